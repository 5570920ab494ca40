//! Generation task handles and the external generator interface.
//!
//! Texture generation is the only suspending operation in the editor. Each
//! issued request gets a unique [`RequestId`] and a [`CancellationToken`];
//! every completion is checked against the slot's currently-expected id
//! before it may touch material state, so late or cancelled responses are
//! silently discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;

use scenesmith_recipe::{GenerationRequest, MapSet, SlotId};

/// Unique id of one issued generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub(crate) u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Cooperative cancellation flag shared between the editor surface and a
/// generation task.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Handle for an in-flight generation request targeting one slot.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    /// Unique id, matched against the slot's expected request on completion.
    pub request_id: RequestId,
    /// The slot the result is destined for.
    pub slot: SlotId,
    /// The request being generated.
    pub request: GenerationRequest,
    cancel: CancellationToken,
}

impl GenerationTask {
    pub(crate) fn new(request_id: RequestId, slot: SlotId, request: GenerationRequest) -> Self {
        Self {
            request_id,
            slot,
            request,
            cancel: CancellationToken::new(),
        }
    }

    /// The task's cancellation token, cloneable into background work.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels the task; any later completion is discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// True once cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Errors from texture generation.
///
/// Cloneable so one failure can resolve every coalesced waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// The generation backend reported a failure. No partial map set is
    /// ever produced.
    #[error("generation backend error: {0}")]
    Backend(String),

    /// The leading generation task went away without resolving, e.g. its
    /// runtime shut down.
    #[error("generation task dropped before completion")]
    TaskDropped,
}

/// The external texture generation collaborator.
///
/// The core treats this as an opaque asynchronous function from request to
/// map set. Implementations must be deterministic per cache key only in the
/// sense that the key identifies the result; byte-identical regeneration is
/// not required.
pub trait TextureGenerator: Send + Sync {
    /// Generates the maps for `request`.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> BoxFuture<'static, Result<MapSet, GenerateError>>;
}
