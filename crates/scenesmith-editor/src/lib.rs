//! SceneSmith editing core.
//!
//! This crate owns the live state of an editing session and everything
//! that keeps it reproducible:
//!
//! - [`scene`]: the node arena behind the scene graph
//! - [`material`]: per-slot committed/preview map bindings
//! - [`history`]: the linear undo/redo command log
//! - [`cache`]: content-addressed, request-coalescing generation cache
//! - [`generate`]: generation task handles and the generator trait
//! - [`codec`]: recipe export/import against live state
//! - [`session`]: the owned value tying it all together, with change events
//! - [`autosave`]: periodic committed-state snapshots
//!
//! The session is the only mutation surface. Commands carry their own
//! inverses, so undo replays recorded payloads instead of recomputing, and
//! export walks committed state only, so a recipe written mid-preview is
//! indistinguishable from one written after a revert.

pub mod autosave;
pub mod cache;
pub mod codec;
pub mod generate;
pub mod history;
pub mod material;
pub mod scene;
pub mod session;

pub use autosave::{Autosave, AutosaveConfig, FileSnapshotStore, SnapshotStore};
pub use cache::{CacheEntry, CacheStats, GenerationCache};
pub use codec::{deserialize, serialize, ImportResult};
pub use generate::{
    CancellationToken, GenerateError, GenerationTask, RequestId, TextureGenerator,
};
pub use history::{Command, CommandError, History, SubtreeSnapshot, UndoOutcome};
pub use material::{MapBinding, MaterialError, MaterialManager, MaterialSlot};
pub use scene::{SceneNode, SceneStore};
pub use session::{ChangeEvent, EditorSession, PreviewOutcome, SessionError};
