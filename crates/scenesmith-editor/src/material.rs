//! The material layer manager.
//!
//! Each slot holds a committed map binding and at most one non-destructive
//! preview binding. Rendering reads [`MaterialManager::effective`], which
//! prefers the preview; everything mutating goes through commands so the
//! history log stays in sync with actual state.
//!
//! The manager itself never touches history. Its mutating calls return the
//! prior state so the session can build exact command inverses.

use std::collections::HashMap;

use thiserror::Error;

use scenesmith_recipe::{CacheKey, GenerationRequest, MapSet, SlotId, TargetSlotType};

use crate::generate::RequestId;

/// Where a slot's maps come from.
#[derive(Debug, Clone, PartialEq)]
pub enum MapBinding {
    /// The editor's built-in default material.
    Default,
    /// A static asset on disk.
    Static {
        /// Asset path.
        path: String,
    },
    /// Resolved generated maps, addressed by cache key.
    Generated {
        /// Key of the cache entry the maps came from.
        cache_key: CacheKey,
        /// Resolved map paths.
        maps: MapSet,
        /// The request that produced them, kept for recipe export.
        request: GenerationRequest,
    },
    /// Regeneration in flight after a recipe import cache miss. Rendering
    /// falls back to a placeholder until the maps resolve.
    Pending {
        /// The request being regenerated.
        request: GenerationRequest,
    },
}

impl MapBinding {
    /// True for bindings the renderer can draw without a placeholder.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, MapBinding::Pending { .. })
    }
}

/// One material slot.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSlot {
    /// Slot identity.
    pub id: SlotId,
    /// Surface category, part of the generation request contract.
    pub slot_type: TargetSlotType,
    /// Committed maps; what recipe export records.
    pub committed: MapBinding,
    /// Active preview, if any. At most one per slot.
    pub preview: Option<MapBinding>,
    /// Stale-result guard: the generation request this slot is waiting
    /// for, if any. Completions with any other id are discarded.
    pub(crate) expected_request: Option<RequestId>,
}

impl MaterialSlot {
    /// Creates a slot bound to the default material.
    pub fn new(id: SlotId, slot_type: TargetSlotType) -> Self {
        Self {
            id,
            slot_type,
            committed: MapBinding::Default,
            preview: None,
            expected_request: None,
        }
    }
}

/// Errors from material slot operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterialError {
    /// The slot does not exist.
    #[error("material slot {0} not found")]
    SlotNotFound(SlotId),

    /// Commit or revert was called with no preview staged.
    #[error("material slot {0} has no active preview")]
    NoActivePreview(SlotId),
}

/// All material slots of a session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialManager {
    slots: HashMap<SlotId, MaterialSlot>,
    next_id: u64,
}

impl MaterialManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh slot id.
    pub(crate) fn allocate_id(&mut self) -> SlotId {
        let id = SlotId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Ensures future allocations stay clear of an imported id.
    pub(crate) fn reserve_id(&mut self, id: SlotId) {
        self.next_id = self.next_id.max(id.0 + 1);
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no slots exist.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Looks up a slot.
    pub fn slot(&self, id: SlotId) -> Option<&MaterialSlot> {
        self.slots.get(&id)
    }

    /// Iterates over all slots in arbitrary order.
    pub fn slots(&self) -> impl Iterator<Item = &MaterialSlot> {
        self.slots.values()
    }

    pub(crate) fn insert_slot(&mut self, slot: MaterialSlot) {
        self.reserve_id(slot.id);
        self.slots.insert(slot.id, slot);
    }

    pub(crate) fn remove_slot(&mut self, id: SlotId) -> Option<MaterialSlot> {
        self.slots.remove(&id)
    }

    fn slot_mut(&mut self, id: SlotId) -> Result<&mut MaterialSlot, MaterialError> {
        self.slots.get_mut(&id).ok_or(MaterialError::SlotNotFound(id))
    }

    /// The maps rendering must use: the preview when one is staged,
    /// otherwise the committed binding. This is the single read API the
    /// renderer consumes.
    pub fn effective(&self, id: SlotId) -> Result<&MapBinding, MaterialError> {
        let slot = self.slots.get(&id).ok_or(MaterialError::SlotNotFound(id))?;
        Ok(slot.preview.as_ref().unwrap_or(&slot.committed))
    }

    /// Stages `binding` as the slot's preview, returning the prior preview
    /// for command inversion. Forward half of a MaterialApply command.
    pub(crate) fn apply_preview(
        &mut self,
        id: SlotId,
        binding: MapBinding,
    ) -> Result<Option<MapBinding>, MaterialError> {
        let slot = self.slot_mut(id)?;
        Ok(slot.preview.replace(binding))
    }

    /// Sets the preview to an exact value, used when replaying command
    /// forward/inverse payloads.
    pub(crate) fn set_preview(
        &mut self,
        id: SlotId,
        preview: Option<MapBinding>,
    ) -> Result<(), MaterialError> {
        let slot = self.slot_mut(id)?;
        slot.preview = preview;
        Ok(())
    }

    /// Promotes the active preview into committed state, returning the
    /// prior committed binding for inversion. Fails without touching state
    /// when no preview is staged.
    pub(crate) fn commit(&mut self, id: SlotId) -> Result<MapBinding, MaterialError> {
        let slot = self.slot_mut(id)?;
        let preview = slot
            .preview
            .take()
            .ok_or(MaterialError::NoActivePreview(id))?;
        Ok(std::mem::replace(&mut slot.committed, preview))
    }

    /// Inverse of [`commit`](Self::commit): moves committed back into the
    /// preview layer and restores the prior committed binding.
    pub(crate) fn uncommit(
        &mut self,
        id: SlotId,
        prev_committed: MapBinding,
    ) -> Result<(), MaterialError> {
        let slot = self.slot_mut(id)?;
        let committed = std::mem::replace(&mut slot.committed, prev_committed);
        slot.preview = Some(committed);
        Ok(())
    }

    /// Discards the active preview, returning it for inversion. Committed
    /// state is untouched.
    pub(crate) fn revert(&mut self, id: SlotId) -> Result<MapBinding, MaterialError> {
        let slot = self.slot_mut(id)?;
        slot.preview
            .take()
            .ok_or(MaterialError::NoActivePreview(id))
    }

    /// Binds committed state directly. Used only by recipe import
    /// materialization, which runs outside the command log.
    pub(crate) fn bind_committed(
        &mut self,
        id: SlotId,
        binding: MapBinding,
    ) -> Result<(), MaterialError> {
        let slot = self.slot_mut(id)?;
        slot.committed = binding;
        Ok(())
    }

    /// Sets or clears the slot's expected generation request id.
    pub(crate) fn set_expected_request(
        &mut self,
        id: SlotId,
        request: Option<RequestId>,
    ) -> Result<(), MaterialError> {
        let slot = self.slot_mut(id)?;
        slot.expected_request = request;
        Ok(())
    }

    /// The generation request id the slot is currently waiting for.
    pub fn expected_request(&self, id: SlotId) -> Result<Option<RequestId>, MaterialError> {
        let slot = self.slots.get(&id).ok_or(MaterialError::SlotNotFound(id))?;
        Ok(slot.expected_request)
    }
}
