//! The editor session: one owned value tying together scene state,
//! material slots, history, and the generation cache.
//!
//! Every mutation routes through the session so the command log and change
//! notifications stay in sync with actual state. Rendering subscribes to
//! [`ChangeEvent`]s and re-reads only the nodes and slots named in them.

use std::sync::Arc;

use log::warn;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use scenesmith_recipe::{GenerationRequest, NodeId, SlotId, TargetSlotType, Transform};

use crate::cache::{CacheEntry, GenerationCache};
use crate::codec::ImportResult;
use crate::generate::{GenerateError, GenerationTask, RequestId, TextureGenerator};
use crate::history::{Command, CommandError, History, SubtreeSnapshot, UndoOutcome};
use crate::material::{MapBinding, MaterialError, MaterialManager, MaterialSlot};
use crate::scene::{SceneNode, SceneStore};

/// What changed, for incremental re-rendering. Serializable so frontends
/// over a process boundary can consume the same feed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeEvent {
    /// Nodes whose state changed.
    pub nodes: Vec<NodeId>,
    /// Slots whose effective binding may have changed.
    pub slots: Vec<SlotId>,
}

/// Errors surfaced by session operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// A command failed to apply.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// A material slot operation failed outside command application.
    #[error(transparent)]
    Material(#[from] MaterialError),

    /// Texture generation failed.
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

/// Outcome of resolving a generation result against a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// The result was applied to the slot.
    Applied,
    /// The slot stopped waiting for this request; the result was discarded
    /// (it is still cached).
    Stale,
}

const EVENT_CAPACITY: usize = 64;

/// One editing session. Explicit owned value; nothing global.
pub struct EditorSession {
    scene: SceneStore,
    materials: MaterialManager,
    history: History,
    cache: Arc<GenerationCache>,
    next_request: u64,
    events: broadcast::Sender<ChangeEvent>,
}

impl EditorSession {
    /// Creates a session with an empty scene and its own cache.
    pub fn new() -> Self {
        Self::with_cache(Arc::new(GenerationCache::new()))
    }

    /// Creates a session sharing an existing cache, e.g. across recipe
    /// reloads.
    pub fn with_cache(cache: Arc<GenerationCache>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            scene: SceneStore::new(),
            materials: MaterialManager::new(),
            history: History::new(),
            cache,
            next_request: 0,
            events,
        }
    }

    /// The scene store, read-only.
    pub fn scene(&self) -> &SceneStore {
        &self.scene
    }

    /// The material manager, read-only.
    pub fn materials(&self) -> &MaterialManager {
        &self.materials
    }

    /// The shared generation cache.
    pub fn cache(&self) -> &Arc<GenerationCache> {
        &self.cache
    }

    /// True when there is a command to undo.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// True when there is a command to redo.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    fn emit(&self, nodes: Vec<NodeId>, slots: Vec<SlotId>) {
        if nodes.is_empty() && slots.is_empty() {
            return;
        }
        // No receivers is fine; headless sessions run without a renderer.
        let _ = self.events.send(ChangeEvent { nodes, slots });
    }

    /// Applies a command and records it in the history. A failed command
    /// leaves state, log, and subscribers untouched.
    pub fn execute(&mut self, command: Command) -> Result<(), CommandError> {
        let (nodes, slots) = command.touched();
        self.history
            .execute(command, &mut self.scene, &mut self.materials)?;
        self.emit(nodes, slots);
        Ok(())
    }

    /// Reverses the most recent command, if any.
    pub fn undo(&mut self) -> Result<UndoOutcome, CommandError> {
        let touched = self.history.undo_peek().map(Command::touched);
        let outcome = self.history.undo(&mut self.scene, &mut self.materials)?;
        if outcome == UndoOutcome::Done {
            if let Some((nodes, slots)) = touched {
                self.emit(nodes, slots);
            }
        }
        Ok(outcome)
    }

    /// Re-applies the most recently undone command, if any.
    pub fn redo(&mut self) -> Result<UndoOutcome, CommandError> {
        let outcome = self.history.redo(&mut self.scene, &mut self.materials)?;
        if outcome == UndoOutcome::Done {
            if let Some((nodes, slots)) = self.history.undo_peek().map(Command::touched) {
                self.emit(nodes, slots);
            }
        }
        Ok(outcome)
    }

    /// Adds a node under `parent` with one material slot per requested
    /// type, as one undoable command. Returns the new node's id.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        mesh_ref: Option<String>,
        slot_types: &[TargetSlotType],
    ) -> Result<NodeId, CommandError> {
        let parent_node = self
            .scene
            .node(parent)
            .ok_or(CommandError::NodeNotFound(parent))?;
        let child_index = parent_node.children.len();

        let id = self.scene.allocate_id();
        let mut node = SceneNode::new(id, Some(parent));
        node.mesh_ref = mesh_ref;
        let mut slots = Vec::with_capacity(slot_types.len());
        for slot_type in slot_types {
            let slot_id = self.materials.allocate_id();
            node.slot_refs.push(slot_id);
            slots.push(MaterialSlot::new(slot_id, *slot_type));
        }

        let snapshot = SubtreeSnapshot {
            parent,
            child_index,
            nodes: vec![node],
            slots,
        };
        self.execute(Command::NodeAdd { snapshot })?;
        Ok(id)
    }

    /// Removes the subtree rooted at `id`, material slots included, as one
    /// undoable command. The root cannot be removed.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), CommandError> {
        let snapshot = SubtreeSnapshot::capture(&self.scene, &self.materials, id)?;
        self.execute(Command::NodeRemove { snapshot })
    }

    /// Sets a node's transform as an undoable command.
    pub fn set_transform(&mut self, node: NodeId, new: Transform) -> Result<(), CommandError> {
        let old = self
            .scene
            .node(node)
            .ok_or(CommandError::NodeNotFound(node))?
            .transform;
        self.execute(Command::TransformEdit { node, old, new })
    }

    /// Stages a binding as a slot's preview, as an undoable command.
    pub fn apply_material(
        &mut self,
        slot: SlotId,
        binding: MapBinding,
    ) -> Result<(), CommandError> {
        let prev_preview = self
            .materials
            .slot(slot)
            .ok_or(MaterialError::SlotNotFound(slot))
            .map_err(CommandError::from)?
            .preview
            .clone();
        self.execute(Command::MaterialApply {
            slot,
            prev_preview,
            new_preview: binding,
        })
    }

    /// Commits a slot's active preview, as an undoable command.
    pub fn commit_material(&mut self, slot: SlotId) -> Result<(), CommandError> {
        let prev_committed = self
            .materials
            .slot(slot)
            .ok_or(MaterialError::SlotNotFound(slot))
            .map_err(CommandError::from)?
            .committed
            .clone();
        self.execute(Command::MaterialCommit {
            slot,
            prev_committed,
        })
    }

    /// Discards a slot's active preview, as an undoable command.
    pub fn revert_material(&mut self, slot: SlotId) -> Result<(), CommandError> {
        let discarded = self
            .materials
            .slot(slot)
            .ok_or(MaterialError::SlotNotFound(slot))
            .map_err(CommandError::from)?
            .preview
            .clone()
            .ok_or(MaterialError::NoActivePreview(slot))
            .map_err(CommandError::from)?;
        self.execute(Command::MaterialRevert { slot, discarded })
    }

    fn allocate_request(&mut self, slot: SlotId, request: GenerationRequest) -> GenerationTask {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        GenerationTask::new(id, slot, request)
    }

    /// Generates maps for `request` and stages them as the slot's preview.
    ///
    /// The cache deduplicates the generation; concurrent identical requests
    /// share one backend call. By the time the result arrives the slot may
    /// have moved on (newer request, cancellation), in which case the
    /// result is discarded and `Stale` returned; the cache keeps it either
    /// way. Failures never touch the history.
    pub async fn request_preview(
        &mut self,
        slot: SlotId,
        request: GenerationRequest,
        generator: &dyn TextureGenerator,
    ) -> Result<PreviewOutcome, SessionError> {
        let task = self.allocate_request(slot, request);
        self.materials
            .set_expected_request(slot, Some(task.request_id))?;

        let cache = Arc::clone(&self.cache);
        let result = cache.request(&task.request, generator).await;
        match result {
            Ok(entry) => self.resolve_preview(&task, entry),
            Err(err) => {
                if self.materials.expected_request(slot)? == Some(task.request_id) {
                    self.materials.set_expected_request(slot, None)?;
                }
                Err(err.into())
            }
        }
    }

    /// Applies a resolved generation result as the slot's preview, unless
    /// the slot stopped waiting for it.
    fn resolve_preview(
        &mut self,
        task: &GenerationTask,
        entry: CacheEntry,
    ) -> Result<PreviewOutcome, SessionError> {
        if task.is_cancelled()
            || self.materials.expected_request(task.slot)? != Some(task.request_id)
        {
            warn!(
                "discarding stale generation result {} for slot {}",
                task.request_id, task.slot
            );
            return Ok(PreviewOutcome::Stale);
        }
        self.materials.set_expected_request(task.slot, None)?;
        self.apply_material(
            task.slot,
            MapBinding::Generated {
                cache_key: entry.key,
                maps: entry.maps,
                request: entry.request,
            },
        )?;
        Ok(PreviewOutcome::Applied)
    }

    /// Regenerates one pending slot from a recipe import. Binds committed
    /// state directly, outside the history: the import itself was not an
    /// edit, so its materialization is not one either.
    pub async fn complete_pending(
        &mut self,
        slot: SlotId,
        request: GenerationRequest,
        generator: &dyn TextureGenerator,
    ) -> Result<PreviewOutcome, SessionError> {
        let task = self.allocate_request(slot, request);
        self.materials
            .set_expected_request(slot, Some(task.request_id))?;

        let cache = Arc::clone(&self.cache);
        let result = cache.request(&task.request, generator).await;
        match result {
            Ok(entry) => {
                if task.is_cancelled()
                    || self.materials.expected_request(slot)? != Some(task.request_id)
                {
                    warn!(
                        "discarding stale regeneration result {} for slot {}",
                        task.request_id, slot
                    );
                    return Ok(PreviewOutcome::Stale);
                }
                self.materials.set_expected_request(slot, None)?;
                self.materials.bind_committed(
                    slot,
                    MapBinding::Generated {
                        cache_key: entry.key,
                        maps: entry.maps,
                        request: entry.request,
                    },
                )?;
                self.emit(Vec::new(), vec![slot]);
                Ok(PreviewOutcome::Applied)
            }
            Err(err) => {
                if self.materials.expected_request(slot)? == Some(task.request_id) {
                    self.materials.set_expected_request(slot, None)?;
                }
                Err(err.into())
            }
        }
    }

    /// Replaces the session state wholesale with an import result. The
    /// history is cleared; an import is a new timeline, not an edit.
    pub fn apply_import(&mut self, import: ImportResult) {
        let nodes: Vec<NodeId> = import.scene.node_ids().collect();
        let slots: Vec<SlotId> = import.materials.slots().map(|s| s.id).collect();
        self.scene = import.scene;
        self.materials = import.materials;
        self.history.clear();
        self.emit(nodes, slots);
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;
    use pretty_assertions::assert_eq;

    use scenesmith_recipe::hash::request_cache_key;
    use scenesmith_recipe::MapSet;

    use crate::codec;

    use super::*;

    fn static_binding(path: &str) -> MapBinding {
        MapBinding::Static {
            path: path.to_string(),
        }
    }

    struct StubGenerator {
        calls: AtomicUsize,
    }

    impl StubGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TextureGenerator for StubGenerator {
        fn generate(
            &self,
            request: &GenerationRequest,
        ) -> BoxFuture<'static, Result<MapSet, GenerateError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let albedo = format!("{}.png", request.prompt.replace(' ', "_"));
            async move { Ok(MapSet::albedo_only(albedo)) }.boxed()
        }
    }

    fn floor_session() -> (EditorSession, SlotId) {
        let mut session = EditorSession::new();
        let root = session.scene().root();
        let node = session
            .add_node(root, Some("floor.mesh".into()), &[TargetSlotType::Floor])
            .unwrap();
        let slot = session.scene().node(node).unwrap().slot_refs[0];
        (session, slot)
    }

    #[test]
    fn preview_commit_undo_walks_back_both_layers() {
        let (mut session, slot) = floor_session();

        session
            .apply_material(slot, static_binding("wet_cobble.png"))
            .unwrap();
        assert_eq!(
            session.materials().effective(slot).unwrap(),
            &static_binding("wet_cobble.png")
        );

        session.commit_material(slot).unwrap();
        let committed = session.materials().slot(slot).unwrap();
        assert_eq!(committed.committed, static_binding("wet_cobble.png"));
        assert!(committed.preview.is_none());

        // Undo the commit: preview is staged again over the old committed.
        assert_eq!(session.undo().unwrap(), UndoOutcome::Done);
        let slot_state = session.materials().slot(slot).unwrap();
        assert_eq!(slot_state.committed, MapBinding::Default);
        assert_eq!(slot_state.preview, Some(static_binding("wet_cobble.png")));

        // Undo the apply: back to the initial state.
        assert_eq!(session.undo().unwrap(), UndoOutcome::Done);
        assert_eq!(
            session.materials().effective(slot).unwrap(),
            &MapBinding::Default
        );

        assert_eq!(session.redo().unwrap(), UndoOutcome::Done);
        assert_eq!(session.redo().unwrap(), UndoOutcome::Done);
        assert_eq!(
            session.materials().slot(slot).unwrap().committed,
            static_binding("wet_cobble.png")
        );
    }

    #[test]
    fn revert_discards_preview_and_is_undoable() {
        let (mut session, slot) = floor_session();
        session
            .apply_material(slot, static_binding("draft.png"))
            .unwrap();
        session.revert_material(slot).unwrap();
        assert_eq!(
            session.materials().effective(slot).unwrap(),
            &MapBinding::Default
        );

        session.undo().unwrap();
        assert_eq!(
            session.materials().effective(slot).unwrap(),
            &static_binding("draft.png")
        );
    }

    #[test]
    fn events_name_the_touched_nodes_and_slots() {
        let (mut session, slot) = floor_session();
        let mut events = session.subscribe();
        session
            .apply_material(slot, static_binding("draft.png"))
            .unwrap();

        let event = events.try_recv().unwrap();
        assert!(event.nodes.is_empty());
        assert_eq!(event.slots, vec![slot]);
    }

    #[test]
    fn failed_commands_emit_nothing() {
        let (mut session, slot) = floor_session();
        let mut events = session.subscribe();
        assert!(session.commit_material(slot).is_err());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn request_preview_stages_generated_maps() {
        let (mut session, slot) = floor_session();
        let generator = StubGenerator::new();
        let request = GenerationRequest::new("mossy stone", 7, 1024, TargetSlotType::Floor);

        let outcome = session
            .request_preview(slot, request.clone(), &generator)
            .await
            .unwrap();
        assert_eq!(outcome, PreviewOutcome::Applied);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        match session.materials().effective(slot).unwrap() {
            MapBinding::Generated { cache_key, request: recorded, .. } => {
                assert_eq!(cache_key, &request_cache_key(&request));
                assert_eq!(recorded, &request);
            }
            other => panic!("expected generated preview, got {:?}", other),
        }
        // The preview is undoable like any other edit.
        session.undo().unwrap();
        assert_eq!(
            session.materials().effective(slot).unwrap(),
            &MapBinding::Default
        );
    }

    #[tokio::test]
    async fn stale_results_are_discarded() {
        let (mut session, slot) = floor_session();
        let request = GenerationRequest::new("mossy stone", 7, 1024, TargetSlotType::Floor);
        let task = session.allocate_request(slot, request.clone());
        // The slot has since started waiting for a different request.
        session
            .materials
            .set_expected_request(slot, Some(RequestId(999)))
            .unwrap();

        let entry = CacheEntry::new(
            request_cache_key(&request),
            request,
            MapSet::albedo_only("mossy_stone.png"),
        );
        let outcome = session.resolve_preview(&task, entry).unwrap();
        assert_eq!(outcome, PreviewOutcome::Stale);
        assert_eq!(
            session.materials().effective(slot).unwrap(),
            &MapBinding::Default
        );
        // Nothing was pushed: the only undoable edit is the node add from
        // setup.
        assert_eq!(session.undo().unwrap(), UndoOutcome::Done);
        assert!(!session.can_undo());
    }

    #[tokio::test]
    async fn complete_pending_binds_committed_without_history() {
        let (session, slot) = floor_session();
        let request = GenerationRequest::new("mossy stone", 7, 1024, TargetSlotType::Floor);

        // Round-trip through a document with an empty cache to get a
        // pending slot.
        let mut exporter = session;
        exporter
            .apply_material(
                slot,
                MapBinding::Pending {
                    request: request.clone(),
                },
            )
            .unwrap();
        exporter.commit_material(slot).unwrap();
        let doc = codec::serialize(exporter.scene(), exporter.materials());

        let mut session = EditorSession::new();
        let import = codec::deserialize(&doc, session.cache()).unwrap();
        let pending = import.pending.clone();
        session.apply_import(import);
        assert!(!session.can_undo());

        let generator = StubGenerator::new();
        for (slot, request) in pending {
            let outcome = session
                .complete_pending(slot, request, &generator)
                .await
                .unwrap();
            assert_eq!(outcome, PreviewOutcome::Applied);
        }
        for slot in session.materials().slots() {
            assert!(slot.committed.is_resolved());
        }
        assert!(!session.can_undo());
    }
}
