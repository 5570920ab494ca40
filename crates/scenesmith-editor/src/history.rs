//! Linear undo/redo command history.
//!
//! Every mutation of scene or material state is a [`Command`] carrying both
//! its forward and inverse payloads, so undo never recomputes state. The log
//! is strictly linear: executing a new command after undo discards the
//! abandoned future.

use thiserror::Error;

use scenesmith_recipe::{NodeId, SlotId, Transform};

use crate::material::{MapBinding, MaterialError, MaterialManager, MaterialSlot};
use crate::scene::{SceneNode, SceneStore};

/// Everything needed to remove a subtree and later reconstruct it exactly:
/// attachment point, node clones in depth-first preorder, and the material
/// slots those nodes own.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeSnapshot {
    /// Parent the subtree root hangs under.
    pub parent: NodeId,
    /// Index in the parent's child list.
    pub child_index: usize,
    /// Node clones, subtree root first, preorder in stable child order.
    pub nodes: Vec<SceneNode>,
    /// Material slots referenced by the captured nodes.
    pub slots: Vec<MaterialSlot>,
}

impl SubtreeSnapshot {
    /// Captures the subtree rooted at `id` without mutating anything.
    /// Fails when `id` is the root or missing.
    pub(crate) fn capture(
        scene: &SceneStore,
        materials: &MaterialManager,
        id: NodeId,
    ) -> Result<Self, CommandError> {
        let node = scene.node(id).ok_or(CommandError::NodeNotFound(id))?;
        let parent = node.parent.ok_or(CommandError::RootImmutable)?;
        let parent_node = scene
            .node(parent)
            .ok_or(CommandError::NodeNotFound(parent))?;
        let child_index = parent_node
            .children
            .iter()
            .position(|c| *c == id)
            .ok_or(CommandError::NodeNotFound(id))?;

        let mut nodes = Vec::new();
        let mut slots = Vec::new();
        for node_id in scene.subtree(id) {
            let node = scene
                .node(node_id)
                .ok_or(CommandError::NodeNotFound(node_id))?;
            for slot_id in &node.slot_refs {
                if let Some(slot) = materials.slot(*slot_id) {
                    slots.push(slot.clone());
                }
            }
            nodes.push(node.clone());
        }
        Ok(Self {
            parent,
            child_index,
            nodes,
            slots,
        })
    }

    /// Id of the captured subtree root.
    pub fn root(&self) -> Option<NodeId> {
        self.nodes.first().map(|n| n.id)
    }

    fn insert(
        &self,
        scene: &mut SceneStore,
        materials: &mut MaterialManager,
    ) -> Result<(), CommandError> {
        let root = self
            .root()
            .ok_or_else(|| CommandError::corrupt("empty subtree snapshot"))?;
        if !scene.contains(self.parent) {
            return Err(CommandError::NodeNotFound(self.parent));
        }
        for node in &self.nodes {
            scene.insert_detached(node.clone());
        }
        for slot in &self.slots {
            materials.insert_slot(slot.clone());
        }
        // Child nodes keep their captured links; only the subtree root
        // needs reattaching to the wider graph.
        if !scene.attach(root, self.parent, self.child_index) {
            return Err(CommandError::NodeNotFound(self.parent));
        }
        Ok(())
    }

    fn remove(
        &self,
        scene: &mut SceneStore,
        materials: &mut MaterialManager,
    ) -> Result<(), CommandError> {
        let root = self
            .root()
            .ok_or_else(|| CommandError::corrupt("empty subtree snapshot"))?;
        if scene.detach(root).is_none() {
            return Err(CommandError::NodeNotFound(root));
        }
        for node in &self.nodes {
            scene.remove(node.id);
        }
        for slot in &self.slots {
            materials.remove_slot(slot.id);
        }
        Ok(())
    }
}

/// One reversible edit. Immutable once created; both directions replay
/// recorded payloads rather than recomputing.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace a node's transform.
    TransformEdit {
        node: NodeId,
        old: Transform,
        new: Transform,
    },
    /// Stage a preview binding on a slot.
    MaterialApply {
        slot: SlotId,
        prev_preview: Option<MapBinding>,
        new_preview: MapBinding,
    },
    /// Promote a slot's preview into committed state.
    MaterialCommit {
        slot: SlotId,
        prev_committed: MapBinding,
    },
    /// Discard a slot's preview.
    MaterialRevert { slot: SlotId, discarded: MapBinding },
    /// Insert a subtree (and its material slots).
    NodeAdd { snapshot: SubtreeSnapshot },
    /// Remove a subtree (and its material slots).
    NodeRemove { snapshot: SubtreeSnapshot },
}

impl Command {
    pub(crate) fn apply(
        &self,
        scene: &mut SceneStore,
        materials: &mut MaterialManager,
    ) -> Result<(), CommandError> {
        match self {
            Command::TransformEdit { node, old, new } => {
                let prior = scene
                    .set_transform(*node, *new)
                    .ok_or(CommandError::NodeNotFound(*node))?;
                debug_assert_eq!(&prior, old, "transform payload out of sync");
                Ok(())
            }
            Command::MaterialApply {
                slot, new_preview, ..
            } => {
                materials.set_preview(*slot, Some(new_preview.clone()))?;
                Ok(())
            }
            Command::MaterialCommit {
                slot,
                prev_committed,
            } => {
                let prior = materials.commit(*slot)?;
                debug_assert_eq!(&prior, prev_committed, "commit payload out of sync");
                Ok(())
            }
            Command::MaterialRevert { slot, discarded } => {
                let prior = materials.revert(*slot)?;
                debug_assert_eq!(&prior, discarded, "revert payload out of sync");
                Ok(())
            }
            Command::NodeAdd { snapshot } => snapshot.insert(scene, materials),
            Command::NodeRemove { snapshot } => snapshot.remove(scene, materials),
        }
    }

    pub(crate) fn unapply(
        &self,
        scene: &mut SceneStore,
        materials: &mut MaterialManager,
    ) -> Result<(), CommandError> {
        match self {
            Command::TransformEdit { node, old, .. } => {
                scene
                    .set_transform(*node, *old)
                    .ok_or(CommandError::NodeNotFound(*node))?;
                Ok(())
            }
            Command::MaterialApply {
                slot, prev_preview, ..
            } => {
                materials.set_preview(*slot, prev_preview.clone())?;
                Ok(())
            }
            Command::MaterialCommit {
                slot,
                prev_committed,
            } => {
                materials.uncommit(*slot, prev_committed.clone())?;
                Ok(())
            }
            Command::MaterialRevert { slot, discarded } => {
                materials.set_preview(*slot, Some(discarded.clone()))?;
                Ok(())
            }
            Command::NodeAdd { snapshot } => snapshot.remove(scene, materials),
            Command::NodeRemove { snapshot } => snapshot.insert(scene, materials),
        }
    }

    /// Nodes and slots the command touches, for change notification.
    pub fn touched(&self) -> (Vec<NodeId>, Vec<SlotId>) {
        match self {
            Command::TransformEdit { node, .. } => (vec![*node], Vec::new()),
            Command::MaterialApply { slot, .. }
            | Command::MaterialCommit { slot, .. }
            | Command::MaterialRevert { slot, .. } => (Vec::new(), vec![*slot]),
            Command::NodeAdd { snapshot } | Command::NodeRemove { snapshot } => (
                snapshot.nodes.iter().map(|n| n.id).collect(),
                snapshot.slots.iter().map(|s| s.id).collect(),
            ),
        }
    }
}

/// Errors from applying or reversing a command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// Referenced node does not exist.
    #[error("scene node {0} not found")]
    NodeNotFound(NodeId),

    /// The root node cannot be removed or reparented.
    #[error("the scene root cannot be removed")]
    RootImmutable,

    /// A material operation failed.
    #[error(transparent)]
    Material(#[from] MaterialError),

    /// Recorded payloads no longer line up with live state.
    #[error("command payload corrupt: {0}")]
    Corrupt(String),
}

impl CommandError {
    fn corrupt(message: impl Into<String>) -> Self {
        CommandError::Corrupt(message.into())
    }
}

/// Result of an undo/redo request. Hitting the boundary of the log is a
/// status, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    /// A command was replayed.
    Done,
    /// Nothing left to undo/redo.
    NothingToDo,
}

/// The linear command log. `cursor` is in `[0, len]`; entries at
/// `cursor..` are the redoable future.
#[derive(Debug, Default)]
pub struct History {
    log: Vec<Command>,
    cursor: usize,
}

impl History {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded commands, including the redoable future.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// True when no commands are recorded.
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// True when there is a command to undo.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// True when there is a command to redo.
    pub fn can_redo(&self) -> bool {
        self.cursor < self.log.len()
    }

    /// Drops all recorded commands. Used when import replaces the session
    /// state wholesale.
    pub fn clear(&mut self) {
        self.log.clear();
        self.cursor = 0;
    }

    /// The command undo would replay next, for UI labels.
    pub fn undo_peek(&self) -> Option<&Command> {
        self.cursor.checked_sub(1).map(|i| &self.log[i])
    }

    /// Applies `command` forward, then records it. A failed application
    /// leaves both the log and the state untouched. Any redoable future is
    /// discarded.
    pub fn execute(
        &mut self,
        command: Command,
        scene: &mut SceneStore,
        materials: &mut MaterialManager,
    ) -> Result<(), CommandError> {
        command.apply(scene, materials)?;
        self.log.truncate(self.cursor);
        self.log.push(command);
        self.cursor = self.log.len();
        Ok(())
    }

    /// Reverses the command before the cursor, if any.
    pub fn undo(
        &mut self,
        scene: &mut SceneStore,
        materials: &mut MaterialManager,
    ) -> Result<UndoOutcome, CommandError> {
        let Some(index) = self.cursor.checked_sub(1) else {
            return Ok(UndoOutcome::NothingToDo);
        };
        self.log[index].unapply(scene, materials)?;
        self.cursor = index;
        Ok(UndoOutcome::Done)
    }

    /// Re-applies the command at the cursor, if any.
    pub fn redo(
        &mut self,
        scene: &mut SceneStore,
        materials: &mut MaterialManager,
    ) -> Result<UndoOutcome, CommandError> {
        if self.cursor == self.log.len() {
            return Ok(UndoOutcome::NothingToDo);
        }
        self.log[self.cursor].apply(scene, materials)?;
        self.cursor += 1;
        Ok(UndoOutcome::Done)
    }

    /// The command at `cursor - 1 - back`, newest first. Test hook.
    #[cfg(test)]
    fn executed(&self, back: usize) -> Option<&Command> {
        self.cursor.checked_sub(1 + back).map(|i| &self.log[i])
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use scenesmith_recipe::TargetSlotType;

    use super::*;

    struct Fixture {
        scene: SceneStore,
        materials: MaterialManager,
        history: History,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                scene: SceneStore::new(),
                materials: MaterialManager::new(),
                history: History::new(),
            }
        }

        fn add_node(&mut self) -> NodeId {
            let id = self.scene.allocate_id();
            let mut node = SceneNode::new(id, Some(self.scene.root()));
            let slot = self.materials.allocate_id();
            node.slot_refs.push(slot);
            let root = self.scene.root();
            let child_index = self.scene.node(root).map(|n| n.children.len()).unwrap();
            let snapshot = SubtreeSnapshot {
                parent: root,
                child_index,
                nodes: vec![node],
                slots: vec![MaterialSlot::new(slot, TargetSlotType::Object)],
            };
            self.execute(Command::NodeAdd { snapshot });
            id
        }

        fn execute(&mut self, command: Command) {
            self.history
                .execute(command, &mut self.scene, &mut self.materials)
                .unwrap();
        }

        fn undo(&mut self) -> UndoOutcome {
            self.history
                .undo(&mut self.scene, &mut self.materials)
                .unwrap()
        }

        fn redo(&mut self) -> UndoOutcome {
            self.history
                .redo(&mut self.scene, &mut self.materials)
                .unwrap()
        }

        fn transform_edit(&self, node: NodeId, x: f32) -> Command {
            let old = self.scene.node(node).unwrap().transform;
            Command::TransformEdit {
                node,
                old,
                new: Transform::at([x, 0.0, 0.0]),
            }
        }
    }

    #[test]
    fn execute_then_undo_restores_initial_state() {
        let mut fx = Fixture::new();
        let node = fx.add_node();
        let initial_scene = fx.scene.clone();
        let initial_materials = fx.materials.clone();

        fx.execute(fx.transform_edit(node, 1.0));
        fx.execute(fx.transform_edit(node, 2.0));
        fx.execute(fx.transform_edit(node, 3.0));

        for _ in 0..3 {
            assert_eq!(fx.undo(), UndoOutcome::Done);
        }
        assert_eq!(fx.scene, initial_scene);
        assert_eq!(fx.materials, initial_materials);
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut fx = Fixture::new();
        let node = fx.add_node();
        fx.execute(fx.transform_edit(node, 5.0));
        let edited = fx.scene.clone();

        assert_eq!(fx.undo(), UndoOutcome::Done);
        assert_eq!(fx.redo(), UndoOutcome::Done);
        assert_eq!(fx.scene, edited);
    }

    #[test]
    fn boundary_is_a_status_not_an_error() {
        let mut fx = Fixture::new();
        assert_eq!(fx.undo(), UndoOutcome::NothingToDo);
        assert_eq!(fx.redo(), UndoOutcome::NothingToDo);

        let node = fx.add_node();
        fx.execute(fx.transform_edit(node, 1.0));
        fx.undo();
        fx.undo();
        fx.undo();
        assert_eq!(fx.undo(), UndoOutcome::NothingToDo);
    }

    #[test]
    fn new_command_after_undo_discards_the_future() {
        let mut fx = Fixture::new();
        let node = fx.add_node();
        for x in 1..=4 {
            fx.execute(fx.transform_edit(node, x as f32));
        }
        assert_eq!(fx.history.len(), 5);

        fx.undo();
        fx.undo();
        assert_eq!(fx.history.cursor(), 3);

        fx.execute(fx.transform_edit(node, 9.0));
        assert_eq!(fx.history.len(), 4);
        assert_eq!(fx.redo(), UndoOutcome::NothingToDo);
        assert!(matches!(
            fx.history.executed(0),
            Some(Command::TransformEdit { .. })
        ));
    }

    #[test]
    fn failed_command_leaves_log_and_state_untouched() {
        let mut fx = Fixture::new();
        let node = fx.add_node();
        let slot = fx.scene.node(node).unwrap().slot_refs[0];
        let before_len = fx.history.len();
        let before_materials = fx.materials.clone();

        let err = fx.history.execute(
            Command::MaterialCommit {
                slot,
                prev_committed: MapBinding::Default,
            },
            &mut fx.scene,
            &mut fx.materials,
        );
        assert_eq!(
            err,
            Err(CommandError::Material(MaterialError::NoActivePreview(slot)))
        );
        assert_eq!(fx.history.len(), before_len);
        assert_eq!(fx.materials, before_materials);
    }

    #[test]
    fn node_remove_undo_reconstructs_subtree_and_slots() {
        let mut fx = Fixture::new();
        let a = fx.add_node();
        let _b = fx.add_node();

        // Hang a child with its own slot under `a`.
        let child = fx.scene.allocate_id();
        let child_slot = fx.materials.allocate_id();
        let mut child_node = SceneNode::new(child, Some(a));
        child_node.slot_refs.push(child_slot);
        let snapshot = SubtreeSnapshot {
            parent: a,
            child_index: 0,
            nodes: vec![child_node],
            slots: vec![MaterialSlot::new(child_slot, TargetSlotType::Wall)],
        };
        fx.execute(Command::NodeAdd { snapshot });

        let before_scene = fx.scene.clone();
        let before_materials = fx.materials.clone();

        let snapshot =
            SubtreeSnapshot::capture(&fx.scene, &fx.materials, a).unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        fx.execute(Command::NodeRemove { snapshot });
        assert!(!fx.scene.contains(a));
        assert!(!fx.scene.contains(child));
        assert!(fx.materials.slot(child_slot).is_none());
        assert!(fx.scene.check_consistency().is_ok());

        assert_eq!(fx.undo(), UndoOutcome::Done);
        assert_eq!(fx.scene, before_scene);
        assert_eq!(fx.materials, before_materials);
        assert!(fx.scene.check_consistency().is_ok());
    }

    #[test]
    fn capturing_the_root_is_rejected() {
        let fx = Fixture::new();
        let root = fx.scene.root();
        assert_eq!(
            SubtreeSnapshot::capture(&fx.scene, &fx.materials, root),
            Err(CommandError::RootImmutable)
        );
    }
}
