//! The scene state store.
//!
//! Nodes live in an arena keyed by [`NodeId`]; parent/child relationships
//! are id references, never pointers, so subtree removal and undo
//! reconstruction cannot dangle. There is always exactly one root, and the
//! store is mutated only through command application in the session.

use std::collections::HashMap;

use scenesmith_recipe::{NodeId, SlotId, Transform};

/// One node of the editable scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Node identity, stable for the session and across export/import.
    pub id: NodeId,
    /// Parent id; `None` only for the root.
    pub parent: Option<NodeId>,
    /// Local transform.
    pub transform: Transform,
    /// Child ids in editing order. This order is the stable child order
    /// used by recipe serialization.
    pub children: Vec<NodeId>,
    /// Mesh asset reference, if the node carries geometry.
    pub mesh_ref: Option<String>,
    /// Material slots owned by this node.
    pub slot_refs: Vec<SlotId>,
}

impl SceneNode {
    /// Creates a childless node.
    pub fn new(id: NodeId, parent: Option<NodeId>) -> Self {
        Self {
            id,
            parent,
            transform: Transform::identity(),
            children: Vec::new(),
            mesh_ref: None,
            slot_refs: Vec::new(),
        }
    }
}

/// Arena of scene nodes with a single root.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneStore {
    nodes: HashMap<NodeId, SceneNode>,
    root: NodeId,
    next_id: u64,
}

impl SceneStore {
    /// Creates a store containing only a fresh root node.
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, SceneNode::new(root, None));
        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    /// Creates a store around an imported root node.
    pub(crate) fn with_root(root: SceneNode) -> Self {
        let root_id = root.id;
        let next_id = root_id.0 + 1;
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            nodes,
            root: root_id,
            next_id,
        }
    }

    /// Allocates a fresh node id. Ids are never reused within a session,
    /// even after undo.
    pub(crate) fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Ensures future allocations stay clear of an imported id.
    pub(crate) fn reserve_id(&mut self, id: NodeId) {
        self.next_id = self.next_id.max(id.0 + 1);
    }

    /// The root node id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }

    /// True if the node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterates over all node ids in arbitrary order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Replaces a node's transform, returning the prior value.
    pub(crate) fn set_transform(&mut self, id: NodeId, transform: Transform) -> Option<Transform> {
        let node = self.nodes.get_mut(&id)?;
        Some(std::mem::replace(&mut node.transform, transform))
    }

    /// Inserts a node into the arena without linking it to a parent.
    pub(crate) fn insert_detached(&mut self, node: SceneNode) {
        self.reserve_id(node.id);
        self.nodes.insert(node.id, node);
    }

    /// Links an already-inserted node under `parent` at `index` (clamped
    /// to the child count).
    pub(crate) fn attach(&mut self, id: NodeId, parent: NodeId, index: usize) -> bool {
        if !self.nodes.contains_key(&id) {
            return false;
        }
        let Some(parent_node) = self.nodes.get_mut(&parent) else {
            return false;
        };
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(parent);
        }
        true
    }

    /// Unlinks a node from its parent, returning its former child index.
    pub(crate) fn detach(&mut self, id: NodeId) -> Option<usize> {
        let parent = self.nodes.get(&id)?.parent?;
        let parent_node = self.nodes.get_mut(&parent)?;
        let index = parent_node.children.iter().position(|c| *c == id)?;
        parent_node.children.remove(index);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
        Some(index)
    }

    /// Removes a node from the arena. The caller is responsible for
    /// detaching it and removing its descendants first.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        self.nodes.remove(&id)
    }

    /// Returns `id` and all its descendants in depth-first preorder,
    /// following stable child order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                out.push(current);
                for child in node.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        out
    }

    /// Verifies the structural invariants: one root, mutually consistent
    /// parent/child links, every node reachable from the root.
    pub fn check_consistency(&self) -> Result<(), String> {
        let root = self
            .nodes
            .get(&self.root)
            .ok_or_else(|| format!("root {} missing from arena", self.root))?;
        if root.parent.is_some() {
            return Err(format!("root {} has a parent", self.root));
        }
        for (id, node) in &self.nodes {
            if node.id != *id {
                return Err(format!("node {} stored under key {}", node.id, id));
            }
            if *id != self.root && node.parent.is_none() {
                return Err(format!("node {} has no parent and is not the root", id));
            }
            if let Some(parent) = node.parent {
                let parent_node = self
                    .nodes
                    .get(&parent)
                    .ok_or_else(|| format!("node {} has missing parent {}", id, parent))?;
                if !parent_node.children.contains(id) {
                    return Err(format!("node {} absent from children of {}", id, parent));
                }
            }
            for child in &node.children {
                let child_node = self
                    .nodes
                    .get(child)
                    .ok_or_else(|| format!("child {} of {} missing", child, id))?;
                if child_node.parent != Some(*id) {
                    return Err(format!("child {} does not point back to {}", child, id));
                }
            }
        }
        let reachable = self.subtree(self.root);
        if reachable.len() != self.nodes.len() {
            return Err(format!(
                "{} nodes reachable from root, {} in arena",
                reachable.len(),
                self.nodes.len()
            ));
        }
        Ok(())
    }
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child_of(store: &mut SceneStore, parent: NodeId) -> NodeId {
        let id = store.allocate_id();
        store.insert_detached(SceneNode::new(id, None));
        let end = store.node(parent).map(|n| n.children.len()).unwrap_or(0);
        assert!(store.attach(id, parent, end));
        id
    }

    #[test]
    fn fresh_store_has_a_consistent_root() {
        let store = SceneStore::new();
        assert_eq!(store.len(), 1);
        assert!(store.check_consistency().is_ok());
    }

    #[test]
    fn attach_detach_round_trip_preserves_child_order() {
        let mut store = SceneStore::new();
        let root = store.root();
        let a = child_of(&mut store, root);
        let b = child_of(&mut store, root);
        let c = child_of(&mut store, root);
        assert_eq!(store.node(root).unwrap().children, vec![a, b, c]);

        let index = store.detach(b).unwrap();
        assert_eq!(index, 1);
        assert_eq!(store.node(root).unwrap().children, vec![a, c]);

        assert!(store.attach(b, root, index));
        assert_eq!(store.node(root).unwrap().children, vec![a, b, c]);
        assert!(store.check_consistency().is_ok());
    }

    #[test]
    fn subtree_is_preorder_in_child_order() {
        let mut store = SceneStore::new();
        let root = store.root();
        let a = child_of(&mut store, root);
        let b = child_of(&mut store, root);
        let a1 = child_of(&mut store, a);
        let a2 = child_of(&mut store, a);
        assert_eq!(store.subtree(root), vec![root, a, a1, a2, b]);
        assert_eq!(store.subtree(a), vec![a, a1, a2]);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut store = SceneStore::new();
        let root = store.root();
        let a = child_of(&mut store, root);
        store.detach(a);
        store.remove(a);
        let b = store.allocate_id();
        assert_ne!(a, b);
    }

    #[test]
    fn consistency_catches_broken_back_links() {
        let mut store = SceneStore::new();
        let root = store.root();
        let a = child_of(&mut store, root);
        store.node_mut(a).unwrap().parent = None;
        assert!(store.check_consistency().is_err());
    }
}
