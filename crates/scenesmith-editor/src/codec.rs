//! Recipe codec: live session state to and from [`RecipeDoc`].
//!
//! Export walks the scene depth-first in stable child order and records
//! committed material state only; previews are session-local and never
//! leave the editor. Import is lenient per entry: malformed or orphaned
//! entries are skipped with a recorded warning, and generated slots whose
//! maps are not cached come back as pending regeneration requests rather
//! than errors.

use std::collections::HashSet;

use log::warn;

use scenesmith_recipe::hash::request_cache_key;
use scenesmith_recipe::{
    GenerationRequest, ImportWarning, MapSource, MaterialSnapshot, NodeId, NodeSnapshot,
    RecipeDoc, RecipeError, SlotId, TargetSlotType, WarningCode, RECIPE_VERSION,
};

use crate::cache::GenerationCache;
use crate::material::{MapBinding, MaterialManager, MaterialSlot};
use crate::scene::{SceneNode, SceneStore};

/// Exports the committed session state as a versioned document.
///
/// Nodes appear in depth-first preorder from the root, so parents always
/// precede their children and sibling order is the editing order. Import
/// accepts any order; preorder keeps the output stable and diffable.
pub fn serialize(scene: &SceneStore, materials: &MaterialManager) -> RecipeDoc {
    let mut doc = RecipeDoc::new();
    let mut exported_slots = HashSet::new();

    for id in scene.subtree(scene.root()) {
        let Some(node) = scene.node(id) else { continue };
        doc.scene.push(NodeSnapshot {
            id: node.id,
            parent_id: node.parent,
            transform: node.transform,
            mesh_ref: node.mesh_ref.clone(),
            slot_refs: node.slot_refs.clone(),
        });
        for slot_id in &node.slot_refs {
            if !exported_slots.insert(*slot_id) {
                continue;
            }
            if let Some(slot) = materials.slot(*slot_id) {
                doc.materials.push(material_snapshot(slot));
            }
        }
    }
    doc
}

/// The committed binding as a document entry. A pending binding exports as
/// generated: its cache key is derivable from the request, and the next
/// import regenerates it the same way this session would have.
fn material_snapshot(slot: &MaterialSlot) -> MaterialSnapshot {
    let (source, generator_params) = match &slot.committed {
        MapBinding::Default => (MapSource::Default {}, None),
        MapBinding::Static { path } => (
            MapSource::Static {
                static_ref: path.clone(),
            },
            None,
        ),
        MapBinding::Generated {
            cache_key, request, ..
        } => (
            MapSource::Generated {
                cache_key: cache_key.clone(),
            },
            Some(request.clone()),
        ),
        MapBinding::Pending { request } => (
            MapSource::Generated {
                cache_key: request_cache_key(request),
            },
            Some(request.clone()),
        ),
    };
    MaterialSnapshot {
        slot_id: slot.id,
        slot_type: slot.slot_type,
        source,
        generator_params,
    }
}

/// Everything import produced: session-ready state, per-entry warnings,
/// and the generation requests still to be issued for uncached slots.
#[derive(Debug)]
pub struct ImportResult {
    /// Rebuilt scene store.
    pub scene: SceneStore,
    /// Rebuilt material manager.
    pub materials: MaterialManager,
    /// One warning per skipped or defaulted entry.
    pub warnings: Vec<ImportWarning>,
    /// Slots whose maps were not cached, with the request to regenerate
    /// them. Non-fatal; the slots render a placeholder until resolved.
    pub pending: Vec<(SlotId, GenerationRequest)>,
}

/// Rebuilds session state from a document.
///
/// Fails fast with [`RecipeError::Schema`] on a newer document version,
/// before any state is built. Everything else recovers per entry.
pub fn deserialize(
    doc: &RecipeDoc,
    cache: &GenerationCache,
) -> Result<ImportResult, RecipeError> {
    if doc.version > RECIPE_VERSION {
        return Err(RecipeError::unsupported_version(doc.version));
    }

    let mut warnings = Vec::new();
    let scene = import_scene(doc, &mut warnings);
    let (materials, pending) = import_materials(doc, &scene, cache, &mut warnings);

    debug_assert!(scene.check_consistency().is_ok());
    Ok(ImportResult {
        scene,
        materials,
        warnings,
        pending,
    })
}

fn import_scene(doc: &RecipeDoc, warnings: &mut Vec<ImportWarning>) -> SceneStore {
    if doc.scene.is_empty() {
        warnings.push(ImportWarning::new(
            WarningCode::EmptyScene,
            "document has no scene nodes",
        ));
        return SceneStore::new();
    }

    // First pass: dedupe ids, establish the root, defer everything else.
    let mut store: Option<SceneStore> = None;
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut deferred: Vec<(NodeId, &NodeSnapshot)> = Vec::new();
    for snapshot in &doc.scene {
        if !seen.insert(snapshot.id) {
            push_warning(
                warnings,
                ImportWarning::for_node(
                    WarningCode::SkippedDuplicateNode,
                    "node id already used",
                    snapshot.id,
                ),
            );
            continue;
        }
        match snapshot.parent_id {
            None if store.is_none() => {
                store = Some(SceneStore::with_root(node_from_snapshot(snapshot)));
            }
            None => {
                push_warning(
                    warnings,
                    ImportWarning::for_node(
                        WarningCode::ExtraRoot,
                        "second root node skipped",
                        snapshot.id,
                    ),
                );
            }
            Some(parent) => deferred.push((parent, snapshot)),
        }
    }
    let Some(mut store) = store else {
        warnings.push(ImportWarning::new(
            WarningCode::EmptyScene,
            "no root node found; starting from a fresh scene",
        ));
        return SceneStore::new();
    };

    // Attach in sweeps until a fixpoint: a node's parent may appear later
    // in the array, so document order is not required. Export still writes
    // preorder, which keeps sibling order stable for well-formed files.
    loop {
        let before = deferred.len();
        let mut remaining = Vec::with_capacity(before);
        for (parent, snapshot) in deferred {
            if store.contains(parent) {
                store.insert_detached(node_from_snapshot(snapshot));
                let end = store.node(parent).map(|n| n.children.len()).unwrap_or(0);
                store.attach(snapshot.id, parent, end);
            } else {
                remaining.push((parent, snapshot));
            }
        }
        deferred = remaining;
        if deferred.is_empty() || deferred.len() == before {
            break;
        }
    }
    // What is left has a missing parent or sits in a parent cycle.
    for (parent, snapshot) in deferred {
        push_warning(
            warnings,
            ImportWarning::for_node(
                WarningCode::OrphanedNode,
                format!("parent {} missing or skipped", parent),
                snapshot.id,
            ),
        );
    }
    store
}

fn node_from_snapshot(snapshot: &NodeSnapshot) -> SceneNode {
    let mut node = SceneNode::new(snapshot.id, snapshot.parent_id);
    node.transform = snapshot.transform;
    node.mesh_ref = snapshot.mesh_ref.clone();
    node.slot_refs = snapshot.slot_refs.clone();
    node
}

fn import_materials(
    doc: &RecipeDoc,
    scene: &SceneStore,
    cache: &GenerationCache,
    warnings: &mut Vec<ImportWarning>,
) -> (MaterialManager, Vec<(SlotId, GenerationRequest)>) {
    let referenced: HashSet<SlotId> = scene
        .node_ids()
        .filter_map(|id| scene.node(id))
        .flat_map(|node| node.slot_refs.iter().copied())
        .collect();

    let mut manager = MaterialManager::new();
    let mut pending = Vec::new();
    for snapshot in &doc.materials {
        if manager.slot(snapshot.slot_id).is_some() {
            push_warning(
                warnings,
                ImportWarning::new(
                    WarningCode::MalformedMaterial,
                    format!("duplicate materials entry for slot {}", snapshot.slot_id),
                ),
            );
            continue;
        }
        if !referenced.contains(&snapshot.slot_id) {
            warnings.push(ImportWarning::new(
                WarningCode::UnusedMaterial,
                format!("slot {} is referenced by no node", snapshot.slot_id),
            ));
        }

        let mut slot = MaterialSlot::new(snapshot.slot_id, snapshot.slot_type);
        slot.committed = import_binding(snapshot, cache, &mut pending, warnings);
        manager.insert_slot(slot);
    }

    // Slot refs with no materials entry still need a live slot.
    for slot_id in referenced {
        if manager.slot(slot_id).is_none() {
            push_warning(
                warnings,
                ImportWarning::new(
                    WarningCode::DefaultedSlot,
                    format!("slot {} has no materials entry; bound to default", slot_id),
                ),
            );
            manager.insert_slot(MaterialSlot::new(slot_id, TargetSlotType::Generic));
        }
    }
    (manager, pending)
}

fn import_binding(
    snapshot: &MaterialSnapshot,
    cache: &GenerationCache,
    pending: &mut Vec<(SlotId, GenerationRequest)>,
    warnings: &mut Vec<ImportWarning>,
) -> MapBinding {
    match &snapshot.source {
        MapSource::Default {} => MapBinding::Default,
        MapSource::Static { static_ref } => MapBinding::Static {
            path: static_ref.clone(),
        },
        MapSource::Generated { cache_key } => {
            let Some(request) = snapshot.generator_params.clone() else {
                push_warning(
                    warnings,
                    ImportWarning::new(
                        WarningCode::DefaultedSlot,
                        format!(
                            "slot {} is generated but has no generator params; bound to default",
                            snapshot.slot_id
                        ),
                    ),
                );
                return MapBinding::Default;
            };
            match cache.lookup(cache_key) {
                Some(entry) => MapBinding::Generated {
                    cache_key: cache_key.clone(),
                    maps: entry.maps,
                    request,
                },
                None => {
                    pending.push((snapshot.slot_id, request.clone()));
                    MapBinding::Pending { request }
                }
            }
        }
    }
}

fn push_warning(warnings: &mut Vec<ImportWarning>, warning: ImportWarning) {
    warn!("import: {}", warning);
    warnings.push(warning);
}
