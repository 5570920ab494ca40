//! Strict recipe document validation.
//!
//! Validation is the CLI/tooling path: it reports every structural problem
//! instead of silently skipping entries the way lenient import does.

use std::collections::{HashMap, HashSet};

use crate::document::{MapSource, NodeId, RecipeDoc, RECIPE_VERSION};
use crate::error::{
    ErrorCode, ImportWarning, ValidationError, ValidationResult, WarningCode,
};

/// Validates a recipe document.
pub fn validate(doc: &RecipeDoc) -> ValidationResult {
    let mut result = ValidationResult::new();

    if doc.version > RECIPE_VERSION {
        result.add_error(ValidationError::new(
            ErrorCode::UnsupportedVersion,
            format!(
                "version {} is newer than supported version {}",
                doc.version, RECIPE_VERSION
            ),
        ));
    }

    if doc.scene.is_empty() {
        result.add_warning(ImportWarning::new(WarningCode::EmptyScene, "scene is empty"));
    }

    check_nodes(doc, &mut result);
    check_materials(doc, &mut result);

    result
}

fn check_nodes(doc: &RecipeDoc, result: &mut ValidationResult) {
    let mut parents: HashMap<NodeId, Option<NodeId>> = HashMap::new();
    let mut roots = 0usize;

    for node in &doc.scene {
        if parents.insert(node.id, node.parent_id).is_some() {
            result.add_error(ValidationError::for_node(
                ErrorCode::DuplicateNodeId,
                "node id appears more than once",
                node.id,
            ));
        }
        if node.parent_id.is_none() {
            roots += 1;
        }
    }

    if !doc.scene.is_empty() {
        if roots == 0 {
            result.add_error(ValidationError::new(
                ErrorCode::NoRoot,
                "every node has a parent; no root",
            ));
        } else if roots > 1 {
            result.add_error(ValidationError::new(
                ErrorCode::MultipleRoots,
                format!("{} root nodes, expected exactly one", roots),
            ));
        }
    }

    for node in &doc.scene {
        if let Some(parent) = node.parent_id {
            if !parents.contains_key(&parent) {
                result.add_error(ValidationError::for_node(
                    ErrorCode::MissingParent,
                    format!("parent {} does not exist", parent),
                    node.id,
                ));
            }
        }
    }

    // Walk every parent chain; a chain longer than the node count is a cycle.
    for node in &doc.scene {
        let mut current = node.parent_id;
        let mut steps = 0usize;
        while let Some(parent) = current {
            steps += 1;
            if steps > doc.scene.len() {
                result.add_error(ValidationError::for_node(
                    ErrorCode::ParentCycle,
                    "parent chain does not terminate at the root",
                    node.id,
                ));
                break;
            }
            current = parents.get(&parent).copied().flatten();
        }
    }
}

fn check_materials(doc: &RecipeDoc, result: &mut ValidationResult) {
    let mut slot_ids = HashSet::new();
    for material in &doc.materials {
        if !slot_ids.insert(material.slot_id) {
            result.add_error(ValidationError::new(
                ErrorCode::DuplicateSlotId,
                format!("materials entry for slot {} appears more than once", material.slot_id),
            ));
        }
        if matches!(material.source, MapSource::Generated { .. })
            && material.generator_params.is_none()
        {
            result.add_error(ValidationError::new(
                ErrorCode::MissingGeneratorParams,
                format!(
                    "generated slot {} has no generator_params; a cache miss could not regenerate it",
                    material.slot_id
                ),
            ));
        }
    }

    let mut referenced = HashSet::new();
    for node in &doc.scene {
        for slot in &node.slot_refs {
            referenced.insert(*slot);
            if !slot_ids.contains(slot) {
                result.add_error(ValidationError::for_node(
                    ErrorCode::MissingMaterial,
                    format!("slot {} has no materials entry", slot),
                    node.id,
                ));
            }
        }
    }

    for material in &doc.materials {
        if !referenced.contains(&material.slot_id) {
            result.add_warning(ImportWarning::new(
                WarningCode::UnusedMaterial,
                format!("materials entry for slot {} is referenced by no node", material.slot_id),
            ));
        }
    }
}
