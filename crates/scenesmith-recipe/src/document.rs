//! The versioned recipe document.
//!
//! A recipe captures a scene graph plus the committed material state of
//! every slot, keyed by generation cache keys instead of raw texture data.
//! Reopening a recipe reproduces the same visual result: cached keys bind
//! immediately, missing keys are regenerated from the recorded parameters.
//!
//! Preview state is transient editor state and never appears in a document.

use serde::{Deserialize, Serialize};

use crate::error::{ImportWarning, RecipeError, WarningCode};
use crate::hash::CacheKey;
use crate::request::{GenerationRequest, TargetSlotType};

/// Current recipe schema version.
pub const RECIPE_VERSION: u32 = 1;

/// Identity of a scene node. Allocated by the editing session, stable
/// across export/import.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a material slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SlotId(pub u64);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local transform of a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation, XYZ.
    pub position: [f32; 3],
    /// Euler rotation in degrees, XYZ order.
    pub rotation_deg: [f32; 3],
    /// Per-axis scale.
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation_deg: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Transform with a translation only.
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

/// One node of the exported scene graph.
///
/// Nodes are listed in depth-first order starting at the root; child order
/// within a parent is the editing order and is preserved on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Node identity.
    pub id: NodeId,
    /// Parent node; `None` marks the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    /// Local transform.
    pub transform: Transform,
    /// Mesh asset reference, if the node carries geometry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_ref: Option<String>,
    /// Material slots owned by this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slot_refs: Vec<SlotId>,
}

/// Where a slot's committed maps come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapSource {
    /// Maps produced by a generation request, addressed by cache key.
    Generated {
        /// Key of the resolved cache entry.
        cache_key: CacheKey,
    },
    /// A static asset on disk.
    Static {
        /// Asset path.
        static_ref: String,
    },
    /// The editor's built-in default material.
    Default {},
}

/// Committed material state of one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSnapshot {
    /// Slot identity.
    pub slot_id: SlotId,
    /// Surface category of the slot.
    pub slot_type: TargetSlotType,
    /// Map source for the committed state.
    #[serde(flatten)]
    pub source: MapSource,
    /// Generation parameters, recorded for `Generated` sources so a cache
    /// miss on import can regenerate the maps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_params: Option<GenerationRequest>,
}

/// A versioned recipe document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeDoc {
    /// Schema version; see [`RECIPE_VERSION`].
    pub version: u32,
    /// Scene graph snapshot, depth-first from the root.
    pub scene: Vec<NodeSnapshot>,
    /// Committed material state per slot.
    pub materials: Vec<MaterialSnapshot>,
}

impl RecipeDoc {
    /// Creates an empty document at the current schema version.
    pub fn new() -> Self {
        Self {
            version: RECIPE_VERSION,
            scene: Vec::new(),
            materials: Vec::new(),
        }
    }

    /// Parses a document from a JSON string.
    ///
    /// This is the strict path: any malformed entry fails the parse. Use
    /// [`parse_recipe`] for the lenient import path.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parses a document from a JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Serializes the document to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the document to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serializes the document to a JSON value.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Looks up the materials entry for a slot.
    pub fn material(&self, slot_id: SlotId) -> Option<&MaterialSnapshot> {
        self.materials.iter().find(|m| m.slot_id == slot_id)
    }
}

impl Default for RecipeDoc {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of lenient document parsing.
#[derive(Debug)]
pub struct ParsedRecipe {
    /// The document with malformed entries dropped.
    pub doc: RecipeDoc,
    /// One warning per dropped entry.
    pub warnings: Vec<ImportWarning>,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    #[serde(default)]
    scene: Vec<serde_json::Value>,
    #[serde(default)]
    materials: Vec<serde_json::Value>,
}

/// Parses a recipe leniently: the envelope and version must be valid, but
/// individual malformed node or material entries are skipped with a
/// recorded warning so a partially corrupt recipe still loads everything
/// valid.
///
/// Fails fast with [`RecipeError::Schema`] when the document version is
/// newer than this build supports, before looking at any entry.
pub fn parse_recipe(json: &str) -> Result<ParsedRecipe, RecipeError> {
    let envelope: Envelope = serde_json::from_str(json)?;
    if envelope.version > RECIPE_VERSION {
        return Err(RecipeError::unsupported_version(envelope.version));
    }

    let mut warnings = Vec::new();
    let mut scene = Vec::with_capacity(envelope.scene.len());
    for (index, entry) in envelope.scene.into_iter().enumerate() {
        match serde_json::from_value::<NodeSnapshot>(entry) {
            Ok(node) => scene.push(node),
            Err(err) => warnings.push(ImportWarning::new(
                WarningCode::MalformedNode,
                format!("scene[{}] skipped: {}", index, err),
            )),
        }
    }

    let mut materials = Vec::with_capacity(envelope.materials.len());
    for (index, entry) in envelope.materials.into_iter().enumerate() {
        match serde_json::from_value::<MaterialSnapshot>(entry) {
            Ok(material) => materials.push(material),
            Err(err) => warnings.push(ImportWarning::new(
                WarningCode::MalformedMaterial,
                format!("materials[{}] skipped: {}", index, err),
            )),
        }
    }

    Ok(ParsedRecipe {
        doc: RecipeDoc {
            version: envelope.version,
            scene,
            materials,
        },
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::request_cache_key;
    use pretty_assertions::assert_eq;

    fn sample_doc() -> RecipeDoc {
        let request = GenerationRequest::new("mossy stone", 7, 512, TargetSlotType::Floor);
        RecipeDoc {
            version: RECIPE_VERSION,
            scene: vec![
                NodeSnapshot {
                    id: NodeId(0),
                    parent_id: None,
                    transform: Transform::identity(),
                    mesh_ref: None,
                    slot_refs: vec![],
                },
                NodeSnapshot {
                    id: NodeId(1),
                    parent_id: Some(NodeId(0)),
                    transform: Transform::at([1.0, 2.0, 3.0]),
                    mesh_ref: Some("meshes/cube.glb".to_string()),
                    slot_refs: vec![SlotId(10)],
                },
            ],
            materials: vec![MaterialSnapshot {
                slot_id: SlotId(10),
                slot_type: TargetSlotType::Floor,
                source: MapSource::Generated {
                    cache_key: request_cache_key(&request),
                },
                generator_params: Some(request),
            }],
        }
    }

    #[test]
    fn document_round_trips_through_json() {
        let doc = sample_doc();
        let json = doc.to_json_pretty().unwrap();
        let parsed = RecipeDoc::from_json(&json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn map_source_discriminates_by_field() {
        let json = r#"{
            "slot_id": 3,
            "slot_type": "wall",
            "static_ref": "textures/brick.png"
        }"#;
        let material: MaterialSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(
            material.source,
            MapSource::Static {
                static_ref: "textures/brick.png".to_string()
            }
        );

        let json = r#"{ "slot_id": 4, "slot_type": "generic" }"#;
        let material: MaterialSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(material.source, MapSource::Default {});
    }

    #[test]
    fn lenient_parse_skips_malformed_nodes() {
        let json = r#"{
            "version": 1,
            "scene": [
                { "id": 0, "transform": { "position": [0,0,0], "rotation_deg": [0,0,0], "scale": [1,1,1] } },
                { "id": "not a number" },
                { "id": 2, "parent_id": 0, "transform": { "position": [0,0,0], "rotation_deg": [0,0,0], "scale": [1,1,1] } }
            ],
            "materials": []
        }"#;
        let parsed = parse_recipe(json).unwrap();
        assert_eq!(parsed.doc.scene.len(), 2);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].code, WarningCode::MalformedNode);
    }

    #[test]
    fn newer_version_is_rejected_before_entries() {
        let json = r#"{ "version": 99, "scene": [ 42 ], "materials": [ true ] }"#;
        let err = parse_recipe(json).unwrap_err();
        assert!(matches!(
            err,
            RecipeError::Schema {
                found: 99,
                supported: RECIPE_VERSION
            }
        ));
    }

    #[test]
    fn older_or_equal_version_is_accepted() {
        let json = r#"{ "version": 1, "scene": [], "materials": [] }"#;
        assert!(parse_recipe(json).is_ok());
    }
}
