//! Texture generation request and response types.
//!
//! A [`GenerationRequest`] is the complete input contract for the external
//! texture generation collaborator. Equal requests must always resolve to
//! equal cache keys, so every field that influences the output lives here.

use serde::{Deserialize, Serialize};

/// Material slot categories a generated texture can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSlotType {
    /// Ground/floor surfaces.
    Floor,
    /// Vertical surfaces.
    Wall,
    /// Props and free-standing objects.
    Object,
    /// No particular surface category.
    Generic,
}

impl TargetSlotType {
    /// Returns the slot type as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetSlotType::Floor => "floor",
            TargetSlotType::Wall => "wall",
            TargetSlotType::Object => "object",
            TargetSlotType::Generic => "generic",
        }
    }

    /// Returns all slot types.
    pub fn all() -> &'static [TargetSlotType] {
        &[
            TargetSlotType::Floor,
            TargetSlotType::Wall,
            TargetSlotType::Object,
            TargetSlotType::Generic,
        ]
    }
}

impl std::fmt::Display for TargetSlotType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TargetSlotType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "floor" => Ok(TargetSlotType::Floor),
            "wall" => Ok(TargetSlotType::Wall),
            "object" => Ok(TargetSlotType::Object),
            "generic" => Ok(TargetSlotType::Generic),
            _ => Err(format!("unknown slot type: {}", s)),
        }
    }
}

/// Parameters for one texture generation call.
///
/// This is the unit the cache key is derived from: two requests with equal
/// fields are the same generation, regardless of when or where they are
/// issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationRequest {
    /// Free-text description of the desired material.
    pub prompt: String,
    /// RNG seed for deterministic generation.
    pub seed: u32,
    /// Output resolution (square, pixels per side).
    pub size: u32,
    /// Which slot category the texture is intended for.
    pub target_slot_type: TargetSlotType,
}

impl GenerationRequest {
    /// Creates a new request.
    pub fn new(
        prompt: impl Into<String>,
        seed: u32,
        size: u32,
        target_slot_type: TargetSlotType,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            seed,
            size,
            target_slot_type,
        }
    }
}

/// Resolved texture map paths returned by a generation call.
///
/// Albedo is always present; the remaining maps depend on the material
/// style. A failed generation returns an error, never a partial set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSet {
    /// Base color map path.
    pub albedo: String,
    /// Normal (or normal-like height) map path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal: Option<String>,
    /// Roughness map path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roughness: Option<String>,
    /// Metalness map path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metalness: Option<String>,
}

impl MapSet {
    /// Creates a map set containing only an albedo map.
    pub fn albedo_only(albedo: impl Into<String>) -> Self {
        Self {
            albedo: albedo.into(),
            normal: None,
            roughness: None,
            metalness: None,
        }
    }

    /// Iterates over the present map paths.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.albedo.as_str())
            .chain(self.normal.as_deref())
            .chain(self.roughness.as_deref())
            .chain(self.metalness.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_type_round_trips_through_str() {
        for slot_type in TargetSlotType::all() {
            let parsed: TargetSlotType = slot_type.as_str().parse().unwrap();
            assert_eq!(parsed, *slot_type);
        }
        assert!("ceiling".parse::<TargetSlotType>().is_err());
    }

    #[test]
    fn map_set_paths_skips_missing_maps() {
        let maps = MapSet {
            albedo: "a.png".to_string(),
            normal: None,
            roughness: Some("r.png".to_string()),
            metalness: None,
        };
        let paths: Vec<&str> = maps.paths().collect();
        assert_eq!(paths, vec!["a.png", "r.png"]);
    }

    #[test]
    fn map_set_omits_absent_maps_in_json() {
        let maps = MapSet::albedo_only("wet_cobble.png");
        let json = serde_json::to_string(&maps).unwrap();
        assert!(!json.contains("normal"));
        assert!(!json.contains("roughness"));
    }
}
