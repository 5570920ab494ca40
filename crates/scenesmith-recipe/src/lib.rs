//! SceneSmith recipe document library.
//!
//! A recipe is a compact, versioned JSON document that captures a scene
//! graph and the committed material state of every slot. Generated textures
//! are recorded as content-addressed cache keys plus the generation
//! parameters that produced them, so reopening a recipe reproduces the same
//! visual result without shipping raw texture data.
//!
//! # Example
//!
//! ```
//! use scenesmith_recipe::{GenerationRequest, TargetSlotType};
//! use scenesmith_recipe::hash::request_cache_key;
//!
//! let request = GenerationRequest::new("mossy stone", 7, 1024, TargetSlotType::Floor);
//! let key = request_cache_key(&request);
//! assert_eq!(key.as_str().len(), 64);
//! // Equal requests always derive equal keys.
//! assert_eq!(key, request_cache_key(&request));
//! ```
//!
//! # Modules
//!
//! - [`document`]: the versioned document and lenient parsing
//! - [`request`]: generation request/response contract
//! - [`hash`]: canonical hashing and cache key derivation
//! - [`validation`]: strict document validation
//! - [`error`]: error and warning types

pub mod document;
pub mod error;
pub mod hash;
pub mod request;
pub mod validation;

pub use document::{
    parse_recipe, MapSource, MaterialSnapshot, NodeId, NodeSnapshot, ParsedRecipe, RecipeDoc,
    SlotId, Transform, RECIPE_VERSION,
};
pub use error::{
    ErrorCode, ImportWarning, RecipeError, ValidationError, ValidationResult, WarningCode,
};
pub use hash::{canonical_doc_hash, canonical_value_hash, derive_map_seed, request_cache_key, CacheKey};
pub use request::{GenerationRequest, MapSet, TargetSlotType};
pub use validation::validate;
