//! SceneSmith procedural texture backend.
//!
//! The default [`TextureGenerator`](scenesmith_editor::TextureGenerator)
//! implementation: it maps free-form prompts onto three procedural styles
//! (checker, stone, metal) and writes PBR-like map sets as PNGs.
//!
//! Everything is deterministic: PCG32 seeded from the request, fixed PNG
//! encoder settings, file names derived from the request's cache key. The
//! same request always yields the same bytes in the same places, which is
//! what makes recipe regeneration reproducible offline.

pub mod buffer;
pub mod generator;
pub mod png;
pub mod rng;
pub mod style;
pub mod synth;

pub use generator::ProceduralGenerator;
pub use style::{infer_style, Style};
