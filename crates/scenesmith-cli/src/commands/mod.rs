//! CLI command implementations.

pub mod regen;
pub mod roundtrip;
pub mod show;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use scenesmith_recipe::{parse_recipe, ImportWarning, ParsedRecipe};

/// Loads and leniently parses a recipe file.
pub(crate) fn load_recipe(path: &str) -> Result<ParsedRecipe> {
    let json = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("failed to read recipe file: {}", path))?;
    parse_recipe(&json).with_context(|| format!("failed to parse recipe: {}", path))
}

/// Prints one warning line in the shared format.
pub(crate) fn print_warning(warning: &ImportWarning) {
    println!("  {} {}", "!".yellow(), warning);
}
