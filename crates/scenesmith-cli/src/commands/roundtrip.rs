//! Roundtrip command: import, re-export, and compare canonical forms.

use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;

use scenesmith_editor::{codec, GenerationCache};
use scenesmith_recipe::hash::canonical_doc_hash;

use super::{load_recipe, print_warning};

/// Imports a recipe into a fresh session, serializes it back, and compares
/// the canonical hashes. Exit code 0 when the round trip is lossless.
pub fn run(recipe_path: &str) -> Result<ExitCode> {
    let parsed = load_recipe(recipe_path)?;
    for warning in &parsed.warnings {
        print_warning(warning);
    }

    let cache = GenerationCache::new();
    let imported = codec::deserialize(&parsed.doc, &cache)
        .with_context(|| format!("failed to import recipe: {}", recipe_path))?;
    for warning in &imported.warnings {
        print_warning(warning);
    }
    if !imported.pending.is_empty() {
        println!(
            "  {} {} generated slot(s) would need regeneration",
            "i".cyan(),
            imported.pending.len()
        );
    }

    let exported = codec::serialize(&imported.scene, &imported.materials);
    let hash_in = canonical_doc_hash(&parsed.doc).context("hashing input document")?;
    let hash_out = canonical_doc_hash(&exported).context("hashing re-exported document")?;

    if hash_in == hash_out {
        println!(
            "{} canonical forms match ({})",
            "OK:".green().bold(),
            &hash_in[..12]
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{} round trip drifted", "Drift:".red().bold());
        println!("  in:  {}", hash_in);
        println!("  out: {}", hash_out);
        Ok(ExitCode::FAILURE)
    }
}
