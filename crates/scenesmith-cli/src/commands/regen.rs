//! Regen command: regenerate all generated texture maps of a recipe.

use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;

use scenesmith_editor::{codec, EditorSession, PreviewOutcome};
use scenesmith_texture::ProceduralGenerator;

use super::{load_recipe, print_warning};

/// Imports a recipe with an empty cache, so every generated slot comes
/// back pending, then resolves them all through the procedural backend.
/// Exit code 0 when every slot regenerated.
pub fn run(recipe_path: &str, out_dir: &str) -> Result<ExitCode> {
    let parsed = load_recipe(recipe_path)?;
    for warning in &parsed.warnings {
        print_warning(warning);
    }

    let mut session = EditorSession::new();
    let imported = codec::deserialize(&parsed.doc, session.cache())
        .with_context(|| format!("failed to import recipe: {}", recipe_path))?;
    for warning in &imported.warnings {
        print_warning(warning);
    }
    let pending = imported.pending.clone();
    session.apply_import(imported);

    if pending.is_empty() {
        println!("{} recipe has no generated slots", "OK:".green().bold());
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{} {} slot(s) into {}",
        "Regenerating:".cyan().bold(),
        pending.len(),
        out_dir
    );
    let generator = ProceduralGenerator::new(out_dir);
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;

    let mut failures = 0usize;
    runtime.block_on(async {
        for (slot, request) in pending {
            match session.complete_pending(slot, request.clone(), &generator).await {
                Ok(PreviewOutcome::Applied) => {
                    println!(
                        "  {} slot {} ({:?})",
                        "+".green(),
                        slot,
                        request.prompt
                    );
                }
                Ok(PreviewOutcome::Stale) => {
                    println!("  {} slot {} skipped (stale)", "!".yellow(), slot);
                }
                Err(err) => {
                    failures += 1;
                    println!("  {} slot {} failed: {}", "x".red().bold(), slot, err);
                }
            }
        }
    });

    let stats = session.cache().stats();
    println!(
        "{} {} generated, {} reused from cache",
        "Done:".green().bold(),
        stats.misses,
        stats.hits
    );
    if failures == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
