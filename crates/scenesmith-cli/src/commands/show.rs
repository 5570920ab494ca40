//! Show command: human-readable recipe summary.

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use scenesmith_recipe::MapSource;

use super::{load_recipe, print_warning};

/// Prints a summary of a recipe: node count, material sources, cache keys.
pub fn run(recipe_path: &str) -> Result<ExitCode> {
    let parsed = load_recipe(recipe_path)?;
    for warning in &parsed.warnings {
        print_warning(warning);
    }
    let doc = &parsed.doc;

    println!("{} {}", "Recipe:".cyan().bold(), recipe_path);
    println!("  version:   {}", doc.version);
    println!("  nodes:     {}", doc.scene.len());
    println!("  materials: {}", doc.materials.len());

    for material in &doc.materials {
        let source = match &material.source {
            MapSource::Generated { cache_key } => {
                format!("{} {}", "generated".magenta(), cache_key.short().dimmed())
            }
            MapSource::Static { static_ref } => {
                format!("{} {}", "static".blue(), static_ref.dimmed())
            }
            MapSource::Default {} => "default".to_string(),
        };
        println!(
            "    slot {:>3} [{}] {}",
            material.slot_id.to_string().bold(),
            material.slot_type,
            source
        );
    }
    Ok(ExitCode::SUCCESS)
}
