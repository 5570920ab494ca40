//! Validate command: strict validation with coded errors and warnings.

use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use scenesmith_recipe::validate;

use super::{load_recipe, print_warning};

/// Validates a recipe file. Exit code 0 when the document passes, 1 when
/// it has validation errors.
pub fn run(recipe_path: &str) -> Result<ExitCode> {
    println!("{} {}", "Validating:".cyan().bold(), recipe_path);

    let parsed = load_recipe(recipe_path)?;
    for warning in &parsed.warnings {
        print_warning(warning);
    }

    let result = validate(&parsed.doc);
    for warning in &result.warnings {
        print_warning(warning);
    }
    for error in &result.errors {
        println!("  {} {}", "x".red().bold(), error);
    }

    if result.is_ok() {
        println!(
            "{} {} nodes, {} materials",
            "OK:".green().bold(),
            parsed.doc.scene.len(),
            parsed.doc.materials.len()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} {} error(s), {} warning(s)",
            "Invalid:".red().bold(),
            result.errors.len(),
            result.warnings.len() + parsed.warnings.len()
        );
        Ok(ExitCode::FAILURE)
    }
}
