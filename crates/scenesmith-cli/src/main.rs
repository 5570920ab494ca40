//! SceneSmith CLI - inspect, validate, and regenerate scene recipes.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

/// SceneSmith - scene recipe tooling
#[derive(Parser)]
#[command(name = "scenesmith")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a recipe document and print coded errors and warnings
    Validate {
        /// Path to the recipe JSON file
        recipe: String,
    },

    /// Summarize a recipe: nodes, material sources, cache keys
    Show {
        /// Path to the recipe JSON file
        recipe: String,
    },

    /// Import a recipe into a fresh session, re-export it, and report drift
    Roundtrip {
        /// Path to the recipe JSON file
        recipe: String,
    },

    /// Regenerate all generated texture maps of a recipe offline
    Regen {
        /// Path to the recipe JSON file
        recipe: String,

        /// Directory to write the generated maps to
        #[arg(short, long, default_value = "scenesmith-maps")]
        out: String,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Validate { recipe } => commands::validate::run(&recipe),
        Commands::Show { recipe } => commands::show::run(&recipe),
        Commands::Roundtrip { recipe } => commands::roundtrip::run(&recipe),
        Commands::Regen { recipe, out } => commands::regen::run(&recipe, &out),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
