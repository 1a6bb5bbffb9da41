//! CLI command definitions.
//!
//! Thin surface over the core library: every subcommand resolves to one
//! store or import operation in `src/db` / `src/config`.

use crate::config::ImportStrategy;
use clap::{Parser, Subcommand};

/// Per-task metric tracking for software projects.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the database file (default: ~/.worktally/worktally.db)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import project definitions from a YAML file
    Import {
        /// Path to the definition file
        file: String,

        /// How to resolve collisions with existing projects
        #[arg(short, long, value_enum, default_value_t = ImportStrategy::Abort)]
        strategy: ImportStrategy,
    },

    /// List all projects in the store
    Projects,

    /// Show the metrics defined for a project
    Metrics {
        /// Qualified project name (org/name or bare name)
        project: String,
    },

    /// List tasks in a project
    Tasks {
        /// Qualified project name
        project: String,

        /// Also print per-metric totals for each task
        #[arg(long)]
        details: bool,
    },

    /// Record metric values against a task
    Record {
        /// Qualified project name
        project: String,

        /// Task name (created on first record)
        task: String,

        /// Alternating METRIC VALUE pairs, e.g. `compile_time 2hrs points 3`
        #[arg(num_args = 2.., value_names = ["METRIC", "VALUE"])]
        values: Vec<String>,
    },
}
