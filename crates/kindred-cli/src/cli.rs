//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kindred - Relationship wellness and risk analytics
#[derive(Parser)]
#[command(name = "kindred")]
#[command(about = "Relationship wellness and risk analytics over logged events", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Analytics config file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the full analytics report
    Analyze {
        /// Snapshot JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Reference time (RFC 3339 or YYYY-MM-DD, defaults to now)
        #[arg(long)]
        now: Option<String>,

        /// Only analyze this relationship
        #[arg(short, long)]
        relationship: Option<String>,

        /// Interaction id to score against the baseline profile
        #[arg(long)]
        score: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check for warnings before an upcoming interaction
    Warnings {
        /// Snapshot JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Where the interaction will happen
        #[arg(short, long)]
        location: Option<String>,

        /// What you plan to talk about
        #[arg(short, long)]
        topic: Option<String>,

        /// Only consider this relationship
        #[arg(short, long)]
        relationship: Option<String>,

        /// Alert id to suppress (repeatable)
        #[arg(long = "dismiss")]
        dismissed: Vec<String>,

        /// Reference time (RFC 3339 or YYYY-MM-DD, defaults to now)
        #[arg(long)]
        now: Option<String>,

        /// Print the assessment as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show trigger risk profiles
    Triggers {
        /// Snapshot JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the active analytics configuration
    Config,
}
