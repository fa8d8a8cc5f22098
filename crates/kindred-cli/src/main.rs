//! Kindred CLI - Relationship wellness and risk analytics
//!
//! Usage:
//!   kindred analyze --input events.json      Full report per relationship
//!   kindred warnings --input events.json     Alerts for an upcoming interaction
//!   kindred triggers --input events.json     Trigger risk profiles
//!   kindred config                           Active thresholds

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            input,
            now,
            relationship,
            score,
            json,
        } => {
            let now = commands::parse_now(now.as_deref())?;
            commands::cmd_analyze(
                config,
                &input,
                now,
                relationship.as_deref(),
                score.as_deref(),
                json,
            )
            .await
        }
        Commands::Warnings {
            input,
            location,
            topic,
            relationship,
            dismissed,
            now,
            json,
        } => {
            let now = commands::parse_now(now.as_deref())?;
            let context = kindred_core::SituationalContext {
                planned_location: location,
                planned_topic: topic,
                relationship_id: relationship,
            };
            commands::cmd_warnings(&config, &input, context, dismissed, now, json)
        }
        Commands::Triggers { input, json } => commands::cmd_triggers(&config, &input, json),
        Commands::Config => commands::cmd_config(&config, cli.config.as_deref()),
    }
}
