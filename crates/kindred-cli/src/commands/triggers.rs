//! Triggers command implementation

use std::path::Path;

use anyhow::Result;
use kindred_core::{analyze_triggers, AnalyticsConfig};

use super::{load_snapshot, truncate};

pub fn cmd_triggers(config: &AnalyticsConfig, input: &Path, json: bool) -> Result<()> {
    let file = load_snapshot(input)?;
    let (events, _) = file.events.sanitized();
    let analysis = analyze_triggers(&events.triggers, &config.triggers);

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    if analysis.patterns.is_empty() {
        println!("No trigger observations in {}", input.display());
        return Ok(());
    }

    println!();
    println!(
        "   {:<24} {:>5} {:>6} {:>8}  {}",
        "Trigger", "Seen", "Viol%", "Severity", "Notes"
    );
    println!("   ─────────────────────────────────────────────────────────────");
    for pattern in &analysis.patterns {
        let mut notes = Vec::new();
        if pattern.high_risk {
            notes.push("high risk".to_string());
        }
        if pattern.improving {
            notes.push("improving".to_string());
        }
        if let Some(response) = &pattern.most_effective_response {
            notes.push(format!("helps: {}", response));
        }
        println!(
            "   {:<24} {:>5} {:>5.1}% {:>8.1}  {}",
            truncate(&pattern.label, 24),
            pattern.occurrences,
            pattern.violation_rate,
            pattern.average_severity,
            notes.join(", ")
        );
    }
    println!();
    Ok(())
}
