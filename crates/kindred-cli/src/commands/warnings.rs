//! Warnings command implementation

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use kindred_core::{
    analyze_triggers, AnalyticsConfig, SituationalContext, WarningAssessment, WarningEngine,
};

use super::load_snapshot;

pub fn cmd_warnings(
    config: &AnalyticsConfig,
    input: &Path,
    context: SituationalContext,
    dismissed: Vec<String>,
    now: DateTime<Utc>,
    json: bool,
) -> Result<()> {
    let assessment = evaluate_warnings(config, input, &context, dismissed, now)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    println!();
    print_assessment(&assessment);
    println!();
    Ok(())
}

pub fn evaluate_warnings(
    config: &AnalyticsConfig,
    input: &Path,
    context: &SituationalContext,
    dismissed: Vec<String>,
    now: DateTime<Utc>,
) -> Result<WarningAssessment> {
    let file = load_snapshot(input)?;
    let (events, skipped) = file.events.sanitized();
    if skipped.total() > 0 {
        tracing::warn!(skipped = skipped.total(), "Ignored invalid records");
    }

    let triggers = analyze_triggers(&events.triggers, &config.triggers);
    let engine = WarningEngine::new(config.insights.clone(), config.warnings.clone());
    let dismissed: BTreeSet<String> = dismissed.into_iter().collect();

    Ok(engine.evaluate(&events, &triggers, context, &dismissed, now))
}

pub fn print_assessment(assessment: &WarningAssessment) {
    match assessment {
        WarningAssessment::NoImmediateConcerns { message } => {
            println!("   ✅ {}", message);
        }
        WarningAssessment::Alerts { alerts } => {
            println!("   🚨 {} warning(s):", alerts.len());
            for alert in alerts {
                println!();
                println!(
                    "   [{}] {} ({}% confidence)",
                    alert.severity.as_str().to_uppercase(),
                    alert.title,
                    alert.confidence
                );
                println!("      {}", alert.message);
                for rec in &alert.recommendations {
                    println!("      • {}", rec);
                }
                if let Some(phrases) = &alert.suggested_phrases {
                    println!("      Try saying:");
                    for phrase in phrases {
                        println!("        \"{}\"", phrase);
                    }
                }
                if let Some(exits) = &alert.exit_strategies {
                    println!("      If you need to leave:");
                    for exit in exits {
                        println!("        - {}", exit);
                    }
                }
                println!("      Dismiss with: --dismiss {}", alert.id);
            }
        }
    }
}
