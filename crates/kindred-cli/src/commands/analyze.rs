//! Analyze command implementation

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use kindred_core::analytics::split_by_relationship;
use kindred_core::{
    AnalyticsConfig, AnalyticsReport, AnalyticsRequest, Analyzer, SituationalContext,
};
use tokio::task::JoinSet;

use super::{load_snapshot, print_assessment, truncate};

pub async fn cmd_analyze(
    config: AnalyticsConfig,
    input: &Path,
    now: DateTime<Utc>,
    relationship: Option<&str>,
    score: Option<&str>,
    json: bool,
) -> Result<()> {
    let file = load_snapshot(input)?;
    let mut request = AnalyticsRequest::new(file.events, now).with_baseline(file.baseline);

    if let Some(id) = score {
        let interaction = request
            .events
            .interactions
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .with_context(|| format!("No interaction with id '{}'", id))?;
        if let Some(scope) = relationship {
            if interaction.relationship_id != scope {
                bail!(
                    "Interaction '{}' belongs to '{}', not '{}'",
                    id,
                    interaction.relationship_id,
                    scope
                );
            }
        }
        request = request.with_interaction(interaction);
    }

    let analyzer = Arc::new(Analyzer::new(config));
    let reports = match relationship {
        Some(id) => {
            let scoped = request.events.for_relationship(id);
            if scoped.interactions.is_empty() && scoped.boundaries.is_empty() {
                bail!("No events for relationship '{}'", id);
            }
            request = request.with_context(SituationalContext {
                relationship_id: Some(id.to_string()),
                ..Default::default()
            });
            vec![analyzer.compute(&request)]
        }
        None => analyze_relationships(analyzer, &request).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("No interactions or boundary events in {}", input.display());
        return Ok(());
    }
    for report in &reports {
        print_report(report);
    }
    Ok(())
}

/// Analyze every relationship concurrently on the blocking pool
///
/// Reports come back sorted by relationship id.
pub async fn analyze_relationships(
    analyzer: Arc<Analyzer>,
    request: &AnalyticsRequest,
) -> Result<Vec<AnalyticsReport>> {
    let mut tasks = JoinSet::new();
    for (id, sub) in split_by_relationship(request) {
        let analyzer = Arc::clone(&analyzer);
        tasks.spawn_blocking(move || (id, analyzer.compute(&sub)));
    }

    let mut reports = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let (id, report) = joined.context("Analysis task failed")?;
        tracing::debug!(relationship = %id, "Relationship analyzed");
        reports.push((id, report));
    }
    reports.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(reports.into_iter().map(|(_, report)| report).collect())
}

fn print_report(report: &AnalyticsReport) {
    println!();
    println!("💞 Relationship: {}", report.scope);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Health score: {}/100", report.health_score);

    if let Some(score) = &report.compatibility {
        println!(
            "   Compatibility: {}/100 (communication {}, validation {}, triggers {})",
            score.overall,
            score.communication_alignment,
            score.validation_match,
            score.trigger_impact
        );
    }

    println!();
    if report.insights.is_empty() {
        println!("   No patterns detected in the last two weeks");
    } else {
        println!("   Insights:");
        for insight in &report.insights {
            println!(
                "   {:<8} {:>3}%  {}",
                insight.severity.as_str(),
                insight.confidence,
                insight.title
            );
            println!("            {}", truncate(&insight.description, 70));
        }
    }

    let risk = &report.risk_map;
    println!();
    println!("   Risk map:");
    if let Some(time) = &risk.riskiest_time_of_day {
        println!("   Riskiest time of day: {}", time);
    }
    if let Some(day) = &risk.riskiest_weekday {
        println!("   Riskiest weekday:     {}", day);
    }
    for bucket in risk.locations.iter().take(3) {
        println!(
            "   {:<24} {:>5.1}% red ({} of {})",
            truncate(&bucket.key, 24),
            bucket.violation_rate,
            bucket.violations,
            bucket.total
        );
    }
    println!("   Recent trend: {}", risk.recent_trend.as_str());

    if !report.triggers.headline_risks.is_empty() {
        println!();
        println!(
            "   Top triggers: {}",
            report.triggers.headline_risks.join(", ")
        );
    }

    if report.boundaries.total > 0 {
        println!();
        println!(
            "   Boundaries: {} set, {:.0}% respected, {} negative reactions",
            report.boundaries.total,
            report.boundaries.respect_rate,
            report.boundaries.negative_reactions
        );
    }

    println!();
    print_assessment(&report.warnings);

    if report.skipped.total() > 0 {
        println!();
        println!(
            "   ⚠️  Skipped {} invalid records (run with --verbose for details)",
            report.skipped.total()
        );
    }
    println!();
}
