//! Compute analytics - one call from events to a full report

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::boundaries::{summarize_boundaries, BoundarySummary};
use crate::config::AnalyticsConfig;
use crate::insights::{InsightEngine, PatternInsight};
use crate::models::{BaselineProfile, InteractionEvent};
use crate::risk_map::{build_risk_map, RiskMap};
use crate::scoring::{compatibility_score, health_score, CompatibilityScore};
use crate::snapshot::{EventSnapshot, SkippedRecords};
use crate::triggers::{analyze_triggers, TriggerAnalysis};
use crate::warnings::{SituationalContext, WarningAssessment, WarningEngine};

/// Scope used when the analysis is not limited to one relationship
pub const ALL_RELATIONSHIPS: &str = "all";

/// Everything one analysis needs, including the reference time
#[derive(Debug, Clone)]
pub struct AnalyticsRequest {
    pub events: EventSnapshot,
    pub baseline: Option<BaselineProfile>,
    /// Interaction to score against the baseline
    pub interaction: Option<InteractionEvent>,
    pub context: Option<SituationalContext>,
    /// Alert ids the user has dismissed
    pub dismissed: BTreeSet<String>,
    pub now: DateTime<Utc>,
}

impl AnalyticsRequest {
    pub fn new(events: EventSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            events,
            baseline: None,
            interaction: None,
            context: None,
            dismissed: BTreeSet::new(),
            now,
        }
    }

    pub fn with_baseline(mut self, baseline: Option<BaselineProfile>) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_interaction(mut self, interaction: InteractionEvent) -> Self {
        self.interaction = Some(interaction);
        self
    }

    pub fn with_context(mut self, context: SituationalContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_dismissed<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.dismissed.extend(ids);
        self
    }

    /// Relationship the analysis is limited to, if any
    pub fn relationship(&self) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|c| c.relationship_id.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    fn scope(&self) -> &str {
        self.relationship().unwrap_or(ALL_RELATIONSHIPS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub scope: String,
    pub health_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<CompatibilityScore>,
    pub insights: Vec<PatternInsight>,
    pub triggers: TriggerAnalysis,
    pub risk_map: RiskMap,
    pub boundaries: BoundarySummary,
    pub warnings: WarningAssessment,
    pub skipped: SkippedRecords,
}

/// Stateless analytics pipeline
pub struct Analyzer {
    config: AnalyticsConfig,
    insights: InsightEngine,
    warnings: WarningEngine,
}

impl Analyzer {
    pub fn new(config: AnalyticsConfig) -> Self {
        let insights = InsightEngine::new(config.insights.clone());
        let warnings = WarningEngine::new(config.insights.clone(), config.warnings.clone());
        Self {
            config,
            insights,
            warnings,
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(AnalyticsConfig::default())
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Run the whole pipeline over one request
    pub fn compute(&self, request: &AnalyticsRequest) -> AnalyticsReport {
        let (mut events, skipped) = request.events.sanitized();
        let scope = request.scope();
        let now = request.now;

        let relationship = request.relationship();
        if let Some(id) = relationship {
            events = events.for_relationship(id);
        }
        let interaction = request
            .interaction
            .as_ref()
            .filter(|i| relationship.map_or(true, |id| i.relationship_id == id));

        let health = health_score(&events.interactions);
        let compatibility = match (interaction, &request.baseline) {
            (Some(interaction), Some(baseline)) => match interaction.validate() {
                Ok(()) => Some(compatibility_score(interaction, baseline)),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping compatibility for invalid interaction");
                    None
                }
            },
            _ => None,
        };

        let insights = self.insights.generate(&events.interactions, now, scope);
        let triggers = analyze_triggers(&events.triggers, &self.config.triggers);
        let risk_map = build_risk_map(&events.interactions, &self.config.risk_map);
        let boundaries = summarize_boundaries(&events.boundaries);

        let context = request.context.clone().unwrap_or_default();
        let warnings = self
            .warnings
            .evaluate(&events, &triggers, &context, &request.dismissed, now);

        info!(
            scope,
            interactions = events.interactions.len(),
            health,
            insights = insights.len(),
            alerts = warnings.alerts().len(),
            skipped = skipped.total(),
            "Analysis complete"
        );

        AnalyticsReport {
            generated_at: now,
            scope: scope.to_string(),
            health_score: health,
            compatibility,
            insights,
            triggers,
            risk_map,
            boundaries,
            warnings,
            skipped,
        }
    }

    /// Split a request per relationship and analyze each independently
    ///
    /// Trigger observations are shared by every relationship. The scored
    /// interaction only goes to its own relationship.
    pub fn compute_by_relationship(
        &self,
        request: &AnalyticsRequest,
    ) -> BTreeMap<String, AnalyticsReport> {
        split_by_relationship(request)
            .into_iter()
            .map(|(id, sub)| {
                let report = self.compute(&sub);
                (id, report)
            })
            .collect()
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::with_default_config()
    }
}

/// One request per relationship reference found in the events
pub fn split_by_relationship(request: &AnalyticsRequest) -> Vec<(String, AnalyticsRequest)> {
    request
        .events
        .relationship_ids()
        .into_iter()
        .map(|id| {
            let mut context = request.context.clone().unwrap_or_default();
            context.relationship_id = Some(id.clone());
            let sub = AnalyticsRequest {
                events: request.events.for_relationship(&id),
                baseline: request.baseline.clone(),
                interaction: request
                    .interaction
                    .clone()
                    .filter(|i| i.relationship_id == id),
                context: Some(context),
                dismissed: request.dismissed.clone(),
                now: request.now,
            };
            (id, sub)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::*;

    fn request(interactions: Vec<InteractionEvent>) -> AnalyticsRequest {
        AnalyticsRequest::new(
            EventSnapshot {
                interactions,
                ..Default::default()
            },
            now(),
        )
    }

    #[test]
    fn test_empty_request() {
        let report = Analyzer::default().compute(&request(Vec::new()));

        assert_eq!(report.health_score, 50);
        assert!(report.insights.is_empty());
        assert!(report.compatibility.is_none());
        assert!(report.warnings.is_clear());
        assert_eq!(report.scope, "all");
        assert_eq!(report.generated_at, now());
    }

    #[test]
    fn test_invalid_records_skipped() {
        let mut bad = red(1);
        bad.energy_after = 11;
        let report = Analyzer::default().compute(&request(vec![bad, green(2)]));

        assert_eq!(report.skipped.interactions, 1);
        assert_eq!(report.health_score, 100);
    }

    #[test]
    fn test_compatibility_needs_interaction_and_baseline() {
        let analyzer = Analyzer::default();
        let req = request(vec![green(1)]).with_interaction(green(0));
        assert!(analyzer.compute(&req).compatibility.is_none());

        let req = req.with_baseline(Some(BaselineProfile::default()));
        let score = analyzer.compute(&req).compatibility.unwrap();
        assert_eq!(score.overall, 50);
    }

    #[test]
    fn test_compute_is_idempotent() {
        let analyzer = Analyzer::default();
        let req = request(vec![red(6), green(5), red(4), red(3), green(2), red(1)]);
        assert_eq!(analyzer.compute(&req), analyzer.compute(&req));
    }

    fn mixed_request() -> AnalyticsRequest {
        let mut sam = vec![red(3), red(2), red(1)];
        for event in &mut sam {
            event.relationship_id = "sam".to_string();
        }
        let mut interactions: Vec<InteractionEvent> = (1..=6).map(green).collect();
        interactions.extend(sam);
        request(interactions)
    }

    #[test]
    fn test_scoped_compute_ignores_other_relationships() {
        let req = mixed_request().with_context(SituationalContext {
            relationship_id: Some("sam".to_string()),
            ..Default::default()
        });
        let report = Analyzer::default().compute(&req);

        assert_eq!(report.scope, "sam");
        assert_eq!(report.health_score, 0);
        let total: usize = report.risk_map.time_of_day.iter().map(|b| b.total).sum();
        assert_eq!(total, 3);
        let ids: Vec<&str> = report.insights.iter().map(|i| i.id.as_str()).collect();
        assert!(ids.contains(&"escalation:sam"));
        assert!(!ids.contains(&"positive_trend:sam"));
    }

    #[test]
    fn test_scoped_compute_skips_foreign_interaction_score() {
        let mut foreign = green(0);
        foreign.relationship_id = "alex".to_string();
        let req = mixed_request()
            .with_interaction(foreign)
            .with_baseline(Some(BaselineProfile::default()))
            .with_context(SituationalContext {
                relationship_id: Some("sam".to_string()),
                ..Default::default()
            });
        assert!(Analyzer::default().compute(&req).compatibility.is_none());
    }

    #[test]
    fn test_compute_by_relationship() {
        let mut sam = vec![red(3), red(2), red(1)];
        for event in &mut sam {
            event.relationship_id = "sam".to_string();
        }
        let mut interactions = vec![green(3), green(2), green(1)];
        interactions.extend(sam);

        let reports = Analyzer::default().compute_by_relationship(&request(interactions));
        let ids: Vec<&String> = reports.keys().collect();
        assert_eq!(ids, vec!["alex", "sam"]);

        assert_eq!(reports["alex"].health_score, 100);
        assert_eq!(reports["sam"].health_score, 0);
        assert_eq!(reports["sam"].scope, "sam");
        assert!(reports["sam"]
            .insights
            .iter()
            .all(|i| i.id.ends_with(":sam")));
    }
}
