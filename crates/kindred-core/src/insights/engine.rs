//! Insight Engine - windows interactions and runs every detector

use chrono::{DateTime, Duration, Utc};

use crate::config::InsightConfig;
use crate::models::InteractionEvent;

use super::detectors::{Detector, DetectorContext};
use super::types::{sort_insights, PatternInsight};

/// The engine that orchestrates the detector battery
pub struct InsightEngine {
    config: InsightConfig,
    detectors: Vec<Detector>,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new(InsightConfig::default())
    }
}

impl InsightEngine {
    /// Create an engine running all built-in detectors
    pub fn new(config: InsightConfig) -> Self {
        Self {
            config,
            detectors: Detector::all().to_vec(),
        }
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    /// Detectors in the order they run
    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Half-open window `(now - window_days, now]`
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - Duration::days(self.config.window_days), now)
    }

    /// Interactions inside the window, in chronological order
    pub fn windowed<'a>(
        &self,
        interactions: &'a [InteractionEvent],
        now: DateTime<Utc>,
    ) -> Vec<&'a InteractionEvent> {
        let (start, end) = self.window(now);
        let mut events: Vec<&InteractionEvent> = interactions
            .iter()
            .filter(|e| e.timestamp > start && e.timestamp <= end)
            .collect();
        events.sort_by_key(|e| e.timestamp);
        events
    }

    /// Run all detectors and return their insights, most urgent first
    ///
    /// Returns nothing when the window holds fewer than the minimum number
    /// of interactions.
    pub fn generate(
        &self,
        interactions: &[InteractionEvent],
        now: DateTime<Utc>,
        scope: &str,
    ) -> Vec<PatternInsight> {
        let events = self.windowed(interactions, now);
        if events.len() < self.config.min_interactions {
            tracing::debug!(
                scope,
                count = events.len(),
                required = self.config.min_interactions,
                "Not enough recent interactions for insights"
            );
            return Vec::new();
        }

        let ctx = DetectorContext {
            now,
            scope,
            config: &self.config,
        };

        let mut insights = Vec::new();
        for detector in &self.detectors {
            let found = detector.detect(&events, &ctx);
            tracing::debug!(
                detector = detector.as_str(),
                fired = found.is_some(),
                "Detector complete"
            );
            insights.extend(found);
        }

        sort_insights(&mut insights);
        insights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::*;
    use crate::models::Severity;

    #[test]
    fn test_engine_creation() {
        let engine = InsightEngine::default();
        assert_eq!(engine.detectors().len(), 6);
        assert_eq!(engine.config().window_days, 14);
    }

    #[test]
    fn test_too_few_interactions() {
        let engine = InsightEngine::default();
        let events = vec![red(1), red(2)];
        assert!(engine.generate(&events, now(), "alex").is_empty());
    }

    #[test]
    fn test_window_excludes_old_and_future() {
        let engine = InsightEngine::default();
        let events = vec![green(14), green(20), green(-1), green(13), green(0)];
        let windowed = engine.windowed(&events, now());
        let ids: Vec<&str> = windowed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["green-13", "green-0"]);
    }

    #[test]
    fn test_old_events_do_not_count_toward_minimum() {
        let engine = InsightEngine::default();
        let events = vec![green(30), green(31), green(1), green(2)];
        assert!(engine.generate(&events, now(), "alex").is_empty());
    }

    #[test]
    fn test_positive_trend_detected() {
        let engine = InsightEngine::default();
        let events = vec![green(1), green(2), green(3), red(4)];
        let insights = engine.generate(&events, now(), "alex");

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].detector, Detector::PositiveTrend);
        assert_eq!(insights[0].id, "positive_trend:alex");
    }

    #[test]
    fn test_results_sorted_by_severity() {
        let engine = InsightEngine::default();
        // 4 reds this week with none before, all draining, all at home
        let mut events = vec![red(1), red(2), red(3), red(4)];
        for event in &mut events {
            event.energy_before = 8;
            event.energy_after = 3;
        }
        let insights = engine.generate(&events, now(), "alex");

        let detectors: Vec<Detector> = insights.iter().map(|i| i.detector).collect();
        assert_eq!(
            detectors,
            vec![
                Detector::Escalation,
                Detector::EnergyDrain,
                Detector::ContextTrigger
            ]
        );
        assert_eq!(insights[0].severity, Severity::High);
        assert_eq!(insights[2].confidence, 90);
    }

    #[test]
    fn test_generate_is_deterministic() {
        let engine = InsightEngine::default();
        let events = vec![red(6), green(5), red(4), red(3), green(2), red(1)];
        let first = engine.generate(&events, now(), "alex");
        let second = engine.generate(&events, now(), "alex");
        assert_eq!(first, second);
    }
}
