//! Trigger Pattern Analyzer
//!
//! Every trigger label folds into a [`TriggerAggregate`]. Aggregates merge by
//! summing counts and widening the seen-range, which is commutative and
//! associative: folding observations one at a time, in any order, gives the
//! same aggregate as folding the whole batch. [`TriggerCache`] relies on that
//! to keep an incrementally updated copy that always matches a rebuild.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TriggerConfig;
use crate::error::Result;
use crate::models::TriggerObservation;
use crate::risk_map::week_start;

/// Number of contextual factors reported per trigger
const TOP_FACTORS: usize = 3;

/// Running statistics for one trigger label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerAggregate {
    /// Normalized (trimmed, lowercase) label
    pub label: String,
    pub occurrences: u32,
    pub violations: u32,
    pub severity_sum: u32,
    pub contextual_factors: BTreeMap<String, u32>,
    pub reactions: BTreeMap<String, u32>,
    pub effective_responses: BTreeMap<String, u32>,
    /// Violations per week the trigger appeared in, keyed by the Monday
    pub checkpoints: BTreeMap<NaiveDate, u32>,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Key an observation is aggregated under
pub fn trigger_key(label: &str) -> String {
    label.trim().to_lowercase()
}

impl TriggerAggregate {
    /// Aggregate holding exactly one observation
    pub fn from_observation(obs: &TriggerObservation) -> Self {
        let violations = u32::from(obs.boundary_violated);
        let mut aggregate = Self {
            label: trigger_key(&obs.label),
            occurrences: 1,
            violations,
            severity_sum: obs.severity as u32,
            first_seen: Some(obs.timestamp),
            last_seen: Some(obs.timestamp),
            ..Default::default()
        };

        for factor in &obs.contextual_factors {
            let factor = factor.trim();
            if !factor.is_empty() {
                *aggregate
                    .contextual_factors
                    .entry(factor.to_lowercase())
                    .or_insert(0) += 1;
            }
        }
        if let Some(reaction) = obs.user_reaction.as_deref().map(str::trim) {
            if !reaction.is_empty() {
                aggregate.reactions.insert(reaction.to_lowercase(), 1);
            }
        }
        if let Some(response) = obs.effective_response.as_deref().map(str::trim) {
            if !response.is_empty() {
                aggregate
                    .effective_responses
                    .insert(response.to_lowercase(), 1);
            }
        }
        aggregate
            .checkpoints
            .insert(week_start(&obs.timestamp), violations);

        aggregate
    }

    /// Fold one observation in
    pub fn observe(&mut self, obs: &TriggerObservation) {
        self.merge(&Self::from_observation(obs));
    }

    /// Combine two aggregates for the same label
    pub fn merge(&mut self, other: &TriggerAggregate) {
        if self.label.is_empty() {
            self.label = other.label.clone();
        }
        self.occurrences += other.occurrences;
        self.violations += other.violations;
        self.severity_sum += other.severity_sum;
        merge_counts(&mut self.contextual_factors, &other.contextual_factors);
        merge_counts(&mut self.reactions, &other.reactions);
        merge_counts(&mut self.effective_responses, &other.effective_responses);
        for (week, count) in &other.checkpoints {
            *self.checkpoints.entry(*week).or_insert(0) += count;
        }
        self.first_seen = match (self.first_seen, other.first_seen) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last_seen = match (self.last_seen, other.last_seen) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Percentage of occurrences that ended in a violated boundary (0-100)
    pub fn violation_rate(&self) -> f64 {
        if self.occurrences == 0 {
            return 0.0;
        }
        (100.0 * self.violations as f64 / self.occurrences as f64).clamp(0.0, 100.0)
    }

    pub fn average_severity(&self) -> f64 {
        if self.occurrences == 0 {
            return 0.0;
        }
        self.severity_sum as f64 / self.occurrences as f64
    }

    pub fn is_high_risk(&self, threshold: f64) -> bool {
        self.violation_rate() > threshold
    }

    /// Violation counts per week, oldest first
    pub fn checkpoint_series(&self) -> Vec<u32> {
        self.checkpoints.values().copied().collect()
    }

    /// The most recent checkpoints (up to `window`) are strictly decreasing
    ///
    /// Needs at least two checkpoints.
    pub fn is_improving(&self, window: usize) -> bool {
        let series = self.checkpoint_series();
        if series.len() < 2 || window < 2 {
            return false;
        }
        let recent = &series[series.len().saturating_sub(window)..];
        recent.windows(2).all(|pair| pair[1] < pair[0])
    }

    pub fn top_factors(&self, limit: usize) -> Vec<String> {
        top_keys(&self.contextual_factors, limit)
    }

    pub fn most_effective_response(&self) -> Option<String> {
        top_keys(&self.effective_responses, 1).into_iter().next()
    }
}

fn merge_counts(into: &mut BTreeMap<String, u32>, from: &BTreeMap<String, u32>) {
    for (key, count) in from {
        *into.entry(key.clone()).or_insert(0) += count;
    }
}

/// Keys by count descending, then name ascending
fn top_keys(counts: &BTreeMap<String, u32>, limit: usize) -> Vec<String> {
    let mut entries: Vec<(&String, &u32)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .take(limit)
        .map(|(key, _)| key.clone())
        .collect()
}

/// Fold a batch of observations into per-label aggregates
pub fn aggregate_triggers<'a, I>(observations: I) -> BTreeMap<String, TriggerAggregate>
where
    I: IntoIterator<Item = &'a TriggerObservation>,
{
    observations
        .into_iter()
        .fold(BTreeMap::new(), |mut acc, obs| {
            acc.entry(trigger_key(&obs.label))
                .or_insert_with(TriggerAggregate::default)
                .observe(obs);
            acc
        })
}

/// Reportable view of one trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSummary {
    pub label: String,
    pub occurrences: u32,
    pub violations: u32,
    pub violation_rate: f64,
    pub average_severity: f64,
    pub high_risk: bool,
    pub improving: bool,
    pub top_factors: Vec<String>,
    pub most_effective_response: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl TriggerSummary {
    fn from_aggregate(aggregate: &TriggerAggregate, config: &TriggerConfig) -> Self {
        Self {
            label: aggregate.label.clone(),
            occurrences: aggregate.occurrences,
            violations: aggregate.violations,
            violation_rate: aggregate.violation_rate(),
            average_severity: aggregate.average_severity(),
            high_risk: aggregate.is_high_risk(config.high_risk_rate),
            improving: aggregate.is_improving(config.improving_checkpoints),
            top_factors: aggregate.top_factors(TOP_FACTORS),
            most_effective_response: aggregate.most_effective_response(),
            last_seen: aggregate.last_seen,
        }
    }
}

/// Ranked trigger report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerAnalysis {
    /// Most problematic first
    pub patterns: Vec<TriggerSummary>,
    /// Labels of the top-ranked triggers
    pub headline_risks: Vec<String>,
    pub high_risk: Vec<String>,
    pub improving: Vec<String>,
}

impl TriggerAnalysis {
    pub fn from_aggregates(
        aggregates: &BTreeMap<String, TriggerAggregate>,
        config: &TriggerConfig,
    ) -> Self {
        let mut patterns: Vec<TriggerSummary> = aggregates
            .values()
            .map(|a| TriggerSummary::from_aggregate(a, config))
            .collect();

        patterns.sort_by(|a, b| {
            b.violation_rate
                .partial_cmp(&a.violation_rate)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.occurrences.cmp(&a.occurrences))
                .then_with(|| a.label.cmp(&b.label))
        });

        let headline_risks = patterns
            .iter()
            .take(config.headline_count)
            .map(|p| p.label.clone())
            .collect();
        let high_risk = patterns
            .iter()
            .filter(|p| p.high_risk)
            .map(|p| p.label.clone())
            .collect();
        let improving = patterns
            .iter()
            .filter(|p| p.improving)
            .map(|p| p.label.clone())
            .collect();

        Self {
            patterns,
            headline_risks,
            high_risk,
            improving,
        }
    }

    pub fn get(&self, label: &str) -> Option<&TriggerSummary> {
        let key = trigger_key(label);
        self.patterns.iter().find(|p| p.label == key)
    }
}

/// Aggregate and rank a batch of observations
pub fn analyze_triggers<'a, I>(observations: I, config: &TriggerConfig) -> TriggerAnalysis
where
    I: IntoIterator<Item = &'a TriggerObservation>,
{
    TriggerAnalysis::from_aggregates(&aggregate_triggers(observations), config)
}

/// Incrementally maintained trigger aggregates
///
/// Writes take the lock exclusively, so updates to any key are serialized;
/// reads share it.
#[derive(Debug, Default)]
pub struct TriggerCache {
    patterns: RwLock<BTreeMap<String, TriggerAggregate>>,
}

impl TriggerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache seeded from a full batch
    pub fn from_observations<'a, I>(observations: I) -> Self
    where
        I: IntoIterator<Item = &'a TriggerObservation>,
    {
        Self {
            patterns: RwLock::new(aggregate_triggers(observations)),
        }
    }

    /// Fold a newly appended observation into its aggregate
    pub fn observe(&self, obs: &TriggerObservation) -> Result<()> {
        obs.validate()?;
        let mut patterns = self.patterns.write().unwrap_or_else(|e| e.into_inner());
        patterns
            .entry(trigger_key(&obs.label))
            .or_insert_with(TriggerAggregate::default)
            .observe(obs);
        Ok(())
    }

    /// Replace the cache with a recomputation over the full event set
    pub fn rebuild<'a, I>(&self, observations: I)
    where
        I: IntoIterator<Item = &'a TriggerObservation>,
    {
        let rebuilt = aggregate_triggers(observations);
        let mut patterns = self.patterns.write().unwrap_or_else(|e| e.into_inner());
        *patterns = rebuilt;
        tracing::debug!(triggers = patterns.len(), "Trigger cache rebuilt");
    }

    pub fn invalidate(&self) {
        self.patterns
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn get(&self, label: &str) -> Option<TriggerAggregate> {
        self.patterns
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&trigger_key(label))
            .cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, TriggerAggregate> {
        self.patterns
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn analyze(&self, config: &TriggerConfig) -> TriggerAnalysis {
        let patterns = self.patterns.read().unwrap_or_else(|e| e.into_inner());
        TriggerAnalysis::from_aggregates(&patterns, config)
    }
}
