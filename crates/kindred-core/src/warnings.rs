//! Proactive Warning Engine
//!
//! Reuses the insight detectors against the user's planned situation and
//! turns what fires into actionable alerts. Dismissal lives with the caller:
//! each alert id carries a fingerprint of the pattern behind it, so a
//! dismissed id stops matching once the pattern changes.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{InsightConfig, WarningConfig};
use crate::insights::{
    count_cycles, count_red_in_category, escalation_counts, ContextBreakdown, Detector,
    DetectorContext, InsightEngine, PatternInsight, SocialContext,
};
use crate::models::{BoundaryEvent, InteractionEvent, Severity};
use crate::snapshot::EventSnapshot;
use crate::triggers::TriggerAnalysis;

const TOPIC_MATCH_CONFIDENCE: u8 = 70;
const BOUNDARY_BASE_CONFIDENCE: usize = 50;
const BOUNDARY_CONFIDENCE_STEP: usize = 10;
const LOCATION_BASE_CONFIDENCE: usize = 40;
const LOCATION_CONFIDENCE_STEP: usize = 15;
const WARNING_CONFIDENCE_CAP: usize = 90;

pub const NO_CONCERNS_MESSAGE: &str =
    "No immediate concerns for this situation. Trust your instincts and check in with yourself afterwards.";
pub const NOT_ENOUGH_DATA_MESSAGE: &str =
    "Not enough recent interactions to spot a pattern yet. Keep logging and check back.";

/// What the user is about to walk into
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SituationalContext {
    #[serde(default)]
    pub planned_location: Option<String>,
    #[serde(default)]
    pub planned_topic: Option<String>,
    /// Restrict evaluation to one relationship
    #[serde(default)]
    pub relationship_id: Option<String>,
}

impl SituationalContext {
    pub fn location(&self) -> Option<&str> {
        non_blank(self.planned_location.as_deref())
    }

    pub fn topic(&self) -> Option<&str> {
        non_blank(self.planned_topic.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The fixed set of warning evaluators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Escalation,
    BoundaryTesting,
    ContextMatch,
    TopicMatch,
    EnergyDrain,
    CommunicationPattern,
    BehavioralCycle,
}

impl WarningKind {
    pub fn all() -> &'static [WarningKind] {
        &[
            Self::Escalation,
            Self::BoundaryTesting,
            Self::ContextMatch,
            Self::TopicMatch,
            Self::EnergyDrain,
            Self::CommunicationPattern,
            Self::BehavioralCycle,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Escalation => "escalation",
            Self::BoundaryTesting => "boundary_testing",
            Self::ContextMatch => "context_match",
            Self::TopicMatch => "topic_match",
            Self::EnergyDrain => "energy_drain",
            Self::CommunicationPattern => "communication_pattern",
            Self::BehavioralCycle => "behavioral_cycle",
        }
    }

    fn evaluate(&self, input: &EvaluationInput<'_>) -> Option<WarningAlert> {
        match self {
            Self::Escalation => evaluate_escalation(input),
            Self::BoundaryTesting => evaluate_boundary_testing(input),
            Self::ContextMatch => evaluate_context_match(input),
            Self::TopicMatch => evaluate_topic_match(input),
            Self::EnergyDrain => evaluate_energy_drain(input),
            Self::CommunicationPattern => evaluate_communication_pattern(input),
            Self::BehavioralCycle => evaluate_behavioral_cycle(input),
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WarningKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown warning kind: {}", s))
    }
}

/// An actionable, dismissible alert about an upcoming interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningAlert {
    /// `<kind>:<scope>:<fingerprint>`
    pub id: String,
    pub kind: WarningKind,
    pub severity: Severity,
    /// 0-100
    pub confidence: u8,
    pub title: String,
    pub message: String,
    /// What set this alert off
    pub triggers: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_phrases: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_strategies: Option<Vec<String>>,
}

impl WarningAlert {
    fn new(
        kind: WarningKind,
        scope: &str,
        fingerprint: &str,
        severity: Severity,
        confidence: u8,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("{}:{}:{}", kind.as_str(), scope, fingerprint),
            kind,
            severity,
            confidence: confidence.min(100),
            title: title.into(),
            message: message.into(),
            triggers: Vec::new(),
            recommendations: Vec::new(),
            suggested_phrases: None,
            exit_strategies: None,
        }
    }

    fn from_insight(
        kind: WarningKind,
        insight: PatternInsight,
        fingerprint: &str,
        scope: &str,
    ) -> Self {
        let mut alert = Self::new(
            kind,
            scope,
            fingerprint,
            insight.severity,
            insight.confidence,
            insight.title,
            insight.description,
        );
        alert.triggers = insight.supporting_data;
        alert.recommendations = insight.recommendations;
        alert
    }

    fn with_triggers(mut self, triggers: Vec<String>) -> Self {
        self.triggers = triggers;
        self
    }

    fn with_recommendations(mut self, recommendations: &[&str]) -> Self {
        self.recommendations = to_strings(recommendations);
        self
    }

    fn with_scripts(mut self, phrases: &[&str], exits: &[&str]) -> Self {
        self.suggested_phrases = Some(to_strings(phrases));
        self.exit_strategies = Some(to_strings(exits));
        self
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Result of a warning evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WarningAssessment {
    Alerts { alerts: Vec<WarningAlert> },
    NoImmediateConcerns { message: String },
}

impl WarningAssessment {
    pub fn alerts(&self) -> &[WarningAlert] {
        match self {
            Self::Alerts { alerts } => alerts,
            Self::NoImmediateConcerns { .. } => &[],
        }
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, Self::NoImmediateConcerns { .. })
    }
}

/// Everything one evaluation pass looks at
struct EvaluationInput<'a> {
    interactions: Vec<&'a InteractionEvent>,
    boundaries: Vec<&'a BoundaryEvent>,
    triggers: &'a TriggerAnalysis,
    context: &'a SituationalContext,
    detector_ctx: DetectorContext<'a>,
    warnings: &'a WarningConfig,
}

impl EvaluationInput<'_> {
    fn scope(&self) -> &str {
        self.detector_ctx.scope
    }

    fn detect(&self, detector: Detector) -> Option<PatternInsight> {
        detector.detect(&self.interactions, &self.detector_ctx)
    }
}

pub struct WarningEngine {
    insights: InsightEngine,
    config: WarningConfig,
}

impl Default for WarningEngine {
    fn default() -> Self {
        Self::new(InsightConfig::default(), WarningConfig::default())
    }
}

impl WarningEngine {
    pub fn new(insights: InsightConfig, config: WarningConfig) -> Self {
        Self {
            insights: InsightEngine::new(insights),
            config,
        }
    }

    /// Evaluate every warning against the planned situation
    ///
    /// Alerts whose id appears in `dismissed` are dropped. When nothing
    /// remains the assessment says so explicitly.
    pub fn evaluate(
        &self,
        events: &EventSnapshot,
        triggers: &TriggerAnalysis,
        context: &SituationalContext,
        dismissed: &BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> WarningAssessment {
        let relationship = non_blank(context.relationship_id.as_deref());
        let scope = relationship.unwrap_or("all");
        let in_scope = |id: &str| relationship.map_or(true, |r| r == id);

        let scoped: Vec<InteractionEvent> = events
            .interactions
            .iter()
            .filter(|e| in_scope(e.relationship_id.as_str()))
            .cloned()
            .collect();
        let interactions = self.insights.windowed(&scoped, now);
        if interactions.len() < self.insights.config().min_interactions {
            debug!(
                scope,
                count = interactions.len(),
                "Not enough recent interactions for warnings"
            );
            return WarningAssessment::NoImmediateConcerns {
                message: NOT_ENOUGH_DATA_MESSAGE.to_string(),
            };
        }

        let (start, end) = self.insights.window(now);
        let boundaries = events
            .boundaries
            .iter()
            .filter(|b| in_scope(b.relationship_id.as_str()))
            .filter(|b| b.timestamp > start && b.timestamp <= end)
            .collect();

        let input = EvaluationInput {
            interactions,
            boundaries,
            triggers,
            context,
            detector_ctx: DetectorContext {
                now,
                scope,
                config: self.insights.config(),
            },
            warnings: &self.config,
        };

        let mut alerts: Vec<WarningAlert> = Vec::new();
        for kind in WarningKind::all() {
            let Some(alert) = kind.evaluate(&input) else {
                continue;
            };
            if dismissed.contains(&alert.id) {
                debug!(id = %alert.id, "Alert dismissed");
                continue;
            }
            debug!(kind = kind.as_str(), id = %alert.id, "Warning raised");
            alerts.push(alert);
        }

        if alerts.is_empty() {
            return WarningAssessment::NoImmediateConcerns {
                message: NO_CONCERNS_MESSAGE.to_string(),
            };
        }

        alerts.sort_by(|a, b| {
            b.severity
                .priority()
                .cmp(&a.severity.priority())
                .then_with(|| b.confidence.cmp(&a.confidence))
        });
        WarningAssessment::Alerts { alerts }
    }
}

// =============================================================================
// Evaluators
// =============================================================================

fn evaluate_escalation(input: &EvaluationInput<'_>) -> Option<WarningAlert> {
    let insight = input.detect(Detector::Escalation)?;
    let (recent, prior) = escalation_counts(&input.interactions, input.detector_ctx.now);

    Some(
        WarningAlert::from_insight(
            WarningKind::Escalation,
            insight,
            &format!("{}-{}", recent, prior),
            input.scope(),
        )
        .with_scripts(
            &[
                "I need us to slow down. Can we pick this up tomorrow?",
                "I'm not okay with how this conversation is going.",
                "I'm going to take some space and come back to this.",
            ],
            &[
                "Arrange your own way home before you go",
                "Tell a friend where you will be and when to check in",
                "Leave if voices are raised; you can finish the talk later",
            ],
        ),
    )
}

fn evaluate_boundary_testing(input: &EvaluationInput<'_>) -> Option<WarningAlert> {
    let tested = input
        .interactions
        .iter()
        .filter(|e| e.boundary_tested)
        .count();
    let pushback = input
        .boundaries
        .iter()
        .filter(|b| b.reaction.is_negative())
        .count();
    let count = tested + pushback;
    if count < input.warnings.boundary_testing_min {
        return None;
    }

    let severity = if count >= input.warnings.boundary_testing_high {
        Severity::High
    } else {
        Severity::Medium
    };
    let confidence =
        (BOUNDARY_BASE_CONFIDENCE + BOUNDARY_CONFIDENCE_STEP * count).min(WARNING_CONFIDENCE_CAP);

    Some(
        WarningAlert::new(
            WarningKind::BoundaryTesting,
            input.scope(),
            &count.to_string(),
            severity,
            confidence as u8,
            "Your boundaries are being tested",
            format!(
                "Your limits were pushed {} times in the last two weeks.",
                count
            ),
        )
        .with_triggers(vec![
            format!("boundary tested during interactions: {}", tested),
            format!("negative reactions to boundaries: {}", pushback),
        ])
        .with_recommendations(&[
            "Decide ahead of time which limits are not negotiable",
            "Restate a boundary once, calmly, without re-arguing it",
        ])
        .with_scripts(
            &[
                "I've already answered that, and my answer hasn't changed.",
                "I'm not going to discuss this further right now.",
                "I understand you're upset, and my boundary still stands.",
            ],
            &[
                "Set an end time before the conversation starts",
                "Step outside or end the call if the limit is pushed again",
            ],
        ),
    )
}

fn evaluate_context_match(input: &EvaluationInput<'_>) -> Option<WarningAlert> {
    let location = input.context.location()?;
    let config = input.detector_ctx.config;

    let breakdown = ContextBreakdown::from_events(&input.interactions);
    if let Some((dominant, share)) = breakdown.dominant() {
        if share >= config.context_share && SocialContext::classify(location) == Some(dominant) {
            let percent = (share * 100.0).round() as u8;
            let count = breakdown.counts.get(&dominant).copied().unwrap_or(0);
            return Some(context_alert(
                input,
                &format!("{}-{}", dominant, count),
                percent.min(config.context_confidence_cap),
                format!("Red flags often happen in {} settings", dominant),
                format!(
                    "{} is a {} setting, where {}% of recent red flags happened.",
                    location, dominant, percent
                ),
                format!("{} red flags: {} of {}", dominant, count, breakdown.red_total),
            ));
        }
    }

    let count = input
        .interactions
        .iter()
        .filter(|e| e.is_red() && e.location.trim().eq_ignore_ascii_case(location))
        .count();
    if count < input.warnings.location_match_min {
        return None;
    }

    let confidence =
        (LOCATION_BASE_CONFIDENCE + LOCATION_CONFIDENCE_STEP * count).min(WARNING_CONFIDENCE_CAP);
    Some(context_alert(
        input,
        &format!("{}-{}", location.to_lowercase(), count),
        confidence as u8,
        format!("Red flags have happened at {}", location),
        format!(
            "{} red flags happened at {} in the last two weeks.",
            count, location
        ),
        format!("red flags at {}: {}", location, count),
    ))
}

fn context_alert(
    input: &EvaluationInput<'_>,
    fingerprint: &str,
    confidence: u8,
    title: String,
    message: String,
    trigger: String,
) -> WarningAlert {
    WarningAlert::new(
        WarningKind::ContextMatch,
        input.scope(),
        fingerprint,
        Severity::High,
        confidence,
        title,
        message,
    )
    .with_triggers(vec![trigger])
    .with_recommendations(&[
        "Consider meeting somewhere else",
        "Bring someone you trust or keep the visit short",
    ])
    .with_scripts(
        &[
            "Could we meet somewhere else this time?",
            "I can only stay for an hour today.",
        ],
        &[
            "Have your own transport",
            "Agree a check-in text with a friend",
            "Plan a reason to leave at a set time",
        ],
    )
}

fn evaluate_topic_match(input: &EvaluationInput<'_>) -> Option<WarningAlert> {
    let topic = input.context.topic()?.to_lowercase();
    let overlaps = |candidate: &str| {
        let candidate = candidate.trim().to_lowercase();
        !candidate.is_empty() && (topic.contains(&candidate) || candidate.contains(&topic))
    };

    let mut matched: BTreeSet<String> = input
        .triggers
        .high_risk
        .iter()
        .filter(|label| overlaps(label.as_str()))
        .map(|label| label.to_lowercase())
        .collect();
    matched.extend(
        input
            .interactions
            .iter()
            .filter(|e| e.is_red() && overlaps(e.category.as_str()))
            .map(|e| e.category.trim().to_lowercase()),
    );
    if matched.is_empty() {
        return None;
    }

    let matched: Vec<String> = matched.into_iter().collect();
    Some(
        WarningAlert::new(
            WarningKind::TopicMatch,
            input.scope(),
            &matched.join("+"),
            Severity::Medium,
            TOPIC_MATCH_CONFIDENCE,
            "This topic has been a trigger before",
            format!(
                "\"{}\" overlaps with topics that led to red flags: {}.",
                topic,
                matched.join(", ")
            ),
        )
        .with_triggers(matched)
        .with_recommendations(&[
            "Write down the one point you want to make",
            "Pick a calm time and a neutral place for this topic",
            "Agree to pause if it gets heated",
        ]),
    )
}

fn evaluate_energy_drain(input: &EvaluationInput<'_>) -> Option<WarningAlert> {
    let insight = input.detect(Detector::EnergyDrain)?;
    let drains = input
        .interactions
        .iter()
        .filter(|e| e.is_energy_drain())
        .count();
    Some(WarningAlert::from_insight(
        WarningKind::EnergyDrain,
        insight,
        &format!("{}-{}", drains, input.interactions.len()),
        input.scope(),
    ))
}

fn evaluate_communication_pattern(input: &EvaluationInput<'_>) -> Option<WarningAlert> {
    let insight = input.detect(Detector::CommunicationPattern)?;
    let count = count_red_in_category(
        &input.interactions,
        &input.detector_ctx.config.communication_category,
    );
    Some(WarningAlert::from_insight(
        WarningKind::CommunicationPattern,
        insight,
        &count.to_string(),
        input.scope(),
    ))
}

fn evaluate_behavioral_cycle(input: &EvaluationInput<'_>) -> Option<WarningAlert> {
    let insight = input.detect(Detector::BehavioralCycle)?;
    let cycles = count_cycles(&input.interactions);
    Some(WarningAlert::from_insight(
        WarningKind::BehavioralCycle,
        insight,
        &cycles.to_string(),
        input.scope(),
    ))
}
