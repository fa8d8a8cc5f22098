//! The detector battery
//!
//! Each detector is a pure function of the windowed interactions and a
//! [`DetectorContext`]. Detectors never look at each other's results.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::InsightConfig;
use crate::models::{InteractionEvent, Severity};

use super::types::{InsightType, PatternInsight};

const ESCALATION_CONFIDENCE: u8 = 85;
const COMMUNICATION_CONFIDENCE: u8 = 90;
const ENERGY_DRAIN_CONFIDENCE: u8 = 80;
const POSITIVE_TREND_CONFIDENCE: u8 = 75;
const CONFIDENCE_PER_CYCLE: usize = 20;

/// Everything a detector may consult besides the events
#[derive(Debug, Clone, Copy)]
pub struct DetectorContext<'a> {
    /// Reference time for recency windows
    pub now: DateTime<Utc>,
    /// Scope embedded in insight ids, usually a relationship reference
    pub scope: &'a str,
    pub config: &'a InsightConfig,
}

/// The fixed set of insight detectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detector {
    Escalation,
    CommunicationPattern,
    EnergyDrain,
    PositiveTrend,
    ContextTrigger,
    BehavioralCycle,
}

impl Detector {
    /// All detectors in pipeline order
    pub fn all() -> &'static [Detector] {
        &[
            Self::Escalation,
            Self::CommunicationPattern,
            Self::EnergyDrain,
            Self::PositiveTrend,
            Self::ContextTrigger,
            Self::BehavioralCycle,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Escalation => "escalation",
            Self::CommunicationPattern => "communication_pattern",
            Self::EnergyDrain => "energy_drain",
            Self::PositiveTrend => "positive_trend",
            Self::ContextTrigger => "context_trigger",
            Self::BehavioralCycle => "behavioral_cycle",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Escalation => "Escalation",
            Self::CommunicationPattern => "Communication Pattern",
            Self::EnergyDrain => "Energy Drain",
            Self::PositiveTrend => "Positive Trend",
            Self::ContextTrigger => "Context Trigger",
            Self::BehavioralCycle => "Behavioral Cycle",
        }
    }

    /// Run this detector over chronologically ordered interactions
    pub fn detect(
        &self,
        events: &[&InteractionEvent],
        ctx: &DetectorContext<'_>,
    ) -> Option<PatternInsight> {
        match self {
            Self::Escalation => detect_escalation(events, ctx),
            Self::CommunicationPattern => detect_communication_pattern(events, ctx),
            Self::EnergyDrain => detect_energy_drain(events, ctx),
            Self::PositiveTrend => detect_positive_trend(events, ctx),
            Self::ContextTrigger => detect_context_trigger(events, ctx),
            Self::BehavioralCycle => detect_behavioral_cycle(events, ctx),
        }
    }
}

impl std::fmt::Display for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Escalation
// =============================================================================

/// Red flags in the last 7 days and in the 7 days before that
pub fn escalation_counts(events: &[&InteractionEvent], now: DateTime<Utc>) -> (usize, usize) {
    let week_ago = now - Duration::days(7);
    let two_weeks_ago = now - Duration::days(14);

    events
        .iter()
        .filter(|e| e.is_red() && e.timestamp <= now)
        .fold((0, 0), |(recent, prior), e| {
            if e.timestamp > week_ago {
                (recent + 1, prior)
            } else if e.timestamp > two_weeks_ago {
                (recent, prior + 1)
            } else {
                (recent, prior)
            }
        })
}

fn detect_escalation(
    events: &[&InteractionEvent],
    ctx: &DetectorContext<'_>,
) -> Option<PatternInsight> {
    let (recent, prior) = escalation_counts(events, ctx.now);
    if recent <= prior || recent <= ctx.config.escalation_min_red {
        return None;
    }

    Some(
        PatternInsight::new(
            Detector::Escalation,
            ctx.scope,
            InsightType::Warning,
            Severity::High,
            ESCALATION_CONFIDENCE,
            "Red flags are escalating",
            format!(
                "{} red flags this week compared with {} the week before.",
                recent, prior
            ),
        )
        .with_recommendations([
            "Give yourself space before the next conversation",
            "Talk to someone you trust about what has been happening",
            "Write down what happened while it is fresh",
        ])
        .with_supporting_data([
            format!("red flags in the last 7 days: {}", recent),
            format!("red flags in the prior 7 days: {}", prior),
        ]),
    )
}

// =============================================================================
// Communication pattern
// =============================================================================

pub fn count_red_in_category(events: &[&InteractionEvent], category: &str) -> usize {
    events
        .iter()
        .filter(|e| e.is_red() && e.category.trim().eq_ignore_ascii_case(category.trim()))
        .count()
}

fn detect_communication_pattern(
    events: &[&InteractionEvent],
    ctx: &DetectorContext<'_>,
) -> Option<PatternInsight> {
    let category = &ctx.config.communication_category;
    let count = count_red_in_category(events, category);
    if count < ctx.config.communication_min_red {
        return None;
    }

    Some(
        PatternInsight::new(
            Detector::CommunicationPattern,
            ctx.scope,
            InsightType::Trend,
            Severity::Medium,
            COMMUNICATION_CONFIDENCE,
            "Recurring communication problems",
            format!(
                "{} red flags were about communication in this period.",
                count
            ),
        )
        .with_recommendations([
            "Use \"I feel\" statements when raising concerns",
            "Agree on a time to talk when neither of you is rushed",
            "Notice whether the same topics keep coming up",
        ])
        .with_supporting_data([format!("{} red flags: {}", category, count)]),
    )
}

// =============================================================================
// Energy drain
// =============================================================================

fn detect_energy_drain(
    events: &[&InteractionEvent],
    ctx: &DetectorContext<'_>,
) -> Option<PatternInsight> {
    if events.is_empty() {
        return None;
    }
    let drains = events.iter().filter(|e| e.is_energy_drain()).count();
    let fraction = drains as f64 / events.len() as f64;
    if fraction <= ctx.config.energy_drain_ratio {
        return None;
    }

    let percent = (fraction * 100.0).round();
    Some(
        PatternInsight::new(
            Detector::EnergyDrain,
            ctx.scope,
            InsightType::Warning,
            Severity::High,
            ENERGY_DRAIN_CONFIDENCE,
            "Interactions are draining your energy",
            format!(
                "{:.0}% of recent interactions left you with noticeably less energy.",
                percent
            ),
        )
        .with_recommendations([
            "Plan recovery time after you see this person",
            "Keep interactions shorter until you feel steadier",
            "Check in with yourself before agreeing to plans",
        ])
        .with_supporting_data([format!(
            "energy drains: {} of {} interactions",
            drains,
            events.len()
        )]),
    )
}

// =============================================================================
// Positive trend
// =============================================================================

fn detect_positive_trend(
    events: &[&InteractionEvent],
    ctx: &DetectorContext<'_>,
) -> Option<PatternInsight> {
    let green = events.iter().filter(|e| e.is_green()).count();
    let red = events.len() - green;
    if green <= red {
        return None;
    }

    Some(
        PatternInsight::new(
            Detector::PositiveTrend,
            ctx.scope,
            InsightType::Improvement,
            Severity::Low,
            POSITIVE_TREND_CONFIDENCE,
            "More green flags than red",
            format!(
                "{} green flags against {} red flags recently.",
                green, red
            ),
        )
        .with_recommendations([
            "Notice what is working and name it out loud",
            "Keep logging so you can see the trend hold",
        ])
        .with_supporting_data([
            format!("green flags: {}", green),
            format!("red flags: {}", red),
        ]),
    )
}

// =============================================================================
// Context trigger
// =============================================================================

const FAMILY_KEYWORDS: &[&str] = &[
    "family", "parent", "mom", "dad", "mother", "father", "sibling", "brother", "sister",
    "grandma", "grandpa", "in-law", "relatives", "cousin",
];

const PRIVATE_KEYWORDS: &[&str] = &[
    "home", "house", "apartment", "bedroom", "alone", "private", "phone", "text message",
    "just us", "car ride",
];

const PUBLIC_KEYWORDS: &[&str] = &[
    "restaurant", "public", "party", "bar", "cafe", "coffee shop", "store", "mall", "park",
    "work", "office", "friends", "gym", "street", "event",
];

/// Coarse social setting inferred from location and witness text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialContext {
    Private,
    Public,
    Family,
}

impl SocialContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
            Self::Family => "family",
        }
    }

    /// Classify free text by keyword; family wins over private, private
    /// over public
    ///
    /// Keywords match whole words, so "moment" is not "mom". A plural
    /// "s" on a word is accepted.
    pub fn classify(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        let words = tokenize(&text);
        let has_any = |keywords: &[&str]| keywords.iter().any(|k| contains_phrase(&words, k));

        if has_any(FAMILY_KEYWORDS) {
            Some(Self::Family)
        } else if has_any(PRIVATE_KEYWORDS) {
            Some(Self::Private)
        } else if has_any(PUBLIC_KEYWORDS) {
            Some(Self::Public)
        } else {
            None
        }
    }

    /// Classify an interaction by its location and witnesses
    pub fn of(event: &InteractionEvent) -> Option<Self> {
        let mut text = event.location.clone();
        if let Some(witnesses) = &event.witnesses {
            text.push(' ');
            text.push_str(witnesses);
        }
        Self::classify(&text)
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn contains_phrase(words: &[&str], keyword: &str) -> bool {
    let phrase = tokenize(keyword);
    if phrase.is_empty() {
        return false;
    }
    words.windows(phrase.len()).any(|window| {
        window.iter().zip(&phrase).all(|(word, expected)| {
            word == expected || word.strip_suffix('s') == Some(*expected)
        })
    })
}

impl std::fmt::Display for SocialContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Red flags grouped by social context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBreakdown {
    /// All red flags, classified or not
    pub red_total: usize,
    pub counts: BTreeMap<SocialContext, usize>,
}

impl ContextBreakdown {
    pub fn from_events(events: &[&InteractionEvent]) -> Self {
        let mut breakdown = Self::default();
        for event in events.iter().filter(|e| e.is_red()) {
            breakdown.red_total += 1;
            if let Some(context) = SocialContext::of(event) {
                *breakdown.counts.entry(context).or_insert(0) += 1;
            }
        }
        breakdown
    }

    /// The context with the most red flags and its share (0-1)
    pub fn dominant(&self) -> Option<(SocialContext, f64)> {
        if self.red_total == 0 {
            return None;
        }
        self.counts
            .iter()
            .fold(None::<(SocialContext, usize)>, |best, (context, count)| {
                match best {
                    Some((_, best_count)) if best_count >= *count => best,
                    _ => Some((*context, *count)),
                }
            })
            .map(|(context, count)| (context, count as f64 / self.red_total as f64))
    }
}

fn detect_context_trigger(
    events: &[&InteractionEvent],
    ctx: &DetectorContext<'_>,
) -> Option<PatternInsight> {
    let breakdown = ContextBreakdown::from_events(events);
    let (context, share) = breakdown.dominant()?;
    if share < ctx.config.context_share {
        return None;
    }

    let percent = (share * 100.0).round() as u8;
    let confidence = percent.min(ctx.config.context_confidence_cap);
    let count = breakdown.counts.get(&context).copied().unwrap_or(0);

    Some(
        PatternInsight::new(
            Detector::ContextTrigger,
            ctx.scope,
            InsightType::Trigger,
            Severity::Medium,
            confidence,
            format!("Red flags cluster in {} settings", context),
            format!(
                "{}% of red flags happened in a {} setting.",
                percent, context
            ),
        )
        .with_recommendations(context_recommendations(context))
        .with_supporting_data([
            format!("{} red flags: {} of {}", context, count, breakdown.red_total),
        ]),
    )
}

fn context_recommendations(context: SocialContext) -> Vec<&'static str> {
    match context {
        SocialContext::Private => vec![
            "Consider meeting somewhere public for difficult conversations",
            "Let a friend know when you are meeting one-on-one",
        ],
        SocialContext::Public => vec![
            "Agree on a signal for leaving early",
            "Save sensitive topics for a calmer setting",
        ],
        SocialContext::Family => vec![
            "Decide in advance how long you will stay at family events",
            "Pick one topic you will not discuss with family present",
        ],
    }
}

// =============================================================================
// Behavioral cycle
// =============================================================================

/// Non-overlapping consecutive red, green, red runs
pub fn count_cycles(events: &[&InteractionEvent]) -> usize {
    let mut cycles = 0;
    let mut i = 0;
    while i + 2 < events.len() {
        if events[i].is_red() && events[i + 1].is_green() && events[i + 2].is_red() {
            cycles += 1;
            i += 3;
        } else {
            i += 1;
        }
    }
    cycles
}

fn detect_behavioral_cycle(
    events: &[&InteractionEvent],
    ctx: &DetectorContext<'_>,
) -> Option<PatternInsight> {
    let cycles = count_cycles(events);
    if cycles < ctx.config.cycle_min {
        return None;
    }

    let confidence = (cycles * CONFIDENCE_PER_CYCLE).min(ctx.config.cycle_confidence_cap as usize);
    Some(
        PatternInsight::new(
            Detector::BehavioralCycle,
            ctx.scope,
            InsightType::Cycle,
            Severity::Medium,
            confidence as u8,
            "A repeating hurt-and-repair cycle",
            format!(
                "A red flag followed by a good moment and another red flag happened {} times.",
                cycles
            ),
        )
        .with_recommendations([
            "Judge the pattern, not the good days in between",
            "Track whether repair actually changes anything",
        ])
        .with_supporting_data([format!("red-green-red cycles: {}", cycles)]),
    )
}
