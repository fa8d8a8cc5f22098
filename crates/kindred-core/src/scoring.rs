//! Health and compatibility scores
//!
//! Both scores are bounded to 0-100. Missing data pulls a score (or one of
//! its parts) to the neutral midpoint instead of failing.

use serde::{Deserialize, Serialize};

use crate::models::{BaselineProfile, InteractionEvent, Severity};

/// Score reported when there is nothing to judge
pub const NEUTRAL_SCORE: u8 = 50;

const RED_FLAG_WEIGHT: f64 = 50.0;
const HIGH_SEVERITY_PENALTY: f64 = 15.0;
const ENERGY_DRAIN_WEIGHT: f64 = 30.0;

const ALIGNMENT_TOP_POINTS: i64 = 10;
const ALIGNMENT_STEP: i64 = 2;
const TRIGGER_PENALTY: f64 = 25.0;

// Weights in tenths: 0.4 / 0.3 / 0.3
const ALIGNMENT_WEIGHT: u32 = 4;
const VALIDATION_WEIGHT: u32 = 3;
const TRIGGER_WEIGHT: u32 = 3;

/// Counts that the health formula and the risk buckets are built from
///
/// Tallies merge by addition, so any partition of the events can be tallied
/// separately and combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagTally {
    pub total: usize,
    pub green: usize,
    pub red: usize,
    pub high_severity_red: usize,
    pub energy_drains: usize,
    pub energy_delta_sum: i64,
}

impl FlagTally {
    pub fn add(&mut self, event: &InteractionEvent) {
        self.total += 1;
        if event.is_green() {
            self.green += 1;
        } else {
            self.red += 1;
            if event.severity == Severity::High {
                self.high_severity_red += 1;
            }
        }
        if event.is_energy_drain() {
            self.energy_drains += 1;
        }
        self.energy_delta_sum += event.energy_delta() as i64;
    }

    pub fn merge(&mut self, other: &FlagTally) {
        self.total += other.total;
        self.green += other.green;
        self.red += other.red;
        self.high_severity_red += other.high_severity_red;
        self.energy_drains += other.energy_drains;
        self.energy_delta_sum += other.energy_delta_sum;
    }

    /// `green/n*100 - red/n*50`, minus 15 per high-severity red flag, minus
    /// `30 * drains/n`, clamped to 0-100. Neutral when empty.
    pub fn health_score(&self) -> u8 {
        if self.total == 0 {
            return NEUTRAL_SCORE;
        }

        let n = self.total as f64;
        let score = (self.green as f64 / n) * 100.0
            - (self.red as f64 / n) * RED_FLAG_WEIGHT
            - HIGH_SEVERITY_PENALTY * self.high_severity_red as f64
            - ENERGY_DRAIN_WEIGHT * (self.energy_drains as f64 / n);

        clamp_score(score)
    }

    /// Percentage of interactions flagged red (0-100)
    pub fn violation_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.red as f64 / self.total as f64
    }

    /// Fraction (0-1) of interactions that drained energy
    pub fn drain_fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.energy_drains as f64 / self.total as f64
    }

    pub fn average_energy_delta(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.energy_delta_sum as f64 / self.total as f64
    }
}

impl<'a> FromIterator<&'a InteractionEvent> for FlagTally {
    fn from_iter<I: IntoIterator<Item = &'a InteractionEvent>>(iter: I) -> Self {
        iter.into_iter().fold(FlagTally::default(), |mut tally, event| {
            tally.add(event);
            tally
        })
    }
}

/// Relationship health over a set of interactions
pub fn health_score<'a, I>(interactions: I) -> u8
where
    I: IntoIterator<Item = &'a InteractionEvent>,
{
    interactions.into_iter().collect::<FlagTally>().health_score()
}

/// Per-interaction alignment with the user's baseline needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityScore {
    pub overall: u8,
    pub communication_alignment: u8,
    pub validation_match: u8,
    pub trigger_impact: u8,
}

/// Score one interaction against a baseline
pub fn compatibility_score(
    interaction: &InteractionEvent,
    baseline: &BaselineProfile,
) -> CompatibilityScore {
    let communication_alignment = communication_alignment(
        interaction.communication_style.as_deref(),
        &baseline.communication_preferences,
    );
    let validation_match =
        validation_match(&interaction.validations_received, &baseline.desired_validations);
    let trigger_impact =
        trigger_impact(&interaction.triggers_encountered, &baseline.known_triggers);

    let weighted = ALIGNMENT_WEIGHT * communication_alignment as u32
        + VALIDATION_WEIGHT * validation_match as u32
        + TRIGGER_WEIGHT * trigger_impact as u32;
    let overall = weighted as f64 / 10.0;

    CompatibilityScore {
        overall: clamp_score(overall),
        communication_alignment,
        validation_match,
        trigger_impact,
    }
}

/// 10 points for the top-ranked style, 2 fewer per rank below, scaled to 0-100
fn communication_alignment(observed: Option<&str>, preferences: &[String]) -> u8 {
    let Some(observed) = observed.map(normalize).filter(|s| !s.is_empty()) else {
        return NEUTRAL_SCORE;
    };
    if preferences.is_empty() {
        return NEUTRAL_SCORE;
    }

    match preferences.iter().position(|p| normalize(p) == observed) {
        Some(rank) => {
            let points = (ALIGNMENT_TOP_POINTS - ALIGNMENT_STEP * rank as i64).max(0);
            (points * 10) as u8
        }
        None => 0,
    }
}

fn validation_match(received: &[String], desired: &[String]) -> u8 {
    if desired.is_empty() {
        return NEUTRAL_SCORE;
    }

    let matched = desired
        .iter()
        .filter(|d| {
            let d = normalize(d);
            received.iter().any(|r| normalize(r) == d)
        })
        .count();

    clamp_score(matched as f64 / desired.len() as f64 * 100.0)
}

fn trigger_impact(encountered: &[String], known: &[String]) -> u8 {
    if known.is_empty() {
        return NEUTRAL_SCORE;
    }

    let hits = known
        .iter()
        .filter(|k| {
            let k = normalize(k);
            encountered.iter().any(|e| normalize(e) == k)
        })
        .count();

    clamp_score(100.0 - TRIGGER_PENALTY * hits as f64)
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Round and clamp a raw score into 0-100
pub(crate) fn clamp_score(score: f64) -> u8 {
    if score.is_nan() {
        return NEUTRAL_SCORE;
    }
    score.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::*;

    fn mix(greens: usize, reds: usize) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        for i in 0..greens {
            events.push(green(i as i64));
        }
        for i in 0..reds {
            events.push(red(i as i64));
        }
        events
    }

    #[test]
    fn test_health_empty_is_neutral() {
        assert_eq!(health_score(&Vec::<InteractionEvent>::new()), 50);
    }

    #[test]
    fn test_health_formula() {
        // 8 green, 2 red, no penalties: 80 - 10 = 70
        assert_eq!(health_score(&mix(8, 2)), 70);

        // all green
        assert_eq!(health_score(&mix(5, 0)), 100);

        // all red clamps at zero
        assert_eq!(health_score(&mix(0, 4)), 0);
    }

    #[test]
    fn test_health_monotonic_in_flag_ratio() {
        assert!(health_score(&mix(8, 2)) > health_score(&mix(2, 8)));
    }

    #[test]
    fn test_health_penalties() {
        let mut events = mix(9, 1);
        // 90 - 5 = 85
        assert_eq!(health_score(&events), 85);

        events[9].severity = Severity::High;
        // 85 - 15 = 70
        assert_eq!(health_score(&events), 70);

        for event in events.iter_mut().take(5) {
            event.energy_before = 8;
            event.energy_after = 4;
        }
        // 70 - 30 * 0.5 = 55
        assert_eq!(health_score(&events), 55);
    }

    #[test]
    fn test_tally_merge_matches_whole() {
        let events = mix(6, 4);
        let whole: FlagTally = events.iter().collect();
        let mut left: FlagTally = events[..3].iter().collect();
        left.merge(&events[3..].iter().collect());
        assert_eq!(left, whole);
        assert_eq!(whole.violation_rate(), 40.0);
        assert_eq!(FlagTally::default().drain_fraction(), 0.0);
    }

    #[test]
    fn test_health_stays_bounded() {
        let mut events = mix(0, 10);
        for event in &mut events {
            event.severity = Severity::High;
            event.energy_before = 10;
            event.energy_after = 1;
        }
        assert_eq!(health_score(&events), 0);
    }

    fn baseline() -> BaselineProfile {
        BaselineProfile {
            communication_preferences: vec![
                "Direct".to_string(),
                "Gentle".to_string(),
                "Playful".to_string(),
            ],
            desired_validations: vec![
                "verbal".to_string(),
                "acts".to_string(),
                "time".to_string(),
                "touch".to_string(),
            ],
            known_triggers: vec!["money".to_string(), "ex".to_string()],
        }
    }

    #[test]
    fn test_compatibility_weighted_parts() {
        let mut event = green(0);
        event.communication_style = Some("gentle".to_string());
        event.validations_received = vec!["Verbal".to_string(), "time".to_string()];
        event.triggers_encountered = vec!["money".to_string()];

        let score = compatibility_score(&event, &baseline());
        assert_eq!(score.communication_alignment, 80);
        assert_eq!(score.validation_match, 50);
        assert_eq!(score.trigger_impact, 75);
        // 0.4*80 + 0.3*50 + 0.3*75 = 32 + 15 + 22.5 = 69.5
        assert_eq!(score.overall, 70);
    }

    #[test]
    fn test_compatibility_rank_floor_and_unknown_style() {
        let prefs: Vec<String> = (0..7).map(|i| format!("style{}", i)).collect();
        assert_eq!(communication_alignment(Some("style0"), &prefs), 100);
        assert_eq!(communication_alignment(Some("style5"), &prefs), 0);
        assert_eq!(communication_alignment(Some("style6"), &prefs), 0);
        assert_eq!(communication_alignment(Some("shouting"), &prefs), 0);
    }

    #[test]
    fn test_compatibility_missing_baseline_fields_are_neutral() {
        let mut event = green(0);
        event.communication_style = Some("direct".to_string());

        let score = compatibility_score(&event, &BaselineProfile::default());
        assert_eq!(score.communication_alignment, 50);
        assert_eq!(score.validation_match, 50);
        assert_eq!(score.trigger_impact, 50);
        assert_eq!(score.overall, 50);

        // missing observed style only neutralizes that part
        let event = green(0);
        let score = compatibility_score(&event, &baseline());
        assert_eq!(score.communication_alignment, 50);
        assert_eq!(score.validation_match, 0);
        assert_eq!(score.trigger_impact, 100);
    }

    #[test]
    fn test_trigger_impact_floor() {
        let known: Vec<String> = (0..6).map(|i| format!("t{}", i)).collect();
        assert_eq!(trigger_impact(&known, &known), 0);
    }
}
