//! Domain models for Kindred
//!
//! These are the records the logging surface produces. The engine only ever
//! reads them.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Energy must drop by at least this much for an interaction to count as a drain
pub const ENERGY_DRAIN_DROP: i32 = 2;

/// Valid range for energy check-ins and trigger severity
pub const SCALE_MIN: u8 = 1;
pub const SCALE_MAX: u8 = 10;

/// Whether a flag marks healthy or concerning behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    Green,
    Red,
}

impl FlagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Red => "red",
        }
    }
}

impl std::str::FromStr for FlagType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "green" => Ok(Self::Green),
            "red" => Ok(Self::Red),
            _ => Err(format!("Unknown flag type: {}", s)),
        }
    }
}

impl std::fmt::Display for FlagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity shared by logged flags, insights, and alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Numeric priority for sorting (higher = more urgent)
    pub fn priority(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse time-of-day bucket recorded with each interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }

    /// All buckets in display order
    pub fn all() -> &'static [TimeOfDay] {
        &[Self::Morning, Self::Afternoon, Self::Evening, Self::Night]
    }

    /// Bucket for an hour of the day (0-23)
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=20 => Self::Evening,
            _ => Self::Night,
        }
    }

    /// Bucket for a timestamp
    pub fn of(timestamp: &DateTime<Utc>) -> Self {
        Self::from_hour(timestamp.hour())
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            "night" => Ok(Self::Night),
            _ => Err(format!("Unknown time of day: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the other person responded when a boundary was set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryReaction {
    Accepted,
    PushedBack,
    Angry,
    GuiltTripped,
    SilentTreatment,
    RespectShown,
}

impl BoundaryReaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::PushedBack => "pushed_back",
            Self::Angry => "angry",
            Self::GuiltTripped => "guilt_tripped",
            Self::SilentTreatment => "silent_treatment",
            Self::RespectShown => "respect_shown",
        }
    }

    pub fn all() -> &'static [BoundaryReaction] {
        &[
            Self::Accepted,
            Self::PushedBack,
            Self::Angry,
            Self::GuiltTripped,
            Self::SilentTreatment,
            Self::RespectShown,
        ]
    }

    /// Reactions that push against the boundary rather than honoring it
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Self::PushedBack | Self::Angry | Self::GuiltTripped | Self::SilentTreatment
        )
    }

    pub fn is_respectful(&self) -> bool {
        matches!(self, Self::Accepted | Self::RespectShown)
    }
}

impl std::str::FromStr for BoundaryReaction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "accepted" => Ok(Self::Accepted),
            "pushed_back" => Ok(Self::PushedBack),
            "angry" => Ok(Self::Angry),
            "guilt_tripped" => Ok(Self::GuiltTripped),
            "silent_treatment" => Ok(Self::SilentTreatment),
            "respect_shown" => Ok(Self::RespectShown),
            _ => Err(format!("Unknown boundary reaction: {}", s)),
        }
    }
}

impl std::fmt::Display for BoundaryReaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Broad category of a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCategory {
    Topic,
    Location,
    Time,
    People,
    Behavior,
    EmotionalState,
}

impl TriggerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Location => "location",
            Self::Time => "time",
            Self::People => "people",
            Self::Behavior => "behavior",
            Self::EmotionalState => "emotional_state",
        }
    }
}

impl std::str::FromStr for TriggerCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "topic" => Ok(Self::Topic),
            "location" => Ok(Self::Location),
            "time" => Ok(Self::Time),
            "people" => Ok(Self::People),
            "behavior" => Ok(Self::Behavior),
            "emotional_state" => Ok(Self::EmotionalState),
            _ => Err(format!("Unknown trigger category: {}", s)),
        }
    }
}

impl std::fmt::Display for TriggerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A logged interaction with a flag and an energy check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// The relationship this interaction belongs to
    pub relationship_id: String,
    pub flag: FlagType,
    pub category: String,
    pub severity: Severity,
    pub energy_before: u8,
    pub energy_after: u8,
    #[serde(default)]
    pub location: String,
    pub time_of_day: TimeOfDay,
    #[serde(default)]
    pub boundary_tested: bool,
    /// Who else was present (free text)
    #[serde(default)]
    pub witnesses: Option<String>,
    /// Communication style observed during the interaction
    #[serde(default)]
    pub communication_style: Option<String>,
    #[serde(default)]
    pub validations_received: Vec<String>,
    #[serde(default)]
    pub triggers_encountered: Vec<String>,
}

impl InteractionEvent {
    pub fn is_red(&self) -> bool {
        self.flag == FlagType::Red
    }

    pub fn is_green(&self) -> bool {
        self.flag == FlagType::Green
    }

    /// Energy after minus energy before
    pub fn energy_delta(&self) -> i32 {
        self.energy_after as i32 - self.energy_before as i32
    }

    /// True when the interaction left the user at least two points lower
    pub fn is_energy_drain(&self) -> bool {
        (self.energy_after as i32) <= (self.energy_before as i32) - ENERGY_DRAIN_DROP
    }

    pub fn validate(&self) -> Result<()> {
        if self.relationship_id.trim().is_empty() {
            return Err(Error::InvalidData(format!(
                "interaction {} has no relationship",
                self.id
            )));
        }
        for (name, value) in [
            ("energy_before", self.energy_before),
            ("energy_after", self.energy_after),
        ] {
            if !(SCALE_MIN..=SCALE_MAX).contains(&value) {
                return Err(Error::InvalidData(format!(
                    "interaction {}: {} {} outside {}-{}",
                    self.id, name, value, SCALE_MIN, SCALE_MAX
                )));
            }
        }
        Ok(())
    }
}

/// A logged instance of the user asserting a limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub relationship_id: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    pub reaction: BoundaryReaction,
}

impl BoundaryEvent {
    pub fn validate(&self) -> Result<()> {
        if self.relationship_id.trim().is_empty() {
            return Err(Error::InvalidData(format!(
                "boundary {} has no relationship",
                self.id
            )));
        }
        if self.category.trim().is_empty() {
            return Err(Error::InvalidData(format!(
                "boundary {} has no category",
                self.id
            )));
        }
        Ok(())
    }
}

/// A single observation of a trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerObservation {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Free-text label, e.g. "money", "ex-partner"
    pub label: String,
    pub category: TriggerCategory,
    pub boundary_violated: bool,
    /// 1-10
    pub severity: u8,
    #[serde(default)]
    pub contextual_factors: Vec<String>,
    #[serde(default)]
    pub user_reaction: Option<String>,
    #[serde(default)]
    pub effective_response: Option<String>,
}

impl TriggerObservation {
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(Error::InvalidData(format!(
                "trigger observation {} has an empty label",
                self.id
            )));
        }
        if !(SCALE_MIN..=SCALE_MAX).contains(&self.severity) {
            return Err(Error::InvalidData(format!(
                "trigger observation {}: severity {} outside {}-{}",
                self.id, self.severity, SCALE_MIN, SCALE_MAX
            )));
        }
        Ok(())
    }
}

/// The user's self-reported needs, used as a comparison reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineProfile {
    /// Communication styles, most preferred first
    #[serde(default)]
    pub communication_preferences: Vec<String>,
    #[serde(default)]
    pub desired_validations: Vec<String>,
    #[serde(default)]
    pub known_triggers: Vec<String>,
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_enum_round_trip_strings() {
        assert_eq!(FlagType::from_str("RED").unwrap(), FlagType::Red);
        assert_eq!(
            BoundaryReaction::from_str("guilt-tripped").unwrap(),
            BoundaryReaction::GuiltTripped
        );
        assert_eq!(
            TriggerCategory::from_str("emotional_state").unwrap(),
            TriggerCategory::EmotionalState
        );
        assert!(Severity::from_str("extreme").is_err());
    }

    #[test]
    fn test_time_of_day_from_hour() {
        assert_eq!(TimeOfDay::from_hour(7), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(13), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(19), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(2), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(23), TimeOfDay::Night);
    }

    #[test]
    fn test_energy_drain() {
        let mut event = green(0);
        event.energy_before = 7;
        event.energy_after = 5;
        assert!(event.is_energy_drain());
        assert_eq!(event.energy_delta(), -2);

        event.energy_after = 6;
        assert!(!event.is_energy_drain());
    }

    #[test]
    fn test_interaction_validation() {
        let mut event = red(1);
        assert!(event.validate().is_ok());

        event.energy_after = 11;
        assert!(event.validate().is_err());

        event.energy_after = 5;
        event.relationship_id = "  ".to_string();
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_trigger_validation() {
        let mut obs = trigger("money", true, 0);
        assert!(obs.validate().is_ok());

        obs.severity = 0;
        assert!(obs.validate().is_err());

        obs.severity = 4;
        obs.label = String::new();
        assert!(obs.validate().is_err());
    }

    #[test]
    fn test_boundary_reaction_classes() {
        assert!(BoundaryReaction::SilentTreatment.is_negative());
        assert!(!BoundaryReaction::Accepted.is_negative());
        assert!(BoundaryReaction::RespectShown.is_respectful());
    }

    #[test]
    fn test_interaction_deserializes_with_defaults() {
        let json = r#"{
            "id": "i1",
            "timestamp": "2026-03-01T18:30:00Z",
            "relationship_id": "alex",
            "flag": "red",
            "category": "Communication",
            "severity": "high",
            "energy_before": 7,
            "energy_after": 3,
            "time_of_day": "evening"
        }"#;
        let event: InteractionEvent = serde_json::from_str(json).unwrap();
        assert!(event.is_red());
        assert!(!event.boundary_tested);
        assert!(event.validations_received.is_empty());
        assert_eq!(event.location, "");
    }
}
