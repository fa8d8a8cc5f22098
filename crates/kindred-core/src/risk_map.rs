//! Time/Location Risk Analyzer
//!
//! Buckets interactions by time of day, weekday, hour, location, and week.
//! A violation here is a red flag.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::RiskMapConfig;
use crate::models::{InteractionEvent, TimeOfDay};
use crate::scoring::FlagTally;

/// Monday of the week containing `timestamp` (UTC)
pub fn week_start(timestamp: &DateTime<Utc>) -> NaiveDate {
    let date = timestamp.date_naive();
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Violation statistics for one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBucket {
    pub key: String,
    pub total: usize,
    pub violations: usize,
    pub violation_rate: f64,
    pub average_health: f64,
    pub average_energy_delta: f64,
}

impl RiskBucket {
    fn from_tally(key: impl Into<String>, tally: &FlagTally) -> Self {
        Self {
            key: key.into(),
            total: tally.total,
            violations: tally.red,
            violation_rate: tally.violation_rate(),
            average_health: tally.health_score() as f64,
            average_energy_delta: tally.average_energy_delta(),
        }
    }
}

/// One point of the weekly trend series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPoint {
    pub week_start: NaiveDate,
    pub total: usize,
    pub violations: usize,
    pub violation_rate: f64,
    pub average_health: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time and location risk tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMap {
    /// Always four buckets, morning first
    pub time_of_day: Vec<RiskBucket>,
    /// Always seven buckets, Monday first
    pub weekdays: Vec<RiskBucket>,
    /// Only hours that saw at least one interaction
    pub hours: Vec<RiskBucket>,
    /// Riskiest locations first
    pub locations: Vec<RiskBucket>,
    /// Oldest week first
    pub weekly: Vec<WeeklyPoint>,
    pub recent_trend: TrendDirection,
    pub riskiest_time_of_day: Option<String>,
    pub riskiest_weekday: Option<String>,
}

/// Build the risk tables for a set of interactions
pub fn build_risk_map(interactions: &[InteractionEvent], config: &RiskMapConfig) -> RiskMap {
    let mut by_time: BTreeMap<TimeOfDay, FlagTally> = BTreeMap::new();
    let mut by_weekday: BTreeMap<u32, FlagTally> = BTreeMap::new();
    let mut by_hour: BTreeMap<u32, FlagTally> = BTreeMap::new();
    let mut by_location: BTreeMap<&str, FlagTally> = BTreeMap::new();
    let mut by_week: BTreeMap<NaiveDate, FlagTally> = BTreeMap::new();

    for event in interactions {
        by_time.entry(event.time_of_day).or_default().add(event);
        by_weekday
            .entry(event.timestamp.weekday().num_days_from_monday())
            .or_default()
            .add(event);
        by_hour
            .entry(event.timestamp.hour())
            .or_default()
            .add(event);
        if !event.location.trim().is_empty() {
            by_location
                .entry(event.location.as_str())
                .or_default()
                .add(event);
        }
        by_week
            .entry(week_start(&event.timestamp))
            .or_default()
            .add(event);
    }

    let empty = FlagTally::default();

    let time_of_day: Vec<RiskBucket> = TimeOfDay::all()
        .iter()
        .map(|slot| RiskBucket::from_tally(slot.as_str(), by_time.get(slot).unwrap_or(&empty)))
        .collect();

    let weekdays: Vec<RiskBucket> = WEEKDAYS
        .iter()
        .map(|day| {
            let tally = by_weekday
                .get(&day.num_days_from_monday())
                .unwrap_or(&empty);
            RiskBucket::from_tally(weekday_name(*day), tally)
        })
        .collect();

    let hours = by_hour
        .iter()
        .map(|(hour, tally)| RiskBucket::from_tally(format!("{:02}:00", hour), tally))
        .collect();

    let mut locations: Vec<RiskBucket> = by_location
        .iter()
        .map(|(location, tally)| RiskBucket::from_tally(*location, tally))
        .collect();
    locations.sort_by(|a, b| {
        b.violation_rate
            .partial_cmp(&a.violation_rate)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.total.cmp(&a.total))
            .then_with(|| a.key.cmp(&b.key))
    });
    locations.truncate(config.location_limit);

    let weekly: Vec<WeeklyPoint> = by_week
        .iter()
        .map(|(week, tally)| WeeklyPoint {
            week_start: *week,
            total: tally.total,
            violations: tally.red,
            violation_rate: tally.violation_rate(),
            average_health: tally.health_score() as f64,
        })
        .collect();

    let recent_trend = recent_trend(&weekly, config);

    RiskMap {
        riskiest_time_of_day: riskiest(&time_of_day),
        riskiest_weekday: riskiest(&weekdays),
        time_of_day,
        weekdays,
        hours,
        locations,
        weekly,
        recent_trend,
    }
}

/// Compare the latest week against the week `trend_lookback` positions
/// earlier (or the earliest week when the series is shorter)
pub fn recent_trend(weekly: &[WeeklyPoint], config: &RiskMapConfig) -> TrendDirection {
    if weekly.len() < 3 {
        return TrendDirection::Stable;
    }

    let last = weekly.len() - 1;
    let earlier = last.saturating_sub(config.trend_lookback);
    let change = weekly[last].violation_rate - weekly[earlier].violation_rate;

    if change > config.trend_tolerance {
        TrendDirection::Increasing
    } else if change < -config.trend_tolerance {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

/// Key of the populated bucket with the highest violation rate
fn riskiest(buckets: &[RiskBucket]) -> Option<String> {
    buckets
        .iter()
        .filter(|b| b.violations > 0)
        .fold(None::<&RiskBucket>, |best, bucket| match best {
            Some(b) if b.violation_rate >= bucket.violation_rate => Some(b),
            _ => Some(bucket),
        })
        .map(|b| b.key.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::*;
    use crate::models::FlagType;
    use chrono::TimeZone;

    fn at(flag: FlagType, y: i32, m: u32, d: u32, h: u32) -> InteractionEvent {
        let mut event = interaction(flag, 0);
        event.timestamp = Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap();
        event.time_of_day = TimeOfDay::from_hour(h);
        event
    }

    #[test]
    fn test_week_start_is_monday() {
        let sunday = Utc.with_ymd_and_hms(2026, 3, 22, 23, 0, 0).unwrap();
        let monday = Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap();
        assert_eq!(
            week_start(&sunday),
            NaiveDate::from_ymd_opt(2026, 3, 16).unwrap()
        );
        assert_eq!(week_start(&monday), week_start(&sunday));
    }

    #[test]
    fn test_empty_map_has_fixed_buckets() {
        let map = build_risk_map(&[], &RiskMapConfig::default());
        assert_eq!(map.time_of_day.len(), 4);
        assert_eq!(map.weekdays.len(), 7);
        assert_eq!(map.weekdays[0].key, "monday");
        assert!(map.hours.is_empty());
        assert!(map.locations.is_empty());
        assert_eq!(map.recent_trend, TrendDirection::Stable);
        assert_eq!(map.time_of_day[0].average_health, 50.0);
        assert!(map.riskiest_time_of_day.is_none());
    }

    #[test]
    fn test_time_and_weekday_buckets() {
        let events = vec![
            at(FlagType::Red, 2026, 3, 16, 21),   // Monday night
            at(FlagType::Red, 2026, 3, 16, 22),   // Monday night
            at(FlagType::Green, 2026, 3, 17, 9),  // Tuesday morning
            at(FlagType::Green, 2026, 3, 18, 19), // Wednesday evening
        ];
        let map = build_risk_map(&events, &RiskMapConfig::default());

        let night = map.time_of_day.iter().find(|b| b.key == "night").unwrap();
        assert_eq!(night.total, 2);
        assert_eq!(night.violation_rate, 100.0);
        assert_eq!(map.riskiest_time_of_day.as_deref(), Some("night"));

        assert_eq!(map.weekdays[0].total, 2);
        assert_eq!(map.weekdays[1].violations, 0);
        assert_eq!(map.riskiest_weekday.as_deref(), Some("monday"));

        let hours: Vec<&str> = map.hours.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(hours, vec!["09:00", "19:00", "21:00", "22:00"]);
    }

    #[test]
    fn test_locations_case_sensitive_and_limited() {
        let mut events = Vec::new();
        for i in 0..10 {
            let mut event = at(FlagType::Red, 2026, 3, 16, 12);
            event.location = format!("Place {}", i);
            if i % 2 == 0 {
                event.flag = FlagType::Green;
            }
            events.push(event);
        }
        let mut upper = at(FlagType::Red, 2026, 3, 16, 12);
        upper.location = "HOME".to_string();
        let mut lower = at(FlagType::Green, 2026, 3, 16, 12);
        lower.location = "home".to_string();
        events.push(upper);
        events.push(lower);

        let map = build_risk_map(&events, &RiskMapConfig::default());
        assert_eq!(map.locations.len(), 8);
        assert_eq!(map.locations[0].key, "HOME");
        assert!(map.locations.iter().all(|b| b.key != "home"));
    }

    #[test]
    fn test_weekly_series_and_trend() {
        let mut events = Vec::new();
        // 4 weeks: violation rates 0%, 50%, 50%, 100%
        events.push(at(FlagType::Green, 2026, 2, 23, 12));
        events.push(at(FlagType::Green, 2026, 3, 3, 12));
        events.push(at(FlagType::Red, 2026, 3, 4, 12));
        events.push(at(FlagType::Red, 2026, 3, 10, 12));
        events.push(at(FlagType::Green, 2026, 3, 11, 12));
        events.push(at(FlagType::Red, 2026, 3, 17, 12));

        let map = build_risk_map(&events, &RiskMapConfig::default());
        assert_eq!(map.weekly.len(), 4);
        assert_eq!(
            map.weekly[0].week_start,
            NaiveDate::from_ymd_opt(2026, 2, 23).unwrap()
        );
        let rates: Vec<f64> = map.weekly.iter().map(|w| w.violation_rate).collect();
        assert_eq!(rates, vec![0.0, 50.0, 50.0, 100.0]);
        assert_eq!(map.recent_trend, TrendDirection::Increasing);
    }

    fn point(rate: f64) -> WeeklyPoint {
        WeeklyPoint {
            week_start: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            total: 4,
            violations: 0,
            violation_rate: rate,
            average_health: 50.0,
        }
    }

    #[test]
    fn test_recent_trend_rules() {
        let config = RiskMapConfig::default();
        assert_eq!(
            recent_trend(&[point(0.0), point(100.0)], &config),
            TrendDirection::Stable
        );
        assert_eq!(
            recent_trend(&[point(80.0), point(0.0), point(20.0)], &config),
            TrendDirection::Decreasing
        );
        assert_eq!(
            recent_trend(
                &[point(10.0), point(40.0), point(90.0), point(90.0), point(40.0)],
                &config
            ),
            TrendDirection::Stable
        );
    }
}
