//! Kindred Core Library
//!
//! Wellness and risk analytics over logged relationship events:
//! - Health and compatibility scoring
//! - Trigger pattern aggregation with an incremental cache
//! - Time, weekday and location risk maps
//! - Behavioral insight detectors
//! - Proactive, dismissible warnings for planned situations
//!
//! Every component is a pure function of the events it is given. The caller
//! owns persistence, dismissal state and the reference time.

pub mod analytics;
pub mod boundaries;
pub mod config;
pub mod error;
pub mod insights;
pub mod models;
pub mod risk_map;
pub mod scoring;
pub mod snapshot;
pub mod triggers;
pub mod warnings;

pub use analytics::{AnalyticsReport, AnalyticsRequest, Analyzer};
pub use boundaries::{summarize_boundaries, BoundarySummary};
pub use config::AnalyticsConfig;
pub use error::{Error, Result};
pub use insights::{Detector, InsightEngine, InsightType, PatternInsight};
pub use risk_map::{build_risk_map, RiskMap, TrendDirection};
pub use scoring::{compatibility_score, health_score, CompatibilityScore, FlagTally};
pub use snapshot::{EventSnapshot, SkippedRecords, SnapshotFile};
pub use triggers::{analyze_triggers, TriggerAnalysis, TriggerCache, TriggerSummary};
pub use warnings::{
    SituationalContext, WarningAlert, WarningAssessment, WarningEngine, WarningKind,
};
