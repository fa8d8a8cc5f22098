//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::sync::Arc;

use chrono::{Datelike, TimeZone, Timelike, Utc};
use kindred_core::{AnalyticsConfig, AnalyticsRequest, Analyzer, SituationalContext, SnapshotFile};
use tempfile::NamedTempFile;

use crate::commands::{self, truncate};

const SNAPSHOT: &str = r#"{
    "interactions": [
        {"id": "a1", "timestamp": "2026-03-05T19:00:00Z", "relationship_id": "alex", "flag": "red",
         "category": "Communication", "severity": "high", "energy_before": 7, "energy_after": 3,
         "location": "Home", "time_of_day": "evening", "boundary_tested": true},
        {"id": "a2", "timestamp": "2026-03-12T19:00:00Z", "relationship_id": "alex", "flag": "red",
         "category": "Communication", "severity": "medium", "energy_before": 6, "energy_after": 3,
         "location": "Home", "time_of_day": "evening", "boundary_tested": true},
        {"id": "a3", "timestamp": "2026-03-14T13:00:00Z", "relationship_id": "alex", "flag": "green",
         "category": "Support", "severity": "low", "energy_before": 5, "energy_after": 7,
         "location": "Cafe", "time_of_day": "afternoon",
         "communication_style": "gentle", "validations_received": ["listened"]},
        {"id": "a4", "timestamp": "2026-03-16T21:00:00Z", "relationship_id": "alex", "flag": "red",
         "category": "Communication", "severity": "high", "energy_before": 6, "energy_after": 2,
         "location": "Home", "time_of_day": "night"},
        {"id": "s1", "timestamp": "2026-03-15T10:00:00Z", "relationship_id": "sam", "flag": "green",
         "category": "Support", "severity": "low", "energy_before": 5, "energy_after": 8,
         "location": "Park", "time_of_day": "morning"}
    ],
    "boundaries": [
        {"id": "b1", "timestamp": "2026-03-13T20:00:00Z", "relationship_id": "alex",
         "category": "Privacy", "severity": "high", "reaction": "guilt_tripped"}
    ],
    "triggers": [
        {"id": "t1", "timestamp": "2026-03-05T19:00:00Z", "label": "Money", "category": "topic",
         "boundary_violated": true, "severity": 7},
        {"id": "t2", "timestamp": "2026-03-12T19:00:00Z", "label": "money", "category": "topic",
         "boundary_violated": true, "severity": 6, "effective_response": "took a walk"}
    ],
    "baseline": {
        "communication_preferences": ["gentle", "direct"],
        "desired_validations": ["listened", "thanked"],
        "known_triggers": ["money"]
    }
}"#;

fn snapshot_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SNAPSHOT.as_bytes()).unwrap();
    file
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 18, 12, 0, 0).unwrap()
}

// ========== Utility Tests ==========

#[test]
fn test_parse_now_rfc3339() {
    let parsed = commands::parse_now(Some("2026-03-18T12:00:00+02:00")).unwrap();
    assert_eq!(parsed.hour(), 10);
}

#[test]
fn test_parse_now_plain_date_is_end_of_day() {
    let parsed = commands::parse_now(Some("2026-03-18")).unwrap();
    assert_eq!(parsed.day(), 18);
    assert_eq!(parsed.hour(), 23);
    assert_eq!(parsed.minute(), 59);
}

#[test]
fn test_parse_now_rejects_garbage() {
    assert!(commands::parse_now(Some("yesterday")).is_err());
}

#[test]
fn test_parse_now_defaults_to_current_time() {
    let before = Utc::now();
    let parsed = commands::parse_now(None).unwrap();
    assert!(parsed >= before);
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer string", 10), "a much ...");
}

#[test]
fn test_load_snapshot_missing_file() {
    let result = commands::load_snapshot(std::path::Path::new("/nonexistent/events.json"));
    assert!(result.is_err());
}

#[test]
fn test_load_config_explicit_path() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[warnings]\nboundary_testing_min = 5").unwrap();
    let config = commands::load_config(Some(file.path())).unwrap();
    assert_eq!(config.warnings.boundary_testing_min, 5);
    assert_eq!(config.insights, AnalyticsConfig::default().insights);
}

// ========== Command Tests ==========

#[tokio::test]
async fn test_cmd_analyze_all_relationships() {
    let file = snapshot_file();
    let result =
        commands::cmd_analyze(AnalyticsConfig::default(), file.path(), now(), None, None, false)
            .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_analyze_single_relationship_json() {
    let file = snapshot_file();
    let result = commands::cmd_analyze(
        AnalyticsConfig::default(),
        file.path(),
        now(),
        Some("alex"),
        Some("a3"),
        true,
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_analyze_unknown_relationship() {
    let file = snapshot_file();
    let result = commands::cmd_analyze(
        AnalyticsConfig::default(),
        file.path(),
        now(),
        Some("nobody"),
        None,
        false,
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_analyze_score_from_other_relationship() {
    let file = snapshot_file();
    let result = commands::cmd_analyze(
        AnalyticsConfig::default(),
        file.path(),
        now(),
        Some("sam"),
        Some("a3"),
        false,
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_analyze_unknown_interaction() {
    let file = snapshot_file();
    let result = commands::cmd_analyze(
        AnalyticsConfig::default(),
        file.path(),
        now(),
        None,
        Some("missing"),
        false,
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_parallel_analysis_matches_sequential() {
    let snapshot = SnapshotFile::from_json_str(SNAPSHOT).unwrap();
    let request =
        AnalyticsRequest::new(snapshot.events, now()).with_baseline(snapshot.baseline);
    let analyzer = Arc::new(Analyzer::default());

    let parallel = commands::analyze_relationships(Arc::clone(&analyzer), &request)
        .await
        .unwrap();
    let sequential: Vec<_> = analyzer
        .compute_by_relationship(&request)
        .into_values()
        .collect();

    assert_eq!(parallel.len(), 2);
    assert_eq!(parallel, sequential);
    assert_eq!(parallel[0].scope, "alex");
    assert_eq!(parallel[1].scope, "sam");
}

#[test]
fn test_evaluate_warnings_for_planned_visit() {
    let file = snapshot_file();
    let context = SituationalContext {
        planned_location: Some("Home".to_string()),
        planned_topic: Some("money".to_string()),
        relationship_id: Some("alex".to_string()),
    };
    let assessment = commands::evaluate_warnings(
        &AnalyticsConfig::default(),
        file.path(),
        &context,
        Vec::new(),
        now(),
    )
    .unwrap();

    assert!(!assessment.is_clear());
    let kinds: Vec<&str> = assessment.alerts().iter().map(|a| a.kind.as_str()).collect();
    assert!(kinds.contains(&"boundary_testing"));
    assert!(kinds.contains(&"context_match"));
    assert!(kinds.contains(&"topic_match"));
    assert!(kinds.contains(&"communication_pattern"));
}

#[test]
fn test_evaluate_warnings_dismissed() {
    let file = snapshot_file();
    let context = SituationalContext {
        relationship_id: Some("alex".to_string()),
        ..Default::default()
    };
    let config = AnalyticsConfig::default();
    let first =
        commands::evaluate_warnings(&config, file.path(), &context, Vec::new(), now()).unwrap();
    let ids: Vec<String> = first.alerts().iter().map(|a| a.id.clone()).collect();

    let second = commands::evaluate_warnings(&config, file.path(), &context, ids, now()).unwrap();
    assert!(second.is_clear());
}

#[test]
fn test_cmd_warnings_prints() {
    let file = snapshot_file();
    let result = commands::cmd_warnings(
        &AnalyticsConfig::default(),
        file.path(),
        SituationalContext::default(),
        Vec::new(),
        now(),
        false,
    );
    assert!(result.is_ok());
}

#[test]
fn test_cmd_triggers() {
    let file = snapshot_file();
    assert!(commands::cmd_triggers(&AnalyticsConfig::default(), file.path(), false).is_ok());
    assert!(commands::cmd_triggers(&AnalyticsConfig::default(), file.path(), true).is_ok());
}

#[test]
fn test_cmd_config() {
    assert!(commands::cmd_config(&AnalyticsConfig::default(), None).is_ok());
}
