//! Shared command utilities
//!
//! This module contains:
//! - `load_config` - Resolve the analytics configuration
//! - `load_snapshot` - Read a snapshot JSON file
//! - `parse_now` - Parse the `--now` reference time

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use kindred_core::{AnalyticsConfig, SnapshotFile};

pub fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig> {
    AnalyticsConfig::load(path).context("Failed to load analytics config")
}

pub fn load_snapshot(path: &Path) -> Result<SnapshotFile> {
    SnapshotFile::load(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))
}

/// RFC 3339 timestamp, or a plain date meaning the end of that day (UTC)
pub fn parse_now(value: Option<&str>) -> Result<DateTime<Utc>> {
    let Some(value) = value.map(str::trim) else {
        return Ok(Utc::now());
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(end_of_day) = date.and_hms_opt(23, 59, 59) {
            return Ok(end_of_day.and_utc());
        }
    }
    bail!("Invalid --now value '{}': use RFC 3339 or YYYY-MM-DD", value)
}
