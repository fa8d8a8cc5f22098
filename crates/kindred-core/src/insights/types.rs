//! Core types for the Insight Generator

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::Severity;

use super::detectors::Detector;

/// Kind of pattern an insight describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    /// A recurring behavior over time
    Trend,
    /// Something getting worse that needs attention
    Warning,
    /// A repeating red/green/red swing
    Cycle,
    /// Things getting better
    Improvement,
    /// A situation that reliably precedes red flags
    Trigger,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::Trend => "trend",
            InsightType::Warning => "warning",
            InsightType::Cycle => "cycle",
            InsightType::Improvement => "improvement",
            InsightType::Trigger => "trigger",
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trend" => Ok(InsightType::Trend),
            "warning" => Ok(InsightType::Warning),
            "cycle" => Ok(InsightType::Cycle),
            "improvement" => Ok(InsightType::Improvement),
            "trigger" => Ok(InsightType::Trigger),
            _ => Err(format!("Unknown insight type: {}", s)),
        }
    }
}

/// A detected behavioral pattern, regenerated on every evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInsight {
    /// Stable key, e.g. "escalation:alex"
    pub id: String,
    pub detector: Detector,
    pub insight_type: InsightType,
    pub severity: Severity,
    /// 0-100
    pub confidence: u8,
    pub title: String,
    pub description: String,
    pub recommendations: Vec<String>,
    pub supporting_data: Vec<String>,
}

impl PatternInsight {
    pub fn new(
        detector: Detector,
        scope: &str,
        insight_type: InsightType,
        severity: Severity,
        confidence: u8,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("{}:{}", detector.as_str(), scope),
            detector,
            insight_type,
            severity,
            confidence: confidence.min(100),
            title: title.into(),
            description: description.into(),
            recommendations: Vec::new(),
            supporting_data: Vec::new(),
        }
    }

    pub fn with_recommendations<I, S>(mut self, recommendations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recommendations = recommendations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_supporting_data<I, S>(mut self, data: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supporting_data = data.into_iter().map(Into::into).collect();
        self
    }

    /// Sort priority; improvements rank alongside low severity
    pub fn rank(&self) -> u8 {
        match self.insight_type {
            InsightType::Improvement => Severity::Low.priority(),
            _ => self.severity.priority(),
        }
    }
}

/// Severity first (highest first), then confidence; ties keep their order
pub fn sort_insights(insights: &mut [PatternInsight]) {
    insights.sort_by(|a, b| {
        b.rank()
            .cmp(&a.rank())
            .then_with(|| b.confidence.cmp(&a.confidence))
    });
}
