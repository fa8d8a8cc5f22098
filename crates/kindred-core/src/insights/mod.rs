//! Insight Generator - behavioral patterns over recent interactions
//!
//! Rather than waiting for the user to notice what keeps happening, the
//! generator runs a fixed battery of detectors over the last two weeks of
//! interactions and surfaces the patterns worth acting on.
//!
//! ## Detectors
//!
//! - **Escalation** - red flags rising week over week
//! - **Communication Pattern** - repeated red flags about communication
//! - **Energy Drain** - most interactions leave the user depleted
//! - **Positive Trend** - green flags outnumber red flags
//! - **Context Trigger** - red flags cluster in one social setting
//! - **Behavioral Cycle** - repeated red, green, red swings
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kindred_core::insights::InsightEngine;
//!
//! let engine = InsightEngine::new(config.insights.clone());
//! let insights = engine.generate(&snapshot.interactions, Utc::now(), "alex");
//! ```

pub mod detectors;
pub mod engine;
pub mod types;

pub use detectors::{
    count_cycles, count_red_in_category, escalation_counts, ContextBreakdown, Detector,
    DetectorContext, SocialContext,
};
pub use engine::InsightEngine;
pub use types::{sort_insights, InsightType, PatternInsight};
