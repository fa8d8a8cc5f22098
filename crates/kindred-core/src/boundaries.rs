//! Boundary response patterns
//!
//! How the other person tends to react when the user sets a limit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{BoundaryEvent, BoundaryReaction};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundarySummary {
    pub total: usize,
    /// Count per reaction, every reaction present
    pub reactions: BTreeMap<BoundaryReaction, usize>,
    /// Accepted or respected, as a percentage of all boundary events
    pub respect_rate: f64,
    pub negative_reactions: usize,
    pub silent_treatment: usize,
    pub most_common_reaction: Option<BoundaryReaction>,
    pub by_category: BTreeMap<String, usize>,
}

pub fn summarize_boundaries(events: &[BoundaryEvent]) -> BoundarySummary {
    let mut reactions: BTreeMap<BoundaryReaction, usize> = BoundaryReaction::all()
        .iter()
        .map(|r| (*r, 0))
        .collect();
    let mut by_category: BTreeMap<String, usize> = BTreeMap::new();

    for event in events {
        *reactions.entry(event.reaction).or_insert(0) += 1;
        *by_category.entry(event.category.trim().to_string()).or_insert(0) += 1;
    }

    let total = events.len();
    let respected: usize = reactions
        .iter()
        .filter(|(r, _)| r.is_respectful())
        .map(|(_, n)| n)
        .sum();
    let negative_reactions = reactions
        .iter()
        .filter(|(r, _)| r.is_negative())
        .map(|(_, n)| n)
        .sum();
    let respect_rate = if total == 0 {
        0.0
    } else {
        100.0 * respected as f64 / total as f64
    };

    // First reaction in declaration order wins ties
    let most_common_reaction = BoundaryReaction::all()
        .iter()
        .filter_map(|r| reactions.get(r).map(|n| (*r, *n)))
        .filter(|(_, n)| *n > 0)
        .fold(None::<(BoundaryReaction, usize)>, |best, (r, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((r, n)),
        })
        .map(|(r, _)| r);

    BoundarySummary {
        total,
        silent_treatment: reactions
            .get(&BoundaryReaction::SilentTreatment)
            .copied()
            .unwrap_or(0),
        reactions,
        respect_rate,
        negative_reactions,
        most_common_reaction,
        by_category,
    }
}
