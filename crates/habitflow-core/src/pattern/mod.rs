//! Completion pattern analysis.
//!
//! Derives a habit's time-of-day preference and timing consistency from
//! its recent completion history. Pure and side-effect free: the planner
//! calls this on every pass with a fresh snapshot.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::habit::TimeSlot;

/// How many recent completions feed the analysis.
pub const PATTERN_WINDOW: usize = 7;

/// Maximum plausible hour variance (12 squared); normalizes the
/// consistency score into [0, 1].
const MAX_HOUR_VARIANCE: f64 = 144.0;

/// Derived completion pattern for one habit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionPattern {
    /// Mean completion hour of day (0-23)
    pub average_hour: f64,
    /// Timing regularity, 0.0 (erratic) to 1.0 (same hour every day)
    pub consistency_score: f64,
    /// Consecutive completion days ending at the latest completion
    pub recent_streak: u32,
    /// Preferred slots, most frequent first
    pub ranked_slots: Vec<TimeSlot>,
}

impl Default for CompletionPattern {
    /// Cold-start pattern for an empty history: 9am, zero consistency,
    /// morning preference.
    fn default() -> Self {
        Self {
            average_hour: 9.0,
            consistency_score: 0.0,
            recent_streak: 0,
            ranked_slots: vec![TimeSlot::Morning],
        }
    }
}

impl CompletionPattern {
    /// Average hour rounded to the nearest whole hour, clamped to 0-23.
    pub fn rounded_hour(&self) -> u32 {
        (self.average_hour.round().max(0.0) as u32).min(23)
    }
}

/// Analyze the last [`PATTERN_WINDOW`] completions of a habit.
///
/// Instants beyond the window are ignored by the caller contract; this
/// function trims anyway so callers can pass the full history.
pub fn analyze_completions(completions: &[DateTime<Utc>]) -> CompletionPattern {
    let start = completions.len().saturating_sub(PATTERN_WINDOW);
    let recent = &completions[start..];

    if recent.is_empty() {
        return CompletionPattern::default();
    }

    let hours: Vec<f64> = recent.iter().map(|c| c.hour() as f64).collect();
    let average_hour = hours.iter().sum::<f64>() / hours.len() as f64;

    let variance = hours
        .iter()
        .map(|h| (h - average_hour).powi(2))
        .sum::<f64>()
        / hours.len() as f64;
    let consistency_score = (1.0 - variance / MAX_HOUR_VARIANCE).clamp(0.0, 1.0);

    CompletionPattern {
        average_hour,
        consistency_score,
        recent_streak: recent_streak(recent),
        ranked_slots: rank_slots(recent),
    }
}

/// Consecutive calendar days ending at the latest completion.
fn recent_streak(completions: &[DateTime<Utc>]) -> u32 {
    let mut dates: Vec<_> = completions.iter().map(|c| c.date_naive()).collect();
    dates.sort();
    dates.dedup();

    let mut streak = 1u32;
    for pair in dates.windows(2).rev() {
        if (pair[1] - pair[0]).num_days() == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// Rank slots by completion frequency, most frequent first.
///
/// Ties break toward the earlier slot in the day so output is stable.
fn rank_slots(completions: &[DateTime<Utc>]) -> Vec<TimeSlot> {
    let mut counts: HashMap<TimeSlot, usize> = HashMap::new();
    for c in completions {
        *counts.entry(TimeSlot::from_hour(c.hour())).or_default() += 1;
    }

    let order = [
        TimeSlot::Morning,
        TimeSlot::Lunch,
        TimeSlot::Evening,
        TimeSlot::Flexible,
    ];
    let mut ranked: Vec<(TimeSlot, usize)> = order
        .into_iter()
        .filter_map(|slot| counts.get(&slot).map(|n| (slot, *n)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().map(|(slot, _)| slot).collect()
}
