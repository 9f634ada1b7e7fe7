//! Trend analytics over completion windows.
//!
//! Compares the current window against the immediately preceding window
//! of equal length and scans the completion-date set for streak runs and
//! miss gaps. All computations are pure functions of the progress
//! snapshot and the supplied clock instant.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::habit::Progress;

/// Reporting period for trend analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendPeriod {
    Week,
    Month,
    Quarter,
}

impl TrendPeriod {
    /// Window length in calendar days.
    pub fn days(&self) -> i64 {
        match self {
            TrendPeriod::Week => 7,
            TrendPeriod::Month => 30,
            TrendPeriod::Quarter => 90,
        }
    }
}

/// Direction of completion-rate change between two equal windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

/// Windowed trend report for one habit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendData {
    pub habit_id: String,
    pub period: TrendPeriod,
    /// Percent of window days completed, 0-100
    pub completion_rate: f64,
    pub completed_days: u32,
    pub total_days: u32,
    pub trend: TrendDirection,
    /// Change vs the preceding window, percent
    pub trend_percentage: f64,
    /// Regularity measure, 0-100
    pub consistency_score: f64,
    pub longest_streak: u32,
    /// Number of maximal consecutive-day runs in the window
    pub total_streaks: u32,
    /// Mean day-distance between consecutive missed days in the window
    pub average_gap_between_misses: f64,
}

/// Trend analyzer.
pub struct TrendAnalyzer;

impl TrendAnalyzer {
    /// Compute the trend report for a habit over `period`, ending at `now`.
    pub fn analyze(progress: &Progress, period: TrendPeriod, now: DateTime<Utc>) -> TrendData {
        let days = period.days();
        let end = now.date_naive();
        let cur_start = end - chrono::Duration::days(days - 1);
        let prev_end = cur_start - chrono::Duration::days(1);
        let prev_start = prev_end - chrono::Duration::days(days - 1);

        let all_dates = progress.completed_dates();
        let current: Vec<NaiveDate> = all_dates
            .iter()
            .copied()
            .filter(|d| *d >= cur_start && *d <= end)
            .collect();
        let previous_count = all_dates
            .iter()
            .filter(|d| **d >= prev_start && **d <= prev_end)
            .count() as u32;

        let completed_days = current.len() as u32;
        let completion_rate = completed_days as f64 / days as f64 * 100.0;

        let trend = match completed_days.cmp(&previous_count) {
            std::cmp::Ordering::Greater => TrendDirection::Improving,
            std::cmp::Ordering::Less => TrendDirection::Declining,
            std::cmp::Ordering::Equal => TrendDirection::Stable,
        };
        let trend_percentage = (completed_days as f64 - previous_count as f64)
            / previous_count.max(1) as f64
            * 100.0;

        let (longest_streak, total_streaks) = streak_runs(&current);
        let average_gap_between_misses = average_miss_gap(&current, cur_start, end);

        // Monotone in both completion rate and streak length.
        let streak_regularity = longest_streak as f64 / days as f64 * 100.0;
        let consistency_score =
            (0.7 * completion_rate + 0.3 * streak_regularity).clamp(0.0, 100.0);

        TrendData {
            habit_id: progress.habit_id.clone(),
            period,
            completion_rate,
            completed_days,
            total_days: days as u32,
            trend,
            trend_percentage,
            consistency_score,
            longest_streak,
            total_streaks,
            average_gap_between_misses,
        }
    }
}

/// Scan sorted completion dates for maximal consecutive-day runs.
///
/// Returns (longest run, number of runs).
fn streak_runs(dates: &[NaiveDate]) -> (u32, u32) {
    if dates.is_empty() {
        return (0, 0);
    }

    let mut longest = 1u32;
    let mut current = 1u32;
    let mut runs = 1u32;
    for pair in dates.windows(2) {
        if (pair[1] - pair[0]).num_days() == 1 {
            current += 1;
            longest = longest.max(current);
        } else {
            runs += 1;
            current = 1;
        }
    }
    (longest, runs)
}

/// Mean calendar-day distance between consecutive missed days in the window.
///
/// Fewer than two missed days means no gap exists to average; returns 0.
fn average_miss_gap(completed: &[NaiveDate], start: NaiveDate, end: NaiveDate) -> f64 {
    let mut missed = Vec::new();
    let mut day = start;
    while day <= end {
        if completed.binary_search(&day).is_err() {
            missed.push(day);
        }
        day += chrono::Duration::days(1);
    }

    if missed.len() < 2 {
        return 0.0;
    }

    let total: i64 = missed.windows(2).map(|p| (p[1] - p[0]).num_days()).sum();
    total as f64 / (missed.len() - 1) as f64
}
