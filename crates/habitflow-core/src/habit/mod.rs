//! Habit and progress data model.
//!
//! These types form the read-only snapshot the engine consumes: habit
//! definitions with their frequency descriptors, and per-habit progress
//! (completion history, streak counters, weekly sub-progress). The
//! snapshot is owned by an external progress store; nothing in this
//! module mutates it.

use chrono::{DateTime, Datelike, Months, NaiveDate, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Time-of-day slot a habit is tagged with.
///
/// Slots map to fixed hour ranges; `Flexible` means "whenever the user
/// usually does it" and defers to the pattern analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    /// 05:00-10:59
    Morning,
    /// 11:00-13:59
    Lunch,
    /// 17:00-22:59
    Evening,
    /// Any hour outside the named ranges
    Flexible,
}

impl TimeSlot {
    /// Classify an hour of day (0-23) into a slot.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=10 => TimeSlot::Morning,
            11..=13 => TimeSlot::Lunch,
            17..=22 => TimeSlot::Evening,
            _ => TimeSlot::Flexible,
        }
    }

    /// Default reminder hour for this slot.
    ///
    /// `Flexible` has no fixed hour; callers substitute the user's
    /// average completion hour.
    pub fn default_hour(&self) -> Option<u32> {
        match self {
            TimeSlot::Morning => Some(8),
            TimeSlot::Lunch => Some(12),
            TimeSlot::Evening => Some(19),
            TimeSlot::Flexible => None,
        }
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "Morning",
            TimeSlot::Lunch => "Lunch",
            TimeSlot::Evening => "Evening",
            TimeSlot::Flexible => "Flexible",
        }
    }
}

/// Broad habit category, used for micro-habit template selection
/// and badge scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitCategory {
    Mindfulness,
    Fitness,
    Nutrition,
    Sleep,
    Productivity,
    Learning,
    Other,
}

/// Interval unit for periodic habits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodicInterval {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl PeriodicInterval {
    /// Advance a due-date computation by `count` intervals.
    pub fn advance(&self, from: DateTime<Utc>, count: u32) -> DateTime<Utc> {
        match self {
            PeriodicInterval::Weekly => from + chrono::Duration::weeks(count as i64),
            PeriodicInterval::Monthly => from + Months::new(count),
            PeriodicInterval::Quarterly => from + Months::new(3 * count),
            PeriodicInterval::Yearly => from + Months::new(12 * count),
        }
    }

    /// How far ahead of the due date an advance reminder is worth sending.
    pub fn advance_notice(&self) -> chrono::Duration {
        match self {
            PeriodicInterval::Weekly => chrono::Duration::days(1),
            PeriodicInterval::Monthly => chrono::Duration::days(3),
            PeriodicInterval::Quarterly => chrono::Duration::weeks(1),
            PeriodicInterval::Yearly => chrono::Duration::weeks(2),
        }
    }
}

/// Frequency descriptor for a habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HabitFrequency {
    /// Every day.
    Daily,
    /// A target number of sessions per week, optionally pinned to weekdays.
    Weekly {
        sessions_per_week: u32,
        #[serde(default)]
        preferred_days: Vec<Weekday>,
    },
    /// Once every `interval_count` intervals (e.g. every 2 weeks).
    Periodic {
        interval: PeriodicInterval,
        interval_count: u32,
    },
}

/// A recurring user commitment.
///
/// Immutable for the duration of a planning pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub frequency: HabitFrequency,
    /// Time-of-day tags; empty means flexible.
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
    pub category: HabitCategory,
    /// Whether the habit carries a research reference (badge signal).
    #[serde(default)]
    pub research_backed: bool,
}

impl Habit {
    /// Slots to plan reminders for, falling back to `Flexible` when untagged.
    pub fn planning_slots(&self) -> Vec<TimeSlot> {
        if self.time_slots.is_empty() {
            vec![TimeSlot::Flexible]
        } else {
            self.time_slots.clone()
        }
    }
}

/// Weekly sub-progress for habits with a weekly target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklyProgress {
    /// Sessions completed in the current week (Monday-based).
    pub completed_this_week: u32,
    /// Monday of the week this counter refers to.
    pub week_start: Option<NaiveDate>,
}

/// Per-habit completion history snapshot.
///
/// `completions` is unique and ascending. Instants (not bare dates) are
/// kept because time-of-day analysis buckets by hour; calendar-day views
/// are derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub habit_id: String,
    #[serde(default)]
    pub completions: Vec<DateTime<Utc>>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_days: u32,
    #[serde(default)]
    pub weekly: Option<WeeklyProgress>,
}

impl Progress {
    /// Empty progress for a habit with no history.
    pub fn empty(habit_id: impl Into<String>) -> Self {
        Self {
            habit_id: habit_id.into(),
            completions: Vec::new(),
            current_streak: 0,
            longest_streak: 0,
            total_days: 0,
            weekly: None,
        }
    }

    /// Distinct completion days, ascending.
    pub fn completed_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.completions.iter().map(|c| c.date_naive()).collect();
        dates.dedup();
        dates
    }

    /// Whether the habit was completed on a given calendar day.
    pub fn completed_on(&self, date: NaiveDate) -> bool {
        self.completions.iter().any(|c| c.date_naive() == date)
    }

    /// Most recent completion instant, if any.
    pub fn last_completion(&self) -> Option<DateTime<Utc>> {
        self.completions.last().copied()
    }

    /// The last `n` completion instants, oldest first.
    pub fn recent_completions(&self, n: usize) -> &[DateTime<Utc>] {
        let start = self.completions.len().saturating_sub(n);
        &self.completions[start..]
    }

    /// Check the snapshot invariants: completions unique and ascending.
    ///
    /// Store implementations can call this before handing a snapshot to
    /// the engine; the engine itself tolerates unordered input but the
    /// streak and window scans assume chronological order.
    pub fn validate(&self) -> Result<(), crate::error::ValidationError> {
        for pair in self.completions.windows(2) {
            if pair[0] >= pair[1] {
                return Err(crate::error::ValidationError::UnorderedCompletions {
                    habit_id: self.habit_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Sessions completed in the week containing `now` (Monday-based).
    ///
    /// Prefers the weekly sub-progress counter when it refers to the
    /// current week; otherwise counts completion days directly.
    pub fn completed_this_week(&self, now: DateTime<Utc>) -> u32 {
        let week_start = week_start(now.date_naive());
        if let Some(weekly) = &self.weekly {
            if weekly.week_start == Some(week_start) {
                return weekly.completed_this_week;
            }
        }
        self.completed_dates()
            .iter()
            .filter(|d| **d >= week_start && **d <= now.date_naive())
            .count() as u32
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Days of the current week already elapsed (0 on Monday).
pub fn days_since_week_start(date: NaiveDate) -> i64 {
    date.weekday().num_days_from_monday() as i64
}

/// Set a `DateTime<Utc>` to an exact hour with zeroed minutes/seconds.
pub fn at_hour(day: DateTime<Utc>, hour: u32) -> Option<DateTime<Utc>> {
    day.with_hour(hour)?
        .with_minute(0)?
        .with_second(0)?
        .with_nanosecond(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_slot_from_hour() {
        assert_eq!(TimeSlot::from_hour(7), TimeSlot::Morning);
        assert_eq!(TimeSlot::from_hour(12), TimeSlot::Lunch);
        assert_eq!(TimeSlot::from_hour(20), TimeSlot::Evening);
        assert_eq!(TimeSlot::from_hour(3), TimeSlot::Flexible);
        assert_eq!(TimeSlot::from_hour(15), TimeSlot::Flexible);
    }

    #[test]
    fn test_periodic_advance() {
        let from = ts(2024, 1, 31, 9);
        assert_eq!(
            PeriodicInterval::Weekly.advance(from, 2),
            ts(2024, 2, 14, 9)
        );
        // chrono clamps month-end overflow
        assert_eq!(
            PeriodicInterval::Monthly.advance(from, 1),
            ts(2024, 2, 29, 9)
        );
        assert_eq!(
            PeriodicInterval::Yearly.advance(from, 1),
            ts(2025, 1, 31, 9)
        );
    }

    #[test]
    fn test_completed_this_week_counts_days() {
        // 2024-03-04 is a Monday
        let mut progress = Progress::empty("h1");
        progress.completions = vec![ts(2024, 3, 4, 8), ts(2024, 3, 5, 8), ts(2024, 3, 2, 8)];
        progress.completions.sort();

        let now = ts(2024, 3, 6, 12);
        assert_eq!(progress.completed_this_week(now), 2);
    }

    #[test]
    fn test_completed_this_week_prefers_weekly_counter() {
        let mut progress = Progress::empty("h1");
        progress.weekly = Some(WeeklyProgress {
            completed_this_week: 3,
            week_start: Some(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()),
        });

        let now = ts(2024, 3, 6, 12);
        assert_eq!(progress.completed_this_week(now), 3);
    }

    #[test]
    fn test_week_start_is_monday() {
        let wed = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        assert_eq!(week_start(wed), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(days_since_week_start(wed), 2);
    }

    #[test]
    fn test_validate_rejects_unordered_history() {
        let mut progress = Progress::empty("h1");
        progress.completions = vec![ts(2024, 3, 5, 8), ts(2024, 3, 4, 8)];
        assert!(progress.validate().is_err());

        progress.completions.sort();
        assert!(progress.validate().is_ok());
    }

    #[test]
    fn test_frequency_serde_tag() {
        let freq = HabitFrequency::Weekly {
            sessions_per_week: 3,
            preferred_days: vec![Weekday::Mon, Weekday::Thu],
        };
        let json = serde_json::to_string(&freq).unwrap();
        assert!(json.contains("\"type\":\"weekly\""), "got {}", json);
        let back: HabitFrequency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, freq);
    }
}
