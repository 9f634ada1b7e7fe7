//! Compassion trigger detection.
//!
//! Classifies consecutive-miss patterns into supportive-message triggers.
//! The classifier itself is a pure function of the miss count; the miss
//! count is computed by scanning backward from today over the days the
//! habit's frequency actually applies to.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::habit::{Habit, HabitFrequency, Progress};

/// Which supportive message a trigger maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompassionMessageId {
    FirstMiss,
    SecondConsecutive,
    ThirdConsecutive,
}

/// Severity of a missed-habit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// How soon the supportive message should reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Immediate,
    Within24h,
    WithinWeek,
}

/// Outcome of a compassion check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompassionTriggerResult {
    pub should_trigger: bool,
    pub message_id: Option<CompassionMessageId>,
    pub severity: Severity,
    pub urgency: Urgency,
    pub follow_up_needed: bool,
    /// Human-readable factors that led to the decision
    pub context_factors: Vec<String>,
}

impl CompassionTriggerResult {
    fn none() -> Self {
        Self {
            should_trigger: false,
            message_id: None,
            severity: Severity::Low,
            urgency: Urgency::WithinWeek,
            follow_up_needed: false,
            context_factors: Vec::new(),
        }
    }
}

/// How the user responded to a shown message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserResponse {
    Accepted,
    Dismissed,
    Snoozed,
}

/// Append-only log entry for a shown compassion message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompassionEvent {
    pub habit_id: String,
    pub trigger_condition: CompassionMessageId,
    pub message_shown: String,
    #[serde(default)]
    pub user_response: Option<UserResponse>,
    #[serde(default)]
    pub time_to_response_secs: Option<u64>,
    pub follow_up_needed: bool,
    pub at: DateTime<Utc>,
}

/// Detector configuration.
#[derive(Debug, Clone)]
pub struct CompassionConfig {
    /// Master switch; disabled means no trigger ever fires
    pub enabled: bool,
    /// How far back the miss scan looks
    pub scan_horizon_days: i64,
}

impl Default for CompassionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_horizon_days: 30,
        }
    }
}

/// Consecutive-miss classifier.
pub struct CompassionDetector {
    config: CompassionConfig,
}

impl CompassionDetector {
    /// Create a detector with default config.
    pub fn new() -> Self {
        Self {
            config: CompassionConfig::default(),
        }
    }

    /// Create with custom config.
    pub fn with_config(config: CompassionConfig) -> Self {
        Self { config }
    }

    /// Run the compassion check for one habit.
    pub fn check(
        &self,
        habit: &Habit,
        progress: &Progress,
        now: DateTime<Utc>,
    ) -> CompassionTriggerResult {
        if !self.config.enabled {
            return CompassionTriggerResult::none();
        }
        let misses = self.consecutive_misses(habit, progress, now);
        classify(misses)
    }

    /// Count consecutive applicable missed days, scanning backward from
    /// today (inclusive).
    pub fn consecutive_misses(
        &self,
        habit: &Habit,
        progress: &Progress,
        now: DateTime<Utc>,
    ) -> u32 {
        let today = now.date_naive();
        let mut misses = 0u32;

        for offset in 0..self.config.scan_horizon_days {
            let day = today - chrono::Duration::days(offset);
            if !applies_on(habit, progress, day) {
                continue;
            }
            if progress.completed_on(day) {
                break;
            }
            misses += 1;
        }
        misses
    }
}

impl Default for CompassionDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a calendar day counts toward the habit's miss streak.
///
/// Daily habits apply every day. Weekly habits apply on their preferred
/// days only (a weekly habit without preferred days has no per-day miss
/// semantics). Periodic habits apply on days strictly past the due date.
fn applies_on(habit: &Habit, progress: &Progress, day: NaiveDate) -> bool {
    match &habit.frequency {
        HabitFrequency::Daily => true,
        HabitFrequency::Weekly { preferred_days, .. } => preferred_days.contains(&day.weekday()),
        HabitFrequency::Periodic {
            interval,
            interval_count,
        } => match progress.last_completion() {
            Some(last) => {
                let due = interval.advance(last, *interval_count).date_naive();
                day > due
            }
            None => false,
        },
    }
}

/// Pure classification of a consecutive-miss count.
pub fn classify(consecutive_misses: u32) -> CompassionTriggerResult {
    match consecutive_misses {
        0 => CompassionTriggerResult::none(),
        1 => CompassionTriggerResult {
            should_trigger: true,
            message_id: Some(CompassionMessageId::FirstMiss),
            severity: Severity::Low,
            urgency: Urgency::Within24h,
            follow_up_needed: false,
            context_factors: vec!["1 missed day".to_string()],
        },
        2 => CompassionTriggerResult {
            should_trigger: true,
            message_id: Some(CompassionMessageId::SecondConsecutive),
            severity: Severity::Medium,
            urgency: Urgency::Immediate,
            follow_up_needed: false,
            context_factors: vec!["2 consecutive missed days".to_string()],
        },
        n => CompassionTriggerResult {
            should_trigger: true,
            message_id: Some(CompassionMessageId::ThirdConsecutive),
            severity: Severity::High,
            urgency: Urgency::Immediate,
            follow_up_needed: true,
            context_factors: vec![format!("{} consecutive missed days", n)],
        },
    }
}

/// Supportive message copy for a trigger.
pub fn message_for(message_id: CompassionMessageId, habit_name: &str) -> String {
    match message_id {
        CompassionMessageId::FirstMiss => format!(
            "Missed '{}' yesterday? One day off changes nothing -- pick it back up today.",
            habit_name
        ),
        CompassionMessageId::SecondConsecutive => format!(
            "Two days without '{}'. A smaller version still counts -- want to try that?",
            habit_name
        ),
        CompassionMessageId::ThirdConsecutive => format!(
            "'{}' has slipped for a few days. Let's restart gently with a recovery plan.",
            habit_name
        ),
    }
}
