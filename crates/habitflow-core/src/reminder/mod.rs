//! Reminder recommendation types.
//!
//! A `ReminderRecommendation` is the engine's only output toward the
//! notification dispatcher: a plain serializable record saying what to
//! surface, when, and why. Planning lives in [`planner`], cross-habit
//! ordering in [`priority`].

pub mod planner;
pub mod priority;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use planner::{PlannerConfig, ReminderPlanner};
pub use priority::merge_and_sort;

/// What kind of reminder this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Daily,
    Weekly,
    Periodic,
    /// Deliberate immediate-at-now reminder (evening catch-up, overdue)
    Urgent,
    /// Low-pressure supportive nudge from the compassion flow
    Gentle,
}

/// Reminder priority, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl ReminderPriority {
    /// Numeric rank for ordering (critical highest).
    pub fn rank(&self) -> u8 {
        match self {
            ReminderPriority::Low => 0,
            ReminderPriority::Medium => 1,
            ReminderPriority::High => 2,
            ReminderPriority::Critical => 3,
        }
    }
}

/// A reminder the dispatcher should schedule or display.
///
/// `timing` is strictly after the planning instant except for
/// [`ReminderKind::Urgent`] and overdue periodic reminders, which are
/// deliberately stamped at `now`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderRecommendation {
    pub habit_id: String,
    pub kind: ReminderKind,
    pub priority: ReminderPriority,
    pub timing: DateTime<Utc>,
    pub message: String,
    pub reason: String,
}
