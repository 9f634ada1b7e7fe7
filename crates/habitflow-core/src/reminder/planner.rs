//! Context-aware reminder planning.
//!
//! Dispatches on the habit's frequency descriptor:
//! - daily: slot-based instants shaped by the user's completion pattern
//! - weekly: remaining-sessions pressure against the days left in the week
//! - periodic: due-date projection with interval-specific advance notice
//!
//! Planning is pure; the service layer owns timers and dispatch.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use tracing::debug;

use super::{ReminderKind, ReminderPriority, ReminderRecommendation};
use crate::habit::{at_hour, days_since_week_start, Habit, HabitFrequency, Progress, TimeSlot};
use crate::pattern::{analyze_completions, CompletionPattern, PATTERN_WINDOW};

/// Planner tunables.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Consistency score below which reminders move earlier
    pub early_nudge_threshold: f64,
    /// Minutes to move a reminder earlier for inconsistent users
    pub early_nudge_minutes: i64,
    /// Hour of day for weekly reminders
    pub weekly_hour: u32,
    /// Hour from which an uncompleted daily habit warrants an urgent ping
    pub evening_urgent_hour: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            early_nudge_threshold: 0.5,
            early_nudge_minutes: 30,
            weekly_hour: 10,
            evening_urgent_hour: 18,
        }
    }
}

/// Per-habit reminder planner.
pub struct ReminderPlanner {
    config: PlannerConfig,
}

impl ReminderPlanner {
    /// Create a planner with default config.
    pub fn new() -> Self {
        Self {
            config: PlannerConfig::default(),
        }
    }

    /// Create with custom config.
    pub fn with_config(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Compute reminder candidates for one habit.
    ///
    /// Missing frequency sub-configuration (zero weekly sessions, zero
    /// interval count) yields an empty plan, never an error.
    pub fn plan(
        &self,
        habit: &Habit,
        progress: &Progress,
        now: DateTime<Utc>,
    ) -> Vec<ReminderRecommendation> {
        match &habit.frequency {
            HabitFrequency::Daily => self.plan_daily(habit, progress, now),
            HabitFrequency::Weekly {
                sessions_per_week,
                preferred_days,
            } => self.plan_weekly(habit, progress, now, *sessions_per_week, preferred_days),
            HabitFrequency::Periodic {
                interval,
                interval_count,
            } => self.plan_periodic(habit, progress, now, *interval, *interval_count),
        }
    }

    // ── Daily ────────────────────────────────────────────────────────

    fn plan_daily(
        &self,
        habit: &Habit,
        progress: &Progress,
        now: DateTime<Utc>,
    ) -> Vec<ReminderRecommendation> {
        if progress.completed_on(now.date_naive()) {
            return Vec::new();
        }

        let pattern = analyze_completions(progress.recent_completions(PATTERN_WINDOW));
        let priority = self.daily_priority(now.hour());
        let mut reminders = Vec::new();

        for slot in habit.planning_slots() {
            let Some(timing) = self.daily_slot_instant(&slot, &pattern, progress, now) else {
                continue;
            };
            reminders.push(ReminderRecommendation {
                habit_id: habit.id.clone(),
                kind: ReminderKind::Daily,
                priority,
                timing,
                message: format!("Time for '{}' ({})", habit.name, slot.display_name()),
                reason: format!("{} slot reminder", slot.display_name()),
            });
        }

        // Late in the day with nothing logged: one catch-up ping at `now`.
        if now.hour() >= self.config.evening_urgent_hour {
            reminders.push(ReminderRecommendation {
                habit_id: habit.id.clone(),
                kind: ReminderKind::Urgent,
                priority: ReminderPriority::High,
                timing: now,
                message: format!("'{}' is still open today", habit.name),
                reason: "No completion logged by evening".to_string(),
            });
        }

        reminders
    }

    /// Target instant for one slot: the slot's fixed hour (or the user's
    /// rounded average hour for flexible slots), rolled to the next day
    /// when already past, then nudged earlier for users with an
    /// inconsistent history.
    fn daily_slot_instant(
        &self,
        slot: &TimeSlot,
        pattern: &CompletionPattern,
        progress: &Progress,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let hour = slot.default_hour().unwrap_or_else(|| pattern.rounded_hour());
        let mut timing = at_hour(now, hour)?;
        if timing <= now {
            timing += Duration::days(1);
        }
        // Cold-start histories stay at the slot hour; the nudge only
        // applies once there is a history to be inconsistent about.
        if !progress.completions.is_empty()
            && pattern.consistency_score < self.config.early_nudge_threshold
        {
            timing -= Duration::minutes(self.config.early_nudge_minutes);
        }
        Some(timing)
    }

    fn daily_priority(&self, now_hour: u32) -> ReminderPriority {
        if now_hour < 12 {
            ReminderPriority::Medium
        } else {
            ReminderPriority::High
        }
    }

    // ── Weekly ───────────────────────────────────────────────────────

    fn plan_weekly(
        &self,
        habit: &Habit,
        progress: &Progress,
        now: DateTime<Utc>,
        sessions_per_week: u32,
        preferred_days: &[Weekday],
    ) -> Vec<ReminderRecommendation> {
        if sessions_per_week == 0 {
            debug!(habit = %habit.id, "weekly habit without a session target, skipping");
            return Vec::new();
        }

        let completed = progress.completed_this_week(now);
        let remaining = sessions_per_week.saturating_sub(completed);
        if remaining == 0 {
            return Vec::new();
        }

        let days_remaining = (7 - days_since_week_start(now.date_naive())).max(1);
        let ratio = remaining as f64 / days_remaining as f64;
        let priority = if ratio >= 2.0 {
            ReminderPriority::Critical
        } else if ratio >= 1.5 {
            ReminderPriority::High
        } else if ratio >= 1.0 {
            ReminderPriority::Medium
        } else {
            ReminderPriority::Low
        };

        let instants = if preferred_days.is_empty() {
            self.spread_instants(now, remaining, days_remaining)
        } else {
            preferred_days
                .iter()
                .filter_map(|wd| self.next_weekday_instant(now, *wd))
                .collect()
        };

        instants
            .into_iter()
            .filter(|t| *t > now)
            .map(|timing| ReminderRecommendation {
                habit_id: habit.id.clone(),
                kind: ReminderKind::Weekly,
                priority,
                timing,
                message: format!(
                    "{} session{} of '{}' left this week",
                    remaining,
                    if remaining == 1 { "" } else { "s" },
                    habit.name
                ),
                reason: format!("{} sessions across {} remaining days", remaining, days_remaining),
            })
            .collect()
    }

    /// Evenly space `remaining` instants across the days left in the week.
    fn spread_instants(
        &self,
        now: DateTime<Utc>,
        remaining: u32,
        days_remaining: i64,
    ) -> Vec<DateTime<Utc>> {
        (0..remaining as i64)
            .filter_map(|i| {
                let offset = i * days_remaining / remaining as i64;
                at_hour(now + Duration::days(offset), self.config.weekly_hour)
            })
            .collect()
    }

    /// Next occurrence of `weekday` at the weekly reminder hour
    /// (today counts when the hour is still ahead).
    fn next_weekday_instant(&self, now: DateTime<Utc>, weekday: Weekday) -> Option<DateTime<Utc>> {
        let today = now.weekday().num_days_from_monday() as i64;
        let target = weekday.num_days_from_monday() as i64;
        let offset = (target - today).rem_euclid(7);
        let mut instant = at_hour(now + Duration::days(offset), self.config.weekly_hour)?;
        if instant <= now {
            instant += Duration::weeks(1);
        }
        Some(instant)
    }

    // ── Periodic ─────────────────────────────────────────────────────

    fn plan_periodic(
        &self,
        habit: &Habit,
        progress: &Progress,
        now: DateTime<Utc>,
        interval: crate::habit::PeriodicInterval,
        interval_count: u32,
    ) -> Vec<ReminderRecommendation> {
        if interval_count == 0 {
            debug!(habit = %habit.id, "periodic habit without an interval count, skipping");
            return Vec::new();
        }

        let next_due = progress
            .last_completion()
            .map(|last| interval.advance(last, interval_count))
            .unwrap_or(now);

        if next_due <= now {
            let overdue = next_due < now;
            let priority = if overdue {
                ReminderPriority::Critical
            } else {
                ReminderPriority::High
            };
            return vec![ReminderRecommendation {
                habit_id: habit.id.clone(),
                kind: ReminderKind::Periodic,
                priority,
                timing: now,
                message: if overdue {
                    format!(
                        "'{}' is {} days past due",
                        habit.name,
                        (now - next_due).num_days().max(1)
                    )
                } else {
                    format!("'{}' is due", habit.name)
                },
                reason: "Interval elapsed since last completion".to_string(),
            }];
        }

        // Not yet due: advance notice only when it lands within the
        // next 24 hours.
        let advance_at = next_due - interval.advance_notice();
        if advance_at > now && advance_at <= now + Duration::hours(24) {
            return vec![ReminderRecommendation {
                habit_id: habit.id.clone(),
                kind: ReminderKind::Periodic,
                priority: ReminderPriority::Medium,
                timing: advance_at,
                message: format!(
                    "'{}' is coming up on {}",
                    habit.name,
                    next_due.format("%b %e")
                ),
                reason: "Advance notice before due date".to_string(),
            }];
        }

        Vec::new()
    }
}

impl Default for ReminderPlanner {
    fn default() -> Self {
        Self::new()
    }
}
