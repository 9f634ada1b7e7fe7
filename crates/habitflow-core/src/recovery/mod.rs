//! Recovery session lifecycle.
//!
//! A recovery session is a bounded five-step support program opened when
//! a habit has slipped. Sessions move `active -> completed` and never
//! leave the terminal state. The manager also keeps aggregate recovery
//! metrics (total sessions, success count, running mean recovery time).

pub mod micro;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use micro::{generate_micro_habit, MicroHabit};

/// Fixed step count of the recovery program taxonomy.
pub const TOTAL_STEPS: u32 = 5;

/// Days until the target return date of a new session.
const TARGET_RETURN_DAYS: i64 = 7;

/// Flavor of recovery program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryType {
    /// Restart from a reduced-scope micro version of the habit
    MicroRestart,
    /// Rebuild the full habit over several days
    GentleRebuild,
    /// Wipe the slate and treat the habit as new
    FreshStart,
}

impl RecoveryType {
    /// Fixed coaching-tip set shown over the session's steps.
    pub fn coaching_tips(&self) -> Vec<String> {
        let tips: &[&str] = match self {
            RecoveryType::MicroRestart => &[
                "Start with the two-minute version today",
                "Same time, same place as before",
                "Done beats perfect while momentum rebuilds",
            ],
            RecoveryType::GentleRebuild => &[
                "Aim for three days this week, not seven",
                "Stack it onto a habit that survived",
                "Review what broke the routine and remove one obstacle",
            ],
            RecoveryType::FreshStart => &[
                "Yesterday's streak is gone; today's count starts at zero and that is fine",
                "Pick the easiest slot in your day",
                "Tell someone you are restarting",
            ],
        };
        tips.iter().map(|t| t.to_string()).collect()
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryOutcome {
    Successful,
    Abandoned,
}

/// One recovery session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoverySession {
    pub id: String,
    pub habit_id: String,
    pub started_at: DateTime<Utc>,
    pub recovery_type: RecoveryType,
    /// 0..=TOTAL_STEPS
    pub current_step: u32,
    pub total_steps: u32,
    /// Monotonic: once true, never reverts
    pub completed: bool,
    /// Set when the session completes
    #[serde(default)]
    pub outcome: Option<RecoveryOutcome>,
    pub successful_days: u32,
    pub challenging_days: u32,
    pub target_return_date: DateTime<Utc>,
    pub next_milestone: String,
    pub coaching_tips: Vec<String>,
}

impl RecoverySession {
    fn new(habit_id: &str, recovery_type: RecoveryType, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            habit_id: habit_id.to_string(),
            started_at: now,
            recovery_type,
            current_step: 0,
            total_steps: TOTAL_STEPS,
            completed: false,
            outcome: None,
            successful_days: 0,
            challenging_days: 0,
            target_return_date: now + chrono::Duration::days(TARGET_RETURN_DAYS),
            next_milestone: "Complete 3 consecutive days".to_string(),
            coaching_tips: recovery_type.coaching_tips(),
        }
    }
}

/// Field-wise update for an active session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionPatch {
    pub current_step: Option<u32>,
    pub successful_days: Option<u32>,
    pub challenging_days: Option<u32>,
    pub next_milestone: Option<String>,
}

/// Aggregate recovery metrics across all sessions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoveryMetrics {
    pub total_sessions: u64,
    pub successful_recoveries: u64,
    /// Running mean of (completion - start) in days over successful sessions
    pub average_recovery_days: f64,
}

/// Recovery session store and state machine.
///
/// Mutating entry points take `&mut self`; the service layer serializes
/// access per aggregate.
#[derive(Debug, Default)]
pub struct RecoveryManager {
    sessions: HashMap<String, RecoverySession>,
    metrics: RecoveryMetrics,
}

impl RecoveryManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self, session_id: &str) -> Option<&RecoverySession> {
        self.sessions.get(session_id)
    }

    /// The habit's non-completed session, if one exists.
    pub fn active_session_for(&self, habit_id: &str) -> Option<&RecoverySession> {
        self.sessions
            .values()
            .find(|s| s.habit_id == habit_id && !s.completed)
    }

    pub fn metrics(&self) -> &RecoveryMetrics {
        &self.metrics
    }

    /// Sessions completed with a successful outcome.
    pub fn successful_sessions(&self) -> Vec<RecoverySession> {
        self.sessions
            .values()
            .filter(|s| s.outcome == Some(RecoveryOutcome::Successful))
            .cloned()
            .collect()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a recovery session for a habit.
    ///
    /// At most one active session per habit: when one already exists it
    /// is returned unchanged and no new session is created.
    pub fn start(
        &mut self,
        habit_id: &str,
        recovery_type: RecoveryType,
        now: DateTime<Utc>,
    ) -> RecoverySession {
        if let Some(existing) = self.active_session_for(habit_id) {
            return existing.clone();
        }

        let session = RecoverySession::new(habit_id, recovery_type, now);
        self.metrics.total_sessions += 1;
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Merge a patch into an active session.
    ///
    /// Unknown ids and completed sessions are no-ops; `current_step` is
    /// clamped to `total_steps`.
    pub fn update(&mut self, session_id: &str, patch: SessionPatch) -> Option<RecoverySession> {
        let session = self.sessions.get_mut(session_id)?;
        if session.completed {
            return None;
        }

        if let Some(step) = patch.current_step {
            session.current_step = step.min(session.total_steps);
        }
        if let Some(days) = patch.successful_days {
            session.successful_days = days;
        }
        if let Some(days) = patch.challenging_days {
            session.challenging_days = days;
        }
        if let Some(milestone) = patch.next_milestone {
            session.next_milestone = milestone;
        }
        Some(session.clone())
    }

    /// Complete a session. Terminal: later updates and completions are
    /// no-ops. A successful outcome folds the session's duration into
    /// the running mean recovery time.
    pub fn complete(
        &mut self,
        session_id: &str,
        outcome: RecoveryOutcome,
        now: DateTime<Utc>,
    ) -> Option<RecoverySession> {
        let session = self.sessions.get_mut(session_id)?;
        if session.completed {
            return None;
        }

        session.completed = true;
        session.outcome = Some(outcome);
        if outcome == RecoveryOutcome::Successful {
            let days = (now - session.started_at).num_days().max(0) as f64;
            let n = self.metrics.successful_recoveries as f64;
            self.metrics.average_recovery_days =
                (self.metrics.average_recovery_days * n + days) / (n + 1.0);
            self.metrics.successful_recoveries += 1;
        }
        Some(session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_start_creates_five_step_session() {
        let mut manager = RecoveryManager::new();
        let session = manager.start("h1", RecoveryType::MicroRestart, ts(1));

        assert_eq!(session.current_step, 0);
        assert_eq!(session.total_steps, TOTAL_STEPS);
        assert!(!session.completed);
        assert_eq!(session.target_return_date, ts(8));
        assert_eq!(session.next_milestone, "Complete 3 consecutive days");
        assert!(!session.coaching_tips.is_empty());
        assert_eq!(manager.metrics().total_sessions, 1);
    }

    #[test]
    fn test_second_start_returns_existing_active_session() {
        let mut manager = RecoveryManager::new();
        let first = manager.start("h1", RecoveryType::MicroRestart, ts(1));
        let second = manager.start("h1", RecoveryType::FreshStart, ts(2));

        assert_eq!(first.id, second.id, "active session is returned, not replaced");
        assert_eq!(second.recovery_type, RecoveryType::MicroRestart);
        assert_eq!(manager.metrics().total_sessions, 1);
    }

    #[test]
    fn test_start_after_completion_opens_new_session() {
        let mut manager = RecoveryManager::new();
        let first = manager.start("h1", RecoveryType::MicroRestart, ts(1));
        manager.complete(&first.id, RecoveryOutcome::Abandoned, ts(3));

        let second = manager.start("h1", RecoveryType::GentleRebuild, ts(4));
        assert_ne!(first.id, second.id);
        assert_eq!(manager.metrics().total_sessions, 2);
    }

    #[test]
    fn test_update_clamps_step_to_total() {
        let mut manager = RecoveryManager::new();
        let session = manager.start("h1", RecoveryType::MicroRestart, ts(1));

        let updated = manager
            .update(
                &session.id,
                SessionPatch {
                    current_step: Some(99),
                    ..Default::default()
                },
            )
            .expect("active session accepts updates");
        assert_eq!(updated.current_step, TOTAL_STEPS);
    }

    #[test]
    fn test_unknown_session_is_noop() {
        let mut manager = RecoveryManager::new();
        assert!(manager.update("nope", SessionPatch::default()).is_none());
        assert!(manager
            .complete("nope", RecoveryOutcome::Successful, ts(1))
            .is_none());
        assert_eq!(manager.metrics().successful_recoveries, 0);
    }

    #[test]
    fn test_completed_is_terminal() {
        let mut manager = RecoveryManager::new();
        let session = manager.start("h1", RecoveryType::MicroRestart, ts(1));
        manager.complete(&session.id, RecoveryOutcome::Successful, ts(5));

        // Second completion and further updates are no-ops
        assert!(manager
            .complete(&session.id, RecoveryOutcome::Successful, ts(9))
            .is_none());
        assert!(manager
            .update(
                &session.id,
                SessionPatch {
                    current_step: Some(1),
                    ..Default::default()
                }
            )
            .is_none());
        assert!(manager.session(&session.id).unwrap().completed);
        assert_eq!(manager.metrics().successful_recoveries, 1);
    }

    #[test]
    fn test_average_recovery_days_running_mean() {
        let mut manager = RecoveryManager::new();
        let a = manager.start("h1", RecoveryType::MicroRestart, ts(1));
        manager.complete(&a.id, RecoveryOutcome::Successful, ts(5)); // 4 days

        let b = manager.start("h2", RecoveryType::MicroRestart, ts(1));
        manager.complete(&b.id, RecoveryOutcome::Successful, ts(9)); // 8 days

        let c = manager.start("h3", RecoveryType::MicroRestart, ts(1));
        manager.complete(&c.id, RecoveryOutcome::Abandoned, ts(20)); // excluded

        let metrics = manager.metrics();
        assert_eq!(metrics.successful_recoveries, 2);
        assert_eq!(metrics.average_recovery_days, 6.0, "(4 + 8) / 2");
    }
}
