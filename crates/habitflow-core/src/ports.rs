//! Dependency ports for the engine.
//!
//! The engine owns no I/O: wall-clock time, the habit/progress snapshot,
//! timer scheduling, notification display, and event persistence all sit
//! behind these traits and are injected by the application layer. A
//! tokio-backed scheduler is provided; everything else is host-specific.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::badges::UserBadge;
use crate::compassion::CompassionEvent;
use crate::error::ScheduleError;
use crate::habit::{Habit, Progress};
use crate::recovery::RecoverySession;
use crate::reminder::ReminderRecommendation;

/// Wall-clock source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Read-only habit/progress snapshot provider.
pub trait ProgressStore: Send + Sync {
    fn habits(&self) -> Vec<Habit>;
    fn progress_for(&self, habit_id: &str) -> Option<Progress>;
}

/// Sink for reminders the user should see.
///
/// Permission handling, rendering, and click-through routing live behind
/// this port.
pub trait NotificationDispatcher: Send + Sync {
    /// Ask the host for notification permission. `false` leaves the
    /// engine inert.
    fn ensure_permission(&self) -> bool;
    fn dispatch(&self, reminder: &ReminderRecommendation);
}

/// Sink for serializable engine records (persistence, sync, telemetry).
pub trait EventSink: Send + Sync {
    fn compassion_event(&self, _event: &CompassionEvent) {}
    fn session_started(&self, _session: &RecoverySession) {}
    fn session_completed(&self, _session: &RecoverySession) {}
    fn badge_earned(&self, _badge: &UserBadge) {}
    fn trend_report(&self, _trend: &crate::analytics::TrendData) {}
}

/// Event sink that discards everything.
pub struct NullEventSink;

impl EventSink for NullEventSink {}

/// Opaque handle to a scheduled reminder timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReminderHandle(pub u64);

/// Timer scheduling port.
///
/// `schedule` registers a one-shot timer that delivers the reminder to
/// the dispatcher after `delay`; `cancel` must be effective even while
/// the timer is mid-flight.
pub trait Scheduler: Send + Sync {
    fn schedule(
        &self,
        habit_id: &str,
        delay: Duration,
        reminder: ReminderRecommendation,
    ) -> Result<ReminderHandle, ScheduleError>;

    fn cancel(&self, handle: ReminderHandle);
}

/// Tokio-backed scheduler: one spawned sleep per reminder, aborted on
/// cancel. Must be used from within a tokio runtime.
pub struct TokioScheduler {
    dispatcher: Arc<dyn NotificationDispatcher>,
    tasks: Mutex<HashMap<u64, tokio::task::JoinHandle<()>>>,
    next_id: AtomicU64,
}

impl TokioScheduler {
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            dispatcher,
            tasks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, HashMap<u64, tokio::task::JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(
        &self,
        habit_id: &str,
        delay: Duration,
        reminder: ReminderRecommendation,
    ) -> Result<ReminderHandle, ScheduleError> {
        let delay = delay.to_std().map_err(|_| ScheduleError::RegisterFailed {
            habit_id: habit_id.to_string(),
            message: "non-positive delay".to_string(),
        })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let dispatcher = Arc::clone(&self.dispatcher);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            dispatcher.dispatch(&reminder);
        });
        self.tasks().insert(id, task);
        Ok(ReminderHandle(id))
    }

    fn cancel(&self, handle: ReminderHandle) {
        if let Some(task) = self.tasks().remove(&handle.0) {
            task.abort();
        }
    }
}
