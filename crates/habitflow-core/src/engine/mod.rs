//! Habit support engine service.
//!
//! Wires the pure components (planner, prioritizer, compassion detector,
//! trend analyzer, badge evaluator) to the injected ports and owns the
//! two stateful concerns that must be serialized: reminder-timer
//! bookkeeping and the recovery/badge aggregates.
//!
//! ## Lifecycle
//!
//! ```ignore
//! let engine = HabitSupportEngine::new(clock, store, scheduler, dispatcher, events);
//! if engine.initialize() {
//!     engine.schedule_all()?;
//! }
//! // On every progress mutation:
//! engine.on_progress_updated("habit-id");
//! ```

#[cfg(test)]
mod service_tests;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::analytics::{TrendAnalyzer, TrendData, TrendPeriod};
use crate::badges::{BadgeContext, BadgeEvaluator, UserBadge};
use crate::compassion::{
    message_for, CompassionConfig, CompassionDetector, CompassionEvent, CompassionTriggerResult,
    Severity, Urgency,
};
use crate::error::{Result, ScheduleError};
use crate::habit::{Habit, Progress};
use crate::ports::{Clock, EventSink, NotificationDispatcher, ProgressStore, ReminderHandle, Scheduler};
use crate::recovery::{
    generate_micro_habit, MicroHabit, RecoveryManager, RecoveryMetrics, RecoveryOutcome,
    RecoverySession, RecoveryType, SessionPatch,
};
use crate::reminder::{
    merge_and_sort, PlannerConfig, ReminderKind, ReminderPlanner, ReminderPriority,
    ReminderRecommendation,
};

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Owner of the badge/earned-award aggregate
    pub user_id: String,
    pub planner: PlannerConfig,
    pub compassion: CompassionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            planner: PlannerConfig::default(),
            compassion: CompassionConfig::default(),
        }
    }
}

/// What a progress mutation set in motion.
#[derive(Debug, Clone)]
pub struct ProgressUpdateOutcome {
    pub trigger: CompassionTriggerResult,
    /// The habit's active recovery session, when one applies
    pub session: Option<RecoverySession>,
    /// Micro-habit generated for a newly opened session
    pub micro_habit: Option<MicroHabit>,
    pub new_badges: Vec<UserBadge>,
}

/// The habit support engine.
///
/// Analytics entry points are pure over the store snapshot and callable
/// from any thread; timer bookkeeping and the recovery/badge aggregates
/// are guarded so concurrent callers serialize per aggregate.
pub struct HabitSupportEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    store: Arc<dyn ProgressStore>,
    scheduler: Arc<dyn Scheduler>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    events: Arc<dyn EventSink>,
    planner: ReminderPlanner,
    detector: CompassionDetector,
    recovery: Mutex<RecoveryManager>,
    badges: Mutex<BadgeEvaluator>,
    /// Outstanding timer handles per habit
    handles: Mutex<HashMap<String, Vec<ReminderHandle>>>,
    ready: AtomicBool,
}

impl HabitSupportEngine {
    /// Create an engine with default configuration.
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn ProgressStore>,
        scheduler: Arc<dyn Scheduler>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self::with_config(EngineConfig::default(), clock, store, scheduler, dispatcher, events)
    }

    /// Create with custom configuration.
    pub fn with_config(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn ProgressStore>,
        scheduler: Arc<dyn Scheduler>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            planner: ReminderPlanner::with_config(config.planner.clone()),
            detector: CompassionDetector::with_config(config.compassion.clone()),
            config,
            clock,
            store,
            scheduler,
            dispatcher,
            events,
            recovery: Mutex::new(RecoveryManager::new()),
            badges: Mutex::new(BadgeEvaluator::with_default_badges()),
            handles: Mutex::new(HashMap::new()),
            ready: AtomicBool::new(false),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Initialize the engine. Returns false (and stays inert) when the
    /// host refuses notification permission.
    pub fn initialize(&self) -> bool {
        if !self.dispatcher.ensure_permission() {
            warn!("notification permission denied, engine stays inert");
            return false;
        }
        self.ready.store(true, Ordering::SeqCst);
        true
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Disable the engine: releases every timer and blocks further
    /// scheduling. Effective even for timers mid-flight.
    pub fn shutdown(&self) {
        self.ready.store(false, Ordering::SeqCst);
        self.clear_all_reminders();
    }

    // ── Reminder planning & scheduling ───────────────────────────────

    /// Compute reminder candidates for one habit without scheduling.
    pub fn calculate_smart_reminders(&self, habit_id: &str) -> Vec<ReminderRecommendation> {
        let now = self.clock.now();
        let Some(habit) = self.find_habit(habit_id) else {
            return Vec::new();
        };
        let progress = self.progress_of(habit_id);
        self.planner.plan(&habit, &progress, now)
    }

    /// All pending reminders across habits: priority rank descending,
    /// instants ascending within equal priority.
    pub fn all_pending_reminders(&self) -> Vec<ReminderRecommendation> {
        let now = self.clock.now();
        let per_habit = self.store.habits().into_iter().map(|habit| {
            let progress = self.progress_of(&habit.id);
            self.planner.plan(&habit, &progress, now)
        });
        merge_and_sort(per_habit)
    }

    /// Re-plan and re-register one habit's reminder timers.
    ///
    /// All prior handles for the habit are cancelled before new ones are
    /// issued, under one lock, so no duplicate notification can fire for
    /// the same logical reminder. Candidates whose instant has already
    /// passed are dropped (logged, not retried); deliberate
    /// immediate-at-now reminders are dispatched directly.
    ///
    /// Returns the number of reminders dispatched or registered.
    pub fn schedule_reminders(&self, habit_id: &str) -> Result<usize> {
        if !self.is_ready() {
            return Err(ScheduleError::NotReady.into());
        }

        let now = self.clock.now();
        let Some(habit) = self.find_habit(habit_id) else {
            debug!(habit = habit_id, "unknown habit, nothing to schedule");
            return Ok(0);
        };
        let progress = self.progress_of(habit_id);
        let plan = self.planner.plan(&habit, &progress, now);

        let mut handles = self.handles_guard();
        for old in handles.remove(habit_id).unwrap_or_default() {
            self.scheduler.cancel(old);
        }

        let mut registered = Vec::new();
        let mut count = 0usize;
        for reminder in plan {
            if reminder.timing > now {
                match self.scheduler.schedule(habit_id, reminder.timing - now, reminder) {
                    Ok(handle) => {
                        registered.push(handle);
                        count += 1;
                    }
                    Err(e) => warn!(habit = habit_id, error = %e, "timer registration failed"),
                }
            } else if reminder.timing == now {
                self.dispatcher.dispatch(&reminder);
                count += 1;
            } else {
                warn!(habit = habit_id, timing = %reminder.timing, "dropping past-due reminder");
            }
        }
        handles.insert(habit_id.to_string(), registered);
        Ok(count)
    }

    /// Schedule reminders for every habit in the store.
    pub fn schedule_all(&self) -> Result<usize> {
        let mut total = 0;
        for habit in self.store.habits() {
            total += self.schedule_reminders(&habit.id)?;
        }
        Ok(total)
    }

    /// Release every outstanding reminder timer.
    pub fn clear_all_reminders(&self) {
        let mut handles = self.handles_guard();
        for (_, habit_handles) in handles.drain() {
            for handle in habit_handles {
                self.scheduler.cancel(handle);
            }
        }
    }

    // ── Progress mutations ───────────────────────────────────────────

    /// React to a progress mutation for one habit: compassion check,
    /// recovery activation, badge rescan.
    ///
    /// Returns `None` for unknown habits.
    pub fn on_progress_updated(&self, habit_id: &str) -> Option<ProgressUpdateOutcome> {
        let now = self.clock.now();
        let habit = self.find_habit(habit_id)?;
        let progress = self.progress_of(habit_id);

        let trigger = self.detector.check(&habit, &progress, now);
        let mut session = None;
        let mut micro_habit = None;

        if trigger.should_trigger {
            if let Some(message_id) = trigger.message_id {
                let message = message_for(message_id, &habit.name);

                if trigger.severity == Severity::High {
                    let (active, newly_opened) = {
                        let mut recovery = self.recovery_guard();
                        let newly = recovery.active_session_for(habit_id).is_none();
                        (recovery.start(habit_id, RecoveryType::MicroRestart, now), newly)
                    };
                    if newly_opened {
                        self.events.session_started(&active);
                        micro_habit = Some(generate_micro_habit(&habit));
                    }
                    session = Some(active);
                }

                if self.is_ready() && trigger.urgency == Urgency::Immediate {
                    self.dispatcher.dispatch(&ReminderRecommendation {
                        habit_id: habit_id.to_string(),
                        kind: ReminderKind::Gentle,
                        priority: ReminderPriority::Low,
                        timing: now,
                        message: message.clone(),
                        reason: "Supportive check-in after missed days".to_string(),
                    });
                }

                self.events.compassion_event(&CompassionEvent {
                    habit_id: habit_id.to_string(),
                    trigger_condition: message_id,
                    message_shown: message,
                    user_response: None,
                    time_to_response_secs: None,
                    follow_up_needed: trigger.follow_up_needed,
                    at: now,
                });
            }
        }

        let new_badges = self.rescan_badges(Some(habit_id), now);

        Some(ProgressUpdateOutcome {
            trigger,
            session,
            micro_habit,
            new_badges,
        })
    }

    // ── Recovery ─────────────────────────────────────────────────────

    pub fn active_recovery_for(&self, habit_id: &str) -> Option<RecoverySession> {
        self.recovery_guard().active_session_for(habit_id).cloned()
    }

    /// Merge a patch into an active recovery session. Unknown ids are
    /// no-ops.
    pub fn update_recovery(&self, session_id: &str, patch: SessionPatch) -> Option<RecoverySession> {
        self.recovery_guard().update(session_id, patch)
    }

    /// Complete a recovery session and rescan badges (a successful
    /// recovery is a badge signal).
    pub fn complete_recovery(
        &self,
        session_id: &str,
        outcome: RecoveryOutcome,
    ) -> Option<RecoverySession> {
        let now = self.clock.now();
        let completed = self.recovery_guard().complete(session_id, outcome, now)?;
        self.events.session_completed(&completed);
        for badge in self.rescan_badges(Some(&completed.habit_id), now) {
            debug!(badge = %badge.badge_id, "earned via recovery completion");
        }
        Some(completed)
    }

    pub fn recovery_metrics(&self) -> RecoveryMetrics {
        self.recovery_guard().metrics().clone()
    }

    // ── Analytics & badges ───────────────────────────────────────────

    /// Windowed trend report for one habit, also pushed to the event
    /// sink for persistence.
    pub fn trend_report(&self, habit_id: &str, period: TrendPeriod) -> Option<TrendData> {
        self.find_habit(habit_id)?;
        let progress = self.progress_of(habit_id);
        let trend = TrendAnalyzer::analyze(&progress, period, self.clock.now());
        self.events.trend_report(&trend);
        Some(trend)
    }

    /// Drain the new-badge notification queue (exactly-once).
    pub fn take_new_badges(&self) -> Vec<UserBadge> {
        self.badges_guard().take_new_badges()
    }

    pub fn earned_badges(&self) -> Vec<UserBadge> {
        self.badges_guard().earned().to_vec()
    }

    fn rescan_badges(&self, habit_id: Option<&str>, now: DateTime<Utc>) -> Vec<UserBadge> {
        let habits = self.store.habits();
        let progress: Vec<Progress> = habits
            .iter()
            .map(|h| self.progress_of(&h.id))
            .collect();
        let completed_recoveries = self.recovery_guard().successful_sessions();

        let ctx = BadgeContext {
            habits: &habits,
            progress: &progress,
            completed_recoveries: &completed_recoveries,
            now,
        };
        let new_badges = self
            .badges_guard()
            .check_for_new_badges(&self.config.user_id, habit_id, &ctx);
        for badge in &new_badges {
            self.events.badge_earned(badge);
        }
        new_badges
    }

    // ── Internals ────────────────────────────────────────────────────

    fn find_habit(&self, habit_id: &str) -> Option<Habit> {
        self.store.habits().into_iter().find(|h| h.id == habit_id)
    }

    fn progress_of(&self, habit_id: &str) -> Progress {
        self.store
            .progress_for(habit_id)
            .unwrap_or_else(|| Progress::empty(habit_id))
    }

    fn recovery_guard(&self) -> MutexGuard<'_, RecoveryManager> {
        self.recovery.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn badges_guard(&self) -> MutexGuard<'_, BadgeEvaluator> {
        self.badges.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handles_guard(&self) -> MutexGuard<'_, HashMap<String, Vec<ReminderHandle>>> {
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }
}
