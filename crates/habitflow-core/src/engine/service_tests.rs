//! Behavior tests for the engine service layer, driven through fake ports.

#[cfg(test)]
mod tests {
    use crate::compassion::Severity;
    use crate::engine::HabitSupportEngine;
    use crate::error::ScheduleError;
    use crate::habit::{Habit, HabitCategory, HabitFrequency, PeriodicInterval, Progress, TimeSlot};
    use crate::ports::{
        Clock, EventSink, NotificationDispatcher, ProgressStore, ReminderHandle, Scheduler,
    };
    use crate::reminder::{ReminderKind, ReminderPriority, ReminderRecommendation};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    // ── Fake ports ───────────────────────────────────────────────────

    struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        fn at(now: DateTime<Utc>) -> Self {
            Self(Mutex::new(now))
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[derive(Default)]
    struct InMemoryStore {
        habits: Mutex<Vec<Habit>>,
        progress: Mutex<HashMap<String, Progress>>,
    }

    impl InMemoryStore {
        fn insert(&self, habit: Habit, progress: Progress) {
            self.progress
                .lock()
                .unwrap()
                .insert(habit.id.clone(), progress);
            self.habits.lock().unwrap().push(habit);
        }
    }

    impl ProgressStore for InMemoryStore {
        fn habits(&self) -> Vec<Habit> {
            self.habits.lock().unwrap().clone()
        }
        fn progress_for(&self, habit_id: &str) -> Option<Progress> {
            self.progress.lock().unwrap().get(habit_id).cloned()
        }
    }

    #[derive(Default)]
    struct RecordingScheduler {
        scheduled: Mutex<Vec<(u64, String, Duration, ReminderRecommendation)>>,
        cancelled: Mutex<Vec<u64>>,
        next_id: AtomicU64,
    }

    impl Scheduler for RecordingScheduler {
        fn schedule(
            &self,
            habit_id: &str,
            delay: Duration,
            reminder: ReminderRecommendation,
        ) -> Result<ReminderHandle, ScheduleError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.scheduled
                .lock()
                .unwrap()
                .push((id, habit_id.to_string(), delay, reminder));
            Ok(ReminderHandle(id))
        }

        fn cancel(&self, handle: ReminderHandle) {
            self.cancelled.lock().unwrap().push(handle.0);
        }
    }

    struct RecordingDispatcher {
        permission: bool,
        dispatched: Mutex<Vec<ReminderRecommendation>>,
    }

    impl RecordingDispatcher {
        fn new(permission: bool) -> Self {
            Self {
                permission,
                dispatched: Mutex::new(Vec::new()),
            }
        }
    }

    impl NotificationDispatcher for RecordingDispatcher {
        fn ensure_permission(&self) -> bool {
            self.permission
        }
        fn dispatch(&self, reminder: &ReminderRecommendation) {
            self.dispatched.lock().unwrap().push(reminder.clone());
        }
    }

    #[derive(Default)]
    struct CountingSink {
        compassion_events: AtomicUsize,
        sessions_started: AtomicUsize,
        badges_earned: AtomicUsize,
    }

    impl EventSink for CountingSink {
        fn compassion_event(&self, _event: &crate::compassion::CompassionEvent) {
            self.compassion_events.fetch_add(1, Ordering::SeqCst);
        }
        fn session_started(&self, _session: &crate::recovery::RecoverySession) {
            self.sessions_started.fetch_add(1, Ordering::SeqCst);
        }
        fn badge_earned(&self, _badge: &crate::badges::UserBadge) {
            self.badges_earned.fetch_add(1, Ordering::SeqCst);
        }
    }

    // ── Fixtures ─────────────────────────────────────────────────────

    struct Harness {
        engine: HabitSupportEngine,
        store: Arc<InMemoryStore>,
        scheduler: Arc<RecordingScheduler>,
        dispatcher: Arc<RecordingDispatcher>,
        sink: Arc<CountingSink>,
    }

    fn ts(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
    }

    fn make_harness(now: DateTime<Utc>, permission: bool) -> Harness {
        let store = Arc::new(InMemoryStore::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let dispatcher = Arc::new(RecordingDispatcher::new(permission));
        let sink = Arc::new(CountingSink::default());
        let engine = HabitSupportEngine::new(
            Arc::new(FixedClock::at(now)),
            store.clone(),
            scheduler.clone(),
            dispatcher.clone(),
            sink.clone(),
        );
        Harness {
            engine,
            store,
            scheduler,
            dispatcher,
            sink,
        }
    }

    fn daily_habit(id: &str, slots: Vec<TimeSlot>) -> Habit {
        Habit {
            id: id.to_string(),
            name: format!("Habit {}", id),
            frequency: HabitFrequency::Daily,
            time_slots: slots,
            category: HabitCategory::Fitness,
            research_backed: false,
        }
    }

    // ── Tests ────────────────────────────────────────────────────────

    #[test]
    fn test_denied_permission_leaves_engine_inert() {
        let h = make_harness(ts(6, 9), false);
        h.store
            .insert(daily_habit("h1", vec![TimeSlot::Morning]), Progress::empty("h1"));

        assert!(!h.engine.initialize());
        assert!(!h.engine.is_ready());

        let err = h.engine.schedule_reminders("h1").unwrap_err();
        assert!(err.to_string().contains("not ready"), "got: {}", err);
        assert!(h.scheduler.scheduled.lock().unwrap().is_empty());
    }

    #[test]
    fn test_completed_today_schedules_nothing() {
        let h = make_harness(ts(6, 9), true);
        let mut progress = Progress::empty("h1");
        progress.completions = vec![ts(6, 7)];
        h.store
            .insert(daily_habit("h1", vec![TimeSlot::Morning]), progress);
        h.engine.initialize();

        assert!(h.engine.calculate_smart_reminders("h1").is_empty());
        assert_eq!(h.engine.schedule_reminders("h1").unwrap(), 0);
    }

    #[test]
    fn test_reschedule_cancels_prior_handles() {
        let h = make_harness(ts(6, 6), true);
        h.store
            .insert(daily_habit("h1", vec![TimeSlot::Morning]), Progress::empty("h1"));
        h.engine.initialize();

        h.engine.schedule_reminders("h1").unwrap();
        let first_ids: Vec<u64> = h
            .scheduler
            .scheduled
            .lock()
            .unwrap()
            .iter()
            .map(|(id, ..)| *id)
            .collect();
        assert!(!first_ids.is_empty());

        h.engine.schedule_reminders("h1").unwrap();
        let cancelled = h.scheduler.cancelled.lock().unwrap().clone();
        for id in first_ids {
            assert!(
                cancelled.contains(&id),
                "handle {} must be cancelled before rescheduling",
                id
            );
        }
    }

    #[test]
    fn test_evening_urgent_dispatches_immediately() {
        let h = make_harness(ts(6, 19), true);
        h.store
            .insert(daily_habit("h1", vec![TimeSlot::Morning]), Progress::empty("h1"));
        h.engine.initialize();

        h.engine.schedule_reminders("h1").unwrap();

        let dispatched = h.dispatcher.dispatched.lock().unwrap();
        assert_eq!(dispatched.len(), 1, "urgent reminder bypasses the timer");
        assert_eq!(dispatched[0].kind, ReminderKind::Urgent);
        assert_eq!(dispatched[0].timing, ts(6, 19));

        // The morning-slot reminder for tomorrow still goes through the
        // scheduler.
        let scheduled = h.scheduler.scheduled.lock().unwrap();
        assert_eq!(scheduled.len(), 1);
        assert!(scheduled[0].2 > Duration::zero());
    }

    #[test]
    fn test_pending_reminders_are_totally_ordered() {
        let h = make_harness(ts(6, 9), true);

        // Overdue periodic -> critical at now
        let periodic = Habit {
            frequency: HabitFrequency::Periodic {
                interval: PeriodicInterval::Weekly,
                interval_count: 1,
            },
            ..daily_habit("overdue", vec![])
        };
        let mut periodic_progress = Progress::empty("overdue");
        periodic_progress.completions = vec![ts(1, 9) - Duration::weeks(2)];
        h.store.insert(periodic, periodic_progress);

        // Plain daily habits at different slots
        h.store
            .insert(daily_habit("a", vec![TimeSlot::Evening]), Progress::empty("a"));
        h.store
            .insert(daily_habit("b", vec![TimeSlot::Lunch]), Progress::empty("b"));

        let pending = h.engine.all_pending_reminders();
        assert!(pending.len() >= 3);
        assert_eq!(pending[0].habit_id, "overdue");
        assert_eq!(pending[0].priority, ReminderPriority::Critical);

        for pair in pending.windows(2) {
            assert!(pair[0].priority.rank() >= pair[1].priority.rank());
            if pair[0].priority == pair[1].priority {
                assert!(pair[0].timing <= pair[1].timing);
            }
        }
    }

    #[test]
    fn test_clear_all_releases_every_handle() {
        let h = make_harness(ts(6, 6), true);
        h.store
            .insert(daily_habit("h1", vec![TimeSlot::Morning]), Progress::empty("h1"));
        h.store
            .insert(daily_habit("h2", vec![TimeSlot::Evening]), Progress::empty("h2"));
        h.engine.initialize();
        h.engine.schedule_all().unwrap();

        let issued: Vec<u64> = h
            .scheduler
            .scheduled
            .lock()
            .unwrap()
            .iter()
            .map(|(id, ..)| *id)
            .collect();
        assert!(!issued.is_empty());

        h.engine.shutdown();
        let cancelled = h.scheduler.cancelled.lock().unwrap();
        for id in issued {
            assert!(cancelled.contains(&id), "handle {} still outstanding", id);
        }
        assert!(!h.engine.is_ready());
    }

    #[test]
    fn test_three_misses_open_one_recovery_session() {
        let h = make_harness(ts(9, 9), true);
        let mut progress = Progress::empty("h1");
        progress.completions = vec![ts(6, 8)]; // 3 missed days since
        h.store
            .insert(daily_habit("h1", vec![TimeSlot::Morning]), progress);
        h.engine.initialize();

        let outcome = h.engine.on_progress_updated("h1").expect("known habit");
        assert!(outcome.trigger.should_trigger);
        assert_eq!(outcome.trigger.severity, Severity::High);
        let session = outcome.session.expect("high severity opens recovery");
        assert!(outcome.micro_habit.is_some(), "new session ships a micro-habit");
        assert_eq!(h.sink.sessions_started.load(Ordering::SeqCst), 1);
        assert_eq!(h.sink.compassion_events.load(Ordering::SeqCst), 1);

        // Gentle supportive message was dispatched immediately
        let dispatched = h.dispatcher.dispatched.lock().unwrap();
        assert!(dispatched.iter().any(|r| r.kind == ReminderKind::Gentle));
        drop(dispatched);

        // A second scan does not open a second session
        let again = h.engine.on_progress_updated("h1").unwrap();
        assert_eq!(
            again.session.expect("existing session returned").id,
            session.id
        );
        assert!(again.micro_habit.is_none(), "no new micro-habit for an existing session");
        assert_eq!(h.engine.recovery_metrics().total_sessions, 1);
        assert_eq!(h.sink.sessions_started.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_badge_awards_are_idempotent_through_engine() {
        let h = make_harness(ts(9, 9), true);
        let mut progress = Progress::empty("h1");
        progress.completions = vec![ts(9, 8)];
        progress.current_streak = 7;
        h.store
            .insert(daily_habit("h1", vec![TimeSlot::Morning]), progress);

        let first = h.engine.on_progress_updated("h1").unwrap();
        assert!(
            first.new_badges.iter().any(|b| b.badge_id == "streak-7"),
            "7-day streak earns the badge"
        );

        let second = h.engine.on_progress_updated("h1").unwrap();
        assert!(second.new_badges.is_empty(), "no progress change, no second award");

        let drained = h.engine.take_new_badges();
        assert_eq!(drained.len(), 1);
        assert!(h.engine.take_new_badges().is_empty(), "queue drains once");
        assert_eq!(h.sink.badges_earned.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_recovery_lifecycle_through_engine() {
        let h = make_harness(ts(9, 9), true);
        let mut progress = Progress::empty("h1");
        progress.completions = vec![ts(6, 8)];
        h.store
            .insert(daily_habit("h1", vec![TimeSlot::Morning]), progress);

        let session = h
            .engine
            .on_progress_updated("h1")
            .unwrap()
            .session
            .expect("recovery opened");
        assert_eq!(
            h.engine.active_recovery_for("h1").unwrap().id,
            session.id
        );

        let patched = h
            .engine
            .update_recovery(
                &session.id,
                crate::recovery::SessionPatch {
                    current_step: Some(3),
                    successful_days: Some(3),
                    ..Default::default()
                },
            )
            .expect("active session accepts patches");
        assert_eq!(patched.current_step, 3);

        let done = h
            .engine
            .complete_recovery(&session.id, crate::recovery::RecoveryOutcome::Successful)
            .expect("completion succeeds once");
        assert!(done.completed);
        assert!(h.engine.active_recovery_for("h1").is_none());
        assert_eq!(h.engine.recovery_metrics().successful_recoveries, 1);

        // Completing a recovery is a badge signal
        assert!(h
            .engine
            .earned_badges()
            .iter()
            .any(|b| b.badge_id == "comeback-1"));
    }

    #[test]
    fn test_unknown_habit_is_noop() {
        let h = make_harness(ts(6, 9), true);
        h.engine.initialize();

        assert!(h.engine.calculate_smart_reminders("ghost").is_empty());
        assert!(h.engine.on_progress_updated("ghost").is_none());
        assert_eq!(h.engine.schedule_reminders("ghost").unwrap(), 0);
    }
}
