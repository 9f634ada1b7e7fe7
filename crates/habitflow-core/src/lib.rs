//! # Habitflow Core Library
//!
//! Adaptive habit support engine: schedules context-aware reminders for
//! recurring habits, detects missed-habit patterns and drives a
//! compassion/recovery lifecycle, and computes trend, consistency, and
//! badge-progress analytics from completion history.
//!
//! This crate is a library invoked by an application layer. It owns no
//! I/O: the clock, the habit/progress snapshot, timer scheduling,
//! notification display, and record persistence are injected through the
//! ports in [`ports`].
//!
//! ## Architecture
//!
//! - **Planning**: per-frequency reminder computation shaped by the
//!   user's completion pattern, merged into one priority-ordered set
//! - **Compassion/Recovery**: consecutive-miss classification feeding a
//!   five-step recovery-session state machine with micro-habit variants
//! - **Analytics**: pure windowed trend reports and badge progress over
//!   an immutable progress snapshot
//!
//! ## Key Components
//!
//! - [`HabitSupportEngine`]: service facade wiring components to ports
//! - [`ReminderPlanner`]: daily/weekly/periodic reminder computation
//! - [`TrendAnalyzer`]: completion-rate and streak/gap analytics
//! - [`RecoveryManager`]: recovery-session lifecycle
//! - [`BadgeEvaluator`]: idempotent badge awards

pub mod analytics;
pub mod badges;
pub mod compassion;
pub mod engine;
pub mod error;
pub mod habit;
pub mod pattern;
pub mod ports;
pub mod recovery;
pub mod reminder;

pub use analytics::{TrendAnalyzer, TrendData, TrendDirection, TrendPeriod};
pub use badges::{Badge, BadgeEvaluator, BadgeRequirement, BadgeRequirementKind, UserBadge};
pub use compassion::{
    CompassionConfig, CompassionDetector, CompassionEvent, CompassionMessageId,
    CompassionTriggerResult, Severity, Urgency,
};
pub use engine::{EngineConfig, HabitSupportEngine, ProgressUpdateOutcome};
pub use error::{EngineError, ScheduleError, ValidationError};
pub use habit::{Habit, HabitCategory, HabitFrequency, PeriodicInterval, Progress, TimeSlot};
pub use pattern::{analyze_completions, CompletionPattern};
pub use ports::{
    Clock, EventSink, NotificationDispatcher, NullEventSink, ProgressStore, ReminderHandle,
    Scheduler, SystemClock, TokioScheduler,
};
pub use recovery::{
    generate_micro_habit, MicroHabit, RecoveryManager, RecoveryMetrics, RecoveryOutcome,
    RecoverySession, RecoveryType, SessionPatch,
};
pub use reminder::{
    PlannerConfig, ReminderKind, ReminderPlanner, ReminderPriority, ReminderRecommendation,
};
