//! Badge progress evaluation and awards.
//!
//! Maps progress signals (streaks, consistency, totals, recovery
//! success, research engagement) to 0-100 completion percentages and
//! emits award events. Awarding is idempotent: at most one earned badge
//! per (badge, user, habit-scope) tuple, and the "new badge" queue is
//! drained exactly once by the consumer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::habit::{Habit, Progress};
use crate::recovery::RecoverySession;

/// What signal a badge requirement measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeRequirementKind {
    /// Current streak length vs threshold days
    Streak,
    /// Completion rate over a timeframe vs threshold ratio
    ConsistencyRate,
    /// Cumulative completions vs threshold count
    TotalCompletions,
    /// Completed recovery sessions vs threshold count
    RecoverySuccess,
    /// Habits carrying research references vs threshold count
    ResearchEngagement,
}

/// Requirement attached to a badge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeRequirement {
    pub kind: BadgeRequirementKind,
    pub threshold: f64,
    /// Restrict counting to the last N days
    #[serde(default)]
    pub timeframe_days: Option<i64>,
    /// Whether the badge is earned per habit rather than per user
    #[serde(default)]
    pub habit_scoped: bool,
}

/// Badge definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub requirement: BadgeRequirement,
}

/// An earned badge instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBadge {
    pub badge_id: String,
    pub user_id: String,
    #[serde(default)]
    pub habit_id: Option<String>,
    pub earned_at: DateTime<Utc>,
    pub is_new: bool,
}

/// Read-only snapshot the evaluator works against.
pub struct BadgeContext<'a> {
    pub habits: &'a [Habit],
    pub progress: &'a [Progress],
    /// Successfully completed recovery sessions
    pub completed_recoveries: &'a [RecoverySession],
    pub now: DateTime<Utc>,
}

impl BadgeContext<'_> {
    fn progress_for(&self, habit_id: &str) -> Option<&Progress> {
        self.progress.iter().find(|p| p.habit_id == habit_id)
    }

    fn completions_within(&self, progress: &Progress, timeframe_days: Option<i64>) -> u32 {
        match timeframe_days {
            None => progress.completed_dates().len() as u32,
            Some(days) => {
                let cutoff = self.now.date_naive() - chrono::Duration::days(days - 1);
                progress
                    .completed_dates()
                    .iter()
                    .filter(|d| **d >= cutoff)
                    .count() as u32
            }
        }
    }
}

/// Badge registry plus the user's earned set and new-award queue.
#[derive(Debug, Default)]
pub struct BadgeEvaluator {
    badges: Vec<Badge>,
    earned: Vec<UserBadge>,
    new_queue: Vec<UserBadge>,
}

impl BadgeEvaluator {
    /// Create an evaluator over a badge registry.
    pub fn new(badges: Vec<Badge>) -> Self {
        Self {
            badges,
            earned: Vec::new(),
            new_queue: Vec::new(),
        }
    }

    /// Create with the built-in badge set.
    pub fn with_default_badges() -> Self {
        Self::new(default_badges())
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    pub fn earned(&self) -> &[UserBadge] {
        &self.earned
    }

    /// Progress toward one badge, 0-100, clamped.
    ///
    /// `habit_id` selects the habit for habit-scoped requirements;
    /// unscoped requirements take the best value across all habits.
    pub fn progress_toward(
        &self,
        badge: &Badge,
        ctx: &BadgeContext<'_>,
        habit_id: Option<&str>,
    ) -> f64 {
        let req = &badge.requirement;
        let threshold = req.threshold.max(f64::MIN_POSITIVE);

        let raw = match req.kind {
            BadgeRequirementKind::Streak => {
                let streak = match habit_id.and_then(|id| ctx.progress_for(id)) {
                    Some(p) => p.current_streak,
                    None => ctx.progress.iter().map(|p| p.current_streak).max().unwrap_or(0),
                };
                streak as f64 / threshold
            }
            BadgeRequirementKind::ConsistencyRate => {
                let days = req.timeframe_days.unwrap_or(30).max(1);
                let rate_for = |p: &Progress| {
                    ctx.completions_within(p, Some(days)) as f64 / days as f64
                };
                let rate = match habit_id.and_then(|id| ctx.progress_for(id)) {
                    Some(p) => rate_for(p),
                    None => ctx
                        .progress
                        .iter()
                        .map(rate_for)
                        .fold(0.0, f64::max),
                };
                rate / threshold
            }
            BadgeRequirementKind::TotalCompletions => {
                let count: u32 = match habit_id.and_then(|id| ctx.progress_for(id)) {
                    Some(p) => ctx.completions_within(p, req.timeframe_days),
                    None => ctx
                        .progress
                        .iter()
                        .map(|p| ctx.completions_within(p, req.timeframe_days))
                        .sum(),
                };
                count as f64 / threshold
            }
            BadgeRequirementKind::RecoverySuccess => {
                let count = ctx
                    .completed_recoveries
                    .iter()
                    .filter(|s| match habit_id {
                        Some(id) if req.habit_scoped => s.habit_id == id,
                        _ => true,
                    })
                    .count();
                count as f64 / threshold
            }
            BadgeRequirementKind::ResearchEngagement => {
                let count = ctx.habits.iter().filter(|h| h.research_backed).count();
                count as f64 / threshold
            }
        };

        (raw * 100.0).clamp(0.0, 100.0)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Scan all badges for newly met requirements and award them.
    ///
    /// Idempotent: an award already present for the (badge, user,
    /// habit-scope) tuple is never re-emitted. Returns only the genuinely
    /// new awards; the same records are queued for `take_new_badges`.
    pub fn check_for_new_badges(
        &mut self,
        user_id: &str,
        habit_id: Option<&str>,
        ctx: &BadgeContext<'_>,
    ) -> Vec<UserBadge> {
        let mut awarded = Vec::new();

        for badge in &self.badges {
            let scope = if badge.requirement.habit_scoped {
                habit_id.map(|s| s.to_string())
            } else {
                None
            };
            if badge.requirement.habit_scoped && scope.is_none() {
                continue;
            }

            let already = self.earned.iter().any(|ub| {
                ub.badge_id == badge.id && ub.user_id == user_id && ub.habit_id == scope
            });
            if already {
                continue;
            }

            if self.progress_toward(badge, ctx, scope.as_deref()) >= 100.0 {
                awarded.push(UserBadge {
                    badge_id: badge.id.clone(),
                    user_id: user_id.to_string(),
                    habit_id: scope,
                    earned_at: ctx.now,
                    is_new: true,
                });
            }
        }

        self.earned.extend(awarded.iter().cloned());
        self.new_queue.extend(awarded.iter().cloned());
        awarded
    }

    /// Drain the new-badge notification queue (exactly-once consumption).
    pub fn take_new_badges(&mut self) -> Vec<UserBadge> {
        for queued in &self.new_queue {
            if let Some(earned) = self.earned.iter_mut().find(|ub| {
                ub.badge_id == queued.badge_id
                    && ub.user_id == queued.user_id
                    && ub.habit_id == queued.habit_id
            }) {
                earned.is_new = false;
            }
        }
        std::mem::take(&mut self.new_queue)
    }
}

/// Built-in badge set.
pub fn default_badges() -> Vec<Badge> {
    vec![
        Badge {
            id: "streak-7".to_string(),
            name: "One Week Strong".to_string(),
            description: "Keep a habit going for 7 consecutive days".to_string(),
            requirement: BadgeRequirement {
                kind: BadgeRequirementKind::Streak,
                threshold: 7.0,
                timeframe_days: None,
                habit_scoped: true,
            },
        },
        Badge {
            id: "streak-30".to_string(),
            name: "Monthly Momentum".to_string(),
            description: "Keep a habit going for 30 consecutive days".to_string(),
            requirement: BadgeRequirement {
                kind: BadgeRequirementKind::Streak,
                threshold: 30.0,
                timeframe_days: None,
                habit_scoped: true,
            },
        },
        Badge {
            id: "consistency-80".to_string(),
            name: "Steady Hand".to_string(),
            description: "Complete 80% of the last 30 days".to_string(),
            requirement: BadgeRequirement {
                kind: BadgeRequirementKind::ConsistencyRate,
                threshold: 0.8,
                timeframe_days: Some(30),
                habit_scoped: true,
            },
        },
        Badge {
            id: "completions-100".to_string(),
            name: "Century Club".to_string(),
            description: "Log 100 completions across all habits".to_string(),
            requirement: BadgeRequirement {
                kind: BadgeRequirementKind::TotalCompletions,
                threshold: 100.0,
                timeframe_days: None,
                habit_scoped: false,
            },
        },
        Badge {
            id: "comeback-1".to_string(),
            name: "Comeback".to_string(),
            description: "Complete a recovery program".to_string(),
            requirement: BadgeRequirement {
                kind: BadgeRequirementKind::RecoverySuccess,
                threshold: 1.0,
                timeframe_days: None,
                habit_scoped: false,
            },
        },
        Badge {
            id: "research-3".to_string(),
            name: "Evidence Seeker".to_string(),
            description: "Track 3 research-backed habits".to_string(),
            requirement: BadgeRequirement {
                kind: BadgeRequirementKind::ResearchEngagement,
                threshold: 3.0,
                timeframe_days: None,
                habit_scoped: false,
            },
        },
    ]
}
