//! Cross-habit reminder ordering.
//!
//! Merges per-habit reminder lists into one totally ordered set:
//! priority rank descending, then timing ascending. This ordering is the
//! externally visible contract of the engine's pending-reminder query.

use super::ReminderRecommendation;

/// Sort reminders in place: highest priority first, earliest instant
/// first within equal priority.
pub fn sort_reminders(reminders: &mut [ReminderRecommendation]) {
    reminders.sort_by(|a, b| {
        b.priority
            .rank()
            .cmp(&a.priority.rank())
            .then(a.timing.cmp(&b.timing))
    });
}

/// Merge per-habit reminder lists and apply the total order.
pub fn merge_and_sort(
    per_habit: impl IntoIterator<Item = Vec<ReminderRecommendation>>,
) -> Vec<ReminderRecommendation> {
    let mut merged: Vec<ReminderRecommendation> = per_habit.into_iter().flatten().collect();
    sort_reminders(&mut merged);
    merged
}
