//! Micro-habit generation for recovery.
//!
//! Rule-based templates producing a deliberately reduced-scope variant of
//! a habit, used to rebuild momentum during recovery. Lookup is
//! deterministic per category; unknown categories fall back to a default
//! template. The 0.8 success rate is a static prior, not learned.

use serde::{Deserialize, Serialize};

use crate::habit::{Habit, HabitCategory};

/// Difficulty of a micro-habit. Always minimal by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MicroDifficulty {
    Minimal,
}

/// A reduced-scope habit variant created for a recovery session.
///
/// Not persisted as a habit; generated fresh per recovery activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicroHabit {
    pub id: String,
    pub original_habit_id: String,
    pub name: String,
    pub description: String,
    pub time_required_minutes: u32,
    /// Escalating variants, smallest first
    pub scaling_steps: Vec<String>,
    pub difficulty: MicroDifficulty,
    /// The micro version keeps the original habit's time and place
    pub maintains_same_context: bool,
    /// Static prior for template-based micro-habits
    pub success_rate: f64,
}

struct MicroTemplate {
    name: &'static str,
    description: &'static str,
    time_required_minutes: u32,
    scaling_steps: &'static [&'static str],
}

fn template_for(category: HabitCategory) -> MicroTemplate {
    match category {
        HabitCategory::Mindfulness => MicroTemplate {
            name: "One mindful minute",
            description: "Sit down and take ten slow breaths",
            time_required_minutes: 1,
            scaling_steps: &[
                "Ten slow breaths",
                "Three minutes of guided breathing",
                "Ten minutes seated meditation",
            ],
        },
        HabitCategory::Fitness => MicroTemplate {
            name: "Two-minute movement",
            description: "Put on your shoes and do one set of anything",
            time_required_minutes: 2,
            scaling_steps: &[
                "One set of ten squats",
                "Ten minutes of brisk walking",
                "A shortened version of your usual workout",
                "Full workout",
            ],
        },
        HabitCategory::Nutrition => MicroTemplate {
            name: "One better bite",
            description: "Add one vegetable or glass of water to your next meal",
            time_required_minutes: 2,
            scaling_steps: &[
                "One glass of water before a meal",
                "One vegetable with lunch",
                "Plan tomorrow's meals",
            ],
        },
        HabitCategory::Sleep => MicroTemplate {
            name: "Wind-down cue",
            description: "Dim the lights and put the phone in another room",
            time_required_minutes: 3,
            scaling_steps: &[
                "Phone out of the bedroom",
                "Lights down 30 minutes before bed",
                "Full wind-down routine",
            ],
        },
        HabitCategory::Productivity => MicroTemplate {
            name: "Five-minute start",
            description: "Open the work and do the smallest next action",
            time_required_minutes: 5,
            scaling_steps: &[
                "Open the project and write one line",
                "One focused 15-minute block",
                "One full focus session",
            ],
        },
        HabitCategory::Learning => MicroTemplate {
            name: "One page",
            description: "Read or review a single page",
            time_required_minutes: 3,
            scaling_steps: &[
                "One page or one flashcard deck",
                "Fifteen minutes of study",
                "A full study session",
            ],
        },
        HabitCategory::Other => MicroTemplate {
            name: "Smallest possible version",
            description: "Do the habit for two minutes, then stop guilt-free",
            time_required_minutes: 2,
            scaling_steps: &[
                "Two-minute version",
                "Half the usual scope",
                "Full habit",
            ],
        },
    }
}

/// Generate the micro variant of a habit.
pub fn generate_micro_habit(habit: &Habit) -> MicroHabit {
    let template = template_for(habit.category);
    MicroHabit {
        id: uuid::Uuid::new_v4().to_string(),
        original_habit_id: habit.id.clone(),
        name: template.name.to_string(),
        description: template.description.to_string(),
        time_required_minutes: template.time_required_minutes,
        scaling_steps: template
            .scaling_steps
            .iter()
            .map(|s| s.to_string())
            .collect(),
        difficulty: MicroDifficulty::Minimal,
        maintains_same_context: true,
        success_rate: 0.8,
    }
}
