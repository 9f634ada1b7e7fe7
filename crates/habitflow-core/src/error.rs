//! Core error types for habitflow-core.
//!
//! Most habit-level failure modes in this engine are deliberately *not*
//! errors (missing frequency configuration yields an empty plan, unknown
//! session ids are no-ops). The hierarchy below covers the cases that do
//! need to propagate: scheduling faults and invalid snapshots.

use thiserror::Error;

/// Core error type for habitflow-core.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Scheduling-related errors
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Scheduler-port errors.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// The scheduler backend refused or failed to register a timer
    #[error("Failed to register timer for habit '{habit_id}': {message}")]
    RegisterFailed { habit_id: String, message: String },

    /// The engine was asked to schedule before initialization succeeded
    #[error("Engine is not ready")]
    NotReady,
}

/// Snapshot validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Completion history out of order
    #[error("Completion history for '{habit_id}' is not chronological")]
    UnorderedCompletions { habit_id: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for EngineError
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
