//! Completion-history analytics.
//!
//! Windowed trend reports over a habit's completion history: completion
//! rate, streak runs, inter-miss gaps, and period-over-period direction.

pub mod trend;

pub use trend::{TrendAnalyzer, TrendData, TrendDirection, TrendPeriod};
