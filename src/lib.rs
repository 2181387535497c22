//! # sysu-grader
//!
//! Weighted scoring engine for compiler-construction lab submissions. Each
//! case under a case root is compared with its reference answer, either as a
//! lexer token dump or as IR that gets compiled, run and timed, and the
//! per-case scores are folded into a weighted total.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Incremental weighted mean
pub mod accumulator;
/// Configuration of a grading run
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// Run-level and per-case error taxonomies
pub mod error;
/// Case comparators
pub mod grade;
/// Drives a grading run case by case
pub mod orchestrator;
/// Subprocess execution with deadlines
pub mod process;
/// Per-case and leaderboard reports
pub mod report;
/// Routes log output to the console or to log files
pub mod routing;
/// Weight table parsing
pub mod weights;

pub use accumulator::WeightedMean;
pub use config::{GraderConfig, ToolchainConfig, Verbosity};
pub use error::{CaseError, GradingError, Side, Stage};
pub use grade::{Comparator, ExecutionComparator, TokenStreamComparator, Verdict};
pub use orchestrator::Orchestrator;
pub use report::{LeaderboardEntry, Record, ReportManager, TestReport};
pub use routing::{CaseSink, LogRouter, Sink};
pub use weights::{WeightEntry, WeightTable};
