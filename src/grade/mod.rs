#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::Path;

use crate::error::CaseError;

/// Compile, run and time comparison of generated IR.
pub mod exec;
/// Tiered comparison of lexer token dumps.
pub mod tokens;

pub use exec::{ExecutionComparator, StageProgress, parse_timing_marker};
pub use tokens::{TierTally, TokenLine, TokenStreamComparator};

/// Score and classification of a case that was compared successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Score on a 0–100 scale (execution scores may exceed 100).
    pub score:   f64,
    /// Outcome label recorded on the report.
    pub outcome: &'static str,
}

impl Verdict {
    /// Creates a verdict.
    pub fn new(score: f64, outcome: &'static str) -> Self {
        Self { score, outcome }
    }
}

/// Scores a single case directory against its reference answer.
///
/// Implementations are stateless across cases; every reason for a zero score
/// is returned as a [`CaseError`] so the caller can record it.
#[allow(async_fn_in_trait)]
pub trait Comparator {
    /// Short task name used in log lines.
    fn task(&self) -> &'static str;

    /// Compares the artifacts found in `case_dir`.
    async fn compare(&self, case_dir: &Path) -> Result<Verdict, CaseError>;
}
