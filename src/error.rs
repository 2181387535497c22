#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt, path::PathBuf};

use crate::constants::outcome;

/// Errors that end a grading run before any case is scored.
#[derive(thiserror::Error, Debug)]
pub enum GradingError {
    /// The case root or the weight table does not exist.
    #[error("`{}` does not exist.", .0.display())]
    PathNotFound(PathBuf),
    /// A weight table line carries a weight that is not a number.
    #[error("{}:{line}: `{weight}` is not a valid weight.", .path.display())]
    ConfigFormat {
        /// weight table being parsed
        path:   PathBuf,
        /// 1-based line number
        line:   usize,
        /// the offending token
        weight: String,
    },
    /// The weight table exists but could not be read.
    #[error("Could not read `{}`", .path.display())]
    ReadConfig {
        /// weight table being read
        path:   PathBuf,
        /// underlying I/O error
        source: std::io::Error,
    },
    /// Diagnostic verbosity outside of 1..=3.
    #[error("Verbosity must be 1, 2 or 3 (got {0}).")]
    InvalidVerbosity(u8),
}

/// Which of the two programs under comparison an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The course-provided answer.
    Reference,
    /// The student submission.
    Candidate,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Reference => write!(f, "reference"),
            Side::Candidate => write!(f, "candidate"),
        }
    }
}

/// The four subprocess steps of an execution comparison, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Compiling the reference IR.
    ReferenceCompile,
    /// Running the reference executable.
    ReferenceRun,
    /// Compiling the candidate IR.
    CandidateCompile,
    /// Running the candidate executable.
    CandidateRun,
}

impl Stage {
    /// Outcome label used when this stage exceeds its deadline.
    pub fn timeout_outcome(self) -> &'static str {
        match self {
            Stage::ReferenceCompile => outcome::REFERENCE_COMPILE_TIMEOUT,
            Stage::ReferenceRun => outcome::REFERENCE_RUN_TIMEOUT,
            Stage::CandidateCompile => outcome::CANDIDATE_COMPILE_TIMEOUT,
            Stage::CandidateRun => outcome::CANDIDATE_RUN_TIMEOUT,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ReferenceCompile => write!(f, "compiling the reference"),
            Stage::ReferenceRun => write!(f, "running the reference"),
            Stage::CandidateCompile => write!(f, "compiling the candidate"),
            Stage::CandidateRun => write!(f, "running the candidate"),
        }
    }
}

/// Reasons a single case scores zero. All of them are absorbed at the case
/// boundary and recorded on that case's report.
#[derive(thiserror::Error, Debug)]
pub enum CaseError {
    /// The reference artifact was never generated.
    #[error("Reference `{}` was not generated.", .0.display())]
    MissingReference(PathBuf),
    /// The candidate artifact was never generated.
    #[error("Candidate `{}` was not generated.", .0.display())]
    MissingCandidate(PathBuf),
    /// Token dumps differ in length; no alignment is attempted.
    #[error(
        "Candidate has {candidate} tokens but the reference has {reference}; check for missing \
         or extra tokens."
    )]
    TokenCountMismatch {
        /// reference line count
        reference: usize,
        /// candidate line count
        candidate: usize,
    },
    /// The toolchain exited with a nonzero status.
    #[error("Compiling the {0} failed.")]
    CompileFailure(Side),
    /// A subprocess step exceeded its deadline.
    #[error("Timed out while {0}.")]
    StageTimeout(Stage),
    /// The executables exited with different codes.
    #[error("Return code {candidate} does not match the reference's {reference}.")]
    ReturnCodeMismatch {
        /// reference exit code
        reference: i32,
        /// candidate exit code
        candidate: i32,
    },
    /// The executables printed different stdout.
    #[error("Output does not match the reference.")]
    OutputMismatch,
    /// An executable printed no timing marker, or a zero duration.
    #[error("The {0} did not report its running time.")]
    TimingUnavailable(Side),
    /// Anything unexpected while scoring.
    #[error("Internal scoring error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl CaseError {
    /// Human-readable classification recorded on the test report.
    pub fn outcome(&self) -> &'static str {
        match self {
            CaseError::MissingReference(_) => outcome::REFERENCE_MISSING,
            CaseError::MissingCandidate(_) => outcome::CANDIDATE_MISSING,
            CaseError::TokenCountMismatch { .. } => outcome::TOKEN_COUNT_MISMATCH,
            CaseError::CompileFailure(Side::Reference) => outcome::REFERENCE_COMPILE_FAILED,
            CaseError::CompileFailure(Side::Candidate) => outcome::CANDIDATE_COMPILE_FAILED,
            CaseError::StageTimeout(stage) => stage.timeout_outcome(),
            CaseError::ReturnCodeMismatch { .. } => outcome::RETURN_CODE_MISMATCH,
            CaseError::OutputMismatch => outcome::OUTPUT_MISMATCH,
            CaseError::TimingUnavailable(Side::Reference) => outcome::REFERENCE_UNTIMED,
            CaseError::TimingUnavailable(Side::Candidate) => outcome::CANDIDATE_UNTIMED,
            CaseError::Internal(_) => outcome::INTERNAL_ERROR,
        }
    }
}
