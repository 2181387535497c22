#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// File name of every log written by the grader, both per case and run-wide.
pub const SCORE_LOG: &str = "score.txt";

/// Structured report written under the case root.
pub const REPORT_JSON: &str = "report.json";

/// Fixed-width text report written under the case root.
pub const REPORT_TXT: &str = "report.txt";

/// Reference token dump of a lexer case.
pub const LEX_REFERENCE: &str = "answer.txt";

/// Candidate token dump of a lexer case.
pub const LEX_CANDIDATE: &str = "output.txt";

/// Reference IR of a code generation case.
pub const IR_REFERENCE: &str = "answer.ll";

/// Candidate IR of a code generation case.
pub const IR_CANDIDATE: &str = "output.ll";

/// Optional gzip-compressed stdin shared by both executables.
pub const STDIN_FIXTURE: &str = "answer.in.gz";

/// Executable built from the reference IR.
pub const REFERENCE_EXE: &str = "answer.out";

/// Executable built from the candidate IR.
pub const CANDIDATE_EXE: &str = "output.out";

/// Marker preceding a token's source location in a token dump.
pub const LOCATION_MARKER: &str = "Loc=<";

/// Runtime library linked into every executable unless overridden.
pub const DEFAULT_RTLIB_NAME: &str = "test-rtlib";

/// Maximum score of every case.
pub const MAX_SCORE: f64 = 100.0;

/// Name of the leaderboard entry carrying the weighted total.
pub const TOTAL_SCORE_NAME: &str = "总分";

/// Weight assumed when a weight table line names only the case.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Environment variable overriding the runtime library name.
pub const RTLIB_NAME_ENV: &str = "SYSU_GRADER_RTLIB_NAME";

/// Environment variable overriding the diagnostic verbosity.
pub const VERBOSITY_ENV: &str = "SYSU_GRADER_VERBOSITY";

/// Outcome labels recorded on test reports.
pub mod outcome {
    /// Token dumps were compared tier by tier.
    pub const GRADED: &str = "graded";
    /// Candidate executable matched the reference.
    pub const PASSED: &str = "passed";
    /// Reference artifact is absent.
    pub const REFERENCE_MISSING: &str = "reference not generated";
    /// Candidate artifact is absent.
    pub const CANDIDATE_MISSING: &str = "candidate not generated";
    /// Token dumps have different line counts.
    pub const TOKEN_COUNT_MISMATCH: &str = "token count mismatch";
    /// Toolchain rejected the reference IR.
    pub const REFERENCE_COMPILE_FAILED: &str = "reference compile failed";
    /// Toolchain rejected the candidate IR.
    pub const CANDIDATE_COMPILE_FAILED: &str = "candidate compile failed";
    /// Reference compilation hit the deadline.
    pub const REFERENCE_COMPILE_TIMEOUT: &str = "reference compile timeout";
    /// Reference execution hit the deadline.
    pub const REFERENCE_RUN_TIMEOUT: &str = "reference execution timeout";
    /// Candidate compilation hit the deadline.
    pub const CANDIDATE_COMPILE_TIMEOUT: &str = "candidate compile timeout";
    /// Candidate execution hit the deadline.
    pub const CANDIDATE_RUN_TIMEOUT: &str = "candidate execution timeout";
    /// Executables exited with different codes.
    pub const RETURN_CODE_MISMATCH: &str = "return code mismatch";
    /// Executables printed different stdout.
    pub const OUTPUT_MISMATCH: &str = "output mismatch";
    /// Reference executable emitted no usable timing marker.
    pub const REFERENCE_UNTIMED: &str = "reference did not report timing";
    /// Candidate executable emitted no usable timing marker.
    pub const CANDIDATE_UNTIMED: &str = "candidate did not report timing";
    /// Anything else went wrong while scoring.
    pub const INTERNAL_ERROR: &str = "internal scoring error";
}
