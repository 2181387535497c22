#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    io::Read,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{Context, Result, anyhow};
use flate2::read::GzDecoder;
use regex::bytes::Regex;
use similar::TextDiff;
use tracing::{error, info};

use super::{Comparator, Verdict};
use crate::{
    config::{ToolchainConfig, Verbosity},
    constants::{
        CANDIDATE_EXE, IR_CANDIDATE, IR_REFERENCE, REFERENCE_EXE, STDIN_FIXTURE, outcome,
    },
    error::{CaseError, Side, Stage},
    process::{Collected, ProcessError, StdinSource, run_collect},
};

/// Longest stdout excerpt copied into a case log.
const OUTPUT_EXCERPT: usize = 4000;

/// `TOTAL: <H>H-<M>M-<S>S-<us>us`, as printed by the runtime library.
static TIMING_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"TOTAL: ([0-9]+)H-([0-9]+)M-([0-9]+)S-([0-9]+)us")
        .expect("timing marker pattern is valid")
});

/// Total microseconds reported by the last timing marker in `stderr`.
pub fn parse_timing_marker(stderr: &[u8]) -> Option<u64> {
    let caps = TIMING_MARKER.captures_iter(stderr).last()?;
    let field = |i: usize| -> Option<u64> { std::str::from_utf8(&caps[i]).ok()?.parse().ok() };

    let (hours, minutes, seconds, micros) = (field(1)?, field(2)?, field(3)?, field(4)?);
    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1_000_000)?
        .checked_add(micros)
}

/// Results of the four subprocess steps, filled in protocol order.
///
/// When a step times out, the first empty slot names the step that was
/// running.
#[derive(Debug, Default)]
pub struct StageProgress {
    /// toolchain run on the reference IR
    pub reference_compile: Option<Collected>,
    /// reference executable run
    pub reference_run:     Option<Collected>,
    /// toolchain run on the candidate IR
    pub candidate_compile: Option<Collected>,
    /// candidate executable run
    pub candidate_run:     Option<Collected>,
}

impl StageProgress {
    /// The step that has not produced a result yet.
    pub fn pending_stage(&self) -> Stage {
        if self.reference_compile.is_none() {
            Stage::ReferenceCompile
        } else if self.reference_run.is_none() {
            Stage::ReferenceRun
        } else if self.candidate_compile.is_none() {
            Stage::CandidateCompile
        } else {
            Stage::CandidateRun
        }
    }

    /// Stores the result of the pending step.
    pub fn record(&mut self, collected: Collected) -> &Collected {
        let slot = match self.pending_stage() {
            Stage::ReferenceCompile => &mut self.reference_compile,
            Stage::ReferenceRun => &mut self.reference_run,
            Stage::CandidateCompile => &mut self.candidate_compile,
            Stage::CandidateRun => &mut self.candidate_run,
        };
        slot.insert(collected)
    }

    /// Turns a failed step into the case error it stands for.
    pub fn classify(&self, err: ProcessError) -> CaseError {
        let stage = self.pending_stage();
        match err {
            ProcessError::TimedOut { .. } => CaseError::StageTimeout(stage),
            ProcessError::Failed(e) => CaseError::Internal(e.context(format!("while {stage}"))),
        }
    }

    /// Both executable runs, once they finished.
    fn runs(&self) -> Result<(&Collected, &Collected)> {
        match (&self.reference_run, &self.candidate_run) {
            (Some(reference), Some(candidate)) => Ok((reference, candidate)),
            _ => Err(anyhow!("executables were compared before both of them ran")),
        }
    }
}

/// Truncates `content` to `limit` bytes at a line boundary, appending a
/// notice to indicate omitted output.
fn truncate_with_notice(content: &str, limit: usize) -> String {
    if content.len() <= limit {
        return content.to_string();
    }

    let mut end = limit;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }

    let mut truncated = content[..end].to_string();
    if let Some(index) = truncated.rfind('\n') {
        truncated.truncate(index);
    }

    truncated.push_str("\n...[TRUNCATED]");
    truncated
}

/// Decodes `answer.in.gz` when the case ships one.
async fn read_stdin_fixture(case_dir: &Path) -> Result<StdinSource> {
    let path = case_dir.join(STDIN_FIXTURE);
    if !path.exists() {
        return Ok(StdinSource::Null);
    }

    let compressed = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))?;
    let mut input = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut input)
        .with_context(|| format!("Could not decompress {}", path.display()))?;

    Ok(StdinSource::Bytes(input))
}

/// Grades generated IR by compiling and running it next to the reference,
/// then comparing exit code, stdout and self-reported running time.
#[derive(Debug, Clone)]
pub struct ExecutionComparator {
    /// toolchain and per-step deadline
    toolchain: ToolchainConfig,
    /// whether output diffs are logged
    verbosity: Verbosity,
}

impl ExecutionComparator {
    /// Creates a comparator building executables with `toolchain`.
    pub fn new(toolchain: ToolchainConfig, verbosity: Verbosity) -> Self {
        Self {
            toolchain,
            verbosity,
        }
    }

    /// Compiles `ir` into `exe`.
    async fn compile(&self, ir: &Path, exe: &Path) -> Result<Collected, ProcessError> {
        run_collect(
            &self.toolchain.compiler,
            &self.toolchain.compile_args(ir, exe),
            StdinSource::Null,
            None,
            self.toolchain.timeout,
        )
        .await
    }

    /// Runs `exe` with the case's stdin, inside the directory holding it.
    async fn execute(&self, exe: &Path, stdin: StdinSource) -> Result<Collected, ProcessError> {
        run_collect(exe, &[], stdin, exe.parent(), self.toolchain.timeout).await
    }

    /// Compiles and runs one side, recording both steps in `progress`. The
    /// reference side must go first.
    async fn build_and_run(
        &self,
        side: Side,
        ir: &Path,
        exe: &Path,
        stdin: StdinSource,
        progress: &mut StageProgress,
    ) -> Result<(), CaseError> {
        let compiled = match self.compile(ir, exe).await {
            Ok(compiled) => progress.record(compiled),
            Err(e) => return Err(progress.classify(e)),
        };
        if !compiled.status.success() {
            error!("\ncompiling the {side} failed\n{}", compiled.transcript());
            return Err(CaseError::CompileFailure(side));
        }

        let ran = match self.execute(exe, stdin).await {
            Ok(ran) => progress.record(ran),
            Err(e) => return Err(progress.classify(e)),
        };
        info!(
            "{side} ran for {}, return code {}",
            parse_timing_marker(&ran.stderr)
                .map_or_else(|| String::from("an unknown time"), |us| format!("{us}us")),
            ran.return_code()
        );

        Ok(())
    }

    /// Checks exit codes, stdout and timings of two finished runs.
    fn judge(&self, reference: &Collected, candidate: &Collected) -> Result<Verdict, CaseError> {
        let (expected_code, actual_code) = (reference.return_code(), candidate.return_code());
        if expected_code != actual_code {
            info!(
                "\nreturn code mismatch\n>----\nreference: {expected_code}\ncandidate: \
                 {actual_code}\n<----"
            );
            return Err(CaseError::ReturnCodeMismatch {
                reference: expected_code,
                candidate: actual_code,
            });
        }

        if reference.stdout != candidate.stdout {
            let expected = String::from_utf8_lossy(&reference.stdout);
            let actual = String::from_utf8_lossy(&candidate.stdout);
            info!(
                "\noutput mismatch\n>----\nreference output: {}\ncandidate output: {}\n<----",
                truncate_with_notice(&expected, OUTPUT_EXCERPT),
                truncate_with_notice(&actual, OUTPUT_EXCERPT),
            );
            if self.verbosity.is_detailed() {
                let diff = TextDiff::from_lines(expected.as_ref(), actual.as_ref());
                let mut unified = diff.unified_diff();
                unified.context_radius(3).header("reference", "candidate");
                info!("\n{}", truncate_with_notice(&unified.to_string(), OUTPUT_EXCERPT));
            }
            return Err(CaseError::OutputMismatch);
        }

        let reference_us = match parse_timing_marker(&reference.stderr) {
            Some(us) if us > 0 => us,
            _ => {
                error!("\nthe reference did not report its running time");
                return Err(CaseError::TimingUnavailable(Side::Reference));
            }
        };
        let candidate_us = match parse_timing_marker(&candidate.stderr) {
            Some(us) if us > 0 => us,
            _ => {
                error!("\nthe candidate did not report its running time");
                return Err(CaseError::TimingUnavailable(Side::Candidate));
            }
        };

        Ok(Verdict::new(100.0 * reference_us as f64 / candidate_us as f64, outcome::PASSED))
    }
}

impl Comparator for ExecutionComparator {
    fn task(&self) -> &'static str {
        "exec"
    }

    async fn compare(&self, case_dir: &Path) -> Result<Verdict, CaseError> {
        let case_dir = &std::path::absolute(case_dir)
            .with_context(|| format!("Could not resolve {}", case_dir.display()))?;
        let reference_ir = case_dir.join(IR_REFERENCE);
        if !reference_ir.exists() {
            return Err(CaseError::MissingReference(reference_ir));
        }
        let candidate_ir = case_dir.join(IR_CANDIDATE);
        if !candidate_ir.exists() {
            return Err(CaseError::MissingCandidate(candidate_ir));
        }

        let stdin = read_stdin_fixture(case_dir).await?;
        let reference_exe: PathBuf = case_dir.join(REFERENCE_EXE);
        let candidate_exe: PathBuf = case_dir.join(CANDIDATE_EXE);
        let mut progress = StageProgress::default();

        self.build_and_run(
            Side::Reference,
            &reference_ir,
            &reference_exe,
            stdin.clone(),
            &mut progress,
        )
        .await?;
        self.build_and_run(Side::Candidate, &candidate_ir, &candidate_exe, stdin, &mut progress)
            .await?;

        let (reference, candidate) = progress.runs()?;
        let verdict = self.judge(reference, candidate)?;
        info!("\n{} passed", case_dir.display());
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_marker_uses_the_last_occurrence() {
        let stderr = b"TOTAL: 0H-0M-0S-5us\nnoise\nTOTAL: 1H-2M-3S-4us\n";
        assert_eq!(parse_timing_marker(stderr), Some(((60 + 2) * 60 + 3) * 1_000_000 + 4));
    }

    #[test]
    fn missing_or_garbled_marker_yields_none() {
        assert_eq!(parse_timing_marker(b""), None);
        assert_eq!(parse_timing_marker(b"TOTAL: H-M-S-us"), None);
        assert_eq!(parse_timing_marker(b"TOTAL: 0H-0M-0S-0us"), Some(0));
    }

    #[test]
    fn pending_stage_follows_protocol_order() {
        let done = || {
            Some(Collected {
                status: std::process::ExitStatus::default(),
                stdout: Vec::new(),
                stderr: Vec::new(),
            })
        };
        let mut progress = StageProgress::default();
        assert_eq!(progress.pending_stage(), Stage::ReferenceCompile);
        progress.reference_compile = done();
        assert_eq!(progress.pending_stage(), Stage::ReferenceRun);
        progress.reference_run = done();
        assert_eq!(progress.pending_stage(), Stage::CandidateCompile);
        progress.candidate_compile = done();
        assert_eq!(progress.pending_stage(), Stage::CandidateRun);

        let err = progress.classify(ProcessError::TimedOut {
            program: "output.out".into(),
            limit:   std::time::Duration::from_secs(1),
        });
        assert_eq!(err.outcome(), "candidate execution timeout");
    }

    #[test]
    fn truncation_stops_at_a_line_boundary() {
        let text = "line one\nline two\nline three";
        assert_eq!(truncate_with_notice(text, 12), "line one\n...[TRUNCATED]");
        assert_eq!(truncate_with_notice(text, 100), text);
    }
}
