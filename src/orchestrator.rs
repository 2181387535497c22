#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    path::{Path, PathBuf},
};

use anyhow::{Result, anyhow};
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::{
    accumulator::WeightedMean,
    constants::{SCORE_LOG, TOTAL_SCORE_NAME, outcome},
    error::{CaseError, GradingError},
    grade::{Comparator, Verdict},
    report::{LeaderboardEntry, ReportManager, TestReport, float_repr},
    routing::LogRouter,
    weights::WeightTable,
};

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_owned())
}

/// Drives one grading run: every case of the weight table, in order, through
/// a single comparator.
pub struct Orchestrator<C> {
    /// scoring strategy of this run
    comparator: C,
    /// directory holding one subdirectory per case
    case_root:  PathBuf,
    /// routing context shared with the `tracing` subscriber
    router:     LogRouter,
    /// reports collected so far
    reports:    ReportManager,
    /// weighted total so far
    total:      WeightedMean,
}

impl<C: Comparator> Orchestrator<C> {
    /// Creates an orchestrator for the cases under `case_root`.
    pub fn new(comparator: C, case_root: impl Into<PathBuf>, router: LogRouter) -> Self {
        Self {
            comparator,
            case_root: case_root.into(),
            router,
            reports: ReportManager::new(),
            total: WeightedMean::new(),
        }
    }

    /// Reports collected so far.
    pub fn reports(&self) -> &ReportManager {
        &self.reports
    }

    /// Weighted total of the cases graded so far.
    pub fn total(&self) -> f64 {
        self.total.mean()
    }

    /// Grades every case listed in the weight table at `weights_path`.
    ///
    /// A missing case root or weight table, or a malformed weight, fails the
    /// whole run before any case is graded. Every problem with an individual
    /// case is recorded on that case's report instead.
    pub async fn run(&mut self, weights_path: &Path) -> Result<f64, GradingError> {
        if !self.case_root.exists() {
            return Err(GradingError::PathNotFound(self.case_root.clone()));
        }
        let table = WeightTable::load(weights_path)?;
        Ok(self.grade_all(&table).await)
    }

    /// Grades the cases of `table` in order and records the weighted total
    /// on the leaderboard.
    pub async fn grade_all(&mut self, table: &WeightTable) -> f64 {
        let count = table.len();

        for (idx, entry) in table.iter().enumerate() {
            let report = self.grade_case(&entry.case_id).await;
            info!("[{}/{count}] {} score: {}", idx + 1, entry.case_id, float_repr(report.score));
            self.total.fold(report.score, entry.weight);
            self.reports.add_test_report(report);
        }

        let total = self.total.mean();
        self.reports.add_leaderboard_entry(
            LeaderboardEntry::builder()
                .name(TOTAL_SCORE_NAME)
                .value(total)
                .build(),
        );
        info!("{TOTAL_SCORE_NAME}: {total:.6}");
        total
    }

    /// Scores one case with its own log file selected, and turns whatever
    /// happened into a report. Never fails.
    pub async fn grade_case(&mut self, case_id: &str) -> TestReport {
        let case_dir = self.case_root.join(case_id);
        let sink = match self.router.open_case(&case_dir.join(SCORE_LOG)) {
            Ok(sink) => Some(sink),
            Err(e) => {
                warn!("{e:#}; logging {case_id} to the console instead");
                None
            }
        };

        info!("case: {case_id}");
        info!("path: {}", case_dir.display());

        let verdict = match AssertUnwindSafe(self.comparator.compare(&case_dir))
            .catch_unwind()
            .await
        {
            Ok(verdict) => verdict,
            Err(payload) => Err(CaseError::Internal(anyhow!(
                "{} comparator panicked: {}",
                self.comparator.task(),
                panic_message(&*payload)
            ))),
        };

        let Verdict { score, outcome: label } = match verdict {
            Ok(verdict) => verdict,
            Err(CaseError::Internal(e)) => {
                error!("\nscoring {case_id} failed: {e:?}");
                Verdict::new(0.0, outcome::INTERNAL_ERROR)
            }
            Err(e) => {
                error!("\n{e}");
                Verdict::new(0.0, e.outcome())
            }
        };
        info!("score: {score:.6}");

        let detail_path = sink.as_ref().map(|s| s.path().to_path_buf());
        drop(sink);

        TestReport::builder()
            .name(case_id)
            .score(score)
            .outcome_label(label)
            .detail_path(detail_path)
            .build()
    }

    /// Appends the text report to the run-wide log and writes the report
    /// files under the case root.
    pub fn finish(mut self) -> Result<ReportManager> {
        let text = self.reports.to_text();
        self.router.route_to_aggregate();
        info!("\n{text}");
        self.router.route_to_console();

        if self.case_root.is_dir() {
            self.reports.write_to(&self.case_root)?;
        }
        Ok(self.reports)
    }
}
