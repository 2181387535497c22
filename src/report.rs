#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use itertools::Itertools;
use serde_json::{Map, Value, json};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};
use typed_builder::TypedBuilder;

use crate::constants::{MAX_SCORE, REPORT_JSON, REPORT_TXT};

/// Anything the report manager can serialize. Keys of the produced record
/// are kept in lexicographic order by `serde_json::Map`.
pub trait Record {
    /// Field-keyed form of this report.
    fn to_record(&self) -> Map<String, Value>;

    /// One line of the fixed-width text report, without the newline.
    fn to_line(&self) -> String;
}

/// Result of scoring one case.
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
#[builder(doc)]
pub struct TestReport {
    /// Case identifier.
    #[builder(setter(into))]
    pub name:          String,
    /// Score awarded.
    pub score:         f64,
    /// Score of a perfect case.
    #[builder(default = MAX_SCORE)]
    pub max_score:     f64,
    /// Human-readable classification of the outcome.
    #[builder(setter(into))]
    pub outcome_label: String,
    /// Per-case log with the details.
    #[builder(default)]
    pub detail_path:   Option<PathBuf>,
}

impl Record for TestReport {
    fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("name".into(), json!(self.name));
        record.insert("score".into(), json!(self.score));
        record.insert("max_score".into(), json!(self.max_score));
        record.insert("outcome_label".into(), json!(self.outcome_label));
        record.insert(
            "detail_path".into(),
            json!(self.detail_path.as_ref().map(|p| p.display().to_string())),
        );
        record
    }

    fn to_line(&self) -> String {
        format!(
            "{:>8}/{:<8}{:<20}{:>20}",
            format!("{:.2}", self.score),
            format!("{:.2}", self.max_score),
            self.name,
            self.outcome_label
        )
    }
}

/// A single summary metric of the run.
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
#[builder(doc)]
pub struct LeaderboardEntry {
    /// Metric name.
    #[builder(setter(into))]
    pub name:       String,
    /// Metric value.
    pub value:      f64,
    /// Position of the metric on the leaderboard.
    #[builder(default = 1)]
    pub sort_order: i64,
    /// Whether higher values rank first.
    #[builder(default = true)]
    pub descending: bool,
    /// Unit or remark printed after the value.
    #[builder(default, setter(strip_option, into))]
    pub suffix:     Option<String>,
}

impl Record for LeaderboardEntry {
    fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("name".into(), json!(self.name));
        record.insert("value".into(), json!(self.value));
        record.insert("sort_order".into(), json!(self.sort_order));
        record.insert("descending".into(), json!(self.descending));
        record.insert("suffix".into(), json!(self.suffix));
        record
    }

    fn to_line(&self) -> String {
        let mut line = format!("{:>10}{:<10}", format!("{}:", self.name), float_repr(self.value));
        if let Some(suffix) = &self.suffix {
            let _ = write!(line, "{:<20}", format!(" {suffix}"));
        }
        line
    }
}

/// Renders a float the way the course's scoreboards always have: shortest
/// round-trip digits, whole numbers keep one decimal (`100.0`), and
/// magnitudes below `1e-4` or from `1e16` up switch to an exponent with a
/// sign and at least two digits (`1e-05`, `1.5e+16`).
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{value:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => formatted,
        };
    }

    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Row of the console overview table.
#[derive(Tabled)]
struct OverviewRow {
    #[tabled(rename = "Case")]
    /// case identifier
    name:    String,
    #[tabled(rename = "Score")]
    /// `score/max_score`
    score:   String,
    #[tabled(rename = "Outcome")]
    /// outcome label
    outcome: String,
}

/// Collects per-case reports and leaderboard entries in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ReportManager {
    /// per-case reports
    tests:       Vec<TestReport>,
    /// leaderboard entries
    leaderboard: Vec<LeaderboardEntry>,
}

impl ReportManager {
    /// An empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a case report.
    pub fn add_test_report(&mut self, report: TestReport) {
        self.tests.push(report);
    }

    /// Appends a leaderboard entry.
    pub fn add_leaderboard_entry(&mut self, entry: LeaderboardEntry) {
        self.leaderboard.push(entry);
    }

    /// Case reports, in insertion order.
    pub fn test_reports(&self) -> &[TestReport] {
        &self.tests
    }

    /// Leaderboard entries, in insertion order.
    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        &self.leaderboard
    }

    /// Structured form with `test_reports` and `leaderboard_reports`.
    pub fn to_value(&self) -> Value {
        json!({
            "test_reports": self.tests.iter().map(Record::to_record).collect::<Vec<_>>(),
            "leaderboard_reports": self.leaderboard.iter().map(Record::to_record).collect::<Vec<_>>(),
        })
    }

    /// Structured form, serialized.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_value()).context("Could not serialize the report")
    }

    /// Fixed-width text form: leaderboard entries first, then one line per
    /// case.
    pub fn to_text(&self) -> String {
        let leaderboard = self.leaderboard.iter().map(Record::to_line);
        let tests = self.tests.iter().map(Record::to_line);

        leaderboard.chain(tests).fold(String::new(), |mut txt, line| {
            txt.push_str(&line);
            txt.push('\n');
            txt
        })
    }

    /// Console table of every case with the leaderboard in the footer.
    pub fn overview(&self) -> String {
        let rows: Vec<OverviewRow> = self
            .tests
            .iter()
            .map(|t| OverviewRow {
                name:    t.name.clone(),
                score:   format!("{:.2}/{:.2}", t.score, t.max_score),
                outcome: t.outcome_label.clone(),
            })
            .collect();

        let footer = self
            .leaderboard
            .iter()
            .map(|e| format!("{}: {:.2}", e.name, e.value))
            .join("  ");

        Table::new(&rows)
            .with(Panel::header("Grading Overview"))
            .with(Panel::footer(footer))
            .with(Modify::new(Rows::new(1..)).with(Width::wrap(32).keep_words(true)))
            .with(
                Modify::new(Rows::first())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(
                Modify::new(Rows::last())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(Style::modern())
            .to_string()
    }

    /// Writes the structured and the text report into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let json_path = dir.join(REPORT_JSON);
        fs::write(&json_path, self.to_json()?)
            .with_context(|| format!("Could not write {}", json_path.display()))?;

        let txt_path = dir.join(REPORT_TXT);
        fs::write(&txt_path, self.to_text())
            .with_context(|| format!("Could not write {}", txt_path.display()))?;

        Ok(())
    }
}
