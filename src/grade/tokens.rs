#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt::Display, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::{error, info};

use super::{Comparator, Verdict};
use crate::{
    config::Verbosity,
    constants::{LEX_CANDIDATE, LEX_REFERENCE, LOCATION_MARKER, outcome},
    error::CaseError,
};

/// One line of a token dump, split into the parts that are graded.
///
/// A line looks like `identifier 'main'  [StartOfLine]  Loc=<main.c:1:5>`:
/// the kind is the first word, the value sits between the first and the last
/// quote, the location starts at the last `Loc=<`, and whatever lies between
/// the value and the location describes the whitespace seen before the
/// token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLine<'a> {
    /// Token kind.
    pub kind:        &'a str,
    /// Literal text of the token.
    pub value:       &'a str,
    /// Whitespace flags between value and location.
    pub whitespace:  Vec<&'a str>,
    /// Source location, starting at the marker.
    pub location:    &'a str,
    /// False when a quote or the location marker is missing.
    pub well_formed: bool,
}

impl<'a> TokenLine<'a> {
    /// Splits a dump line into its graded parts.
    pub fn parse(line: &'a str) -> Self {
        let kind = line.split_whitespace().next().unwrap_or_default();

        match (line.find('\''), line.rfind('\''), line.rfind(LOCATION_MARKER)) {
            (Some(open), Some(close), Some(loc)) => Self {
                kind,
                value: line.get(open + 1..close).unwrap_or_default().trim(),
                whitespace: line
                    .get(close + 1..loc)
                    .map(|mid| mid.split_whitespace().collect())
                    .unwrap_or_default(),
                location: line[loc..].trim(),
                well_formed: true,
            },
            _ => Self {
                kind,
                value: "",
                whitespace: Vec::new(),
                location: "",
                well_formed: false,
            },
        }
    }
}

/// Per-tier counts of correctly recognized tokens.
///
/// The tiers are cumulative: a token only counts for its location if kind
/// and value were right, and only for whitespace if its location was right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierTally {
    /// Tokens in each dump.
    pub total:      usize,
    /// Tokens with the right kind and value.
    pub kind_value: usize,
    /// Of those, tokens with the right location.
    pub location:   usize,
    /// Of those, tokens with the right whitespace flags.
    pub whitespace: usize,
}

impl TierTally {
    /// `100 * (0.6 * kind_value + 0.3 * location + 0.1 * whitespace) / total`.
    ///
    /// Evaluated in tenths so a perfect dump lands on exactly `100.0`. Two
    /// empty dumps agree perfectly.
    pub fn score(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        let tenths = 6 * self.kind_value + 3 * self.location + self.whitespace;
        tenths as f64 * 10.0 / self.total as f64
    }
}

/// Grades a lexer by comparing its token dump with the reference dump, line
/// by line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenStreamComparator {
    /// how much of the per-token diagnostics to log
    verbosity: Verbosity,
}

impl TokenStreamComparator {
    /// Creates a comparator logging at `verbosity`.
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Tallies two dumps held in memory.
    pub fn tally(&self, reference: &str, candidate: &str) -> Result<TierTally, CaseError> {
        let reference: Vec<&str> = reference.lines().collect();
        let candidate: Vec<&str> = candidate.lines().collect();

        if reference.len() != candidate.len() {
            return Err(CaseError::TokenCountMismatch {
                reference: reference.len(),
                candidate: candidate.len(),
            });
        }

        let mut tally = TierTally {
            total: reference.len(),
            ..TierTally::default()
        };

        for (idx, (expected_line, actual_line)) in
            reference.iter().zip_eq(candidate.iter()).enumerate()
        {
            let number = idx + 1;
            let expected = TokenLine::parse(expected_line);
            let actual = TokenLine::parse(actual_line);

            if !expected.well_formed || !actual.well_formed {
                self.mismatch(number, "is malformed", expected_line, actual_line);
                continue;
            }
            if expected.kind != actual.kind {
                self.mismatch(number, "has the wrong kind", expected.kind, actual.kind);
                continue;
            }
            if expected.value != actual.value {
                self.mismatch(number, "has the wrong value", expected.value, actual.value);
                continue;
            }
            tally.kind_value += 1;

            if expected.location != actual.location {
                if self.verbosity.is_detailed() {
                    self.mismatch(number, "has the wrong location", expected.location, actual.location);
                }
                continue;
            }
            tally.location += 1;

            if expected.whitespace != actual.whitespace {
                if self.verbosity.is_detailed() {
                    self.mismatch(
                        number,
                        "has the wrong surrounding whitespace",
                        format_args!("{:?}", expected.whitespace),
                        format_args!("{:?}", actual.whitespace),
                    );
                }
                continue;
            }
            tally.whitespace += 1;
        }

        Ok(tally)
    }

    /// Logs one token-level mismatch, reference first.
    fn mismatch(&self, number: usize, what: &str, expected: impl Display, actual: impl Display) {
        error!("\ntoken {number} {what}\n< {expected}\n---\n> {actual}");
    }
}

/// Reads a dump, tolerating bytes that are not UTF-8.
async fn read_dump(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl Comparator for TokenStreamComparator {
    fn task(&self) -> &'static str {
        "lex"
    }

    async fn compare(&self, case_dir: &Path) -> Result<Verdict, CaseError> {
        let reference_path = case_dir.join(LEX_REFERENCE);
        if !reference_path.exists() {
            return Err(CaseError::MissingReference(reference_path));
        }
        let candidate_path = case_dir.join(LEX_CANDIDATE);
        if !candidate_path.exists() {
            return Err(CaseError::MissingCandidate(candidate_path));
        }

        let reference = read_dump(&reference_path).await?;
        let candidate = read_dump(&candidate_path).await?;
        let tally = self.tally(&reference, &candidate)?;

        info!("\ntokens: {}", tally.total);
        info!("with the right kind and value: {}", tally.kind_value);
        info!("with the right location: {}", tally.location);
        info!("with the right whitespace: {}", tally.whitespace);

        Ok(Verdict::new(tally.score(), outcome::GRADED))
    }
}
