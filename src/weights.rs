#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{constants::DEFAULT_WEIGHT, error::GradingError};

/// One line of the weight table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightEntry {
    /// Directory name of the case under the case root.
    pub case_id: String,
    /// Contribution of the case to the weighted total.
    pub weight:  f64,
}

/// Ordered mapping of case identifier to weight. Iteration order is the
/// order in which cases are graded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeightTable {
    /// entries in first-seen order
    entries: Vec<WeightEntry>,
}

impl WeightTable {
    /// Reads and parses the weight table at `path`.
    pub fn load(path: &Path) -> Result<Self, GradingError> {
        let text = std::fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => GradingError::PathNotFound(path.to_path_buf()),
            _ => GradingError::ReadConfig {
                path: path.to_path_buf(),
                source,
            },
        })?;

        Self::parse_named(&text, path)
    }

    /// Parses a weight table held in memory.
    ///
    /// Lines with one token get the default weight, lines with two tokens
    /// carry their own weight, and every other line is skipped without
    /// complaint. A case listed twice keeps its first position and takes the
    /// last weight.
    pub fn parse(text: &str) -> Result<Self, GradingError> {
        Self::parse_named(text, Path::new("<weights>"))
    }

    /// Shared parser, `origin` only appears in error messages.
    fn parse_named(text: &str, origin: &Path) -> Result<Self, GradingError> {
        let mut table = Self::default();

        for (idx, line) in text.lines().enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let (case_id, weight) = match tokens.as_slice() {
                [case_id] => (*case_id, DEFAULT_WEIGHT),
                [case_id, weight] => {
                    let weight = weight.parse::<f64>().map_err(|_| GradingError::ConfigFormat {
                        path:   PathBuf::from(origin),
                        line:   idx + 1,
                        weight: weight.to_string(),
                    })?;
                    (*case_id, weight)
                }
                _ => continue,
            };
            table.insert(case_id, weight);
        }

        Ok(table)
    }

    /// Inserts or re-weights a case.
    pub fn insert(&mut self, case_id: impl Into<String>, weight: f64) {
        let case_id = case_id.into();
        match self.entries.iter_mut().find(|e| e.case_id == case_id) {
            Some(entry) => entry.weight = weight,
            None => self.entries.push(WeightEntry { case_id, weight }),
        }
    }

    /// Weight of `case_id`, if listed.
    pub fn weight_of(&self, case_id: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.case_id == case_id)
            .map(|e| e.weight)
    }

    /// Number of cases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no case is listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in grading order.
    pub fn iter(&self) -> std::slice::Iter<'_, WeightEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a WeightTable {
    type IntoIter = std::slice::Iter<'a, WeightEntry>;
    type Item = &'a WeightEntry;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
