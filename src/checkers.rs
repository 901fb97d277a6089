// 🧪 Checker Results - ingestion boundary for external password checkers
// Checkers run elsewhere; their verdicts arrive as `password,reason,score`
// rows and are attached to records by transformed password.

use crate::record::{CheckerOutput, PasswordRecord};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// One CSV row produced by a checker run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckerRow {
    pub password: String,

    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub score: Option<f64>,
}

/// All verdicts of one named checker, keyed by the password it judged
#[derive(Debug, Clone, Default)]
pub struct CheckerResults {
    pub checker: String,
    results: HashMap<String, CheckerOutput>,
}

/// Outcome of attaching results to a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachSummary {
    pub attached: usize,
    pub unmatched: usize,
}

impl CheckerResults {
    pub fn new(checker: impl Into<String>) -> Self {
        CheckerResults {
            checker: checker.into(),
            results: HashMap::new(),
        }
    }

    /// Builder: add one verdict; a later verdict for the same password wins
    pub fn with_result(mut self, password: impl Into<String>, output: CheckerOutput) -> Self {
        self.insert(password, output);
        self
    }

    pub fn insert(&mut self, password: impl Into<String>, output: CheckerOutput) {
        self.results.insert(password.into(), output);
    }

    pub fn from_rows(checker: impl Into<String>, rows: impl IntoIterator<Item = CheckerRow>) -> Self {
        let mut results = CheckerResults::new(checker);
        for row in rows {
            results.insert(row.password, CheckerOutput::new(row.reason, row.score));
        }
        results
    }

    /// Read `password,reason,score` rows (header required, score may be empty)
    pub fn from_csv(checker: impl Into<String>, csv_path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(csv_path)
            .with_context(|| format!("Failed to open checker CSV: {:?}", csv_path))?;

        let mut rows = Vec::new();
        for result in rdr.deserialize() {
            let row: CheckerRow = result.context("Failed to deserialize checker row")?;
            rows.push(row);
        }

        let results = CheckerResults::from_rows(checker, rows);
        info!(checker = results.checker.as_str(), results = results.len(), "loaded checker results");
        Ok(results)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, password: &str) -> Option<&CheckerOutput> {
        self.results.get(password)
    }

    /// Set `checker_outputs[checker]` on every record with a verdict for its transformed password
    pub fn attach(&self, records: &mut [PasswordRecord]) -> AttachSummary {
        let mut summary = AttachSummary {
            attached: 0,
            unmatched: 0,
        };

        for record in records.iter_mut() {
            match self.results.get(&record.transformed_password) {
                Some(output) => {
                    record
                        .checker_outputs
                        .insert(self.checker.clone(), output.clone());
                    summary.attached += 1;
                }
                None => summary.unmatched += 1,
            }
        }

        if summary.unmatched > 0 {
            warn!(
                checker = self.checker.as_str(),
                unmatched = summary.unmatched,
                "records without a checker verdict"
            );
        }

        summary
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_attach_by_transformed_password() {
        let mut records = vec![PasswordRecord::new("abc"), PasswordRecord::new("xyz")];
        records[1].record_rule("CapitalizeAllLetters", "XYZ".to_string(), 1.0);

        let results = CheckerResults::new("zxcvbn")
            .with_result("abc", CheckerOutput::new("", Some(0.0)))
            .with_result("XYZ", CheckerOutput::accepted(Some(4.0)))
            .with_result("xyz", CheckerOutput::new("stale", None));

        let summary = results.attach(&mut records);

        assert_eq!(summary, AttachSummary { attached: 2, unmatched: 0 });
        assert_eq!(records[1].checker("zxcvbn"), Some(&CheckerOutput::accepted(Some(4.0))));
    }

    #[test]
    fn test_attach_counts_unmatched() {
        let mut records = vec![PasswordRecord::new("abc")];
        let summary = CheckerResults::new("nist").attach(&mut records);

        assert_eq!(summary.unmatched, 1);
        assert!(records[0].checker_outputs.is_empty());
    }

    #[test]
    fn test_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zxcvbn.csv");
        fs::write(
            &path,
            "password,reason,score\nabc,,1\nTr0ub4dor,OK,4\nhunter2,Common password,\n",
        )
        .unwrap();

        let results = CheckerResults::from_csv("zxcvbn", &path).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results.get("abc"), Some(&CheckerOutput::new("", Some(1.0))));
        assert_eq!(results.get("hunter2").unwrap().score, None);
        assert!(results.get("Tr0ub4dor").unwrap().is_accepted());
    }

    #[test]
    fn test_from_csv_missing_file() {
        assert!(CheckerResults::from_csv("x", Path::new("/nonexistent.csv")).is_err());
    }
}
