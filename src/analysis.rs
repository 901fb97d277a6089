// 📊 Aggregate Analysis
// Acceptance rates and rejection-reason histograms per checker, plus
// per-rule entropy statistics, over an already filtered collection.

use crate::entropy::round2;
use crate::record::PasswordRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// CHECKER SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonShare {
    pub reason: String,
    pub count: usize,
    /// Share of the whole filtered collection, not just the rejected part
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckerSummary {
    pub checker: String,
    pub total: usize,
    pub accepted: usize,
    pub accepted_pct: f64,
    pub rejected: usize,
    pub rejected_pct: f64,
    /// Records with no output at all for this checker
    pub missing: usize,
    /// Most frequent first; ties keep first-seen order
    pub reasons: Vec<ReasonShare>,
}

impl CheckerSummary {
    pub fn summary(&self) -> String {
        format!(
            "{}: accepted {} ({:.2}%), rejected {} ({:.2}%), {} distinct reasons",
            self.checker,
            self.accepted,
            self.accepted_pct,
            self.rejected,
            self.rejected_pct,
            self.reasons.len()
        )
    }

    pub fn top_reason(&self) -> Option<&ReasonShare> {
        self.reasons.first()
    }
}

/// Percentage of `total`, rounded to 2 decimals; 0 for an empty collection
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(count as f64 * 100.0 / total as f64)
}

/// Every checker name present in the collection, in first-seen order
pub fn checker_names(records: &[PasswordRecord]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        for name in record.checker_outputs.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

/// Count `items` by key, most frequent first, ties in first-seen order
fn ranked<'a>(items: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for item in items {
        match index.get(item) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(item, counts.len());
                counts.push((item.to_string(), 1));
            }
        }
    }

    // Stable sort keeps insertion order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

pub fn summarize_checker(records: &[PasswordRecord], checker: &str) -> CheckerSummary {
    let total = records.len();
    let outputs: Vec<_> = records.iter().filter_map(|r| r.checker(checker)).collect();

    let accepted = outputs.iter().filter(|o| o.is_accepted()).count();
    let rejected = outputs.len() - accepted;

    let reasons = ranked(
        outputs
            .iter()
            .filter(|o| !o.is_accepted())
            .map(|o| o.reason.as_str()),
    )
    .into_iter()
    .map(|(reason, count)| ReasonShare {
        reason,
        count,
        percentage: percentage(count, total),
    })
    .collect();

    CheckerSummary {
        checker: checker.to_string(),
        total,
        accepted,
        accepted_pct: percentage(accepted, total),
        rejected,
        rejected_pct: percentage(rejected, total),
        missing: total - outputs.len(),
        reasons,
    }
}

pub fn summarize(records: &[PasswordRecord], checkers: &[String]) -> Vec<CheckerSummary> {
    checkers
        .iter()
        .map(|checker| summarize_checker(records, checker))
        .collect()
}

// ============================================================================
// RULE STATISTICS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStats {
    pub rule: String,
    pub invocations: usize,
    /// Invocations with a non-zero delta
    pub effective: usize,
    pub total_delta: f64,
    pub mean_delta: f64,
}

/// Per-rule statistics over every record's history, in first-seen order
pub fn rule_stats(records: &[PasswordRecord]) -> Vec<RuleStats> {
    let mut stats: Vec<RuleStats> = Vec::new();

    for applied in records.iter().flat_map(|r| r.applied_rules()) {
        let entry = match stats.iter().position(|s| s.rule == applied.rule) {
            Some(i) => &mut stats[i],
            None => {
                stats.push(RuleStats {
                    rule: applied.rule.clone(),
                    invocations: 0,
                    effective: 0,
                    total_delta: 0.0,
                    mean_delta: 0.0,
                });
                let last = stats.len() - 1;
                &mut stats[last]
            }
        };

        entry.invocations += 1;
        if applied.entropy_delta != 0.0 {
            entry.effective += 1;
        }
        entry.total_delta = round2(entry.total_delta + applied.entropy_delta);
    }

    for entry in stats.iter_mut() {
        entry.mean_delta = round2(entry.total_delta / entry.invocations as f64);
    }

    stats
}

// ============================================================================
// REPORT
// ============================================================================

/// Everything the reporting layer renders for one filtered collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub record_count: usize,
    pub mean_entropy_change: f64,
    pub checkers: Vec<CheckerSummary>,
    pub rules: Vec<RuleStats>,
}

impl Report {
    /// Summarize every checker present in `records`
    pub fn build(records: &[PasswordRecord]) -> Self {
        Report::for_checkers(records, &checker_names(records))
    }

    pub fn for_checkers(records: &[PasswordRecord], checkers: &[String]) -> Self {
        let mean_entropy_change = if records.is_empty() {
            0.0
        } else {
            round2(records.iter().map(|r| r.entropy_change()).sum::<f64>() / records.len() as f64)
        };

        Report {
            generated_at: Utc::now(),
            record_count: records.len(),
            mean_entropy_change,
            checkers: summarize(records, checkers),
            rules: rule_stats(records),
        }
    }

    pub fn header() -> Vec<&'static str> {
        vec![
            "checker",
            "accepted",
            "accepted_pct",
            "rejected",
            "rejected_pct",
            "reason",
            "reason_count",
            "reason_pct",
        ]
    }

    /// One row per (checker, rejection reason); checkers without rejections get one row
    pub fn rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::new();

        for summary in &self.checkers {
            let base = vec![
                summary.checker.clone(),
                summary.accepted.to_string(),
                format!("{:.2}", summary.accepted_pct),
                summary.rejected.to_string(),
                format!("{:.2}", summary.rejected_pct),
            ];

            if summary.reasons.is_empty() {
                let mut row = base;
                row.extend([String::new(), String::new(), String::new()]);
                rows.push(row);
                continue;
            }

            for share in &summary.reasons {
                let mut row = base.clone();
                row.push(share.reason.clone());
                row.push(share.count.to_string());
                row.push(format!("{:.2}", share.percentage));
                rows.push(row);
            }
        }

        rows
    }
}

// ============================================================================
// TESTS
// ============================================================================
