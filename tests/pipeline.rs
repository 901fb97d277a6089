// End-to-end: mutate → attach checker verdicts → filter → summarize

use pcl_lab::{
    CheckerOutput, CheckerResults, Filter, FilterKind, MutationSource, PasswordRecord, Query,
    RandomSource, Report, Rule, RuleKind, Transformation,
};
use serde_json::json;

/// Hands out fixed digits, then falls back to a fixed letter/index/coin
struct FixedDigits(Vec<u8>);

impl MutationSource for FixedDigits {
    fn digit(&mut self) -> u8 {
        if self.0.is_empty() {
            0
        } else {
            self.0.remove(0)
        }
    }

    fn letter(&mut self) -> char {
        'q'
    }

    fn index(&mut self, _len: usize) -> usize {
        0
    }

    fn coin(&mut self) -> bool {
        true
    }
}

#[test]
fn test_capitalize_then_digit_prefix() {
    let pipeline = Transformation::new()
        .with_rule(Rule::new(RuleKind::CapitalizeAllLetters))
        .with_rule(Rule::new(RuleKind::AddTwoRandomDigitsAsPrefix));

    let records = pipeline.apply_to_passwords(["password"], &mut FixedDigits(vec![2, 3]));
    let record = &records[0];

    assert_eq!(record.original_password(), "password");
    assert_eq!(record.original_entropy(), 37.60);
    assert_eq!(record.transformed_password, "23PASSWORD");
    assert_eq!(record.transformed_entropy, 42.10);
    assert_eq!(record.entropy_change(), 4.5);

    let history: Vec<(&str, f64)> = record
        .applied_rules()
        .iter()
        .map(|r| (r.rule.as_str(), r.entropy_delta))
        .collect();
    assert_eq!(
        history,
        vec![("CapitalizeAllLetters", 1.0), ("AddTwoRandomDigitsAsPrefix", 3.5)]
    );
}

#[test]
fn test_misconfigured_rule_in_batch() {
    let pipeline = Transformation::new()
        .with_rule(Rule::new(RuleKind::ApplySimpleLeet).with_range(5, 2))
        .with_rule(Rule::new(RuleKind::AddTwoRandomDigitsAsPrefix));

    let passwords: Vec<String> = (0..500).map(|i| format!("user{i}pass")).collect();
    let records =
        pipeline.apply_to_passwords(passwords.iter().map(String::as_str), &mut RandomSource::seeded(3));

    assert_eq!(records.len(), 500);
    assert!(records.iter().all(|r| r.rule_errors.len() == 1));
    assert!(records.iter().all(|r| r.applied_rules().len() == 1));
    assert!(records.iter().all(|r| r.transformed_password.len() == r.original_password().len() + 2));
}

#[test]
fn test_full_analysis_flow() {
    let pipeline = Transformation::new().with_rule(Rule::new(RuleKind::CapitalizeFirstLetter));
    let mut records = pipeline.apply_to_passwords(
        ["monkey", "dragon", "qwerty", "sunshine"],
        &mut RandomSource::seeded(1),
    );

    let zxcvbn = CheckerResults::new("zxcvbn")
        .with_result("Monkey", CheckerOutput::new("", Some(1.0)))
        .with_result("Dragon", CheckerOutput::new("", Some(3.0)))
        .with_result("Qwerty", CheckerOutput::new("", Some(0.0)))
        .with_result("Sunshine", CheckerOutput::new("", Some(4.0)));
    let nist = CheckerResults::new("nist")
        .with_result("Monkey", CheckerOutput::new("Too short", None))
        .with_result("Dragon", CheckerOutput::new("Too short", None))
        .with_result("Qwerty", CheckerOutput::new("Keyboard pattern", None))
        .with_result("Sunshine", CheckerOutput::accepted(None));

    assert_eq!(zxcvbn.attach(&mut records).attached, 4);
    assert_eq!(nist.attach(&mut records).attached, 4);

    let mut query = Query::new(records)
        .with_filter(Filter::with_arg(
            FilterKind::ChangePclOutputByScore,
            json!({"zxcvbn": 3}),
        ))
        .with_filter(Filter::new(FilterKind::MutatedOnly));
    query.apply_filter();

    let report = Report::build(query.records());
    let zxcvbn_summary = report.checkers.iter().find(|s| s.checker == "zxcvbn").unwrap();
    assert_eq!(zxcvbn_summary.accepted, 2);
    assert_eq!(zxcvbn_summary.rejected, 2);
    assert_eq!(zxcvbn_summary.reasons[0].reason, "Low password score");
    assert_eq!(zxcvbn_summary.reasons[0].percentage, 50.0);

    let nist_summary = report.checkers.iter().find(|s| s.checker == "nist").unwrap();
    assert_eq!(nist_summary.reasons[0].reason, "Too short");
    assert_eq!(nist_summary.reasons[0].count, 2);
    assert_eq!(nist_summary.reasons[1].reason, "Keyboard pattern");

    // Accepted by one checker but not the other
    query.clear_filter();
    query.add_filter(Filter::new(FilterKind::AcceptedByExactlyOne));
    let passwords: Vec<&str> = query
        .apply_filter()
        .iter()
        .map(|r| r.transformed_password.as_str())
        .collect();
    assert_eq!(passwords, vec!["Dragon"]);
}

#[test]
fn test_score_filters_skip_records_without_score() {
    let mut scored = PasswordRecord::new("abc");
    scored
        .checker_outputs
        .insert("X".to_string(), CheckerOutput::new("", Some(39.0)));
    let mut unscored = PasswordRecord::new("def");
    unscored
        .checker_outputs
        .insert("X".to_string(), CheckerOutput::new("Weak", None));

    let records = vec![scored, unscored];
    let lower = Filter::with_arg(FilterKind::ScoreLower, json!({"X": 40})).apply(records.clone());
    let higher = Filter::with_arg(FilterKind::ScoreHigher, json!({"X": 40})).apply(records);

    assert_eq!(lower.len(), 1);
    assert_eq!(lower[0].transformed_password, "abc");
    assert!(higher.is_empty());
}
