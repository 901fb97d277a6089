// 🔁 Transformation Pipeline
// Ordered rules applied once each, in order, to every record of a batch

use crate::record::PasswordRecord;
use crate::rules::{MutationSource, Rule};
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Raw input to the pipeline: a password and maybe an entropy already known for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPassword {
    pub password: String,

    #[serde(default)]
    pub entropy: Option<f64>,
}

impl RawPassword {
    pub fn into_record(self) -> PasswordRecord {
        match self.entropy {
            Some(entropy) => PasswordRecord::with_entropy(self.password, entropy),
            None => PasswordRecord::new(self.password),
        }
    }
}

impl From<&str> for RawPassword {
    fn from(password: &str) -> Self {
        RawPassword {
            password: password.to_string(),
            entropy: None,
        }
    }
}

impl From<(String, Option<f64>)> for RawPassword {
    fn from((password, entropy): (String, Option<f64>)) -> Self {
        RawPassword { password, entropy }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transformation {
    rules: Vec<Rule>,
}

impl Transformation {
    pub fn new() -> Self {
        Transformation { rules: Vec::new() }
    }

    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Transformation { rules }
    }

    /// Load the rule list from a JSON array
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rules: Vec<Rule> =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        Ok(Transformation::from_rules(rules))
    }

    /// Builder: append a rule at the end of the pipeline
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Run every rule once, in order, on one record
    pub fn apply_to_record(&self, record: &mut PasswordRecord, source: &mut dyn MutationSource) {
        record.mark_mutated();
        for rule in &self.rules {
            rule.apply(record, source);
        }
    }

    /// Run the pipeline over a batch; every input record comes back out
    pub fn apply(
        &self,
        mut records: Vec<PasswordRecord>,
        source: &mut dyn MutationSource,
    ) -> Vec<PasswordRecord> {
        for record in records.iter_mut() {
            self.apply_to_record(record, source);
        }

        let errors: usize = records.iter().map(|r| r.rule_errors.len()).sum();
        debug!(
            records = records.len(),
            rules = self.rules.len(),
            errors,
            "transformation applied"
        );

        records
    }

    /// Build seed records from raw passwords, then run the pipeline
    pub fn apply_to_passwords<I, T>(
        &self,
        passwords: I,
        source: &mut dyn MutationSource,
    ) -> Vec<PasswordRecord>
    where
        I: IntoIterator<Item = T>,
        T: Into<RawPassword>,
    {
        let records = passwords
            .into_iter()
            .map(|raw| Into::<RawPassword>::into(raw).into_record())
            .collect();
        self.apply(records, source)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::tests::ScriptedSource;
    use crate::rules::{RandomSource, RuleKind};

    #[test]
    fn test_empty_pipeline_still_emits_records() {
        let pipeline = Transformation::new();
        let records =
            pipeline.apply_to_passwords(["abc", "Def1"], &mut ScriptedSource::default());

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.is_mutated()));
        assert!(records.iter().all(|r| r.applied_rules().is_empty()));
        assert!(records.iter().all(|r| r.entropy_change() == 0.0));
    }

    #[test]
    fn test_rules_apply_in_configured_order() {
        let pipeline = Transformation::new()
            .with_rule(Rule::new(RuleKind::CapitalizeAllLetters))
            .with_rule(Rule::new(RuleKind::AddTwoRandomDigitsAsPrefix));

        let records = pipeline.apply_to_passwords(["password"], &mut ScriptedSource::digits(&[2, 3]));
        let record = &records[0];

        assert_eq!(record.transformed_password, "23PASSWORD");
        assert_eq!(record.transformed_entropy, 42.10);
        let names: Vec<&str> = record.applied_rules().iter().map(|r| r.rule.as_str()).collect();
        assert_eq!(names, vec!["CapitalizeAllLetters", "AddTwoRandomDigitsAsPrefix"]);
    }

    #[test]
    fn test_ranges_resolve_against_current_password() {
        // After the prefix the last character is still the original last one
        let pipeline = Transformation::new()
            .with_rule(Rule::new(RuleKind::AddTwoRandomDigitsAsPrefix))
            .with_rule(Rule::new(RuleKind::CapitalizeAllLetters).with_range(-1, -1));

        let records = pipeline.apply_to_passwords(["abc"], &mut ScriptedSource::digits(&[4, 4]));
        assert_eq!(records[0].transformed_password, "44abC");
    }

    #[test]
    fn test_bad_rule_does_not_abort_batch() {
        let pipeline = Transformation::new()
            .with_rule(Rule::new(RuleKind::CapitalizeAllLetters).with_range(3, 1))
            .with_rule(Rule::new(RuleKind::LowercaseAllLetters));

        let records = pipeline.apply_to_passwords(["ABCD", "EFGH"], &mut ScriptedSource::default());

        for record in &records {
            assert_eq!(record.rule_errors.len(), 1);
            assert_eq!(record.applied_rules().len(), 1);
        }
        assert_eq!(records[1].transformed_password, "efgh");
    }

    #[test]
    fn test_supplied_entropy_is_kept() {
        let pipeline = Transformation::new();
        let records = pipeline.apply_to_passwords(
            vec![("abc".to_string(), Some(99.0))],
            &mut ScriptedSource::default(),
        );
        assert_eq!(records[0].original_entropy(), 99.0);
    }

    #[test]
    fn test_seeded_batches_match() {
        let pipeline = Transformation::new()
            .with_rule(Rule::new(RuleKind::ApplySimpleLeet))
            .with_rule(Rule::new(RuleKind::ChangeRandomLetterToRandomLetter))
            .with_rule(Rule::new(RuleKind::AddTwoRandomDigitsAsPrefix));
        let passwords = ["sunshine", "letmein", "trustno1"];

        let first = pipeline.apply_to_passwords(passwords, &mut RandomSource::seeded(11));
        let second = pipeline.apply_to_passwords(passwords, &mut RandomSource::seeded(11));

        assert_eq!(first, second);
        assert!(first.iter().all(|r| r.applied_rules().len() == 3));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(
            &path,
            r#"[
                {"rule": "ApplySimpleLeet", "from_index": 1},
                {"rule": "AddRandomStringAtStartOrEnd", "choices": ["!", "?"], "entropy": 1.5}
            ]"#,
        )
        .unwrap();

        let pipeline = Transformation::from_file(&path).unwrap();
        assert_eq!(pipeline.rule_count(), 2);
        assert_eq!(pipeline.rules()[0].from_index, 1);
    }

    #[test]
    fn test_from_file_missing() {
        assert!(Transformation::from_file("/nonexistent/rules.json").is_err());
    }
}
