// 🔑 Password Record - the shared data model
// Original/transformed pair, applied-rule history, per-checker verdicts

use crate::entropy::{round2, seed_entropy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Literal reason a checker reports for an accepted password
pub const ACCEPTED: &str = "OK";

/// Reason written by score normalization for a low-scoring, reason-less verdict
pub const LOW_SCORE: &str = "Low password score";

// ============================================================================
// CHECKER OUTPUT
// ============================================================================

/// Verdict of one external checker on one password
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckerOutput {
    /// Rejection reason, or `"OK"` when accepted
    #[serde(default)]
    pub reason: String,

    /// Numeric score, for checkers that produce one
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl CheckerOutput {
    pub fn new(reason: impl Into<String>, score: Option<f64>) -> Self {
        CheckerOutput {
            reason: reason.into(),
            score,
        }
    }

    pub fn accepted(score: Option<f64>) -> Self {
        CheckerOutput::new(ACCEPTED, score)
    }

    pub fn is_accepted(&self) -> bool {
        self.reason == ACCEPTED
    }
}

// ============================================================================
// APPLIED RULE
// ============================================================================

/// One entry of a record's mutation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedRule {
    pub rule: String,
    pub entropy_delta: f64,
}

// ============================================================================
// CHARACTER CLASSES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharClass {
    Lower,
    Upper,
    Number,
    Special,
}

impl CharClass {
    pub fn of(c: char) -> CharClass {
        if c.is_lowercase() {
            CharClass::Lower
        } else if c.is_uppercase() {
            CharClass::Upper
        } else if c.is_ascii_digit() {
            CharClass::Number
        } else {
            CharClass::Special
        }
    }

    /// Parse the names used in filter configuration
    pub fn parse(name: &str) -> Option<CharClass> {
        match name.trim().to_lowercase().as_str() {
            "lower" | "lower letter" | "lowercase" => Some(CharClass::Lower),
            "upper" | "upper letter" | "uppercase" => Some(CharClass::Upper),
            "number" | "digit" => Some(CharClass::Number),
            "special" | "special char" => Some(CharClass::Special),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharClass::Lower => "lower",
            CharClass::Upper => "upper",
            CharClass::Number => "number",
            CharClass::Special => "special",
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// PASSWORD RECORD
// ============================================================================

/// A password before and after mutation, plus everything learned about it
///
/// The original pair is private and fixed at construction. `applied_rules`
/// is `None` for a seed record and `Some` once the record went through a
/// transformation pipeline, even if that pipeline had no rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordRecord {
    original_password: String,
    original_entropy: f64,

    pub transformed_password: String,
    pub transformed_entropy: f64,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    applied_rules: Option<Vec<AppliedRule>>,

    /// Rule configuration errors raised against this record
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rule_errors: Vec<String>,

    #[serde(default)]
    pub checker_outputs: BTreeMap<String, CheckerOutput>,
}

impl PasswordRecord {
    /// Seed record with entropy from the character-space formula
    pub fn new(password: impl Into<String>) -> Self {
        let password = password.into();
        let entropy = seed_entropy(&password);
        PasswordRecord::with_entropy(password, entropy)
    }

    /// Seed record with a caller-supplied entropy
    pub fn with_entropy(password: impl Into<String>, entropy: f64) -> Self {
        let password = password.into();
        let entropy = round2(entropy);
        PasswordRecord {
            transformed_password: password.clone(),
            transformed_entropy: entropy,
            original_password: password,
            original_entropy: entropy,
            applied_rules: None,
            rule_errors: Vec::new(),
            checker_outputs: BTreeMap::new(),
        }
    }

    pub fn original_password(&self) -> &str {
        &self.original_password
    }

    pub fn original_entropy(&self) -> f64 {
        self.original_entropy
    }

    /// Whether the record went through a transformation pipeline
    pub fn is_mutated(&self) -> bool {
        self.applied_rules.is_some()
    }

    pub fn applied_rules(&self) -> &[AppliedRule] {
        self.applied_rules.as_deref().unwrap_or(&[])
    }

    /// Turn a seed record into a mutated one with an empty history
    pub fn mark_mutated(&mut self) {
        if self.applied_rules.is_none() {
            self.applied_rules = Some(Vec::new());
        }
    }

    /// Replace the transformed password and credit the delta, appending history
    pub fn record_rule(&mut self, rule: &str, password: String, entropy_delta: f64) {
        let entropy_delta = round2(entropy_delta);
        self.transformed_password = password;
        self.transformed_entropy = round2(self.transformed_entropy + entropy_delta);
        self.applied_rules
            .get_or_insert_with(Vec::new)
            .push(AppliedRule {
                rule: rule.to_string(),
                entropy_delta,
            });
    }

    pub fn entropy_change(&self) -> f64 {
        round2(self.transformed_entropy - self.original_entropy)
    }

    pub fn character_classes(&self) -> BTreeSet<CharClass> {
        self.transformed_password.chars().map(CharClass::of).collect()
    }

    pub fn distinct_character_count(&self) -> usize {
        self.transformed_password.chars().collect::<BTreeSet<_>>().len()
    }

    pub fn length(&self) -> usize {
        self.transformed_password.chars().count()
    }

    pub fn checker(&self, name: &str) -> Option<&CheckerOutput> {
        self.checker_outputs.get(name)
    }

    /// Names of the checkers that accepted this password
    pub fn accepted_by(&self) -> Vec<&str> {
        self.checker_outputs
            .iter()
            .filter(|(_, output)| output.is_accepted())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
