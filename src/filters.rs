// 🔎 Filters - typed predicates over record collections
// A filter takes a collection and returns a (possibly smaller) new one.
// Misconfigured filters log a warning and pass their input through untouched.

use crate::error::FilterArgError;
use crate::record::{CharClass, PasswordRecord, ACCEPTED, LOW_SCORE};
use anyhow::{Context as AnyhowContext, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Thresholds used by `ChangePCLOutputByScore` when none are configured
pub const DEFAULT_SCORE_THRESHOLDS: [(&str, f64); 3] = [
    ("passwordmeter", 40.0),
    ("zxcvbn", 3.0),
    ("guesses", 10_000_001.0),
];

// ============================================================================
// ARGUMENT TYPES
// ============================================================================

/// Semantic type of a filter's configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Number,
    Text,
    TextList,
    /// Checker name → number
    NumberMap,
    /// Checker name → string
    TextMap,
}

impl ArgType {
    pub fn name(&self) -> &'static str {
        match self {
            ArgType::Number => "number",
            ArgType::Text => "string",
            ArgType::TextList => "list of strings",
            ArgType::NumberMap => "mapping of numbers",
            ArgType::TextMap => "mapping of strings",
        }
    }
}

/// What a filter expects as its configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub required: bool,
    /// `None` for filters that take no value at all
    pub arg_type: Option<ArgType>,
}

impl ArgSpec {
    const NONE: ArgSpec = ArgSpec {
        required: false,
        arg_type: None,
    };

    const fn required(arg_type: ArgType) -> ArgSpec {
        ArgSpec {
            required: true,
            arg_type: Some(arg_type),
        }
    }

    const fn optional(arg_type: ArgType) -> ArgSpec {
        ArgSpec {
            required: false,
            arg_type: Some(arg_type),
        }
    }
}

/// A configuration value after type checking
#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Absent,
    Number(f64),
    Text(String),
    TextList(Vec<String>),
    NumberMap(Vec<(String, f64)>),
    TextMap(Vec<(String, String)>),
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
    .to_string()
}

fn parse_arg(arg_type: ArgType, value: &Value) -> Option<Arg> {
    match arg_type {
        ArgType::Number => value.as_f64().map(Arg::Number),
        ArgType::Text => value.as_str().map(|s| Arg::Text(s.to_string())),
        ArgType::TextList => value
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(Arg::TextList),
        ArgType::NumberMap => value
            .as_object()?
            .iter()
            .map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
            .collect::<Option<Vec<_>>>()
            .map(Arg::NumberMap),
        ArgType::TextMap => value
            .as_object()?
            .iter()
            .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect::<Option<Vec<_>>>()
            .map(Arg::TextMap),
    }
}

// ============================================================================
// FILTER DEFINITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    MinLength,
    MaxLength,
    MinDistinctChars,
    MaxDistinctChars,
    /// Password has every listed character class
    ContainsCharClasses,
    /// Password has no character class outside the list
    OnlyCharClasses,
    PasswordRegex,
    /// Every listed checker's reason matches its regex
    ReasonRegex,
    /// Every listed checker's reason contains its substring
    ReasonContains,
    /// No listed checker's reason contains its substring
    ReasonDoesNotContain,
    /// At least one listed checker scores at or above its threshold
    ScoreHigher,
    /// At least one listed checker scores below its threshold
    ScoreLower,
    /// Accepted by exactly one checker, rejected by all the others
    AcceptedByExactlyOne,
    /// Accepted by the named checker, rejected by all the others
    AcceptedOnlyBy,
    /// Rewrites checker reasons from scores; the only mutating filter
    #[serde(rename = "ChangePCLOutputByScore")]
    ChangePclOutputByScore,
    MinEntropyChange,
    /// History contains the named rule with a non-zero delta
    RuleApplied,
    MutatedOnly,
}

impl FilterKind {
    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::MinLength => "MinLength",
            FilterKind::MaxLength => "MaxLength",
            FilterKind::MinDistinctChars => "MinDistinctChars",
            FilterKind::MaxDistinctChars => "MaxDistinctChars",
            FilterKind::ContainsCharClasses => "ContainsCharClasses",
            FilterKind::OnlyCharClasses => "OnlyCharClasses",
            FilterKind::PasswordRegex => "PasswordRegex",
            FilterKind::ReasonRegex => "ReasonRegex",
            FilterKind::ReasonContains => "ReasonContains",
            FilterKind::ReasonDoesNotContain => "ReasonDoesNotContain",
            FilterKind::ScoreHigher => "ScoreHigher",
            FilterKind::ScoreLower => "ScoreLower",
            FilterKind::AcceptedByExactlyOne => "AcceptedByExactlyOne",
            FilterKind::AcceptedOnlyBy => "AcceptedOnlyBy",
            FilterKind::ChangePclOutputByScore => "ChangePCLOutputByScore",
            FilterKind::MinEntropyChange => "MinEntropyChange",
            FilterKind::RuleApplied => "RuleApplied",
            FilterKind::MutatedOnly => "MutatedOnly",
        }
    }

    pub fn arg_spec(&self) -> ArgSpec {
        match self {
            FilterKind::MinLength
            | FilterKind::MaxLength
            | FilterKind::MinDistinctChars
            | FilterKind::MaxDistinctChars
            | FilterKind::MinEntropyChange => ArgSpec::required(ArgType::Number),
            FilterKind::ContainsCharClasses | FilterKind::OnlyCharClasses => {
                ArgSpec::required(ArgType::TextList)
            }
            FilterKind::PasswordRegex | FilterKind::AcceptedOnlyBy | FilterKind::RuleApplied => {
                ArgSpec::required(ArgType::Text)
            }
            FilterKind::ReasonRegex
            | FilterKind::ReasonContains
            | FilterKind::ReasonDoesNotContain => ArgSpec::required(ArgType::TextMap),
            FilterKind::ScoreHigher | FilterKind::ScoreLower => {
                ArgSpec::required(ArgType::NumberMap)
            }
            FilterKind::AcceptedByExactlyOne => ArgSpec::optional(ArgType::TextList),
            FilterKind::ChangePclOutputByScore => ArgSpec::optional(ArgType::NumberMap),
            FilterKind::MutatedOnly => ArgSpec::NONE,
        }
    }
}

/// A filter kind plus its untyped configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub filter: FilterKind,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<Value>,
}

/// A filter whose argument passed validation
enum Stage {
    MinLength(usize),
    MaxLength(usize),
    MinDistinct(usize),
    MaxDistinct(usize),
    ContainsClasses(BTreeSet<CharClass>),
    OnlyClasses(BTreeSet<CharClass>),
    PasswordRegex(Regex),
    ReasonRegex(Vec<(String, Regex)>),
    ReasonContains(Vec<(String, String)>),
    ReasonDoesNotContain(Vec<(String, String)>),
    ScoreHigher(Vec<(String, f64)>),
    ScoreLower(Vec<(String, f64)>),
    AcceptedByExactlyOne(Option<Vec<String>>),
    AcceptedOnlyBy(String),
    NormalizeByScore(Vec<(String, f64)>),
    MinEntropyChange(f64),
    RuleApplied(String),
    MutatedOnly,
}

impl Filter {
    pub fn new(filter: FilterKind) -> Self {
        Filter { filter, arg: None }
    }

    pub fn with_arg(filter: FilterKind, arg: impl Into<Value>) -> Self {
        Filter {
            filter,
            arg: Some(arg.into()),
        }
    }

    /// Load a filter chain from a JSON array of `{"filter": ..., "arg": ...}`
    pub fn load_chain<P: AsRef<Path>>(path: P) -> Result<Vec<Filter>> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read filters file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse filters JSON")
    }

    pub fn name(&self) -> &'static str {
        self.filter.name()
    }

    fn validate(&self) -> Result<Arg, FilterArgError> {
        let spec = self.filter.arg_spec();
        let Some(arg_type) = spec.arg_type else {
            return Ok(Arg::Absent);
        };

        match &self.arg {
            None | Some(Value::Null) if spec.required => Err(FilterArgError::Missing {
                filter: self.name(),
                expected: arg_type.name(),
            }),
            None | Some(Value::Null) => Ok(Arg::Absent),
            Some(value) => parse_arg(arg_type, value).ok_or_else(|| FilterArgError::WrongType {
                filter: self.name(),
                expected: arg_type.name(),
                found: describe(value),
            }),
        }
    }

    fn compile_regex(&self, pattern: &str) -> Result<Regex, FilterArgError> {
        Regex::new(pattern).map_err(|err| FilterArgError::InvalidRegex {
            filter: self.name(),
            pattern: pattern.to_string(),
            message: err.to_string(),
        })
    }

    fn char_classes(&self, names: &[String]) -> Result<BTreeSet<CharClass>, FilterArgError> {
        names
            .iter()
            .map(|name| {
                CharClass::parse(name).ok_or_else(|| FilterArgError::UnknownCharClass {
                    filter: self.name(),
                    class: name.clone(),
                })
            })
            .collect()
    }

    /// Check the argument and build the executable stage
    fn prepare(&self) -> Result<Stage, FilterArgError> {
        let arg = self.validate()?;
        // Fractional bounds round inward: at least 3.5 means at least 4
        let lower_bound = |n: f64| n.ceil().max(0.0) as usize;
        let upper_bound = |n: f64| n.floor().max(0.0) as usize;

        let stage = match (self.filter, arg) {
            (FilterKind::MinLength, Arg::Number(n)) => Stage::MinLength(lower_bound(n)),
            (FilterKind::MaxLength, Arg::Number(n)) => Stage::MaxLength(upper_bound(n)),
            (FilterKind::MinDistinctChars, Arg::Number(n)) => Stage::MinDistinct(lower_bound(n)),
            (FilterKind::MaxDistinctChars, Arg::Number(n)) => Stage::MaxDistinct(upper_bound(n)),
            (FilterKind::ContainsCharClasses, Arg::TextList(names)) => {
                Stage::ContainsClasses(self.char_classes(&names)?)
            }
            (FilterKind::OnlyCharClasses, Arg::TextList(names)) => {
                Stage::OnlyClasses(self.char_classes(&names)?)
            }
            (FilterKind::PasswordRegex, Arg::Text(pattern)) => {
                Stage::PasswordRegex(self.compile_regex(&pattern)?)
            }
            (FilterKind::ReasonRegex, Arg::TextMap(patterns)) => Stage::ReasonRegex(
                patterns
                    .into_iter()
                    .map(|(checker, pattern)| {
                        self.compile_regex(&pattern).map(|regex| (checker, regex))
                    })
                    .collect::<Result<_, FilterArgError>>()?,
            ),
            (FilterKind::ReasonContains, Arg::TextMap(needles)) => Stage::ReasonContains(needles),
            (FilterKind::ReasonDoesNotContain, Arg::TextMap(needles)) => {
                Stage::ReasonDoesNotContain(needles)
            }
            (FilterKind::ScoreHigher, Arg::NumberMap(thresholds)) => {
                Stage::ScoreHigher(thresholds)
            }
            (FilterKind::ScoreLower, Arg::NumberMap(thresholds)) => Stage::ScoreLower(thresholds),
            (FilterKind::AcceptedByExactlyOne, Arg::TextList(checkers)) => {
                Stage::AcceptedByExactlyOne(Some(checkers))
            }
            (FilterKind::AcceptedByExactlyOne, _) => Stage::AcceptedByExactlyOne(None),
            (FilterKind::AcceptedOnlyBy, Arg::Text(checker)) => Stage::AcceptedOnlyBy(checker),
            (FilterKind::ChangePclOutputByScore, Arg::NumberMap(thresholds)) => {
                Stage::NormalizeByScore(thresholds)
            }
            (FilterKind::ChangePclOutputByScore, _) => Stage::NormalizeByScore(
                DEFAULT_SCORE_THRESHOLDS
                    .iter()
                    .map(|(checker, threshold)| (checker.to_string(), *threshold))
                    .collect(),
            ),
            (FilterKind::MinEntropyChange, Arg::Number(n)) => Stage::MinEntropyChange(n),
            (FilterKind::RuleApplied, Arg::Text(rule)) => Stage::RuleApplied(rule),
            (FilterKind::MutatedOnly, _) => Stage::MutatedOnly,
            (filter, arg) => {
                return Err(FilterArgError::WrongType {
                    filter: filter.name(),
                    expected: spec_name(filter),
                    found: format!("{:?}", arg),
                })
            }
        };

        Ok(stage)
    }

    /// Run the filter over a collection
    ///
    /// Returns the input unchanged, after a warning, when the configuration
    /// value is missing or mistyped.
    pub fn apply(&self, records: Vec<PasswordRecord>) -> Vec<PasswordRecord> {
        let stage = match self.prepare() {
            Ok(stage) => stage,
            Err(err) => {
                warn!("{}; filter skipped", err);
                return records;
            }
        };

        let before = records.len();
        let out = stage.run(self.name(), records);
        debug!(filter = self.name(), before, after = out.len(), "filter applied");
        out
    }
}

// ============================================================================
// CHECKER KEY TRACKING
// ============================================================================

/// Working copy of a filter's per-checker entries for one invocation
///
/// Built once from the whole collection before any record is judged: each
/// configured checker missing from at least one record gets a single warning
/// and is left out for the entire invocation. The filter's own configuration
/// is never touched, so the next invocation starts from the full set again.
struct ActiveCheckers<T> {
    entries: Vec<(String, T)>,
}

impl<T> ActiveCheckers<T> {
    fn scan(filter: &'static str, entries: Vec<(String, T)>, records: &[PasswordRecord]) -> Self {
        let entries = entries
            .into_iter()
            .filter(|(checker, _)| {
                let missing = records
                    .iter()
                    .filter(|record| !record.checker_outputs.contains_key(checker))
                    .count();
                if missing > 0 {
                    warn!(
                        filter,
                        checker = checker.as_str(),
                        missing,
                        "checker missing from records, ignoring it for this run"
                    );
                }
                missing == 0
            })
            .collect();

        ActiveCheckers { entries }
    }

    fn entries(&self) -> &[(String, T)] {
        &self.entries
    }
}

fn keep_with<T>(
    filter: &'static str,
    entries: Vec<(String, T)>,
    records: Vec<PasswordRecord>,
    keep: impl Fn(&PasswordRecord, &[(String, T)]) -> bool,
) -> Vec<PasswordRecord> {
    let active = ActiveCheckers::scan(filter, entries, &records);
    records
        .into_iter()
        .filter(|record| keep(record, active.entries()))
        .collect()
}

fn spec_name(filter: FilterKind) -> &'static str {
    filter.arg_spec().arg_type.map(|t| t.name()).unwrap_or("no")
}

fn retain(
    records: Vec<PasswordRecord>,
    keep: impl Fn(&PasswordRecord) -> bool,
) -> Vec<PasswordRecord> {
    records.into_iter().filter(|r| keep(r)).collect()
}

fn reason<'r>(record: &'r PasswordRecord, checker: &str) -> &'r str {
    record
        .checker(checker)
        .map(|output| output.reason.as_str())
        .unwrap_or("")
}

fn score(record: &PasswordRecord, checker: &str) -> Option<f64> {
    record.checker(checker).and_then(|output| output.score)
}

fn is_accepted(record: &PasswordRecord, checker: &str) -> bool {
    record.checker(checker).is_some_and(|output| output.is_accepted())
}

// ============================================================================
// STAGE EXECUTION
// ============================================================================

impl Stage {
    fn run(self, filter: &'static str, records: Vec<PasswordRecord>) -> Vec<PasswordRecord> {
        match self {
            Stage::MinLength(n) => retain(records, |r| r.length() >= n),
            Stage::MaxLength(n) => retain(records, |r| r.length() <= n),
            Stage::MinDistinct(n) => retain(records, |r| r.distinct_character_count() >= n),
            Stage::MaxDistinct(n) => retain(records, |r| r.distinct_character_count() <= n),
            Stage::ContainsClasses(classes) => {
                retain(records, |r| r.character_classes().is_superset(&classes))
            }
            Stage::OnlyClasses(classes) => {
                retain(records, |r| r.character_classes().is_subset(&classes))
            }
            Stage::PasswordRegex(regex) => {
                retain(records, |r| regex.is_match(&r.transformed_password))
            }
            Stage::MinEntropyChange(n) => retain(records, |r| r.entropy_change() >= n),
            Stage::RuleApplied(rule) => retain(records, |r| {
                r.applied_rules()
                    .iter()
                    .any(|applied| applied.rule == rule && applied.entropy_delta != 0.0)
            }),
            Stage::MutatedOnly => retain(records, |r| r.is_mutated()),

            Stage::ReasonRegex(patterns) => keep_with(filter, patterns, records, |r, active| {
                active
                    .iter()
                    .all(|(checker, regex)| regex.is_match(reason(r, checker)))
            }),
            Stage::ReasonContains(needles) => keep_with(filter, needles, records, |r, active| {
                active
                    .iter()
                    .all(|(checker, needle)| reason(r, checker).contains(needle.as_str()))
            }),
            Stage::ReasonDoesNotContain(needles) => {
                keep_with(filter, needles, records, |r, active| {
                    active
                        .iter()
                        .all(|(checker, needle)| !reason(r, checker).contains(needle.as_str()))
                })
            }
            Stage::ScoreHigher(thresholds) => keep_with(filter, thresholds, records, |r, active| {
                active
                    .iter()
                    .any(|(checker, threshold)| score(r, checker).is_some_and(|s| s >= *threshold))
            }),
            Stage::ScoreLower(thresholds) => keep_with(filter, thresholds, records, |r, active| {
                active
                    .iter()
                    .any(|(checker, threshold)| score(r, checker).is_some_and(|s| s < *threshold))
            }),
            Stage::AcceptedByExactlyOne(Some(checkers)) => {
                let entries: Vec<(String, ())> = checkers.into_iter().map(|c| (c, ())).collect();
                keep_with(filter, entries, records, |r, active| {
                    active.iter().filter(|(checker, _)| is_accepted(r, checker)).count() == 1
                })
            }
            Stage::AcceptedByExactlyOne(None) => retain(records, |r| r.accepted_by().len() == 1),
            Stage::AcceptedOnlyBy(only) => {
                keep_with(filter, vec![(only, ())], records, |r, active| {
                    active
                        .first()
                        .is_some_and(|(only, _)| r.accepted_by() == [only.as_str()])
                })
            }
            Stage::NormalizeByScore(thresholds) => {
                let active = ActiveCheckers::scan(filter, thresholds, &records);
                records
                    .into_iter()
                    .map(|mut record| {
                        for (checker, threshold) in active.entries() {
                            normalize(&mut record, checker, *threshold);
                        }
                        record
                    })
                    .collect()
            }
        }
    }
}

/// Replace a checker's reason by its verdict against `threshold`
fn normalize(record: &mut PasswordRecord, checker: &str, threshold: f64) {
    let Some(output) = record.checker_outputs.get_mut(checker) else {
        return;
    };
    let Some(score) = output.score else {
        return;
    };

    if score >= threshold {
        output.reason = ACCEPTED.to_string();
    } else if output.reason.trim().is_empty() {
        output.reason = LOW_SCORE.to_string();
    }
}

// ============================================================================
// TESTS
// ============================================================================
