// 🔧 Transformation Rules - Rules as Data
// Each rule rewrites a character range of the current transformed password
// and credits an entropy delta to the record it was applied to.

use crate::entropy::{
    random_letter_delta, two_digit_prefix_delta, ADVANCED_LEET_DELTA, CASE_CHANGE_DELTA,
    SIMPLE_LEET_DELTA,
};
use crate::error::RuleError;
use crate::record::PasswordRecord;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// RANDOMNESS
// ============================================================================

/// Every random choice a rule can make
///
/// Rules never touch a global RNG; the pipeline entry point threads one of
/// these through so a fixed seed (or a scripted source) gives exact output.
pub trait MutationSource {
    /// Uniform decimal digit, `0..=9`
    fn digit(&mut self) -> u8;

    /// Uniform lowercase ASCII letter
    fn letter(&mut self) -> char;

    /// Uniform index in `0..len`; `len` is never zero
    fn index(&mut self, len: usize) -> usize;

    /// Fair coin, `true` means "start of the password"
    fn coin(&mut self) -> bool;
}

/// `MutationSource` backed by any `rand` RNG
#[derive(Debug, Clone)]
pub struct RandomSource<R> {
    rng: R,
}

impl RandomSource<ChaCha8Rng> {
    /// Reproducible source for a given seed
    pub fn seeded(seed: u64) -> Self {
        RandomSource::new(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        RandomSource::new(ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> RandomSource<R> {
    pub fn new(rng: R) -> Self {
        RandomSource { rng }
    }
}

impl<R: Rng> MutationSource for RandomSource<R> {
    fn digit(&mut self) -> u8 {
        self.rng.gen_range(0..10)
    }

    fn letter(&mut self) -> char {
        char::from(b'a' + self.rng.gen_range(0..26u8))
    }

    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    fn coin(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }
}

// ============================================================================
// LEET TABLES
// ============================================================================

fn simple_leet(c: char) -> Option<&'static [&'static str]> {
    let candidates: &'static [&'static str] = match c.to_ascii_lowercase() {
        'a' => &["4", "@"],
        'e' => &["3"],
        'i' => &["1", "!"],
        'l' => &["1"],
        'o' => &["0"],
        's' => &["5", "$"],
        't' => &["7"],
        _ => return None,
    };
    Some(candidates)
}

fn advanced_leet(c: char) -> Option<&'static [&'static str]> {
    let candidates: &'static [&'static str] = match c.to_ascii_lowercase() {
        'a' => &["4", "@", "/\\"],
        'b' => &["8", "|3"],
        'c' => &["(", "<"],
        'd' => &["|)"],
        'e' => &["3", "&"],
        'g' => &["9", "6"],
        'h' => &["#", "|-|"],
        'i' => &["1", "!", "|"],
        'k' => &["|<"],
        'l' => &["1", "|_"],
        'o' => &["0", "()"],
        's' => &["5", "$"],
        't' => &["7", "+"],
        'z' => &["2"],
        _ => return None,
    };
    Some(candidates)
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// What a rule does, with the configuration that variant needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule")]
pub enum RuleKind {
    /// Substitute characters from the simple leet table
    ApplySimpleLeet,

    /// Substitute characters from the advanced leet table
    ApplyAdvancedLeet,

    CapitalizeAllLetters,
    LowercaseAllLetters,

    /// Uppercase the first character of the range
    CapitalizeFirstLetter,

    /// Insert `value` at the start or the end, 50/50
    AddStringAtStartOrEnd { value: String, entropy: f64 },

    /// Insert one of `choices` at the start or the end, 50/50
    AddRandomStringAtStartOrEnd { choices: Vec<String>, entropy: f64 },

    AddTwoRandomDigitsAsPrefix,

    /// Replace the first letter of the range with a random lowercase letter
    ChangeFirstLetterToRandomLetter,

    /// Replace a uniformly chosen letter of the range with a random lowercase letter
    ChangeRandomLetterToRandomLetter,
}

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::ApplySimpleLeet => "ApplySimpleLeet",
            RuleKind::ApplyAdvancedLeet => "ApplyAdvancedLeet",
            RuleKind::CapitalizeAllLetters => "CapitalizeAllLetters",
            RuleKind::LowercaseAllLetters => "LowercaseAllLetters",
            RuleKind::CapitalizeFirstLetter => "CapitalizeFirstLetter",
            RuleKind::AddStringAtStartOrEnd { .. } => "AddStringAtStartOrEnd",
            RuleKind::AddRandomStringAtStartOrEnd { .. } => "AddRandomStringAtStartOrEnd",
            RuleKind::AddTwoRandomDigitsAsPrefix => "AddTwoRandomDigitsAsPrefix",
            RuleKind::ChangeFirstLetterToRandomLetter => "ChangeFirstLetterToRandomLetter",
            RuleKind::ChangeRandomLetterToRandomLetter => "ChangeRandomLetterToRandomLetter",
        }
    }
}

/// A rule plus the character range it works on
///
/// Indices are inclusive and resolved against the password as it is when the
/// rule runs. Negative indices count from the end, so `-1` is the last
/// character; `to_index` past the end is clamped to the last character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(flatten)]
    pub kind: RuleKind,

    #[serde(default)]
    pub from_index: i64,

    #[serde(default = "default_to_index")]
    pub to_index: i64,
}

fn default_to_index() -> i64 {
    -1
}

/// New password and the delta it is worth, before bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub password: String,
    pub entropy_delta: f64,
}

impl Rule {
    /// Rule over the whole password
    pub fn new(kind: RuleKind) -> Self {
        Rule {
            kind,
            from_index: 0,
            to_index: -1,
        }
    }

    /// Builder: restrict to an inclusive range
    pub fn with_range(mut self, from_index: i64, to_index: i64) -> Self {
        self.from_index = from_index;
        self.to_index = to_index;
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Resolve the configured range against a password of `len` characters
    pub fn resolve_range(&self, len: usize) -> Result<(usize, usize), RuleError> {
        let last = len as i64 - 1;
        let from = if self.from_index < 0 {
            (len as i64 + self.from_index).max(0)
        } else {
            self.from_index
        };
        let to = if self.to_index < 0 {
            len as i64 + self.to_index
        } else {
            self.to_index.min(last)
        };

        if from > to {
            return Err(RuleError::InvalidRange {
                rule: self.name().to_string(),
                from,
                to,
                len,
            });
        }

        Ok((from as usize, to as usize))
    }

    /// Compute what this rule would do to `password` without touching a record
    pub fn evaluate(
        &self,
        password: &str,
        source: &mut dyn MutationSource,
    ) -> Result<RuleOutcome, RuleError> {
        let chars: Vec<char> = password.chars().collect();
        let (from, to) = self.resolve_range(chars.len())?;
        let head: String = chars[..from].iter().collect();
        let tail: String = chars[to + 1..].iter().collect();
        let slice = &chars[from..=to];

        let (password, entropy_delta) = match &self.kind {
            RuleKind::ApplySimpleLeet => {
                let middle = substitute(slice, simple_leet, source);
                (format!("{head}{middle}{tail}"), SIMPLE_LEET_DELTA)
            }
            RuleKind::ApplyAdvancedLeet => {
                let middle = substitute(slice, advanced_leet, source);
                (format!("{head}{middle}{tail}"), ADVANCED_LEET_DELTA)
            }
            RuleKind::CapitalizeAllLetters => {
                let middle: String = slice.iter().flat_map(|c| c.to_uppercase()).collect();
                (format!("{head}{middle}{tail}"), CASE_CHANGE_DELTA)
            }
            RuleKind::LowercaseAllLetters => {
                let middle: String = slice.iter().flat_map(|c| c.to_lowercase()).collect();
                (format!("{head}{middle}{tail}"), CASE_CHANGE_DELTA)
            }
            RuleKind::CapitalizeFirstLetter => {
                let first: String = slice[0].to_uppercase().collect();
                let rest: String = slice[1..].iter().collect();
                (format!("{head}{first}{rest}{tail}"), CASE_CHANGE_DELTA)
            }
            RuleKind::AddStringAtStartOrEnd { value, entropy } => {
                (insert_start_or_end(password, value, source), *entropy)
            }
            RuleKind::AddRandomStringAtStartOrEnd { choices, entropy } => {
                if choices.is_empty() {
                    return Err(RuleError::EmptyChoices {
                        rule: self.name().to_string(),
                    });
                }
                let value = &choices[source.index(choices.len())];
                (insert_start_or_end(password, value, source), *entropy)
            }
            RuleKind::AddTwoRandomDigitsAsPrefix => {
                let first = source.digit();
                let second = source.digit();
                (
                    format!("{first}{second}{password}"),
                    two_digit_prefix_delta(first, second),
                )
            }
            RuleKind::ChangeFirstLetterToRandomLetter => {
                let position = (from..=to).find(|&i| chars[i].is_alphabetic());
                replace_letter(&chars, position, source)
            }
            RuleKind::ChangeRandomLetterToRandomLetter => {
                let letters: Vec<usize> =
                    (from..=to).filter(|&i| chars[i].is_alphabetic()).collect();
                let position = if letters.is_empty() {
                    None
                } else {
                    Some(letters[source.index(letters.len())])
                };
                replace_letter(&chars, position, source)
            }
        };

        // No textual change is never worth entropy
        let entropy_delta = if password == chars.iter().collect::<String>() {
            0.0
        } else {
            entropy_delta
        };

        Ok(RuleOutcome {
            password,
            entropy_delta,
        })
    }

    /// Apply to a record in place
    ///
    /// A configuration error leaves the password and entropy untouched, is
    /// logged, and is kept on the record; it never aborts the caller's batch.
    pub fn apply(&self, record: &mut PasswordRecord, source: &mut dyn MutationSource) {
        match self.evaluate(&record.transformed_password, source) {
            Ok(outcome) => {
                record.record_rule(self.name(), outcome.password, outcome.entropy_delta);
            }
            Err(err) => {
                warn!(rule = self.name(), "skipping rule: {}", err);
                record.rule_errors.push(err.to_string());
            }
        }
    }
}

fn substitute(
    slice: &[char],
    table: fn(char) -> Option<&'static [&'static str]>,
    source: &mut dyn MutationSource,
) -> String {
    let mut out = String::with_capacity(slice.len());
    for &c in slice {
        match table(c) {
            Some(candidates) => out.push_str(candidates[source.index(candidates.len())]),
            None => out.push(c),
        }
    }
    out
}

fn insert_start_or_end(password: &str, value: &str, source: &mut dyn MutationSource) -> String {
    if source.coin() {
        format!("{value}{password}")
    } else {
        format!("{password}{value}")
    }
}

fn replace_letter(
    chars: &[char],
    position: Option<usize>,
    source: &mut dyn MutationSource,
) -> (String, f64) {
    match position {
        Some(index) => {
            let mut out = chars.to_vec();
            out[index] = source.letter();
            (out.into_iter().collect(), random_letter_delta(index))
        }
        None => (chars.iter().collect(), 0.0),
    }
}

// ============================================================================
// TESTS
// ============================================================================
