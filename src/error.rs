// ⚠️ Configuration errors
// Recorded against records or logged against filters, never raised out of the core

use thiserror::Error;

/// Errors raised while applying a single rule to a single record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("{rule}: empty range, from_index {from} > to_index {to} for password of length {len}")]
    InvalidRange {
        rule: String,
        from: i64,
        to: i64,
        len: usize,
    },

    #[error("{rule}: no strings to choose from")]
    EmptyChoices { rule: String },
}

/// Errors raised while validating a filter's configuration value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterArgError {
    #[error("{filter}: missing required {expected} argument")]
    Missing {
        filter: &'static str,
        expected: &'static str,
    },

    #[error("{filter}: expected {expected} argument, got {found}")]
    WrongType {
        filter: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("{filter}: invalid regex {pattern:?}: {message}")]
    InvalidRegex {
        filter: &'static str,
        pattern: String,
        message: String,
    },

    #[error("{filter}: unknown character class {class:?}")]
    UnknownCharClass { filter: &'static str, class: String },
}
