// PCL Lab - Core Library
// Mutates passwords with entropy bookkeeping, then slices checker verdicts

pub mod entropy;
pub mod error;
pub mod record;
pub mod rules;
pub mod transform;
pub mod checkers;
pub mod filters;
pub mod query;
pub mod analysis;
pub mod io;

// Re-export commonly used types
pub use record::{
    AppliedRule, CharClass, CheckerOutput, PasswordRecord,
    ACCEPTED, LOW_SCORE,
};
pub use entropy::{round2, seed_entropy, two_digit_prefix_delta};
pub use error::{FilterArgError, RuleError};
pub use rules::{MutationSource, RandomSource, Rule, RuleKind, RuleOutcome};
pub use transform::{RawPassword, Transformation};
pub use checkers::{AttachSummary, CheckerResults, CheckerRow};
pub use filters::{ArgSpec, ArgType, Filter, FilterKind, DEFAULT_SCORE_THRESHOLDS};
pub use query::Query;
pub use analysis::{
    checker_names, rule_stats, summarize, summarize_checker,
    CheckerSummary, ReasonShare, Report, RuleStats,
};
pub use io::{load_passwords, load_records, save_records, write_report_csv};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
