// 🗂️ Query - working set plus a configurable filter chain
// apply_filter folds the chain over the working set; clear_filter forgets the
// chain but keeps whatever the working set has been narrowed to.

use crate::filters::Filter;
use crate::record::PasswordRecord;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Collection the query was created from, for `reset`
    source: Vec<PasswordRecord>,
    working: Vec<PasswordRecord>,
    chain: Vec<Filter>,
}

impl Query {
    pub fn new(records: Vec<PasswordRecord>) -> Self {
        Query {
            working: records.clone(),
            source: records,
            chain: Vec::new(),
        }
    }

    /// Builder: append a filter to the chain
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.chain.push(filter);
        self
    }

    pub fn add_filter(&mut self, filter: Filter) {
        self.chain.push(filter);
    }

    pub fn set_chain(&mut self, chain: Vec<Filter>) {
        self.chain = chain;
    }

    pub fn chain(&self) -> &[Filter] {
        &self.chain
    }

    /// Collapse the configured chain onto the working set
    pub fn apply_filter(&mut self) -> &[PasswordRecord] {
        let before = self.working.len();
        let working = std::mem::take(&mut self.working);
        self.working = self
            .chain
            .iter()
            .fold(working, |records, filter| filter.apply(records));

        debug!(
            filters = self.chain.len(),
            before,
            after = self.working.len(),
            "filter chain applied"
        );
        &self.working
    }

    /// Drop the chain, keep the working set
    pub fn clear_filter(&mut self) {
        self.chain.clear();
    }

    /// Restore the working set to the collection the query started from
    pub fn reset(&mut self) {
        self.working = self.source.clone();
    }

    pub fn records(&self) -> &[PasswordRecord] {
        &self.working
    }

    pub fn into_records(self) -> Vec<PasswordRecord> {
        self.working
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
