//! Batch results.

use crate::graph::{QueryError, QueryStats, RecordSet};

/// What one statement of a batch produced.
pub type StatementOutcome = Result<RecordSet, QueryError>;

/// Ordered per-statement outcomes of an executed batch.
///
/// Failed statements keep their position, so `outcomes()[i]` always belongs
/// to the i-th statement that was queued.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    outcomes: Vec<StatementOutcome>,
}

impl ResultSet {
    pub fn new(outcomes: Vec<StatementOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[StatementOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<StatementOutcome> {
        self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// The first statement's records, if it succeeded.
    pub fn single_result(&self) -> Option<&RecordSet> {
        self.outcomes.first().and_then(|o| o.as_ref().ok())
    }

    /// Records of every successful statement, in batch order.
    pub fn all_results(&self) -> Vec<&RecordSet> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok()).collect()
    }

    pub fn has_error(&self) -> bool {
        self.outcomes.iter().any(|o| o.is_err())
    }

    /// The error of the lowest-positioned failed statement.
    pub fn first_error(&self) -> Option<&QueryError> {
        self.outcomes.iter().find_map(|o| o.as_ref().err())
    }

    pub fn all_errors(&self) -> Vec<&QueryError> {
        self.outcomes.iter().filter_map(|o| o.as_ref().err()).collect()
    }

    /// Update counters summed over every successful statement.
    pub fn stats(&self) -> QueryStats {
        let mut total = QueryStats::default();
        for records in self.outcomes.iter().flatten() {
            total += records.stats();
        }
        total
    }
}
