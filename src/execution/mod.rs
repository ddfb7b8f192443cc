//! Statement execution engine.
//!
//! [`BatchExecutor`] sends a [`Batch`] through a
//! [`CypherDriver`](crate::graph::CypherDriver) one statement at a time,
//! retries transient failures according to a [`RetryPolicy`] and collects
//! the per-statement outcomes into a [`ResultSet`].

mod batch;
mod result;
mod retry;

pub use batch::{Batch, BatchExecutor};
pub use result::{ResultSet, StatementOutcome};
pub use retry::{is_transient, RetryDecision, RetryPolicy, RetryState, TRANSIENT_ERROR_CODES};
