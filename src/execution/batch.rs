//! Batched statement execution with classified retry.
//!
//! Statements run strictly one at a time in queue order, because later
//! statements may depend on the side effects of earlier ones. Each statement
//! walks the same small state machine:
//!
//! ```text
//! Pending -> Executing -> Succeeded
//!                      -> RetryScheduled -> Executing
//!                      -> Failed
//! ```
//!
//! A connection failure that outlives its retry budget aborts the whole
//! batch. A query error only settles its own statement; the remaining
//! statements still run.

use std::collections::VecDeque;
use std::time::Duration;

use crate::config::{ErrorMode, ExecutionConfig};
use crate::error::AppError;
use crate::execution::result::{ResultSet, StatementOutcome};
use crate::execution::retry::{RetryDecision, RetryPolicy, RetryState};
use crate::graph::{CypherDriver, DriverError, Query, QueryError, RecordSet, Statement};

/// An ordered queue of statements submitted together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    entries: VecDeque<Statement>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a statement; it runs after everything already queued.
    pub fn push(&mut self, statement: Statement) -> &mut Self {
        self.entries.push_back(statement);
        self
    }

    /// Puts a statement at the head of the queue so it runs first.
    pub fn prepend(&mut self, statement: Statement) -> &mut Self {
        self.entries.push_front(statement);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.entries.iter()
    }
}

impl FromIterator<Statement> for Batch {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Batch {
    type Item = Statement;
    type IntoIter = std::collections::vec_deque::IntoIter<Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Where a statement goes after one driver call.
#[derive(Debug)]
enum Step {
    Succeeded(RecordSet),
    RetryScheduled(Duration),
    Failed(QueryError),
}

/// Sends batches through a [`CypherDriver`].
///
/// Retry counters live on the stack of each `execute` call, so one executor
/// can serve sequential batches; concurrent callers should each own an
/// executor.
pub struct BatchExecutor<D: CypherDriver> {
    driver: D,
    config: ExecutionConfig,
    policy: RetryPolicy,
}

impl<D: CypherDriver> BatchExecutor<D> {
    pub fn new(driver: D, config: ExecutionConfig) -> Self {
        let policy = RetryPolicy::from_config(&config);
        Self {
            driver,
            config,
            policy,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Creates a query builder for a single statement.
    pub fn query(&self, cypher: &str) -> Query<'_, D> {
        Query::new(self, cypher)
    }

    /// Executes every statement of the batch in order.
    ///
    /// # Errors
    ///
    /// - [`AppError::Connection`] as soon as a connection failure exhausts
    ///   its retries; statements after it are not sent.
    /// - [`AppError::Query`] with the first failed statement's error once the
    ///   batch completes, when the error mode is [`ErrorMode::Throw`].
    /// - [`AppError::Serialization`] before anything is sent, when a
    ///   statement carries an unserializable parameter.
    pub async fn execute(&self, batch: Batch) -> Result<ResultSet, AppError> {
        for statement in batch.iter() {
            statement.validate()?;
        }

        let total = batch.len();
        let mut batch_retries = 0u32;
        let mut outcomes: Vec<StatementOutcome> = Vec::with_capacity(total);

        for (index, statement) in batch.into_iter().enumerate() {
            let outcome = self
                .run_with_retry(index, &statement, &mut batch_retries)
                .await?;
            outcomes.push(outcome);
        }

        let results = ResultSet::new(outcomes);

        if let Some(first) = results.first_error() {
            tracing::debug!(
                statements = total,
                errors = results.all_errors().len(),
                code = first.code(),
                "Batch finished with errors"
            );
            if self.config.error_mode == ErrorMode::Throw {
                return Err(AppError::Query(first.clone()));
            }
        }

        Ok(results)
    }

    /// Executes one statement and returns its records.
    ///
    /// Unlike [`execute`](Self::execute), a query error is always returned
    /// as an error here, whatever the error mode: there is no result set to
    /// embed it in.
    pub async fn execute_statement(&self, statement: Statement) -> Result<RecordSet, AppError> {
        let mut batch = Batch::new();
        batch.push(statement);

        let results = self.execute(batch).await?;
        match results.into_outcomes().into_iter().next() {
            Some(Ok(records)) => Ok(records),
            Some(Err(err)) => Err(AppError::Query(err)),
            None => Ok(RecordSet::default()),
        }
    }

    /// Drives one statement to a terminal state.
    async fn run_with_retry(
        &self,
        index: usize,
        statement: &Statement,
        batch_retries: &mut u32,
    ) -> Result<StatementOutcome, AppError> {
        let mut state = RetryState::default();

        loop {
            tracing::debug!(index, attempt = state.attempts_used, "Dispatching statement");

            let result = self
                .driver
                .run_statement(
                    statement.cypher(),
                    statement.params(),
                    self.config.database.as_deref(),
                )
                .await;

            match self.next_step(index, result, &mut state, batch_retries)? {
                Step::Succeeded(records) => return Ok(Ok(records)),
                Step::Failed(err) => return Ok(Err(err)),
                Step::RetryScheduled(sleep) => {
                    state.attempts_used += 1;
                    tokio::time::sleep(sleep).await;
                }
            }
        }
    }

    /// Classifies one driver result.
    fn next_step(
        &self,
        index: usize,
        result: Result<RecordSet, DriverError>,
        state: &mut RetryState,
        batch_retries: &mut u32,
    ) -> Result<Step, AppError> {
        match result {
            Ok(records) => Ok(Step::Succeeded(records)),
            Err(DriverError::Connection(message)) => {
                if self.policy.may_retry_connection(state) {
                    state.connection_retries += 1;
                    let sleep = self.policy.connection_backoff();
                    tracing::warn!(
                        index,
                        attempt = state.connection_retries,
                        sleep_ms = sleep.as_millis() as u64,
                        "Connection failed, retrying statement: {}",
                        message
                    );
                    Ok(Step::RetryScheduled(sleep))
                } else {
                    tracing::error!(index, "Connection failed, aborting batch: {}", message);
                    Err(AppError::Connection(message))
                }
            }
            Err(DriverError::Query(err)) => {
                state.last_error_code = Some(err.code().to_string());
                match self.policy.classify(err.code(), *batch_retries) {
                    RetryDecision::Retry => {
                        *batch_retries += 1;
                        let sleep = self.policy.backoff();
                        tracing::warn!(
                            index,
                            code = err.code(),
                            batch_retries = *batch_retries,
                            sleep_ms = sleep.as_millis() as u64,
                            "Transient query error, retrying statement"
                        );
                        Ok(Step::RetryScheduled(sleep))
                    }
                    RetryDecision::GiveUp => {
                        tracing::debug!(index, code = err.code(), "Statement failed");
                        Ok(Step::Failed(err))
                    }
                }
            }
        }
    }
}
