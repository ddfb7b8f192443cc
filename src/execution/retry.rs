//! Retry classification and backoff.

use std::time::Duration;

use rand::Rng;

use crate::config::ExecutionConfig;

/// Error codes that may succeed when the statement is sent again.
pub const TRANSIENT_ERROR_CODES: [&str; 5] = [
    "Neo.TransientError.Transaction.DeadlockDetected",
    "Neo.TransientError.Transaction.LockAcquisitionTimeout",
    "Neo.TransientError.Transaction.Outdated",
    "Neo.DatabaseError.Transaction.TransactionCommitFailed",
    "Neo.DatabaseError.Statement.ExecutionFailed",
];

/// Whether a database error code is in the transient allow-list.
pub fn is_transient(code: &str) -> bool {
    TRANSIENT_ERROR_CODES.contains(&code)
}

/// Outcome of classifying a query error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    GiveUp,
}

/// Per-statement bookkeeping, discarded once the statement settles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Times this statement has been re-sent, for any reason.
    pub attempts_used: u32,
    /// Re-sends caused by connection failures.
    pub connection_retries: u32,
    pub last_error_code: Option<String>,
}

/// Retry limits derived from [`ExecutionConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_retries: u32,
    pub max_interval_ms: u64,
    pub request_max_retries: u32,
    pub request_interval_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self {
            enabled: config.retry_cypher_errors,
            max_retries: config.cypher_max_retries,
            max_interval_ms: config.cypher_retry_max_interval_ms,
            request_max_retries: config.request_max_retries,
            request_interval_ms: config.request_retry_interval_ms,
        }
    }

    /// Decides whether a failed statement is sent again.
    ///
    /// `batch_retries` is the number of retries already spent by the whole
    /// batch, not by this statement alone.
    pub fn classify(&self, code: &str, batch_retries: u32) -> RetryDecision {
        if self.enabled && is_transient(code) && batch_retries < self.max_retries {
            RetryDecision::Retry
        } else {
            RetryDecision::GiveUp
        }
    }

    /// Randomized sleep in `[1, max_interval_ms]` milliseconds.
    pub fn backoff(&self) -> Duration {
        let upper = self.max_interval_ms.max(1);
        Duration::from_millis(rand::thread_rng().gen_range(1..=upper))
    }

    pub fn may_retry_connection(&self, state: &RetryState) -> bool {
        state.connection_retries < self.request_max_retries
    }

    pub fn connection_backoff(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ExecutionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_transient_code_retries() {
        let policy = RetryPolicy::default();
        for code in TRANSIENT_ERROR_CODES {
            assert_eq!(policy.classify(code, 0), RetryDecision::Retry, "{}", code);
        }
    }

    #[test]
    fn test_other_codes_give_up() {
        let policy = RetryPolicy::default();
        for code in [
            "Neo.ClientError.Schema.ConstraintValidationFailed",
            "Neo.ClientError.Statement.SyntaxError",
            "Neo.TransientError.General.MemoryPoolOutOfMemoryError",
            "unknown",
            "",
        ] {
            assert_eq!(policy.classify(code, 0), RetryDecision::GiveUp, "{}", code);
        }
    }

    #[test]
    fn test_budget_exhaustion_gives_up() {
        let policy = RetryPolicy {
            max_retries: 2,
            ..Default::default()
        };
        let code = TRANSIENT_ERROR_CODES[0];
        assert_eq!(policy.classify(code, 1), RetryDecision::Retry);
        assert_eq!(policy.classify(code, 2), RetryDecision::GiveUp);
    }

    #[test]
    fn test_disabled_retry_gives_up() {
        let policy = RetryPolicy {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(
            policy.classify(TRANSIENT_ERROR_CODES[1], 0),
            RetryDecision::GiveUp
        );
    }

    #[test]
    fn test_backoff_stays_in_range() {
        let policy = RetryPolicy {
            max_interval_ms: 5,
            ..Default::default()
        };
        for _ in 0..200 {
            let sleep = policy.backoff();
            assert!(sleep >= Duration::from_millis(1));
            assert!(sleep <= Duration::from_millis(5));
        }
    }

    #[test]
    fn test_zero_interval_still_sleeps_one_ms() {
        let policy = RetryPolicy {
            max_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(policy.backoff(), Duration::from_millis(1));
    }

    #[test]
    fn test_connection_retry_budget() {
        let policy = RetryPolicy {
            request_max_retries: 1,
            ..Default::default()
        };
        let mut state = RetryState::default();
        assert!(policy.may_retry_connection(&state));
        state.connection_retries = 1;
        assert!(!policy.may_retry_connection(&state));
    }
}
