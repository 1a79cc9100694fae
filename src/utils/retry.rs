//! Retry utilities: backoff builders for ledger writes.
//!
//! Uses `backon` for exponential backoff with jitter. Retryable error
//! classification lives on the error type (`LedgerError::is_retryable`).

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::config::RetryConfig;

/// Standard backoff for ledger writes under lock contention.
///
/// - Min delay: 10ms
/// - Max delay: 2s
/// - Max attempts: 10
/// - Jitter enabled
pub fn store_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_secs(2))
        .with_max_times(10)
        .with_jitter()
}

/// Backoff built from configuration.
pub fn backoff_from_config(config: &RetryConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(config.min_delay())
        .with_max_delay(config.max_delay())
        .with_max_times(config.max_times)
        .with_jitter()
}
