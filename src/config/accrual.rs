//! Accrual, bus, and retry configuration types.

use std::time::Duration;

use serde::Deserialize;

/// Settings key for points credited to the customer per completed order.
pub const CUSTOMER_POINTS_KEY: &str = "customer_points_per_order";
/// Settings key for points credited to the representative per completed order.
pub const REPRESENTATIVE_POINTS_KEY: &str = "representative_points_per_order";

/// Fallback accrual rates, used when the settings store has no value.
///
/// These also seed the settings store on first start.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccrualConfig {
    pub customer_points_per_order: i64,
    pub representative_points_per_order: i64,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            customer_points_per_order: 10,
            representative_points_per_order: 5,
        }
    }
}

/// In-process order completion bus.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Queue capacity. Publishers wait for space once it is full.
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Backoff for ledger writes that hit database lock contention, also used
/// when an order bus handler fails.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_times: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 10,
            max_delay_ms: 2000,
            max_times: 10,
        }
    }
}

impl RetryConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}
