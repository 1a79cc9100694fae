//! Loyalty points ledger.
//!
//! Customer and representative point accounts backed by an append-only
//! transaction ledger with cached balances. Order completions accrue points
//! exactly once per order; redemptions and admin debits never drive a
//! balance negative.

pub mod bus;
pub mod config;
pub mod handlers;
pub mod interfaces;
pub mod ledger;
pub mod services;
pub mod storage;
pub mod transport;
pub mod utils;

pub mod proto {
    tonic::include_proto!("loyalty");
}
