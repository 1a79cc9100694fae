//! Request handlers for the loyalty ledger's external surfaces.

pub mod grpc;

pub use grpc::LoyaltyLedgerHandler;
