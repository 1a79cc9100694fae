//! Loyalty ledger domain model.
//!
//! Customer and representative accounts share one [`Account`] shape tagged by
//! [`Role`]; only the tier table and the permitted transaction kinds differ.

pub mod projection;
pub mod tier;
pub mod types;

pub use projection::{BalanceDelta, DeltaRejected};
pub use tier::{tier, Tier};
pub use types::{
    Account, NewTransaction, OrderCompleted, Reconciliation, Role, Setting, Transaction,
    TransactionKind,
};
