//! Loyalty ledger services.

pub mod accrual;
pub mod leaderboard;
pub mod loyalty;
pub mod redemption;

pub use accrual::{AccrualOutcome, AccrualPosting, AccrualReport, AccrualTrigger};
pub use leaderboard::{rank_entries, LeaderboardAggregator, LeaderboardEntry, LeaderboardScope};
pub use loyalty::{AccountSummary, LoyaltyService};
pub use redemption::RedemptionEngine;
