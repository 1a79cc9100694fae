//! Leaderboard aggregator.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::interfaces::directory::AccountDirectory;
use crate::interfaces::ledger_store::{LedgerError, LedgerStore, Result};
use crate::ledger::Role;

/// What a leaderboard ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeaderboardScope {
    /// Cached current balances.
    #[default]
    AllTime,
    /// Net points posted in `[since, until)`, read from the ledger.
    Window {
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: u32,
    pub account_id: String,
    pub display_name: String,
    pub points: i64,
}

/// Sort by points descending, then account_id ascending, and keep `limit`.
pub fn rank_entries(mut totals: Vec<(String, i64)>, limit: usize) -> Vec<(String, i64)> {
    totals.sort_by(|(a_id, a_pts), (b_id, b_pts)| {
        b_pts.cmp(a_pts).then_with(|| a_id.cmp(b_id))
    });
    totals.truncate(limit);
    totals
}

/// Produces ranked account summaries per role.
pub struct LeaderboardAggregator {
    ledger: Arc<dyn LedgerStore>,
    directory: Arc<dyn AccountDirectory>,
}

impl LeaderboardAggregator {
    pub fn new(ledger: Arc<dyn LedgerStore>, directory: Arc<dyn AccountDirectory>) -> Self {
        Self { ledger, directory }
    }

    pub async fn leaderboard(
        &self,
        role: Role,
        limit: usize,
        scope: LeaderboardScope,
    ) -> Result<Vec<LeaderboardEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let totals: Vec<(String, i64)> = match scope {
            LeaderboardScope::AllTime => self
                .ledger
                .top_accounts(role, limit)
                .await?
                .into_iter()
                .map(|account| (account.account_id, account.balance))
                .collect(),
            LeaderboardScope::Window { since, until } => {
                if since >= until {
                    return Err(LedgerError::Validation(
                        "leaderboard window must end after it starts".into(),
                    ));
                }
                self.ledger.window_totals(role, since, until).await?
            }
        };

        let ranked = rank_entries(totals, limit);
        let mut entries = Vec::with_capacity(ranked.len());
        for (position, (account_id, points)) in ranked.into_iter().enumerate() {
            let display_name = self
                .directory
                .display_name(&account_id, role)
                .await
                .unwrap_or_else(|| account_id.clone());
            entries.push(LeaderboardEntry {
                rank: u32::try_from(position + 1).unwrap_or(u32::MAX),
                account_id,
                display_name,
                points,
            });
        }
        Ok(entries)
    }
}
