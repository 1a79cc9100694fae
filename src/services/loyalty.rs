//! Loyalty service facade.
//!
//! Single entry point for the admin/reporting surface and the order
//! completion path. Holds no state beyond its stores.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::accrual::{AccrualReport, AccrualTrigger};
use super::leaderboard::{LeaderboardAggregator, LeaderboardEntry, LeaderboardScope};
use super::redemption::RedemptionEngine;
use crate::config::{AccrualConfig, CUSTOMER_POINTS_KEY, REPRESENTATIVE_POINTS_KEY};
use crate::interfaces::directory::AccountDirectory;
use crate::interfaces::ledger_store::{LedgerError, LedgerStore, Result};
use crate::interfaces::settings_store::{self, SettingsError, SettingsStore};
use crate::ledger::{
    tier, Account, NewTransaction, OrderCompleted, Reconciliation, Role, Setting, Tier,
    Transaction,
};

/// Account balances with the derived tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub account_id: String,
    pub role: Role,
    pub balance: i64,
    pub total_earned: i64,
    pub total_redeemed: i64,
    pub tier: Tier,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        Self {
            tier: tier(account.balance, account.role),
            account_id: account.account_id,
            role: account.role,
            balance: account.balance,
            total_earned: account.total_earned,
            total_redeemed: account.total_redeemed,
            last_activity_at: account.last_activity_at,
        }
    }
}

pub struct LoyaltyService {
    ledger: Arc<dyn LedgerStore>,
    settings: Arc<dyn SettingsStore>,
    accrual: Arc<AccrualTrigger>,
    redemption: RedemptionEngine,
    leaderboard: LeaderboardAggregator,
}

impl LoyaltyService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        settings: Arc<dyn SettingsStore>,
        directory: Arc<dyn AccountDirectory>,
        accrual_defaults: AccrualConfig,
    ) -> Self {
        Self {
            accrual: Arc::new(AccrualTrigger::new(
                ledger.clone(),
                settings.clone(),
                accrual_defaults,
            )),
            redemption: RedemptionEngine::new(ledger.clone()),
            leaderboard: LeaderboardAggregator::new(ledger.clone(), directory),
            ledger,
            settings,
        }
    }

    /// Shared handle for bus subscribers.
    pub fn accrual(&self) -> Arc<AccrualTrigger> {
        self.accrual.clone()
    }

    /// Summary for display. An identity with no history reads as zero/New.
    pub async fn account_summary(&self, account_id: &str, role: Role) -> Result<AccountSummary> {
        if account_id.trim().is_empty() {
            return Err(LedgerError::Validation("account_id is required".into()));
        }
        let account = match self.ledger.account(account_id, role).await {
            Ok(account) => account,
            Err(LedgerError::AccountNotFound { .. }) => Account::empty(account_id, role),
            Err(e) => return Err(e),
        };
        Ok(account.into())
    }

    pub async fn redeem(
        &self,
        customer_account_id: &str,
        points: i64,
        description: &str,
    ) -> Result<Uuid> {
        self.redemption
            .redeem(customer_account_id, points, description)
            .await
    }

    /// Signed manual correction. Debits are guarded like redemptions.
    pub async fn admin_adjust(
        &self,
        account_id: &str,
        role: Role,
        points: i64,
        description: &str,
    ) -> Result<Uuid> {
        let transaction_id = self
            .ledger
            .append(NewTransaction::adjustment(
                account_id,
                role,
                points,
                description,
            ))
            .await?;
        info!(account_id, %role, points, %transaction_id, "Admin adjustment posted");
        Ok(transaction_id)
    }

    pub async fn leaderboard(
        &self,
        role: Role,
        limit: usize,
        scope: LeaderboardScope,
    ) -> Result<Vec<LeaderboardEntry>> {
        self.leaderboard.leaderboard(role, limit, scope).await
    }

    pub async fn transactions(
        &self,
        account_id: &str,
        role: Role,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        self.ledger.transactions(account_id, role, limit).await
    }

    pub async fn verify(&self, account_id: &str, role: Role) -> Result<Reconciliation> {
        self.ledger.verify(account_id, role).await
    }

    pub async fn complete_order(&self, order: &OrderCompleted) -> Result<AccrualReport> {
        self.accrual.process(order).await
    }

    pub async fn get_setting(&self, key: &str) -> settings_store::Result<Setting> {
        self.settings.get(key).await
    }

    pub async fn put_setting(
        &self,
        key: &str,
        value: &str,
        description: &str,
    ) -> settings_store::Result<Setting> {
        let setting = self.settings.upsert(key, value, description).await?;
        info!(key, value, "Setting updated");
        Ok(setting)
    }

    pub async fn list_settings(&self) -> settings_store::Result<Vec<Setting>> {
        self.settings.list().await
    }

    /// Write the accrual rate keys that are absent. Existing values are kept.
    ///
    /// Returns the keys that were written.
    pub async fn seed_default_settings(
        &self,
        defaults: &AccrualConfig,
    ) -> settings_store::Result<Vec<String>> {
        let rates = [
            (
                CUSTOMER_POINTS_KEY,
                defaults.customer_points_per_order,
                "Points credited to the customer per completed order",
            ),
            (
                REPRESENTATIVE_POINTS_KEY,
                defaults.representative_points_per_order,
                "Points credited to the assigned representative per completed order",
            ),
        ];

        let mut seeded = Vec::new();
        for (key, value, description) in rates {
            match self.settings.get(key).await {
                Ok(_) => continue,
                Err(SettingsError::NotFound(_)) => {
                    self.settings
                        .upsert(key, &value.to_string(), description)
                        .await?;
                    info!(key, value, "Seeded default setting");
                    seeded.push(key.to_string());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::directory::StaticDirectory;
    use crate::storage::{MockLedgerStore, MockSettingsStore};

    fn service() -> LoyaltyService {
        LoyaltyService::new(
            Arc::new(MockLedgerStore::new()),
            Arc::new(MockSettingsStore::new()),
            Arc::new(StaticDirectory::new()),
            AccrualConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_summary_without_history_is_zero() {
        let svc = service();

        let summary = svc.account_summary("C9", Role::Customer).await.unwrap();
        assert_eq!(summary.balance, 0);
        assert_eq!(summary.tier, Tier::New);
        assert!(summary.last_activity_at.is_none());
    }

    #[tokio::test]
    async fn test_summary_carries_tier() {
        let svc = service();
        svc.admin_adjust("R1", Role::Representative, 200, "migration")
            .await
            .unwrap();

        let summary = svc
            .account_summary("R1", Role::Representative)
            .await
            .unwrap();
        assert_eq!(summary.tier, Tier::Platinum);
        assert_eq!(summary.total_earned, 200);
    }

    #[tokio::test]
    async fn test_negative_adjustment_is_guarded() {
        let svc = service();
        svc.admin_adjust("C1", Role::Customer, 5, "goodwill")
            .await
            .unwrap();

        let result = svc.admin_adjust("C1", Role::Customer, -6, "correction").await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientPoints { .. })
        ));

        svc.admin_adjust("C1", Role::Customer, -5, "correction")
            .await
            .unwrap();
        let summary = svc.account_summary("C1", Role::Customer).await.unwrap();
        assert_eq!(summary.balance, 0);
        assert_eq!(summary.total_earned, 5);
        assert_eq!(summary.total_redeemed, 0);
    }

    #[tokio::test]
    async fn test_seed_keeps_existing_values() {
        let svc = service();
        svc.put_setting(CUSTOMER_POINTS_KEY, "25", "custom")
            .await
            .unwrap();

        let seeded = svc
            .seed_default_settings(&AccrualConfig::default())
            .await
            .unwrap();

        assert_eq!(seeded, vec![REPRESENTATIVE_POINTS_KEY.to_string()]);
        assert_eq!(
            svc.get_setting(CUSTOMER_POINTS_KEY).await.unwrap().value,
            "25"
        );
        assert_eq!(
            svc.get_setting(REPRESENTATIVE_POINTS_KEY).await.unwrap().value,
            "5"
        );
        assert_eq!(svc.list_settings().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_setting_not_found() {
        let svc = service();
        assert!(matches!(
            svc.get_setting("missing").await,
            Err(SettingsError::NotFound(_))
        ));
    }
}
