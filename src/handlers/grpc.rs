//! gRPC `LoyaltyLedger` service.
//!
//! Thin mapping between the wire types and [`LoyaltyService`]. Error kinds map
//! to status codes so clients can tell a rejected redemption from a fault.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tonic::{Request, Response, Status};
use tracing::error;

use crate::bus::OrderCompletionBus;
use crate::interfaces::ledger_store::LedgerError;
use crate::interfaces::settings_store::SettingsError;
use crate::ledger::{OrderCompleted, Reconciliation, Role, Setting, Transaction, TransactionKind};
use crate::proto;
use crate::proto::loyalty_ledger_server::LoyaltyLedger;
use crate::services::{
    AccountSummary, AccrualOutcome, AccrualReport, LeaderboardScope, LoyaltyService,
};

/// Entries returned when a leaderboard request leaves `limit` unset.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

impl From<LedgerError> for Status {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientPoints { .. } => Status::failed_precondition(e.to_string()),
            LedgerError::Validation(_) | LedgerError::RoleForbidsKind { .. } => {
                Status::invalid_argument(e.to_string())
            }
            LedgerError::AccountNotFound { .. } => Status::not_found(e.to_string()),
            LedgerError::DuplicateAccrual { .. } => Status::already_exists(e.to_string()),
            LedgerError::InvalidUuid(_)
            | LedgerError::InvalidTimestamp(_)
            | LedgerError::Database(_) => {
                error!(error = %e, "Ledger storage failure");
                Status::internal(e.to_string())
            }
        }
    }
}

impl From<SettingsError> for Status {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::NotFound(_) => Status::not_found(e.to_string()),
            SettingsError::InvalidValue { .. } | SettingsError::Validation(_) => {
                Status::invalid_argument(e.to_string())
            }
            SettingsError::Database(_) => {
                error!(error = %e, "Settings storage failure");
                Status::internal(e.to_string())
            }
        }
    }
}

fn role_from_proto(value: i32) -> Result<Role, Status> {
    match proto::Role::try_from(value) {
        Ok(proto::Role::Customer) => Ok(Role::Customer),
        Ok(proto::Role::Representative) => Ok(Role::Representative),
        _ => Err(Status::invalid_argument("role must be customer or representative")),
    }
}

fn role_to_proto(role: Role) -> i32 {
    match role {
        Role::Customer => proto::Role::Customer as i32,
        Role::Representative => proto::Role::Representative as i32,
    }
}

fn kind_to_proto(kind: TransactionKind) -> i32 {
    match kind {
        TransactionKind::Earned => proto::TransactionKind::Earned as i32,
        TransactionKind::Redeemed => proto::TransactionKind::Redeemed as i32,
        TransactionKind::AdminAdjustment => proto::TransactionKind::AdminAdjustment as i32,
    }
}

fn timestamp_to_proto(ts: &DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: ts.timestamp(),
        nanos: i32::try_from(ts.timestamp_subsec_nanos()).unwrap_or(0),
    }
}

fn timestamp_from_proto(ts: &prost_types::Timestamp) -> Result<DateTime<Utc>, Status> {
    u32::try_from(ts.nanos)
        .ok()
        .and_then(|nanos| DateTime::<Utc>::from_timestamp(ts.seconds, nanos))
        .ok_or_else(|| Status::invalid_argument("timestamp out of range"))
}

fn limit_from_proto(limit: u32) -> Option<usize> {
    (limit > 0).then(|| usize::try_from(limit).unwrap_or(usize::MAX))
}

fn summary_to_proto(summary: AccountSummary) -> proto::AccountSummary {
    proto::AccountSummary {
        account_id: summary.account_id,
        role: role_to_proto(summary.role),
        balance: summary.balance,
        total_earned: summary.total_earned,
        total_redeemed: summary.total_redeemed,
        tier: summary.tier.to_string(),
        last_activity_at: summary.last_activity_at.as_ref().map(timestamp_to_proto),
    }
}

fn transaction_to_proto(tx: Transaction) -> proto::Transaction {
    proto::Transaction {
        transaction_id: tx.transaction_id.to_string(),
        account_id: tx.account_id,
        role: role_to_proto(tx.role),
        kind: kind_to_proto(tx.kind),
        points: tx.points,
        source_order_id: tx.source_order_id,
        description: tx.description,
        created_at: Some(timestamp_to_proto(&tx.created_at)),
    }
}

fn setting_to_proto(setting: Setting) -> proto::Setting {
    proto::Setting {
        key: setting.key,
        value: setting.value,
        description: setting.description,
    }
}

fn reconciliation_to_proto(report: Reconciliation) -> proto::Reconciliation {
    proto::Reconciliation {
        consistent: report.consistent(),
        role: role_to_proto(report.cached.role),
        cached_balance: report.cached.balance,
        ledger_balance: report.ledger_balance,
        cached_total_earned: report.cached.total_earned,
        ledger_total_earned: report.ledger_total_earned,
        cached_total_redeemed: report.cached.total_redeemed,
        ledger_total_redeemed: report.ledger_total_redeemed,
        transaction_count: report.transaction_count,
        account_id: report.cached.account_id,
    }
}

fn order_from_proto(order: proto::OrderCompleted) -> Result<OrderCompleted, Status> {
    let completed_at = match order.completed_at.as_ref() {
        Some(ts) => timestamp_from_proto(ts)?,
        None => Utc::now(),
    };
    Ok(OrderCompleted {
        order_id: order.order_id,
        customer_account_id: order.customer_account_id,
        representative_account_id: order
            .representative_account_id
            .filter(|id| !id.trim().is_empty()),
        order_value: order.order_value,
        completed_at,
    })
}

fn report_to_proto(report: AccrualReport) -> proto::AccrualReport {
    let postings = report
        .postings
        .into_iter()
        .map(|posting| {
            let (status, points) = match &posting.outcome {
                AccrualOutcome::Posted { points, .. } => (proto::AccrualStatus::Posted, *points),
                AccrualOutcome::AlreadyProcessed => (proto::AccrualStatus::AlreadyProcessed, 0),
                AccrualOutcome::Skipped { points } => (proto::AccrualStatus::Skipped, *points),
                AccrualOutcome::Failed { .. } => (proto::AccrualStatus::Failed, 0),
            };
            proto::AccrualPosting {
                role: role_to_proto(posting.role),
                account_id: posting.account_id,
                status: status as i32,
                points,
                detail: posting.outcome.to_string(),
            }
        })
        .collect();
    proto::AccrualReport {
        order_id: report.order_id,
        postings,
    }
}

/// gRPC front for [`LoyaltyService`].
pub struct LoyaltyLedgerHandler {
    service: Arc<LoyaltyService>,
    bus: Arc<OrderCompletionBus>,
}

impl LoyaltyLedgerHandler {
    pub fn new(service: Arc<LoyaltyService>, bus: Arc<OrderCompletionBus>) -> Self {
        Self { service, bus }
    }
}

#[tonic::async_trait]
impl LoyaltyLedger for LoyaltyLedgerHandler {
    async fn get_account_summary(
        &self,
        request: Request<proto::AccountRef>,
    ) -> Result<Response<proto::AccountSummary>, Status> {
        let req = request.into_inner();
        let role = role_from_proto(req.role)?;
        let summary = self.service.account_summary(&req.account_id, role).await?;
        Ok(Response::new(summary_to_proto(summary)))
    }

    async fn get_leaderboard(
        &self,
        request: Request<proto::LeaderboardRequest>,
    ) -> Result<Response<proto::Leaderboard>, Status> {
        let req = request.into_inner();
        let role = role_from_proto(req.role)?;
        let limit = limit_from_proto(req.limit).unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
        let scope = match (req.since.as_ref(), req.until.as_ref()) {
            (None, None) => LeaderboardScope::AllTime,
            (Some(since), until) => LeaderboardScope::Window {
                since: timestamp_from_proto(since)?,
                until: match until {
                    Some(until) => timestamp_from_proto(until)?,
                    None => Utc::now(),
                },
            },
            (None, Some(_)) => {
                return Err(Status::invalid_argument(
                    "leaderboard window requires a start",
                ))
            }
        };

        let entries = self
            .service
            .leaderboard(role, limit, scope)
            .await?
            .into_iter()
            .map(|entry| proto::LeaderboardEntry {
                rank: entry.rank,
                account_id: entry.account_id,
                display_name: entry.display_name,
                points: entry.points,
            })
            .collect();
        Ok(Response::new(proto::Leaderboard { entries }))
    }

    async fn redeem(
        &self,
        request: Request<proto::RedeemRequest>,
    ) -> Result<Response<proto::Posted>, Status> {
        let req = request.into_inner();
        let transaction_id = self
            .service
            .redeem(&req.customer_account_id, req.points, &req.description)
            .await?;
        Ok(Response::new(proto::Posted {
            transaction_id: transaction_id.to_string(),
        }))
    }

    async fn admin_adjust(
        &self,
        request: Request<proto::AdjustRequest>,
    ) -> Result<Response<proto::Posted>, Status> {
        let req = request.into_inner();
        let role = role_from_proto(req.role)?;
        let transaction_id = self
            .service
            .admin_adjust(&req.account_id, role, req.points, &req.description)
            .await?;
        Ok(Response::new(proto::Posted {
            transaction_id: transaction_id.to_string(),
        }))
    }

    async fn list_transactions(
        &self,
        request: Request<proto::ListTransactionsRequest>,
    ) -> Result<Response<proto::TransactionList>, Status> {
        let req = request.into_inner();
        let account = req
            .account
            .ok_or_else(|| Status::invalid_argument("account is required"))?;
        let role = role_from_proto(account.role)?;
        let transactions = self
            .service
            .transactions(&account.account_id, role, limit_from_proto(req.limit))
            .await?
            .into_iter()
            .map(transaction_to_proto)
            .collect();
        Ok(Response::new(proto::TransactionList { transactions }))
    }

    async fn verify_account(
        &self,
        request: Request<proto::AccountRef>,
    ) -> Result<Response<proto::Reconciliation>, Status> {
        let req = request.into_inner();
        let role = role_from_proto(req.role)?;
        let report = self.service.verify(&req.account_id, role).await?;
        Ok(Response::new(reconciliation_to_proto(report)))
    }

    async fn get_setting(
        &self,
        request: Request<proto::SettingKey>,
    ) -> Result<Response<proto::Setting>, Status> {
        let req = request.into_inner();
        let setting = self.service.get_setting(&req.key).await?;
        Ok(Response::new(setting_to_proto(setting)))
    }

    async fn put_setting(
        &self,
        request: Request<proto::Setting>,
    ) -> Result<Response<proto::Setting>, Status> {
        let req = request.into_inner();
        let setting = self
            .service
            .put_setting(&req.key, &req.value, &req.description)
            .await?;
        Ok(Response::new(setting_to_proto(setting)))
    }

    async fn list_settings(
        &self,
        _request: Request<proto::ListSettingsRequest>,
    ) -> Result<Response<proto::SettingList>, Status> {
        let settings = self
            .service
            .list_settings()
            .await?
            .into_iter()
            .map(setting_to_proto)
            .collect();
        Ok(Response::new(proto::SettingList { settings }))
    }

    async fn complete_order(
        &self,
        request: Request<proto::OrderCompleted>,
    ) -> Result<Response<proto::AccrualReport>, Status> {
        let order = order_from_proto(request.into_inner())?;
        let report = self.service.complete_order(&order).await?;
        Ok(Response::new(report_to_proto(report)))
    }

    async fn publish_order_completed(
        &self,
        request: Request<proto::OrderCompleted>,
    ) -> Result<Response<proto::PublishAck>, Status> {
        let order = order_from_proto(request.into_inner())?;
        if order.order_id.trim().is_empty() || order.customer_account_id.trim().is_empty() {
            return Err(Status::invalid_argument(
                "order_id and customer_account_id are required",
            ));
        }
        let order_id = order.order_id.clone();
        self.bus
            .publish(order)
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;
        Ok(Response::new(proto::PublishAck { order_id }))
    }
}
