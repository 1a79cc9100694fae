//! LedgerStore interface tests.
//!
//! These tests verify the contract of the LedgerStore trait.
//! Each storage implementation should run these tests. Stores are shared
//! across tests, so every test works on its own freshly generated accounts.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use loyalty_ledger::interfaces::{LedgerError, LedgerStore};
use loyalty_ledger::ledger::{NewTransaction, Role, TransactionKind};

/// Unique account id for one test.
pub fn account(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// Fixed instant far from `Utc::now()` so window tests see only their own rows.
pub fn window_base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2001, 3, 1, 12, 0, 0).unwrap()
}

// =============================================================================
// append tests
// =============================================================================

pub async fn test_append_creates_account<S: LedgerStore>(store: &S) {
    let id = account("append-create");

    store
        .append(NewTransaction::earned(&id, Role::Customer, 10, "O1", "order"))
        .await
        .expect("append should succeed");

    let acct = store
        .account(&id, Role::Customer)
        .await
        .expect("account should exist");
    assert_eq!(acct.balance, 10);
    assert_eq!(acct.total_earned, 10);
    assert_eq!(acct.total_redeemed, 0);
    assert!(acct.last_activity_at.is_some());
}

pub async fn test_append_returns_distinct_ids<S: LedgerStore>(store: &S) {
    let id = account("append-ids");

    let first = store
        .append(NewTransaction::earned(&id, Role::Customer, 10, "O1", "order"))
        .await
        .unwrap();
    let second = store
        .append(NewTransaction::earned(&id, Role::Customer, 10, "O2", "order"))
        .await
        .unwrap();

    assert_ne!(first, second);
}

pub async fn test_append_rejects_duplicate_accrual<S: LedgerStore>(store: &S) {
    let id = account("append-dup");

    store
        .append(NewTransaction::earned(&id, Role::Customer, 10, "O1", "order"))
        .await
        .unwrap();
    let result = store
        .append(NewTransaction::earned(&id, Role::Customer, 10, "O1", "order"))
        .await;

    assert!(
        matches!(result, Err(LedgerError::DuplicateAccrual { .. })),
        "second accrual for the same order should be rejected, got {:?}",
        result
    );
    let acct = store.account(&id, Role::Customer).await.unwrap();
    assert_eq!(acct.balance, 10, "duplicate must not change the balance");
    assert_eq!(store.transactions(&id, Role::Customer, None).await.unwrap().len(), 1);
}

pub async fn test_same_order_credits_each_role_once<S: LedgerStore>(store: &S) {
    let id = account("append-roles");

    store
        .append(NewTransaction::earned(&id, Role::Customer, 10, "O1", "order"))
        .await
        .expect("customer accrual should succeed");
    store
        .append(NewTransaction::earned(&id, Role::Representative, 5, "O1", "order"))
        .await
        .expect("representative accrual for the same order should succeed");

    assert_eq!(store.account(&id, Role::Customer).await.unwrap().balance, 10);
    assert_eq!(
        store.account(&id, Role::Representative).await.unwrap().balance,
        5
    );
}

pub async fn test_redeem_debits_balance<S: LedgerStore>(store: &S) {
    let id = account("redeem");

    store
        .append(NewTransaction::earned(&id, Role::Customer, 30, "O1", "order"))
        .await
        .unwrap();
    store
        .append(NewTransaction::redeemed(&id, 20, "reward"))
        .await
        .expect("redeem within balance should succeed");

    let acct = store.account(&id, Role::Customer).await.unwrap();
    assert_eq!(acct.balance, 10);
    assert_eq!(acct.total_earned, 30);
    assert_eq!(acct.total_redeemed, 20);
}

pub async fn test_redeem_exact_balance<S: LedgerStore>(store: &S) {
    let id = account("redeem-exact");

    store
        .append(NewTransaction::earned(&id, Role::Customer, 10, "O1", "order"))
        .await
        .unwrap();
    store
        .append(NewTransaction::redeemed(&id, 10, "reward"))
        .await
        .expect("redeeming the whole balance should succeed");

    assert_eq!(store.account(&id, Role::Customer).await.unwrap().balance, 0);
}

pub async fn test_redeem_insufficient_changes_nothing<S: LedgerStore>(store: &S) {
    let id = account("redeem-short");

    store
        .append(NewTransaction::earned(&id, Role::Customer, 10, "O1", "order"))
        .await
        .unwrap();
    let result = store.append(NewTransaction::redeemed(&id, 11, "reward")).await;

    match result {
        Err(LedgerError::InsufficientPoints {
            balance, requested, ..
        }) => {
            assert_eq!(balance, 10);
            assert_eq!(requested, 11);
        }
        other => panic!("expected InsufficientPoints, got {:?}", other),
    }

    let acct = store.account(&id, Role::Customer).await.unwrap();
    assert_eq!(acct.balance, 10);
    assert_eq!(acct.total_redeemed, 0);
    assert_eq!(store.transactions(&id, Role::Customer, None).await.unwrap().len(), 1);
}

pub async fn test_representative_cannot_redeem<S: LedgerStore>(store: &S) {
    let id = account("rep-redeem");

    let mut tx = NewTransaction::redeemed(&id, 5, "reward");
    tx.role = Role::Representative;
    let result = store.append(tx).await;

    assert!(matches!(result, Err(LedgerError::RoleForbidsKind { .. })));
}

pub async fn test_adjustment_credit_and_debit<S: LedgerStore>(store: &S) {
    let id = account("adjust");

    store
        .append(NewTransaction::adjustment(&id, Role::Representative, 25, "bonus"))
        .await
        .unwrap();
    store
        .append(NewTransaction::adjustment(&id, Role::Representative, -5, "correction"))
        .await
        .unwrap();

    let acct = store.account(&id, Role::Representative).await.unwrap();
    assert_eq!(acct.balance, 20);
    assert_eq!(acct.total_earned, 25);
    assert_eq!(acct.total_redeemed, 0);

    let result = store
        .append(NewTransaction::adjustment(&id, Role::Representative, -21, "too much"))
        .await;
    assert!(matches!(result, Err(LedgerError::InsufficientPoints { .. })));
    assert_eq!(
        store.account(&id, Role::Representative).await.unwrap().balance,
        20
    );
}

pub async fn test_append_rejects_zero_points<S: LedgerStore>(store: &S) {
    let id = account("zero");

    let result = store
        .append(NewTransaction::adjustment(&id, Role::Customer, 0, "nothing"))
        .await;

    assert!(matches!(result, Err(LedgerError::Validation(_))));
    assert!(matches!(
        store.account(&id, Role::Customer).await,
        Err(LedgerError::AccountNotFound { .. })
    ));
}

pub async fn test_extreme_point_values_rejected<S: LedgerStore>(store: &S) {
    let id = account("extreme");

    let result = store
        .append(NewTransaction::adjustment(&id, Role::Customer, i64::MIN, "min"))
        .await;
    assert!(
        matches!(result, Err(LedgerError::Validation(_))),
        "i64::MIN adjustment should be rejected, got {:?}",
        result
    );

    store
        .append(NewTransaction::adjustment(&id, Role::Customer, i64::MAX, "max"))
        .await
        .expect("a credit up to i64::MAX should succeed");
    let result = store
        .append(NewTransaction::earned(&id, Role::Customer, 1, "O1", "order"))
        .await;
    assert!(
        matches!(result, Err(LedgerError::Validation(_))),
        "credit past i64::MAX should be rejected, got {:?}",
        result
    );

    let acct = store.account(&id, Role::Customer).await.unwrap();
    assert_eq!(acct.balance, i64::MAX);
    let rec = store.verify(&id, Role::Customer).await.unwrap();
    assert!(rec.consistent(), "cache should match ledger: {:?}", rec);
    assert_eq!(rec.transaction_count, 1);

    // The rejected accrual left no idempotency record behind
    store
        .append(NewTransaction::adjustment(&id, Role::Customer, -i64::MAX, "reset"))
        .await
        .unwrap();
    store
        .append(NewTransaction::adjustment(&id, Role::Customer, -1, "below zero"))
        .await
        .expect_err("debit from zero should be rejected");
    let result = store
        .append(NewTransaction::earned(&id, Role::Customer, 1, "O1", "order"))
        .await;
    assert!(
        matches!(result, Err(LedgerError::Validation(_))),
        "total_earned overflow should be rejected, got {:?}",
        result
    );
    assert_eq!(store.account(&id, Role::Customer).await.unwrap().balance, 0);
}

// =============================================================================
// account / transactions tests
// =============================================================================

pub async fn test_account_not_found<S: LedgerStore>(store: &S) {
    let result = store.account(&account("missing"), Role::Customer).await;
    assert!(matches!(result, Err(LedgerError::AccountNotFound { .. })));
}

pub async fn test_roles_are_separate_accounts<S: LedgerStore>(store: &S) {
    let id = account("roles");

    store
        .append(NewTransaction::earned(&id, Role::Representative, 5, "O1", "order"))
        .await
        .unwrap();

    assert!(matches!(
        store.account(&id, Role::Customer).await,
        Err(LedgerError::AccountNotFound { .. })
    ));
    assert!(store
        .transactions(&id, Role::Customer, None)
        .await
        .unwrap()
        .is_empty());
}

pub async fn test_transactions_newest_first<S: LedgerStore>(store: &S) {
    let id = account("history");
    let now = Utc::now();

    for (i, order) in ["O1", "O2", "O3"].iter().enumerate() {
        store
            .append(
                NewTransaction::earned(&id, Role::Customer, 10, *order, "order")
                    .at(now - Duration::minutes(10 - i as i64)),
            )
            .await
            .unwrap();
    }

    let history = store.transactions(&id, Role::Customer, None).await.unwrap();
    let orders: Vec<_> = history
        .iter()
        .map(|t| t.source_order_id.clone().unwrap_or_default())
        .collect();
    assert_eq!(orders, vec!["O3", "O2", "O1"]);
    assert!(history.iter().all(|t| t.kind == TransactionKind::Earned));
}

pub async fn test_transactions_limit<S: LedgerStore>(store: &S) {
    let id = account("history-limit");
    let now = Utc::now();

    for i in 0..5 {
        store
            .append(
                NewTransaction::earned(&id, Role::Customer, 1, format!("O{i}"), "order")
                    .at(now + Duration::seconds(i)),
            )
            .await
            .unwrap();
    }

    let history = store
        .transactions(&id, Role::Customer, Some(2))
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].source_order_id.as_deref(), Some("O4"));
}

pub async fn test_transaction_fields_preserved<S: LedgerStore>(store: &S) {
    let id = account("fields");

    let transaction_id = store
        .append(NewTransaction::earned(&id, Role::Customer, 10, "O1", "Order O1 completed"))
        .await
        .unwrap();
    store
        .append(NewTransaction::redeemed(&id, 4, "Coffee voucher"))
        .await
        .unwrap();

    let history = store.transactions(&id, Role::Customer, None).await.unwrap();
    let earned = history
        .iter()
        .find(|t| t.transaction_id == transaction_id)
        .expect("earned transaction should be listed");
    assert_eq!(earned.points, 10);
    assert_eq!(earned.description, "Order O1 completed");
    assert_eq!(earned.role, Role::Customer);

    let redeemed = history
        .iter()
        .find(|t| t.kind == TransactionKind::Redeemed)
        .expect("redemption should be listed");
    assert_eq!(redeemed.points, -4);
    assert_eq!(redeemed.source_order_id, None);
}

// =============================================================================
// leaderboard queries
// =============================================================================

pub async fn test_top_accounts_order<S: LedgerStore>(store: &S) {
    let high = account("top-b");
    let tie_a = format!("top-a-{}", Uuid::new_v4());
    let tie_c = format!("top-c-{}", Uuid::new_v4());

    for (id, points) in [(&high, 1_000_000), (&tie_a, 900_000), (&tie_c, 900_000)] {
        store
            .append(NewTransaction::adjustment(id, Role::Representative, points, "seed"))
            .await
            .unwrap();
    }

    let mine: Vec<String> = store
        .top_accounts(Role::Representative, 10_000)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.account_id)
        .filter(|a| *a == high || *a == tie_a || *a == tie_c)
        .collect();
    assert_eq!(mine, vec![high, tie_a, tie_c]);
}

pub async fn test_top_accounts_respects_limit<S: LedgerStore>(store: &S) {
    for _ in 0..3 {
        store
            .append(NewTransaction::adjustment(
                account("top-limit"),
                Role::Customer,
                1,
                "seed",
            ))
            .await
            .unwrap();
    }

    let top = store.top_accounts(Role::Customer, 2).await.unwrap();
    assert_eq!(top.len(), 2);
    assert!(top[0].balance >= top[1].balance);
}

pub async fn test_window_totals_half_open<S: LedgerStore>(store: &S) {
    let id = account("window");
    let base = window_base();

    store
        .append(NewTransaction::earned(&id, Role::Customer, 10, "O1", "order").at(base))
        .await
        .unwrap();
    store
        .append(
            NewTransaction::earned(&id, Role::Customer, 10, "O2", "order")
                .at(base + Duration::days(1)),
        )
        .await
        .unwrap();
    store
        .append(NewTransaction::redeemed(&id, 3, "reward").at(base + Duration::hours(1)))
        .await
        .unwrap();

    let totals = store
        .window_totals(Role::Customer, base, base + Duration::days(1))
        .await
        .unwrap();
    let mine: Vec<_> = totals.into_iter().filter(|(a, _)| *a == id).collect();
    assert_eq!(mine, vec![(id.clone(), 7)], "until is exclusive, debits net out");
}

// =============================================================================
// verify tests
// =============================================================================

pub async fn test_verify_consistent<S: LedgerStore>(store: &S) {
    let id = account("verify");

    store
        .append(NewTransaction::earned(&id, Role::Customer, 30, "O1", "order"))
        .await
        .unwrap();
    store
        .append(NewTransaction::redeemed(&id, 12, "reward"))
        .await
        .unwrap();
    let _ = store.append(NewTransaction::redeemed(&id, 100, "too much")).await;

    let rec = store.verify(&id, Role::Customer).await.unwrap();
    assert!(rec.consistent(), "cache should match ledger: {:?}", rec);
    assert_eq!(rec.ledger_balance, 18);
    assert_eq!(rec.ledger_total_earned, 30);
    assert_eq!(rec.ledger_total_redeemed, 12);
    assert_eq!(rec.transaction_count, 2);
}

pub async fn test_verify_unknown_account<S: LedgerStore>(store: &S) {
    let rec = store
        .verify(&account("verify-missing"), Role::Representative)
        .await
        .unwrap();
    assert!(rec.consistent());
    assert_eq!(rec.transaction_count, 0);
    assert_eq!(rec.cached.balance, 0);
}

/// Macro to run all LedgerStore tests against a store instance.
#[macro_export]
macro_rules! run_ledger_store_tests {
    ($store:expr) => {
        use $crate::storage::ledger_store_tests::*;

        // append tests
        test_append_creates_account($store).await;
        println!("  test_append_creates_account: PASSED");

        test_append_returns_distinct_ids($store).await;
        println!("  test_append_returns_distinct_ids: PASSED");

        test_append_rejects_duplicate_accrual($store).await;
        println!("  test_append_rejects_duplicate_accrual: PASSED");

        test_same_order_credits_each_role_once($store).await;
        println!("  test_same_order_credits_each_role_once: PASSED");

        test_redeem_debits_balance($store).await;
        println!("  test_redeem_debits_balance: PASSED");

        test_redeem_exact_balance($store).await;
        println!("  test_redeem_exact_balance: PASSED");

        test_redeem_insufficient_changes_nothing($store).await;
        println!("  test_redeem_insufficient_changes_nothing: PASSED");

        test_representative_cannot_redeem($store).await;
        println!("  test_representative_cannot_redeem: PASSED");

        test_adjustment_credit_and_debit($store).await;
        println!("  test_adjustment_credit_and_debit: PASSED");

        test_append_rejects_zero_points($store).await;
        println!("  test_append_rejects_zero_points: PASSED");

        test_extreme_point_values_rejected($store).await;
        println!("  test_extreme_point_values_rejected: PASSED");

        // account / transactions tests
        test_account_not_found($store).await;
        println!("  test_account_not_found: PASSED");

        test_roles_are_separate_accounts($store).await;
        println!("  test_roles_are_separate_accounts: PASSED");

        test_transactions_newest_first($store).await;
        println!("  test_transactions_newest_first: PASSED");

        test_transactions_limit($store).await;
        println!("  test_transactions_limit: PASSED");

        test_transaction_fields_preserved($store).await;
        println!("  test_transaction_fields_preserved: PASSED");

        // leaderboard queries
        test_top_accounts_order($store).await;
        println!("  test_top_accounts_order: PASSED");

        test_top_accounts_respects_limit($store).await;
        println!("  test_top_accounts_respects_limit: PASSED");

        test_window_totals_half_open($store).await;
        println!("  test_window_totals_half_open: PASSED");

        // verify tests
        test_verify_consistent($store).await;
        println!("  test_verify_consistent: PASSED");

        test_verify_unknown_account($store).await;
        println!("  test_verify_unknown_account: PASSED");
    };
}
