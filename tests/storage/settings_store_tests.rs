//! SettingsStore interface tests.
//!
//! These tests verify the contract of the SettingsStore trait.
//! Each storage implementation should run these tests.

use uuid::Uuid;

use loyalty_ledger::interfaces::{SettingsError, SettingsStore};

fn key(prefix: &str) -> String {
    format!("test_{}_{}", prefix, Uuid::new_v4().simple())
}

pub async fn test_get_missing<S: SettingsStore>(store: &S) {
    let result = store.get(&key("missing")).await;
    assert!(matches!(result, Err(SettingsError::NotFound(_))));
}

pub async fn test_upsert_then_get<S: SettingsStore>(store: &S) {
    let key = key("upsert");

    let written = store
        .upsert(&key, "10", "points per order")
        .await
        .expect("upsert should succeed");
    assert_eq!(written.value, "10");

    let read = store.get(&key).await.expect("get should succeed");
    assert_eq!(read.key, key);
    assert_eq!(read.value, "10");
    assert_eq!(read.description, "points per order");
}

pub async fn test_upsert_replaces<S: SettingsStore>(store: &S) {
    let key = key("replace");

    store.upsert(&key, "10", "first").await.unwrap();
    store.upsert(&key, "25", "second").await.unwrap();

    let read = store.get(&key).await.unwrap();
    assert_eq!(read.value, "25");
    assert_eq!(read.description, "second");
    assert_eq!(
        store
            .list()
            .await
            .unwrap()
            .iter()
            .filter(|s| s.key == key)
            .count(),
        1
    );
}

pub async fn test_upsert_rejects_blank_key<S: SettingsStore>(store: &S) {
    let result = store.upsert("  ", "1", "").await;
    assert!(matches!(result, Err(SettingsError::Validation(_))));
}

pub async fn test_list_ordered_by_key<S: SettingsStore>(store: &S) {
    let suffix = Uuid::new_v4().simple().to_string();
    let b = format!("test_list_b_{suffix}");
    let a = format!("test_list_a_{suffix}");

    store.upsert(&b, "2", "").await.unwrap();
    store.upsert(&a, "1", "").await.unwrap();

    let keys: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.key)
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert!(keys.contains(&a) && keys.contains(&b));
}

pub async fn test_get_i64<S: SettingsStore>(store: &S) {
    let good = key("int");
    let bad = key("not_int");

    store.upsert(&good, " 42 ", "").await.unwrap();
    store.upsert(&bad, "ten", "").await.unwrap();

    assert_eq!(store.get_i64(&good).await.unwrap(), 42);
    assert!(matches!(
        store.get_i64(&bad).await,
        Err(SettingsError::InvalidValue { .. })
    ));
    assert!(matches!(
        store.get_i64(&key("absent")).await,
        Err(SettingsError::NotFound(_))
    ));
}

/// Macro to run all SettingsStore tests against a store instance.
#[macro_export]
macro_rules! run_settings_store_tests {
    ($store:expr) => {
        use $crate::storage::settings_store_tests::*;

        test_get_missing($store).await;
        println!("  test_get_missing: PASSED");

        test_upsert_then_get($store).await;
        println!("  test_upsert_then_get: PASSED");

        test_upsert_replaces($store).await;
        println!("  test_upsert_replaces: PASSED");

        test_upsert_rejects_blank_key($store).await;
        println!("  test_upsert_rejects_blank_key: PASSED");

        test_list_ordered_by_key($store).await;
        println!("  test_list_ordered_by_key: PASSED");

        test_get_i64($store).await;
        println!("  test_get_i64: PASSED");
    };
}
