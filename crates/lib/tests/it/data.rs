//! Account-scoped data tests: namespacing and isolation across switches

use sadhana::{
    data::AccountDataManager,
    events::{SessionEventBus, TabId},
    storage::DeviceStorage,
};

use crate::helpers::*;

// ===== ISOLATION TESTS =====

#[tokio::test]
async fn test_switch_never_shows_previous_account_value() {
    let storage = DeviceStorage::in_memory();
    let data = AccountDataManager::new(&storage, SessionEventBus::default(), TabId::generate());

    data.switch_account_context(None, "account-a").await.unwrap();
    data.store_account_data("count", "540", None).await.unwrap();
    data.set_working_value("malas", "5").await.unwrap();

    data.switch_account_context(Some("account-a"), "account-b")
        .await
        .unwrap();
    assert_eq!(data.get_account_data("count", None).await.unwrap(), None);
    assert_eq!(data.get_account_data("malas", None).await.unwrap(), None);

    data.store_account_data("count", "27", None).await.unwrap();
    data.switch_account_context(Some("account-b"), "account-a")
        .await
        .unwrap();
    assert_eq!(
        data.get_account_data("count", None).await.unwrap().as_deref(),
        Some("540")
    );
    assert_eq!(
        data.get_account_data("malas", None).await.unwrap().as_deref(),
        Some("5")
    );
}

#[tokio::test]
async fn test_overlapping_account_ids_cannot_share_keys() {
    let storage = DeviceStorage::in_memory();
    let data = AccountDataManager::new(&storage, SessionEventBus::default(), TabId::generate());
    data.store_account_data("count", "999", Some("a-b")).await.unwrap();

    let err = data
        .store_account_data("count", "1", Some("a_b"))
        .await
        .unwrap_err();
    assert!(err.is_validation_error());

    data.switch_account_context(None, "a").await.unwrap();
    assert_eq!(data.get_working_value("b_count").await.unwrap(), None);
    assert_eq!(data.clear_account_data("a").await.unwrap(), 0);
    assert_eq!(
        data.get_account_data("count", Some("a-b"))
            .await
            .unwrap()
            .as_deref(),
        Some("999")
    );
}

#[tokio::test]
async fn test_login_switches_data_between_accounts() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (first, one) = create(&tab, "Radha", "one").await;
    let (second, two) = create(&tab, "Krishna", "two").await;

    tab.login(one, "one").await.unwrap();
    tab.data().set_working_value("count", "1008").await.unwrap();

    tab.login(two, "two").await.unwrap();
    assert_eq!(tab.data().active_account_id().await, Some(second.id.clone()));
    assert_eq!(tab.data().get_account_data("count", None).await.unwrap(), None);
    assert_eq!(
        tab.data()
            .get_account_data("count", Some(first.id.as_str()))
            .await
            .unwrap()
            .as_deref(),
        Some("1008")
    );
}

#[tokio::test]
async fn test_no_context_after_logout() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (_, used) = create(&tab, "Radha", "abc123").await;
    tab.login(used, "abc123").await.unwrap();
    tab.logout().await.unwrap();

    let err = tab
        .data()
        .store_account_data("count", "1", None)
        .await
        .unwrap_err();
    assert!(err.is_no_account_context());
}

// ===== REDUNDANCY TESTS =====

#[tokio::test]
async fn test_read_falls_back_when_primary_is_cleared() {
    let storage = DeviceStorage::in_memory();
    let data = AccountDataManager::new(&storage, SessionEventBus::default(), TabId::generate());
    data.store_account_data("streak", "41", Some("acct")).await.unwrap();

    storage.local().delete("account_acct_streak").await.unwrap();
    assert_eq!(
        data.get_account_data("streak", Some("acct"))
            .await
            .unwrap()
            .as_deref(),
        Some("41")
    );
}

#[tokio::test]
async fn test_clear_reaches_every_backend() {
    let storage = DeviceStorage::in_memory();
    let data = AccountDataManager::new(&storage, SessionEventBus::default(), TabId::generate());
    data.switch_account_context(None, "acct").await.unwrap();
    data.store_account_data("count", "9", None).await.unwrap();

    data.clear_account_data("acct").await.unwrap();
    assert!(storage.local().keys("account_acct_").await.unwrap().is_empty());
    assert!(storage.documents().keys("account_acct_").await.unwrap().is_empty());
    assert_eq!(data.get_working_value("count").await.unwrap(), None);
}

#[tokio::test]
async fn test_sibling_clear_drops_working_area() {
    let storage = DeviceStorage::in_memory();
    let bus = SessionEventBus::default();
    let tab_a = AccountDataManager::new(&storage, bus.clone(), TabId::generate());
    let tab_b_tab = TabId::generate();
    let tab_b = AccountDataManager::new(&storage.new_tab(), bus.clone(), tab_b_tab.clone());
    let mut events_b = bus.subscribe(&tab_b_tab);

    tab_b.switch_account_context(None, "acct").await.unwrap();
    tab_b.set_working_value("count", "3").await.unwrap();
    tab_a.clear_account_data("acct").await.unwrap();

    let message = events_b.recv().await.unwrap();
    assert!(tab_b.handle_event(&message).await.unwrap());
    tab_b.release_context().await.unwrap();
    assert_eq!(tab_a.get_account_data("count", Some("acct")).await.unwrap(), None);
}
