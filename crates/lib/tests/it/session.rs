//! Session coordinator tests: explicit login and cross-tab behaviour

use std::sync::Arc;
use std::time::Duration;

use sadhana::session::RemoteSessionChange;

use crate::helpers::*;

// ===== NO AUTO-LOGIN TESTS =====

#[tokio::test]
async fn test_restart_starts_unauthenticated() {
    let device = TestDevice::new();
    {
        let tab = device.open().await;
        let (_, used) = create(&tab, "Radha", "abc123").await;
        tab.login(used, "abc123").await.unwrap();
        assert!(tab.is_authenticated().await);
        // Dropped without logging out, like a closed browser.
    }

    let restarted = device.open_tab().await;
    assert!(restarted.check_persisted_session().await.unwrap());
    assert!(!restarted.is_authenticated().await);
    assert!(restarted.current_account().await.is_none());
    // The pointer is still there but does not authenticate anything.
    assert!(restarted.session_pointer().await.unwrap().is_some());

    restarted.login(slot(1), "abc123").await.unwrap();
    assert!(restarted.is_authenticated().await);
}

#[tokio::test]
async fn test_fresh_device_has_no_accounts() {
    let device = TestDevice::new();
    let tab = device.open().await;
    assert!(!tab.check_persisted_session().await.unwrap());
    assert!(!tab.is_authenticated().await);
}

#[tokio::test]
async fn test_logout_keeps_account_data() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (_, used) = create(&tab, "Radha", "abc123").await;
    let account = tab.login(used, "abc123").await.unwrap();
    tab.data()
        .store_account_data("count", "108", None)
        .await
        .unwrap();

    tab.logout().await.unwrap();
    assert!(tab.check_persisted_session().await.unwrap());
    assert_eq!(
        tab.data()
            .get_account_data("count", Some(account.id.as_str()))
            .await
            .unwrap()
            .as_deref(),
        Some("108")
    );
}

// ===== CROSS-TAB TESTS =====

#[tokio::test]
async fn test_sibling_login_is_observed_not_adopted() {
    let device = TestDevice::new();
    let tab_a = device.open().await;
    let tab_b = device.open_tab().await;
    let mut events_b = tab_b.subscribe();
    let (_, used) = create(&tab_a, "Radha", "abc123").await;

    let account = tab_a.login(used, "abc123").await.unwrap();
    let message = events_b.recv().await.unwrap();
    let change = tab_b.handle_event(&message).await.unwrap();

    assert_eq!(
        change,
        RemoteSessionChange::LoginObserved {
            account_id: account.id,
            slot: used
        }
    );
    assert!(!tab_b.is_authenticated().await);
}

#[tokio::test]
async fn test_sibling_logout_ends_same_account_session() {
    let device = TestDevice::new();
    let tab_a = device.open().await;
    let tab_b = device.open_tab().await;
    let (_, used) = create(&tab_a, "Radha", "abc123").await;
    let account = tab_a.login(used, "abc123").await.unwrap();
    tab_b.login(used, "abc123").await.unwrap();

    let mut events_b = tab_b.subscribe();
    tab_a.logout().await.unwrap();

    let message = events_b.recv().await.unwrap();
    assert_eq!(
        tab_b.handle_event(&message).await.unwrap(),
        RemoteSessionChange::LoggedOut {
            account_id: account.id
        }
    );
    assert!(!tab_b.is_authenticated().await);
    // Tab B logged out locally without broadcasting again.
    assert!(events_b.try_recv().is_none());
}

#[tokio::test]
async fn test_sibling_logout_of_other_account_is_ignored() {
    let device = TestDevice::new();
    let tab_a = device.open().await;
    let tab_b = device.open_tab().await;
    let (_, first) = create(&tab_a, "Radha", "one").await;
    let (_, second) = create(&tab_a, "Krishna", "two").await;
    tab_a.login(first, "one").await.unwrap();
    tab_b.login(second, "two").await.unwrap();

    let mut events_b = tab_b.subscribe();
    tab_a.logout().await.unwrap();
    let message = events_b.recv().await.unwrap();
    assert_eq!(
        tab_b.handle_event(&message).await.unwrap(),
        RemoteSessionChange::Ignored
    );
    assert!(tab_b.is_authenticated().await);
}

#[tokio::test]
async fn test_sibling_device_id_moves_slot_namespace() {
    let device = TestDevice::new();
    let tab_a = device.open().await;
    let tab_b = device.open_tab().await;
    let mut events_a = tab_a.subscribe();

    tab_b.device_ids().store_device_id("0123456789abcdef").await;
    let message = events_a.recv().await.unwrap();
    assert_eq!(
        tab_a.handle_event(&message).await.unwrap(),
        RemoteSessionChange::DeviceIdUpdated
    );
    assert_eq!(tab_a.device_id().await, "0123456789abcdef");

    create(&tab_a, "Radha", "abc123").await;
    assert!(
        device
            .storage
            .local()
            .get("device_0123456789abcdef_slot_1")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_listener_applies_sibling_logout() {
    let device = TestDevice::new();
    let tab_a = device.open().await;
    let tab_b = Arc::new(device.open_tab().await);
    let (_, used) = create(&tab_a, "Radha", "abc123").await;
    tab_a.login(used, "abc123").await.unwrap();
    tab_b.login(used, "abc123").await.unwrap();

    let listener = tab_b.clone().spawn_event_listener();
    tab_a.logout().await.unwrap();

    let mut waited = Duration::ZERO;
    while tab_b.is_authenticated().await && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    assert!(!tab_b.is_authenticated().await);
    listener.abort();
}

#[tokio::test]
async fn test_logout_leaves_newer_sibling_pointer() {
    let device = TestDevice::new();
    let tab_a = device.open().await;
    let tab_b = device.open_tab().await;
    let (_, first) = create(&tab_a, "Radha", "one").await;
    let (_, second) = create(&tab_a, "Krishna", "two").await;
    tab_a.login(first, "one").await.unwrap();
    let latest = tab_b.login(second, "two").await.unwrap();

    tab_a.logout().await.unwrap();
    let pointer = tab_a.session_pointer().await.unwrap().unwrap();
    assert_eq!(pointer.account_id, latest.id);
    assert_eq!(&pointer.tab_id, tab_b.tab_id());

    tab_a.clear_session().await.unwrap();
    assert!(tab_a.session_pointer().await.unwrap().is_none());
}
