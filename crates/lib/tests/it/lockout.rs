//! Lockout cycle tests driven by a manual clock

use crate::helpers::*;

#[tokio::test]
async fn test_three_failures_lock_slot_for_five_minutes() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (created, used) = create(&tab, "Radha", "abc123").await;

    let first = tab.login(used, "wrong").await.unwrap_err();
    assert!(first.is_invalid_credentials());
    assert!(first.to_string().contains("2 attempts remaining"));
    let second = tab.login(used, "wrong").await.unwrap_err();
    assert!(second.to_string().contains("1 attempts remaining"));
    let third = tab.login(used, "wrong").await.unwrap_err();
    assert!(third.is_account_locked());

    assert!(tab.check_lockout_status(used).await.unwrap());
    assert_eq!(tab.get_remaining_lockout_time(used).await.unwrap(), 300_000);

    // The right password is refused while locked.
    assert!(tab.login(used, "abc123").await.unwrap_err().is_account_locked());

    device.clock.advance(300_001);
    assert!(!tab.check_lockout_status(used).await.unwrap());
    assert_eq!(tab.accounts().lockout().failed_attempts(used).await.unwrap(), 0);

    let account = tab.login(used, "abc123").await.unwrap();
    assert_eq!(account.id, created.id);
    assert_eq!(account.name, "Radha");
}

#[tokio::test]
async fn test_lockout_lasts_exactly_configured_duration() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (_, used) = create(&tab, "Radha", "abc123").await;
    for _ in 0..3 {
        let _ = tab.login(used, "wrong").await;
    }

    device.clock.advance(299_999);
    assert!(tab.check_lockout_status(used).await.unwrap());
    assert_eq!(tab.get_remaining_lockout_time(used).await.unwrap(), 1);
    device.clock.advance(1);
    assert!(tab.check_lockout_status(used).await.unwrap());
    assert_eq!(tab.get_remaining_lockout_time(used).await.unwrap(), 0);
    device.clock.advance(1);
    assert!(!tab.check_lockout_status(used).await.unwrap());
}

#[tokio::test]
async fn test_success_before_third_failure_resets_counter() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (_, used) = create(&tab, "Radha", "abc123").await;

    let _ = tab.login(used, "wrong").await;
    let _ = tab.login(used, "wrong").await;
    tab.login(used, "abc123").await.unwrap();
    assert_eq!(tab.accounts().lockout().failed_attempts(used).await.unwrap(), 0);

    tab.logout().await.unwrap();
    let err = tab.login(used, "wrong").await.unwrap_err();
    assert!(err.is_invalid_credentials());
    assert!(!tab.check_lockout_status(used).await.unwrap());
}

#[tokio::test]
async fn test_lockout_is_per_slot() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (_, first) = create(&tab, "Radha", "one").await;
    let (_, second) = create(&tab, "Krishna", "two").await;
    for _ in 0..3 {
        let _ = tab.login(first, "wrong").await;
    }
    assert!(tab.check_lockout_status(first).await.unwrap());
    tab.login(second, "two").await.unwrap();
}

#[tokio::test]
async fn test_lockout_is_shared_between_tabs() {
    let device = TestDevice::new();
    let tab_a = device.open().await;
    let tab_b = device.open_tab().await;
    let (_, used) = create(&tab_a, "Radha", "abc123").await;
    for _ in 0..3 {
        let _ = tab_a.login(used, "wrong").await;
    }
    assert!(tab_b.login(used, "abc123").await.unwrap_err().is_account_locked());
}

#[tokio::test]
async fn test_wrong_password_on_export_counts() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (_, used) = create(&tab, "Radha", "abc123").await;
    for _ in 0..2 {
        let err = tab
            .accounts()
            .export_account_qr(used, "wrong", false)
            .await
            .unwrap_err();
        assert!(err.is_invalid_credentials());
    }
    assert!(tab.login(used, "wrong").await.unwrap_err().is_account_locked());
}
