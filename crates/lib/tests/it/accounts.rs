//! Account slot tests: capacity, create/switch/remove through the coordinator

use sadhana::account::AccountError;

use crate::helpers::*;

// ===== SLOT CAPACITY TESTS =====

#[tokio::test]
async fn test_fourth_account_is_rejected() {
    let device = TestDevice::new();
    let tab = device.open().await;

    for (n, name) in ["Radha", "Krishna", "Sita"].into_iter().enumerate() {
        let (account, used) = create(&tab, name, "pw").await;
        assert_eq!(used, slot(n as u8 + 1));
        assert_eq!(account.slot, used);
    }
    let before = tab.device_accounts().await.unwrap();

    let err = tab
        .create_account(new_account("Rama", "pw"))
        .await
        .unwrap_err();
    assert!(err.is_device_full());
    assert_eq!(tab.device_accounts().await.unwrap(), before);
    assert_eq!(tab.accounts().occupied_slot_count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_full_device_rejects_import() {
    let device = TestDevice::new();
    let tab = device.open().await;
    create(&tab, "Radha", "pw").await;
    let payload = tab
        .accounts()
        .export_account_qr(slot(1), "pw", true)
        .await
        .unwrap();
    create(&tab, "Krishna", "pw").await;
    create(&tab, "Sita", "pw").await;

    let err = tab.import_account(&payload, None).await.unwrap_err();
    assert!(err.is_device_full());
}

#[tokio::test]
async fn test_accounts_get_unique_ids() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (a, _) = create(&tab, "Same", "pw").await;
    let (b, _) = create(&tab, "Same", "pw").await;
    assert_ne!(a.id, b.id);
}

// ===== SWITCH TESTS =====

#[tokio::test]
async fn test_switch_returns_created_account() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (created, used) = create(&tab, "Radha", "abc123").await;

    let account = tab.accounts().switch_to_account(used, "abc123").await.unwrap();
    assert_eq!(account.id, created.id);
    assert_eq!(account.name, "Radha");
    assert_eq!(account.date_of_birth, dob());
    assert_eq!(account.symbol.as_deref(), Some("om"));
}

#[tokio::test]
async fn test_wrong_password_never_returns_data() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (_, used) = create(&tab, "Radha", "abc123").await;

    let err = tab
        .accounts()
        .switch_to_account(used, "abc124")
        .await
        .unwrap_err();
    assert!(err.is_invalid_credentials());
    assert!(err.is_authentication_error());
}

#[tokio::test]
async fn test_empty_slot_is_reported() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let err = tab.login(slot(2), "pw").await.unwrap_err();
    assert!(matches!(
        err,
        sadhana::Error::Account(AccountError::SlotEmpty { slot: 2 })
    ));
    assert!(err.is_not_found());
}

// ===== REMOVAL TESTS =====

#[tokio::test]
async fn test_removal_keeps_other_slot_numbers() {
    let device = TestDevice::new();
    let tab = device.open().await;
    create(&tab, "Radha", "one").await;
    let (second, _) = create(&tab, "Krishna", "two").await;

    tab.remove_account(slot(1)).await.unwrap();
    let summaries = tab.device_accounts().await.unwrap();
    assert!(summaries[0].is_empty);
    assert!(!summaries[1].is_empty);

    let account = tab.login(slot(2), "two").await.unwrap();
    assert_eq!(account.id, second.id);
    assert_eq!(account.slot, slot(2));
}

#[tokio::test]
async fn test_removing_empty_slot_is_noop() {
    let device = TestDevice::new();
    let tab = device.open().await;
    tab.remove_account(slot(3)).await.unwrap();
    assert!(!tab.check_persisted_session().await.unwrap());
}

// ===== PERSISTENCE TESTS =====

#[tokio::test]
async fn test_accounts_survive_file_backed_restart() {
    let dir = tempfile::tempdir().unwrap();
    let device = TestDevice::new();
    let created = {
        let storage = sadhana::storage::DeviceStorage::open(dir.path()).await.unwrap();
        let tab = sadhana::SessionCoordinator::open(
            &storage,
            device.environment.clone(),
            sadhana::Config::for_testing(),
            device.clock.clone(),
            device.bus.clone(),
        )
        .await
        .unwrap();
        create(&tab, "Radha", "abc123").await.0
    };

    let storage = sadhana::storage::DeviceStorage::open(dir.path()).await.unwrap();
    let tab = sadhana::SessionCoordinator::open(
        &storage,
        device.environment.clone(),
        sadhana::Config::for_testing(),
        device.clock.clone(),
        device.bus.clone(),
    )
    .await
    .unwrap();
    assert!(tab.check_persisted_session().await.unwrap());
    assert!(!tab.is_authenticated().await);
    assert_eq!(tab.login(slot(1), "abc123").await.unwrap().id, created.id);
}
