//! QR export and import tests

use sadhana::{
    Clock,
    account::{TransferEnvelope, UserAccount},
};

use crate::helpers::*;

fn assert_same_person(imported: &UserAccount, original: &UserAccount) {
    assert_eq!(imported.name, original.name);
    assert_eq!(imported.date_of_birth, original.date_of_birth);
    assert_eq!(imported.symbol, original.symbol);
}

#[tokio::test]
async fn test_export_then_import_into_slot_two() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (_, used) = create(&tab, "Radha", "abc123").await;
    let original = tab.login(used, "abc123").await.unwrap();

    let payload = tab.export_current_account(true).await.unwrap();
    let (imported, new_slot) = tab.import_account(&payload, None).await.unwrap();

    assert_eq!(new_slot, slot(2));
    assert_eq!(imported.slot, slot(2));
    assert_same_person(&imported, &original);

    // The embedded secret sealed the new slot.
    tab.logout().await.unwrap();
    let reloaded = tab.login(slot(2), "abc123").await.unwrap();
    assert_eq!(reloaded.slot, slot(2));
    assert_same_person(&reloaded, &original);
}

#[tokio::test]
async fn test_import_on_another_device() {
    let source = TestDevice::new();
    let tab = source.open().await;
    let (original, used) = create(&tab, "Radha", "abc123").await;
    let payload = tab
        .accounts()
        .export_account_qr(used, "abc123", true)
        .await
        .unwrap();

    let mut target = TestDevice::new();
    let mut environment = (*target.environment).clone();
    environment.user_agent = Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string());
    target.environment = std::sync::Arc::new(environment);
    let other = target.open().await;
    assert_ne!(other.device_id().await, tab.device_id().await);

    let (imported, new_slot) = other.import_account(&payload, None).await.unwrap();
    assert_eq!(new_slot, slot(1));
    assert_same_person(&imported, &original);
    assert_eq!(imported.device_fingerprint, Some(other.device_id().await));
    other.login(new_slot, "abc123").await.unwrap();
}

#[tokio::test]
async fn test_payload_is_versioned_envelope() {
    let device = TestDevice::new();
    let tab = device.open().await;
    let (_, used) = create(&tab, "Radha", "abc123").await;
    tab.login(used, "abc123").await.unwrap();

    let payload = tab.export_current_account(false).await.unwrap();
    let envelope = TransferEnvelope::decode(&payload).unwrap();
    assert_eq!(envelope.version, "1.0");
    assert_eq!(envelope.device_fingerprint, tab.device_id().await);
    assert!(!envelope.data.contains("Radha"));

    let freshness = tab.config().transfer_freshness_ms;
    assert!(!envelope.is_stale(device.clock.now_utc(), freshness));
    device.clock.advance(freshness + 1);
    assert!(envelope.is_stale(device.clock.now_utc(), freshness));
}

#[tokio::test]
async fn test_malformed_payload_is_rejected() {
    let device = TestDevice::new();
    let tab = device.open().await;
    for payload in ["", "%%%", "eyJ2ZXJzaW9uIjoiMS4wIn0="] {
        let err = tab.import_account(payload, Some("pw")).await.unwrap_err();
        assert!(err.is_invalid_payload(), "{payload:?}: {err}");
    }
    assert!(!tab.check_persisted_session().await.unwrap());
}
