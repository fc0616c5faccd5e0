use std::sync::Arc;

use chrono::NaiveDate;
use sadhana::{
    Config, FixedClock, SessionCoordinator,
    account::{NewAccount, Slot, UserAccount},
    events::SessionEventBus,
    fingerprint::{DeviceEnvironment, ScreenInfo, WebGlInfo},
    storage::DeviceStorage,
};

/// A browser-like environment with every fingerprint signal present.
pub fn browser_environment() -> Arc<DeviceEnvironment> {
    Arc::new(DeviceEnvironment {
        user_agent: Some("Mozilla/5.0 (Linux; Android 14) Mobile Safari/537.36".to_string()),
        languages: vec!["hi-IN".to_string(), "en-IN".to_string()],
        platform: Some("Linux armv8l".to_string()),
        screen: Some(ScreenInfo {
            width: 412,
            height: 915,
            color_depth: 24,
            pixel_ratio: 2.625,
        }),
        timezone: Some("Asia/Kolkata".to_string()),
        timezone_offset_minutes: Some(330),
        hardware_concurrency: Some(8),
        device_memory_gb: Some(4),
        max_touch_points: Some(5),
        canvas_digest: Some("9f2c1e".to_string()),
        webgl: Some(WebGlInfo {
            vendor: "Qualcomm".to_string(),
            renderer: "Adreno (TM) 730".to_string(),
        }),
        audio_signature: Some("35.7383".to_string()),
        fonts: vec!["Roboto".to_string(), "Noto Sans Devanagari".to_string()],
        plugins: vec!["PDF Viewer".to_string(), "Chromium PDF Viewer".to_string()],
        connection_type: Some("4g".to_string()),
        cpu_timing_bucket: Some(12),
    })
}

/// Everything needed to open tabs against one simulated browser profile.
pub struct TestDevice {
    pub storage: DeviceStorage,
    pub bus: SessionEventBus,
    pub clock: Arc<FixedClock>,
    pub environment: Arc<DeviceEnvironment>,
}

impl TestDevice {
    pub fn new() -> Self {
        Self {
            storage: DeviceStorage::in_memory(),
            bus: SessionEventBus::default(),
            clock: Arc::new(FixedClock::default()),
            environment: browser_environment(),
        }
    }

    /// Open the first tab on this device.
    pub async fn open(&self) -> SessionCoordinator {
        self.open_on(&self.storage).await
    }

    /// Open a further tab: shared durable storage, fresh session storage.
    pub async fn open_tab(&self) -> SessionCoordinator {
        self.open_on(&self.storage.new_tab()).await
    }

    async fn open_on(&self, storage: &DeviceStorage) -> SessionCoordinator {
        SessionCoordinator::open(
            storage,
            self.environment.clone(),
            Config::for_testing(),
            self.clock.clone(),
            self.bus.clone(),
        )
        .await
        .expect("coordinator should open")
    }
}

pub fn slot(n: u8) -> Slot {
    Slot::new(n).expect("valid slot number")
}

pub fn dob() -> NaiveDate {
    NaiveDate::from_ymd_opt(1992, 11, 3).expect("valid date")
}

pub fn new_account<'a>(name: &'a str, password: &'a str) -> NewAccount<'a> {
    NewAccount {
        name,
        date_of_birth: dob(),
        password,
        symbol: Some("om"),
    }
}

/// Create an account and return it with its slot.
pub async fn create(
    tab: &SessionCoordinator,
    name: &str,
    password: &str,
) -> (UserAccount, Slot) {
    tab.create_account(new_account(name, password))
        .await
        .expect("account creation should succeed")
}
