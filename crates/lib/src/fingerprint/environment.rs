//! Readable device signals
//!
//! A [`DeviceEnvironment`] is a snapshot of everything the fingerprint probes
//! may look at. Embedders running in a browser fill it from the page (canvas
//! and WebGL digests, audio signature, fonts, ...). On native targets
//! [`DeviceEnvironment::detect`] fills what the host process can see and
//! leaves the rest empty, which makes the matching probes fall back to their
//! sentinels.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Screen geometry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
    pub pixel_ratio: f32,
}

/// Unmasked WebGL vendor and renderer strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebGlInfo {
    pub vendor: String,
    pub renderer: String,
}

/// Snapshot of environment signals used for fingerprinting.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceEnvironment {
    pub user_agent: Option<String>,
    pub languages: Vec<String>,
    pub platform: Option<String>,
    pub screen: Option<ScreenInfo>,
    pub timezone: Option<String>,
    pub timezone_offset_minutes: Option<i32>,
    pub hardware_concurrency: Option<u32>,
    pub device_memory_gb: Option<u32>,
    pub max_touch_points: Option<u32>,
    /// Digest of a rendered test canvas.
    pub canvas_digest: Option<String>,
    pub webgl: Option<WebGlInfo>,
    /// Digest of an offline audio-context render.
    pub audio_signature: Option<String>,
    pub fonts: Vec<String>,
    pub plugins: Vec<String>,
    pub connection_type: Option<String>,
    /// Coarse bucket of a fixed CPU workload's duration.
    pub cpu_timing_bucket: Option<u32>,
}

impl DeviceEnvironment {
    /// Fill what the current process can observe.
    pub fn detect() -> Self {
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;

        let languages = std::env::var("LANG")
            .ok()
            .filter(|lang| !lang.is_empty())
            .map(|lang| vec![lang])
            .unwrap_or_default();

        let offset = chrono::Local::now().offset().local_minus_utc() / 60;

        Self {
            user_agent: Some(format!(
                "{}/{} ({os}; {arch})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            )),
            languages,
            platform: Some(format!("{os}-{arch}")),
            timezone: std::env::var("TZ").ok().filter(|tz| !tz.is_empty()),
            timezone_offset_minutes: Some(offset),
            hardware_concurrency: std::thread::available_parallelism()
                .ok()
                .map(|n| n.get() as u32),
            cpu_timing_bucket: Some(cpu_timing_bucket()),
            ..Self::default()
        }
    }

    /// `"<width>x<height>"`, the part of the screen used by the degraded fallback.
    pub fn screen_size(&self) -> Option<String> {
        self.screen
            .as_ref()
            .map(|screen| format!("{}x{}", screen.width, screen.height))
    }
}

/// Time a fixed hashing workload and reduce it to a log2 bucket of microseconds.
fn cpu_timing_bucket() -> u32 {
    let started = Instant::now();
    let mut digest = [0u8; 32];
    for _ in 0..2_000 {
        let next = Sha256::digest(digest);
        digest.copy_from_slice(&next);
    }
    let micros = started.elapsed().as_micros().max(1) as u64;
    64 - micros.leading_zeros()
}
