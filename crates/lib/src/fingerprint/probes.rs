//! Signal probes feeding the fingerprint generator

use std::sync::Arc;

use async_trait::async_trait;

use super::{DeviceEnvironment, FingerprintError};

/// One independently computed fingerprint component.
#[async_trait]
pub trait SignalProbe: Send + Sync {
    /// Short signal name, e.g. `"webgl"`.
    fn name(&self) -> &'static str;

    /// Literal contributed in place of a value when the probe fails.
    fn sentinel(&self) -> &'static str;

    /// Read the signal.
    async fn probe(&self) -> Result<String, FingerprintError>;
}

/// The signals read from a [`DeviceEnvironment`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    UserAgent,
    Language,
    Canvas,
    WebGl,
    Audio,
    Screen,
    Fonts,
    Hardware,
    Timezone,
    Touch,
    Network,
    Plugins,
    Performance,
}

impl Signal {
    /// Every signal, in the order components are concatenated.
    pub const ALL: [Signal; 13] = [
        Signal::UserAgent,
        Signal::Language,
        Signal::Canvas,
        Signal::WebGl,
        Signal::Audio,
        Signal::Screen,
        Signal::Fonts,
        Signal::Hardware,
        Signal::Timezone,
        Signal::Touch,
        Signal::Network,
        Signal::Plugins,
        Signal::Performance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Signal::UserAgent => "user-agent",
            Signal::Language => "language",
            Signal::Canvas => "canvas",
            Signal::WebGl => "webgl",
            Signal::Audio => "audio",
            Signal::Screen => "screen",
            Signal::Fonts => "fonts",
            Signal::Hardware => "hardware",
            Signal::Timezone => "timezone",
            Signal::Touch => "touch",
            Signal::Network => "network",
            Signal::Plugins => "plugins",
            Signal::Performance => "performance",
        }
    }

    pub fn sentinel(self) -> &'static str {
        match self {
            Signal::UserAgent => "no-ua",
            Signal::Language => "no-language",
            Signal::Canvas => "no-canvas",
            Signal::WebGl => "no-webgl",
            Signal::Audio => "audio-error",
            Signal::Screen => "no-screen",
            Signal::Fonts => "no-fonts",
            Signal::Hardware => "no-hardware",
            Signal::Timezone => "no-timezone",
            Signal::Touch => "no-touch",
            Signal::Network => "no-network",
            Signal::Plugins => "no-plugins",
            Signal::Performance => "no-performance",
        }
    }

    fn read(self, env: &DeviceEnvironment) -> Option<String> {
        match self {
            Signal::UserAgent => env.user_agent.clone(),
            Signal::Language => non_empty(&env.languages),
            Signal::Canvas => env.canvas_digest.clone(),
            Signal::WebGl => env
                .webgl
                .as_ref()
                .map(|gl| format!("{}~{}", gl.vendor, gl.renderer)),
            Signal::Audio => env.audio_signature.clone(),
            Signal::Screen => env.screen.as_ref().map(|s| {
                format!(
                    "{}x{}x{}@{}",
                    s.width, s.height, s.color_depth, s.pixel_ratio
                )
            }),
            Signal::Fonts => non_empty(&env.fonts),
            Signal::Hardware => match (env.hardware_concurrency, env.device_memory_gb) {
                (None, None) => None,
                (cores, memory) => Some(format!(
                    "{}c{}g{}",
                    cores.unwrap_or(0),
                    memory.unwrap_or(0),
                    env.platform.as_deref().unwrap_or("")
                )),
            },
            Signal::Timezone => match (&env.timezone, env.timezone_offset_minutes) {
                (None, None) => None,
                (zone, offset) => Some(format!(
                    "{}{:+}",
                    zone.as_deref().unwrap_or(""),
                    offset.unwrap_or(0)
                )),
            },
            Signal::Touch => env.max_touch_points.map(|n| n.to_string()),
            Signal::Network => env.connection_type.clone(),
            Signal::Plugins => non_empty(&env.plugins),
            Signal::Performance => env.cpu_timing_bucket.map(|b| b.to_string()),
        }
    }
}

fn non_empty(values: &[String]) -> Option<String> {
    (!values.is_empty()).then(|| values.join(","))
}

/// Probe reading one [`Signal`] out of an environment snapshot.
pub struct EnvironmentProbe {
    signal: Signal,
    environment: Arc<DeviceEnvironment>,
}

impl EnvironmentProbe {
    pub fn new(signal: Signal, environment: Arc<DeviceEnvironment>) -> Self {
        Self {
            signal,
            environment,
        }
    }

    /// One probe per [`Signal`].
    pub fn all(environment: Arc<DeviceEnvironment>) -> Vec<Arc<dyn SignalProbe>> {
        Signal::ALL
            .iter()
            .map(|&signal| {
                Arc::new(EnvironmentProbe::new(signal, environment.clone())) as Arc<dyn SignalProbe>
            })
            .collect()
    }
}

#[async_trait]
impl SignalProbe for EnvironmentProbe {
    fn name(&self) -> &'static str {
        self.signal.name()
    }

    fn sentinel(&self) -> &'static str {
        self.signal.sentinel()
    }

    async fn probe(&self) -> Result<String, FingerprintError> {
        self.signal
            .read(&self.environment)
            .ok_or(FingerprintError::Unsupported {
                signal: self.signal.name(),
            })
    }
}
