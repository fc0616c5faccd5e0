//! Device fingerprint generation
//!
//! A fingerprint is a short hex id derived from many independently read
//! environment signals. Each [`SignalProbe`] contributes either its value or
//! a sentinel literal; the contributions are joined with `|`, hashed with
//! SHA-256 and truncated.
//!
//! Generation never fails. When every probe fails the generator hashes a
//! low-entropy composite of user agent, screen size and the current time
//! instead, trading stability for availability.
//!
//! Two readings on the same device are expected, not guaranteed, to match.

mod environment;
pub mod errors;
mod probes;

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

pub use environment::{DeviceEnvironment, ScreenInfo, WebGlInfo};
pub use errors::FingerprintError;
pub use probes::{EnvironmentProbe, Signal, SignalProbe};

use crate::{Clock, Config, constants::FINGERPRINT_SEPARATOR};

/// How much of the environment went into a fingerprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FingerprintQuality {
    /// Every probe produced a value.
    Full,
    /// Some probes contributed sentinels.
    Degraded,
    /// No probe succeeded; the id came from the time-salted fallback.
    Fallback,
}

/// One signal's contribution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component {
    pub signal: &'static str,
    pub value: String,
    /// True when `value` is the probe's sentinel.
    pub is_sentinel: bool,
}

/// A generated fingerprint.
#[derive(Clone, Debug)]
pub struct Fingerprint {
    pub id: String,
    pub quality: FingerprintQuality,
    pub components: Vec<Component>,
}

/// Derives fingerprints from a set of probes.
pub struct FingerprintGenerator {
    probes: Vec<Arc<dyn SignalProbe>>,
    environment: Arc<DeviceEnvironment>,
    probe_timeout: Duration,
    length: usize,
    clock: Arc<dyn Clock>,
}

impl FingerprintGenerator {
    /// Generator with one probe per [`Signal`] over `environment`.
    pub fn new(environment: Arc<DeviceEnvironment>, config: &Config, clock: Arc<dyn Clock>) -> Self {
        let probes = EnvironmentProbe::all(environment.clone());
        Self::with_probes(probes, environment, config, clock)
    }

    /// Generator with explicit probes. `environment` is still consulted for
    /// the fallback composite.
    pub fn with_probes(
        probes: Vec<Arc<dyn SignalProbe>>,
        environment: Arc<DeviceEnvironment>,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            probes,
            environment,
            probe_timeout: config.audio_probe_timeout(),
            length: config.fingerprint_length,
            clock,
        }
    }

    /// Run every probe and derive the fingerprint.
    ///
    /// Each probe is capped at the configured timeout; a probe that runs out
    /// of time contributes `"<name>-timeout"`.
    pub async fn generate_fingerprint(&self) -> Fingerprint {
        let mut components = Vec::with_capacity(self.probes.len());

        for probe in &self.probes {
            let outcome = tokio::time::timeout(self.probe_timeout, probe.probe())
                .await
                .unwrap_or(Err(FingerprintError::TimedOut {
                    signal: probe.name(),
                }));

            let component = match outcome {
                Ok(value) => Component {
                    signal: probe.name(),
                    value,
                    is_sentinel: false,
                },
                Err(FingerprintError::TimedOut { signal }) => {
                    tracing::debug!(signal, "Fingerprint probe timed out");
                    Component {
                        signal,
                        value: format!("{signal}-timeout"),
                        is_sentinel: true,
                    }
                }
                Err(e) => {
                    tracing::debug!(signal = probe.name(), error = %e, "Fingerprint probe failed");
                    Component {
                        signal: probe.name(),
                        value: probe.sentinel().to_string(),
                        is_sentinel: true,
                    }
                }
            };
            components.push(component);
        }

        let failed = components.iter().filter(|c| c.is_sentinel).count();
        if failed == components.len() {
            let id = self.fallback_id();
            tracing::warn!(id = %id, "All fingerprint probes failed; using fallback id");
            return Fingerprint {
                id,
                quality: FingerprintQuality::Fallback,
                components,
            };
        }

        let joined = components
            .iter()
            .map(|c| c.value.as_str())
            .collect::<Vec<_>>()
            .join(FINGERPRINT_SEPARATOR);
        let quality = if failed == 0 {
            FingerprintQuality::Full
        } else {
            FingerprintQuality::Degraded
        };

        Fingerprint {
            id: self.digest(&joined),
            quality,
            components,
        }
    }

    /// Just the id of [`FingerprintGenerator::generate_fingerprint`].
    pub async fn generate_fingerprint_id(&self) -> String {
        self.generate_fingerprint().await.id
    }

    fn fallback_id(&self) -> String {
        let composite = format!(
            "{ua}{sep}{screen}{sep}{now}",
            ua = self.environment.user_agent.as_deref().unwrap_or("unknown"),
            screen = self
                .environment
                .screen_size()
                .unwrap_or_else(|| "0x0".to_string()),
            now = self.clock.now_millis(),
            sep = FINGERPRINT_SEPARATOR,
        );
        self.digest(&composite)
    }

    fn digest(&self, input: &str) -> String {
        let mut id = hex::encode(Sha256::digest(input.as_bytes()));
        id.truncate(self.length);
        id
    }
}
