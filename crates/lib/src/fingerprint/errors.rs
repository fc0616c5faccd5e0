//! Error types for fingerprint signal probes
use thiserror::Error;

/// Why a single signal could not be read.
///
/// These never escape the generator: a failed probe contributes its sentinel
/// string instead.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("Signal '{signal}' is not supported in this environment")]
    Unsupported { signal: &'static str },

    #[error("Signal '{signal}' failed: {reason}")]
    ProbeFailed { signal: &'static str, reason: String },

    #[error("Signal '{signal}' timed out")]
    TimedOut { signal: &'static str },
}

impl From<FingerprintError> for crate::Error {
    fn from(err: FingerprintError) -> Self {
        crate::Error::Fingerprint(err)
    }
}
