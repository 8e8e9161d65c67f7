//! Shared types for the brushwork style filter engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::SessionState;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Serde support for `std::time::Duration` as fractional seconds.
pub(crate) mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Timing of the simulated model acquisition.
///
/// The first [`ensure_ready`](crate::ModelCache::ensure_ready) for a
/// style sleeps for `base_delay` plus a uniformly random fraction of
/// `jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Fixed part of the acquisition delay (seconds when serialized).
    #[serde(with = "duration_serde")]
    pub base_delay: Duration,
    /// Upper bound of the random extra delay (seconds when serialized).
    #[serde(with = "duration_serde")]
    pub jitter: Duration,
}

impl AcquisitionConfig {
    /// Default fixed delay: 1.5 s.
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1500);
    /// Default jitter bound: 1.0 s, for a 1.5–2.5 s total.
    pub const DEFAULT_JITTER: Duration = Duration::from_millis(1000);

    /// No delay at all. Handy for tools and tests that only care about
    /// the pixels.
    pub const INSTANT: Self = Self {
        base_delay: Duration::ZERO,
        jitter: Duration::ZERO,
    };
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            base_delay: Self::DEFAULT_BASE_DELAY,
            jitter: Self::DEFAULT_JITTER,
        }
    }
}

/// Configuration for a [`StyleFilterEngine`](crate::StyleFilterEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Simulated model acquisition timing.
    pub acquisition: AcquisitionConfig,

    /// Seed for the noise stages.
    ///
    /// `Some(seed)` reseeds the generator with the same value for every
    /// run, so identical input and style give identical output. `None`
    /// seeds from the operating system on every run.
    #[serde(default)]
    pub noise_seed: Option<u64>,
}

/// Errors produced by the engine and the session state machine.
///
/// Every variant carries a human-readable message, which is what the
/// session exposes as its `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum EngineError {
    /// A run was requested without an input buffer or a selected style.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The style identifier is not in the catalog.
    #[error("unsupported style: {0:?}")]
    UnsupportedStyle(String),

    /// Model acquisition was aborted before the model became ready.
    #[error("model acquisition failed: {0}")]
    AcquisitionFailure(String),

    /// A numeric stage met a malformed buffer.
    #[error("pipeline failure: {0}")]
    PipelineFailure(String),

    /// The session cannot perform `action` from its current state.
    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        /// State the session was in when the action was attempted.
        state: SessionState,
        /// The rejected action.
        action: String,
    },
}
