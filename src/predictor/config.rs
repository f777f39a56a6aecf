//! Predictor configuration and the feature gate.

use crate::base::neterror::NetError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of speculative lookups in flight at once.
pub const MAX_SPECULATIVE_PARALLEL_RESOLVES: usize = 3;

/// Typical time for a lookup that misses every cache.
pub const EXPECTED_RESOLUTION_TIME: Duration = Duration::from_millis(500);

/// Typical number of hosts predicted together from one page.
pub const TYPICAL_SPECULATIVE_GROUP_SIZE: u32 = 8;

/// Longest a name may wait in the queue before the backlog is abandoned.
///
/// Time to work through one typical group at full parallelism.
pub const MAX_SPECULATIVE_RESOLVE_QUEUE_DELAY: Duration = Duration::from_millis(
    EXPECTED_RESOLUTION_TIME.as_millis() as u64 * TYPICAL_SPECULATIVE_GROUP_SIZE as u64
        / MAX_SPECULATIVE_PARALLEL_RESOLVES as u64,
);

/// How long a speculative result counts as fresh.
pub const DEFAULT_CACHE_EXPIRATION: Duration = Duration::from_secs(5);

/// Configuration options for the predictor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Initial state of the default feature gate.
    pub enabled: bool,

    /// Upper bound on pending speculative lookups.
    pub max_concurrent_lookups: usize,

    /// Queueing delay that triggers congestion control.
    #[serde(rename = "max_queue_delay_ms", with = "millis")]
    pub max_queue_delay: Duration,

    /// Age after which a resolved host is looked up again.
    #[serde(rename = "cache_expiration_ms", with = "millis")]
    pub cache_expiration: Duration,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent_lookups: MAX_SPECULATIVE_PARALLEL_RESOLVES,
            max_queue_delay: MAX_SPECULATIVE_RESOLVE_QUEUE_DELAY,
            cache_expiration: DEFAULT_CACHE_EXPIRATION,
        }
    }
}

impl PredictorConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, NetError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            tracing::warn!(error = %e, "invalid predictor configuration");
            NetError::InvalidArgument
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NetError> {
        if self.max_concurrent_lookups == 0 {
            return Err(NetError::InvalidArgument);
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Switch consulted by every public entry point.
///
/// When it reads false, prediction entry points are silent no-ops.
pub trait FeatureGate: Send + Sync {
    fn is_prediction_enabled(&self) -> bool;
}

impl FeatureGate for AtomicBool {
    fn is_prediction_enabled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

impl FeatureGate for bool {
    fn is_prediction_enabled(&self) -> bool {
        *self
    }
}

impl<G: FeatureGate + ?Sized> FeatureGate for Arc<G> {
    fn is_prediction_enabled(&self) -> bool {
        (**self).is_prediction_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_queue_delay() {
        assert_eq!(MAX_SPECULATIVE_RESOLVE_QUEUE_DELAY, Duration::from_millis(1333));

        let config = PredictorConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_concurrent_lookups, 3);
        assert_eq!(config.cache_expiration, Duration::from_secs(5));
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_from_json_partial() {
        let config =
            PredictorConfig::from_json(r#"{"max_concurrent_lookups": 1, "max_queue_delay_ms": 250}"#)
                .unwrap();
        assert_eq!(config.max_concurrent_lookups, 1);
        assert_eq!(config.max_queue_delay, Duration::from_millis(250));
        assert_eq!(config.cache_expiration, DEFAULT_CACHE_EXPIRATION);
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_from_json_rejects_zero_concurrency() {
        let result = PredictorConfig::from_json(r#"{"max_concurrent_lookups": 0}"#);
        assert_eq!(result, Err(NetError::InvalidArgument));
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_from_json_rejects_garbage() {
        assert_eq!(PredictorConfig::from_json("not json"), Err(NetError::InvalidArgument));
    }

    #[test]
    fn test_serialize_uses_millis() {
        let json = serde_json::to_value(PredictorConfig::default()).unwrap();
        assert_eq!(json["max_queue_delay_ms"], 1333);
        assert_eq!(json["cache_expiration_ms"], 5000);
    }

    #[test]
    fn test_atomic_gate() {
        let gate = Arc::new(AtomicBool::new(true));
        assert!(gate.is_prediction_enabled());
        gate.store(false, Ordering::Release);
        assert!(!gate.is_prediction_enabled());
    }
}
