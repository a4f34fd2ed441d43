//! Mutation engine configuration.

use std::time::Duration;

use treasure_core::{GraphError, GraphResult};

pub const ENV_DISPATCH_DELAY_MS: &str = "TREASURE_DISPATCH_DELAY_MS";
pub const ENV_DISPATCH_TIMEOUT_MS: &str = "TREASURE_DISPATCH_TIMEOUT_MS";
pub const ENV_TRANSITION_CAPACITY: &str = "TREASURE_TRANSITION_CAPACITY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Artificial latency before the store is touched.
    pub dispatch_delay: Duration,
    /// Give up on a dispatch after this long.
    pub dispatch_timeout: Option<Duration>,
    /// Buffered transitions per subscriber before lagging ones start missing events.
    pub transition_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dispatch_delay: Duration::ZERO,
            dispatch_timeout: None,
            transition_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn with_dispatch_delay(mut self, delay: Duration) -> Self {
        self.dispatch_delay = delay;
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = Some(timeout);
        self
    }

    pub fn with_transition_capacity(mut self, capacity: usize) -> Self {
        self.transition_capacity = capacity;
        self
    }

    pub fn from_env() -> GraphResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> GraphResult<Self> {
        let mut config = Self::default();
        if let Some(ms) = parse_u64(&lookup, ENV_DISPATCH_DELAY_MS)? {
            config.dispatch_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, ENV_DISPATCH_TIMEOUT_MS)? {
            config.dispatch_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(capacity) = parse_u64(&lookup, ENV_TRANSITION_CAPACITY)? {
            if capacity == 0 {
                return Err(GraphError::invalid_argument(format!(
                    "{ENV_TRANSITION_CAPACITY} must be at least 1"
                )));
            }
            config.transition_capacity = usize::try_from(capacity).unwrap_or(usize::MAX);
        }
        Ok(config)
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> GraphResult<Option<u64>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| GraphError::invalid_argument(format!("{key}={raw:?}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_dispatch_immediately() {
        let config = EngineConfig::default();
        assert_eq!(config.dispatch_delay, Duration::ZERO);
        assert_eq!(config.dispatch_timeout, None);
    }

    #[test]
    fn lookup_reads_millis() {
        let config = EngineConfig::from_lookup(|key| match key {
            ENV_DISPATCH_DELAY_MS => Some("2000".to_string()),
            ENV_DISPATCH_TIMEOUT_MS => Some("5000".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.dispatch_delay, Duration::from_secs(2));
        assert_eq!(config.dispatch_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.transition_capacity, 64);
    }

    #[test]
    fn lookup_rejects_zero_capacity() {
        let err = EngineConfig::from_lookup(|key| {
            (key == ENV_TRANSITION_CAPACITY).then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument(_)));
    }

    #[test]
    fn lookup_rejects_negative_delay() {
        let err = EngineConfig::from_lookup(|key| {
            (key == ENV_DISPATCH_DELAY_MS).then(|| "-5".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, GraphError::InvalidArgument(_)));
    }
}
