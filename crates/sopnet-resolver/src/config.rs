//! Resolver configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deep-link resolver settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Hops from the main document; codes discovered at this depth stay pending
    pub max_depth: u32,
    /// Overall deadline for one `resolve_all` call
    pub timeout_ms: Option<u64>,
    /// Concurrent locator calls per batch
    pub max_concurrent_fetches: usize,
}

impl ResolverConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With maximum depth
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// With overall deadline
    #[inline]
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// With fetch concurrency
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max;
        self
    }

    /// Deadline as a duration
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Check configuration
    ///
    /// # Errors
    /// Returns [`ConfigError`] for zero concurrency or a zero deadline
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            timeout_ms: None,
            max_concurrent_fetches: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ResolverConfig::new();
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.max_concurrent_fetches, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let config = ResolverConfig::new().with_max_concurrent_fetches(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = ResolverConfig::new().with_timeout_ms(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ResolverConfig = serde_json::from_str(r#"{"max_depth": 5}"#).unwrap();
        assert_eq!(config, ResolverConfig::new().with_max_depth(5));
    }
}
