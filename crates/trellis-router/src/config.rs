//! Router configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of hits a wildcard node needs before results resolved
/// through it are cached.
pub const DEFAULT_PROMOTION_THRESHOLD: u32 = 32;

/// Default period of the full cache wipe, in milliseconds.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 10_000;

/// Behaviour of the router when a request does not match a route exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Redirect to the path with the trailing slash toggled when only that
    /// variant is registered.
    pub redirect_trailing_slash: bool,

    /// Redirect to the cleaned, case-corrected path when one is registered.
    pub redirect_fixed_path: bool,

    /// Answer 405 with an `Allow` list when another method matches the path.
    pub handle_method_not_allowed: bool,

    /// Answer `OPTIONS` requests automatically.
    pub handle_options: bool,

    /// Lookup result cache.
    pub cache: CacheConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            handle_method_not_allowed: true,
            handle_options: true,
            cache: CacheConfig::default(),
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_redirect_trailing_slash(mut self, enabled: bool) -> Self {
        self.redirect_trailing_slash = enabled;
        self
    }

    pub fn with_redirect_fixed_path(mut self, enabled: bool) -> Self {
        self.redirect_fixed_path = enabled;
        self
    }

    pub fn with_handle_method_not_allowed(mut self, enabled: bool) -> Self {
        self.handle_method_not_allowed = enabled;
        self
    }

    pub fn with_handle_options(mut self, enabled: bool) -> Self {
        self.handle_options = enabled;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

/// Lookup result cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Consult and fill the cache on lookups.
    pub enabled: bool,

    /// A result is cached once its wildcard node has been hit more often
    /// than this.
    pub promotion_threshold: u32,

    /// Period of the background wipe, in milliseconds.
    pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            promotion_threshold: DEFAULT_PROMOTION_THRESHOLD,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

impl CacheConfig {
    /// Cache with caching turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the promotion threshold.
    pub fn with_promotion_threshold(mut self, threshold: u32) -> Self {
        self.promotion_threshold = threshold;
        self
    }

    /// Set the sweep period. Sub-millisecond precision is dropped; the
    /// period is never shorter than one millisecond.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = u64::try_from(interval.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        self
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}
