//! Client pool configuration types.

use std::time::Duration;

/// User agent sent when a request carries none.
pub const DEFAULT_USER_AGENT: &str = concat!("curlkit/", env!("CARGO_PKG_VERSION"));

/// Configuration for the client pool and the transports it creates.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// How long an unused pooled client (and its idle connections) is kept.
    pub idle_timeout: Duration,
    /// Period of the background idle sweep.
    pub sweep_interval: Duration,
    /// Maximum idle connections per host, per pooled client.
    pub max_idle_per_host: usize,
    /// `User-Agent` added to requests that carry none.
    pub user_agent: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(90),
            sweep_interval: Duration::from_secs(30),
            max_idle_per_host: 32,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl PoolConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }
}

/// Builder for [`PoolConfig`].
#[derive(Debug, Clone, Default)]
pub struct PoolConfigBuilder {
    idle_timeout: Option<Duration>,
    sweep_interval: Option<Duration>,
    max_idle_per_host: Option<usize>,
    user_agent: Option<String>,
}

impl PoolConfigBuilder {
    /// Set the idle timeout.
    #[must_use]
    pub const fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Set the sweep interval.
    #[must_use]
    pub const fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn max_idle_per_host(mut self, count: usize) -> Self {
        self.max_idle_per_host = Some(count);
        self
    }

    /// Set the default user agent.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> PoolConfig {
        let defaults = PoolConfig::default();
        PoolConfig {
            idle_timeout: self.idle_timeout.unwrap_or(defaults.idle_timeout),
            sweep_interval: self.sweep_interval.unwrap_or(defaults.sweep_interval),
            max_idle_per_host: self.max_idle_per_host.unwrap_or(defaults.max_idle_per_host),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
        }
    }
}
