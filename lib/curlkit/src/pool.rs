//! Cache of transports keyed by their transport-relevant settings.
//!
//! Lookups go through a [`DashMap`], so neither readers nor writers need an
//! external lock. A miss builds a [`HyperTransport`] once and inserts it
//! atomically. The idle sweep runs as a tokio task, started the first time
//! the pool is used inside a runtime and aborted when the last handle drops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

use curlkit_core::{ProxyOptions, RequestConfiguration, Result, TlsOptions, Transport};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::PoolConfig;
use crate::transport::HyperTransport;

/// The part of a configuration that decides which transport serves it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportSettings {
    /// TLS verification and client identity.
    pub tls: TlsOptions,
    /// Proxy route.
    pub proxy: Option<ProxyOptions>,
    /// TCP connect timeout.
    pub connect_timeout: Option<Duration>,
}

impl TransportSettings {
    /// Extract the transport settings of a configuration.
    #[must_use]
    pub fn from_config(config: &RequestConfiguration) -> Self {
        Self {
            tls: config.tls().clone(),
            proxy: config.proxy().cloned(),
            connect_timeout: config.connect_timeout(),
        }
    }
}

struct PooledTransport {
    transport: Arc<dyn Transport>,
    /// Milliseconds since the pool was created.
    last_used: AtomicU64,
}

struct PoolInner {
    config: PoolConfig,
    transports: DashMap<TransportSettings, PooledTransport>,
    created: Instant,
    sweeper: OnceLock<Option<JoinHandle<()>>>,
}

impl PoolInner {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.created.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn sweep(&self) -> usize {
        let now = self.now_ms();
        let idle = u64::try_from(self.config.idle_timeout.as_millis()).unwrap_or(u64::MAX);
        let before = self.transports.len();
        self.transports
            .retain(|_, pooled| now.saturating_sub(pooled.last_used.load(Ordering::Relaxed)) < idle);
        before.saturating_sub(self.transports.len())
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        if let Some(Some(sweeper)) = self.sweeper.get() {
            sweeper.abort();
        }
    }
}

/// Concurrency-safe cache of pooled transports.
///
/// Cloning is cheap and shares the cache. Separate `ClientPool::new` calls
/// produce isolated pools.
///
/// # Example
///
/// ```ignore
/// use curlkit::{ClientPool, PoolConfig};
///
/// let pool = ClientPool::new(PoolConfig::default());
/// let transport = pool.get(&config)?;
/// ```
#[derive(Clone)]
pub struct ClientPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for ClientPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPool")
            .field("config", &self.inner.config)
            .field("transports", &self.inner.transports.len())
            .finish_non_exhaustive()
    }
}

impl Default for ClientPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl ClientPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                transports: DashMap::new(),
                created: Instant::now(),
                sweeper: OnceLock::new(),
            }),
        }
    }

    /// The pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Get the transport for a configuration's settings, creating it on a miss.
    ///
    /// # Errors
    ///
    /// Fails when a new transport cannot be built (unreadable TLS material,
    /// invalid proxy URL).
    pub fn get(&self, config: &RequestConfiguration) -> Result<Arc<dyn Transport>> {
        self.get_with(TransportSettings::from_config(config))
    }

    /// Get the transport for the given settings, creating it on a miss.
    ///
    /// # Errors
    ///
    /// See [`ClientPool::get`].
    pub fn get_with(&self, settings: TransportSettings) -> Result<Arc<dyn Transport>> {
        self.ensure_sweeper();
        let now = self.inner.now_ms();

        if let Some(pooled) = self.inner.transports.get(&settings) {
            pooled.last_used.store(now, Ordering::Relaxed);
            return Ok(Arc::clone(&pooled.transport));
        }

        let pool_config = &self.inner.config;
        let pooled = self
            .inner
            .transports
            .entry(settings.clone())
            .or_try_insert_with(|| {
                debug!(
                    insecure = settings.tls.insecure,
                    proxied = settings.proxy.is_some(),
                    "creating pooled transport"
                );
                let transport = HyperTransport::new(&settings, pool_config)?;
                Ok::<_, curlkit_core::Error>(PooledTransport {
                    transport: Arc::new(transport),
                    last_used: AtomicU64::new(now),
                })
            })?;
        pooled.last_used.store(now, Ordering::Relaxed);
        Ok(Arc::clone(&pooled.transport))
    }

    /// Number of cached transports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.transports.len()
    }

    /// Returns `true` if no transport is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.transports.is_empty()
    }

    /// Drop transports unused for longer than the idle timeout, closing
    /// their connections. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        self.inner.sweep()
    }

    /// Drop every cached transport.
    pub fn clear(&self) {
        self.inner.transports.clear();
    }

    fn ensure_sweeper(&self) {
        self.inner.sweeper.get_or_init(|| {
            let runtime = tokio::runtime::Handle::try_current().ok()?;
            let pool = Arc::downgrade(&self.inner);
            let period = self.inner.config.sweep_interval;
            debug!(?period, "starting idle sweep");
            Some(runtime.spawn(sweep_loop(pool, period)))
        });
    }
}

async fn sweep_loop(pool: Weak<PoolInner>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // the first tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        let Some(inner) = pool.upgrade() else {
            break;
        };
        let removed = inner.sweep();
        if removed > 0 {
            debug!(removed, remaining = inner.transports.len(), "swept idle transports");
        } else {
            trace!(remaining = inner.transports.len(), "idle sweep");
        }
    }
}
