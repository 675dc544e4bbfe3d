//! Shared application state injected into every handler.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::rate_limit::RateLimiter;
use crate::remote_client::ReqwestClient;
use linksync_core::{CoreError, InvalidationHook, LinkBuffer, LinkRecord, TtlCache};
use linksync_storage::FileBackend;
use linksync_sync_engine::{HttpRemoteStore, MemoryRemoteStore, RemoteStore, SyncEngine};
use std::sync::Arc;
use tracing::{info, warn};

/// Reconciler over whichever remote store the configuration selects.
pub type Engine = SyncEngine<Box<dyn RemoteStore>>;

/// Cache of the sorted active link list.
pub type LinkCache = TtlCache<&'static str, Vec<LinkRecord>>;

pub(crate) const LINKS_KEY: &str = "links";

/// Everything a request handler needs.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Arc<ServerConfig>,
    /// Local buffer.
    pub buffer: Arc<LinkBuffer>,
    /// Reconciler.
    pub engine: Arc<Engine>,
    /// Link list cache, invalidated by mutations and sync runs.
    pub cache: Arc<LinkCache>,
    /// Per-user request limiter.
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Assembles state from already built parts.
    pub fn new(config: ServerConfig, buffer: Arc<LinkBuffer>, remote: Box<dyn RemoteStore>) -> Self {
        let cache = Arc::new(LinkCache::new(config.cache_ttl));
        let engine = Arc::new(SyncEngine::new(config.sync.clone(), buffer.clone(), remote));
        engine.add_invalidation_hook(cache.clone());
        let limiter = Arc::new(RateLimiter::per_minute(config.rate_limit_per_minute));

        Self {
            config: Arc::new(config),
            buffer,
            engine,
            cache,
            limiter,
        }
    }

    /// Opens the buffer file and connects the configured remote store.
    ///
    /// Builds a blocking HTTP client, so it must run outside the async runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer directory cannot be created or the
    /// remote store cannot be configured.
    pub fn build(config: ServerConfig) -> ServerResult<Self> {
        let backend = FileBackend::open_with_create_dirs(&config.buffer_path)
            .map_err(CoreError::from)?;
        let buffer = Arc::new(LinkBuffer::open(Box::new(backend)));
        info!(
            path = %config.buffer_path.display(),
            records = buffer.len(),
            pending = buffer.pending_count(),
            "local buffer ready"
        );

        let remote: Box<dyn RemoteStore> = match &config.remote_url {
            Some(url) => {
                let client = ReqwestClient::new(config.request_timeout)?;
                let mut store = HttpRemoteStore::new(url, config.user_id.clone(), client)?;
                if let Some(token) = &config.remote_token {
                    store = store.with_token(token.clone());
                }
                info!(remote = %url, user = %config.user_id, "using REST remote store");
                Box::new(store)
            }
            None => {
                warn!("no remote URL configured, syncing to an in-memory store");
                Box::new(MemoryRemoteStore::new())
            }
        };

        Ok(Self::new(config, buffer, remote))
    }

    /// Returns the active links, served from the cache when fresh.
    ///
    /// A list read concurrently with a mutation is returned but not cached.
    pub fn cached_links(&self) -> Vec<LinkRecord> {
        self.cache.get_or_insert_with(LINKS_KEY, || self.buffer.load_all())
    }

    /// Drops cached views after a local mutation.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}
