//! Server configuration.

use crate::error::{ServerError, ServerResult};
use linksync_sync_engine::SyncConfig;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the link server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Location of the local buffer file.
    pub buffer_path: PathBuf,
    /// Base URL of the remote REST store; in-memory remote when absent.
    pub remote_url: Option<String>,
    /// Bearer token for the remote store.
    pub remote_token: Option<String>,
    /// Owner of the remote link collection.
    pub user_id: String,
    /// Whether `/links` and `/sync` routes require the `x-user-id` header.
    pub require_user_header: bool,
    /// Requests per user per minute; 0 disables limiting.
    pub rate_limit_per_minute: u32,
    /// Lifetime of the cached link list; zero disables caching.
    pub cache_ttl: Duration,
    /// Timeout of each remote request.
    pub request_timeout: Duration,
    /// Reconciler settings.
    pub sync: SyncConfig,
}

impl ServerConfig {
    /// Creates a configuration with default values.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            buffer_path: PathBuf::from("data/links.json"),
            remote_url: None,
            remote_token: None,
            user_id: "default".into(),
            require_user_header: false,
            rate_limit_per_minute: 120,
            cache_ttl: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            sync: SyncConfig::default(),
        }
    }

    /// Loads the configuration from `LINKSYNC_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if a variable is set but unparsable.
    pub fn from_env() -> ServerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if a variable is set but unparsable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, "LINKSYNC_BIND")? {
            config.bind_addr = addr;
        }
        if let Some(path) = lookup("LINKSYNC_BUFFER") {
            config.buffer_path = PathBuf::from(path);
        }
        config.remote_url = lookup("LINKSYNC_REMOTE_URL").filter(|v| !v.trim().is_empty());
        config.remote_token = lookup("LINKSYNC_REMOTE_TOKEN").filter(|v| !v.is_empty());
        if let Some(user) = lookup("LINKSYNC_USER").filter(|v| !v.trim().is_empty()) {
            config.user_id = user;
        }
        if let Some(require) = parse_var(&lookup, "LINKSYNC_REQUIRE_USER_HEADER")? {
            config.require_user_header = require;
        }
        if let Some(limit) = parse_var(&lookup, "LINKSYNC_RATE_LIMIT")? {
            config.rate_limit_per_minute = limit;
        }
        if let Some(secs) = parse_var(&lookup, "LINKSYNC_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var(&lookup, "LINKSYNC_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "LINKSYNC_SYNC_INTERVAL_SECS")? {
            config.sync = if secs == 0 {
                config.sync.without_sync_interval()
            } else {
                config.sync.with_sync_interval(Duration::from_secs(secs))
            };
        }
        if let Some(secs) = parse_var(&lookup, "LINKSYNC_MIN_SYNC_INTERVAL_SECS")? {
            config.sync = config.sync.with_min_sync_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var(&lookup, "LINKSYNC_REMOTE_LOAD_INTERVAL_SECS")? {
            config.sync = config
                .sync
                .with_remote_load_interval(Duration::from_secs(secs));
        }
        if let Some(max) = parse_var(&lookup, "LINKSYNC_MAX_LOG_ENTRIES")? {
            config.sync = config.sync.with_max_log_entries(max);
        }

        info!(
            bind = %config.bind_addr,
            buffer = %config.buffer_path.display(),
            remote = config.remote_url.as_deref().unwrap_or("in-memory"),
            user = %config.user_id,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Sets the buffer file location.
    pub fn with_buffer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.buffer_path = path.into();
        self
    }

    /// Sets the remote store URL.
    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    /// Sets the remote bearer token.
    pub fn with_remote_token(mut self, token: impl Into<String>) -> Self {
        self.remote_token = Some(token.into());
        self
    }

    /// Sets the user whose collection is synced.
    pub fn with_user_id(mut self, user: impl Into<String>) -> Self {
        self.user_id = user.into();
        self
    }

    /// Requires the `x-user-id` header.
    pub fn with_required_user_header(mut self, require: bool) -> Self {
        self.require_user_header = require;
        self
    }

    /// Sets the per-user rate limit.
    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    /// Sets the link list cache lifetime.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the reconciler settings.
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 8080)))
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> ServerResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => {
            debug!("{key} not set, using default");
            Ok(None)
        }
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ServerError::Config(format!("invalid {key} value {raw:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.remote_url.is_none());
        assert!(!config.require_user_header);
        assert_eq!(config.sync.min_sync_interval, Duration::from_secs(5));
    }

    #[test]
    fn config_from_variables() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("LINKSYNC_BIND", "0.0.0.0:9000"),
            ("LINKSYNC_BUFFER", "/tmp/links.json"),
            ("LINKSYNC_REMOTE_URL", "https://api.example.com"),
            ("LINKSYNC_USER", "alice"),
            ("LINKSYNC_REQUIRE_USER_HEADER", "true"),
            ("LINKSYNC_RATE_LIMIT", "0"),
            ("LINKSYNC_SYNC_INTERVAL_SECS", "0"),
            ("LINKSYNC_MAX_LOG_ENTRIES", "25"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.buffer_path, PathBuf::from("/tmp/links.json"));
        assert_eq!(config.remote_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.user_id, "alice");
        assert!(config.require_user_header);
        assert_eq!(config.rate_limit_per_minute, 0);
        assert!(config.sync.sync_interval.is_none());
        assert_eq!(config.sync.max_log_entries, 25);
    }

    #[test]
    fn invalid_variable_is_a_config_error() {
        let err = ServerConfig::from_lookup(lookup(&[("LINKSYNC_RATE_LIMIT", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ServerError::Config(ref m) if m.contains("LINKSYNC_RATE_LIMIT")));
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::default()
            .with_remote_url("https://api.example.com")
            .with_remote_token("t")
            .with_user_id("bob")
            .with_required_user_header(true)
            .with_rate_limit(10)
            .with_cache_ttl(Duration::ZERO);

        assert_eq!(config.user_id, "bob");
        assert_eq!(config.remote_token.as_deref(), Some("t"));
        assert_eq!(config.rate_limit_per_minute, 10);
        assert!(config.cache_ttl.is_zero());
    }
}
