//! Serve command implementation.

use linksync_server::{serve, shutdown_signal, AppState, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// Command-line values that take precedence over the environment.
#[derive(Debug, Default)]
pub struct Overrides {
    /// Bind address.
    pub bind: Option<SocketAddr>,
    /// Buffer file.
    pub buffer: Option<PathBuf>,
    /// Remote store URL.
    pub remote_url: Option<String>,
    /// User id.
    pub user: Option<String>,
}

/// Applies overrides on top of an environment-derived configuration.
pub fn apply(mut config: ServerConfig, overrides: Overrides) -> ServerConfig {
    if let Some(bind) = overrides.bind {
        config.bind_addr = bind;
    }
    if let Some(path) = overrides.buffer {
        config = config.with_buffer_path(path);
    }
    if let Some(url) = overrides.remote_url {
        config = config.with_remote_url(url);
    }
    if let Some(user) = overrides.user {
        config = config.with_user_id(user);
    }
    config
}

/// Runs the serve command.
pub fn run(overrides: Overrides) -> Result<(), Box<dyn std::error::Error>> {
    let config = apply(ServerConfig::from_env()?, overrides);

    // The blocking HTTP client is created and dropped outside the runtime.
    let state = AppState::build(config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve(state.clone(), shutdown_signal()));
    drop(runtime);
    drop(state);

    result?;
    info!("Goodbye");
    Ok(())
}
