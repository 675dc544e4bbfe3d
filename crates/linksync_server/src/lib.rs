//! # linksync server
//!
//! HTTP surface over the local link buffer and its reconciler.
//!
//! This crate provides:
//! - [`ServerConfig`], loaded from `LINKSYNC_*` environment variables
//! - [`AppState`], built once and injected into every handler
//! - The axum [`router`] for link CRUD, reordering, and sync control
//! - [`serve`], which runs the initial load, the periodic scheduler and the
//!   HTTP server until shutdown
//!
//! ## Routes
//!
//! | Method & path            | Purpose                              |
//! |--------------------------|--------------------------------------|
//! | `GET /health`            | liveness and version                 |
//! | `GET/POST /links`        | list (cached) and create             |
//! | `GET/PUT/DELETE /links/{id}` | read, patch, remove              |
//! | `POST /links/reorder`    | batch position update                |
//! | `POST /sync`             | manual reconciliation                |
//! | `POST /sync/reload`      | replace the buffer from the remote   |
//! | `GET /sync/status`       | pending items and last run           |
//! | `GET /sync/stats`        | cumulative counters                  |
//! | `GET/DELETE /sync/logs`  | sync log, optionally `?kind=`        |
//! | `GET /sync/last-change`  | most recent confirmed remote write   |

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod handler;
mod rate_limit;
mod remote_client;
mod server;
mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use rate_limit::RateLimiter;
pub use remote_client::ReqwestClient;
pub use server::{router, serve, shutdown_signal};
pub use state::{AppState, Engine, LinkCache};
