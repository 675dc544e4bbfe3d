//! Request handlers.
//!
//! Every response uses the same envelope: `{"success": true, "data": ...}` on
//! success and `{"success": false, "error": "..."}` on failure.

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use linksync_core::{CacheStats, LinkDraft, LinkPatch, LinkRecord, PositionUpdate, VERSION};
use linksync_sync_engine::{
    DatabaseChange, LoadOutcome, LogEntry, LogKind, ReconcileReport, SyncOutcome, SyncStats,
    SyncStatus,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Header carrying the caller's identity.
pub const USER_HEADER: &str = "x-user-id";

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always true.
    pub success: bool,
    /// Payload.
    pub data: T,
}

type ApiResult<T> = ServerResult<Json<ApiResponse<T>>>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        success: true,
        data,
    }))
}

/// Caller identity from the `x-user-id` header.
///
/// Rejects with 401 when the header is required but absent, and with 429
/// when the caller exhausted its rate limit.
///
/// The header only gates access and keys the rate limiter. Every caller
/// shares the one buffer, which syncs to the collection of
/// [`ServerConfig::user_id`](crate::ServerConfig::user_id).
#[derive(Debug, Clone)]
pub struct UserId(pub Option<String>);

impl FromRequestParts<AppState> for UserId {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        if user.is_none() && state.config.require_user_header {
            return Err(ServerError::Unauthorized(format!(
                "missing {USER_HEADER} header"
            )));
        }

        let key = user.as_deref().unwrap_or("anonymous");
        state
            .limiter
            .check(key)
            .map_err(|retry_in| ServerError::RateLimited {
                retry_after_secs: retry_in.as_secs().max(1),
            })?;

        Ok(UserId(user))
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ServerResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ServerError::InvalidRequest(e.body_text()))
}

/// Runs blocking engine work off the async workers.
async fn blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(format!("blocking task failed: {e}")))?
}

/// Liveness payload.
#[derive(Debug, Serialize)]
pub struct Health {
    /// Always "ok".
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Link list cache counters.
    pub cache: CacheStats,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> ApiResult<Health> {
    ok(Health {
        status: "ok",
        version: VERSION,
        cache: state.cache.stats(),
    })
}

/// `GET /links`
pub async fn list_links(_user: UserId, State(state): State<AppState>) -> ApiResult<Vec<LinkRecord>> {
    ok(state.cached_links())
}

/// `GET /links/{id}`
pub async fn get_link(
    _user: UserId,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<LinkRecord> {
    ok(state.buffer.get(&id)?)
}

/// `POST /links`
pub async fn create_link(
    _user: UserId,
    State(state): State<AppState>,
    payload: Result<Json<LinkDraft>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<ApiResponse<LinkRecord>>)> {
    let draft = json_body(payload)?;
    let record = state.buffer.create(draft)?;
    state.invalidate();
    info!(id = %record.id, "link created");
    Ok((StatusCode::CREATED, ok(record)?))
}

/// `PUT /links/{id}`
pub async fn update_link(
    _user: UserId,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<LinkPatch>, JsonRejection>,
) -> ApiResult<LinkRecord> {
    let patch = json_body(payload)?;
    let record = state.buffer.update(&id, patch)?;
    state.invalidate();
    ok(record)
}

/// Payload of a successful delete.
#[derive(Debug, Serialize)]
pub struct Deleted {
    /// Removed link id.
    pub id: String,
}

/// `DELETE /links/{id}`
pub async fn delete_link(
    _user: UserId,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    let removed = state.buffer.delete(&id)?;
    state.invalidate();
    info!(id = %removed.id, "link deleted");
    ok(Deleted { id: removed.id })
}

/// Body of `POST /links/reorder`.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// New positions.
    pub positions: Vec<PositionUpdate>,
}

/// Payload of a successful reorder.
#[derive(Debug, Serialize)]
pub struct Reordered {
    /// Records touched.
    pub updated: usize,
}

/// `POST /links/reorder`
pub async fn reorder_links(
    _user: UserId,
    State(state): State<AppState>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> ApiResult<Reordered> {
    let request = json_body(payload)?;
    let updated = state.buffer.reorder(&request.positions)?;
    state.invalidate();
    ok(Reordered { updated })
}

/// Payload of `POST /sync`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReply {
    /// Human readable summary.
    pub message: String,
    /// Whether the run executed.
    pub executed: bool,
    /// Counts of an executed run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReconcileReport>,
    /// Reason a run was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

/// `POST /sync`
pub async fn trigger_sync(_user: UserId, State(state): State<AppState>) -> ApiResult<SyncReply> {
    let engine = state.engine.clone();
    let outcome = blocking(move || Ok(engine.manual_sync()?)).await?;

    let reply = match outcome {
        SyncOutcome::Completed(report) => SyncReply {
            message: "Sync completed".into(),
            executed: true,
            report: Some(report),
            skipped: None,
        },
        SyncOutcome::Skipped(reason) => SyncReply {
            message: "Sync skipped".into(),
            executed: false,
            report: None,
            skipped: Some(reason.to_string()),
        },
    };
    ok(reply)
}

/// Payload of `POST /sync/reload`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadReply {
    /// "loaded", "degraded" or "skipped".
    pub outcome: &'static str,
    /// Records in the buffer afterwards.
    pub records: usize,
    /// Seconds until a reload is allowed, when skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_in_secs: Option<u64>,
}

/// `POST /sync/reload`
pub async fn reload_from_remote(
    _user: UserId,
    State(state): State<AppState>,
) -> ApiResult<ReloadReply> {
    let engine = state.engine.clone();
    let outcome = blocking(move || Ok(engine.reload_from_remote()?)).await?;

    let reply = match outcome {
        LoadOutcome::Loaded { records } => ReloadReply {
            outcome: "loaded",
            records,
            retry_in_secs: None,
        },
        LoadOutcome::Degraded { local_records } => ReloadReply {
            outcome: "degraded",
            records: local_records,
            retry_in_secs: None,
        },
        LoadOutcome::Skipped { retry_in } => ReloadReply {
            outcome: "skipped",
            records: state.buffer.len(),
            retry_in_secs: Some(ceil_secs(retry_in)),
        },
    };
    ok(reply)
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// Payload of `GET /sync/status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReply {
    /// Engine status.
    #[serde(flatten)]
    pub status: SyncStatus,
    /// Ids of the records awaiting reconciliation.
    pub pending_ids: Vec<String>,
}

/// `GET /sync/status`
pub async fn sync_status(_user: UserId, State(state): State<AppState>) -> ApiResult<StatusReply> {
    let pending_ids = state.buffer.pending().into_iter().map(|r| r.id).collect();
    ok(StatusReply {
        status: state.engine.status(),
        pending_ids,
    })
}

/// `GET /sync/stats`
pub async fn sync_stats(_user: UserId, State(state): State<AppState>) -> ApiResult<SyncStats> {
    ok(state.engine.stats())
}

/// Query of `GET /sync/logs`.
#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    /// Restricts entries to one kind.
    pub kind: Option<String>,
}

/// `GET /sync/logs`
pub async fn list_logs(
    _user: UserId,
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Vec<LogEntry>> {
    let kind = query
        .kind
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(str::parse::<LogKind>)
        .transpose()
        .map_err(ServerError::InvalidRequest)?;
    ok(state.engine.log().list(kind))
}

/// Payload of `DELETE /sync/logs`.
#[derive(Debug, Serialize)]
pub struct Cleared {
    /// Entries removed.
    pub cleared: usize,
}

/// `DELETE /sync/logs`
pub async fn clear_logs(_user: UserId, State(state): State<AppState>) -> ApiResult<Cleared> {
    ok(Cleared {
        cleared: state.engine.log().clear(),
    })
}

/// `GET /sync/last-change`
pub async fn last_change(
    _user: UserId,
    State(state): State<AppState>,
) -> ApiResult<Option<DatabaseChange>> {
    ok(state.engine.log().last_database_change())
}

/// Fallback for unknown routes.
pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "success": false, "error": "no such route" })),
    )
}
