//! REST remote store.
//!
//! This module maps the [`RemoteStore`] operations onto a REST document API:
//!
//! | Operation  | Request                                   |
//! |------------|-------------------------------------------|
//! | `list_all` | `GET    {base}/users/{user}/links`        |
//! | `get`      | `GET    {base}/users/{user}/links/{id}`   |
//! | `create`   | `POST   {base}/users/{user}/links`        |
//! | `update`   | `PATCH  {base}/users/{user}/links/{id}`   |
//! | `delete`   | `DELETE {base}/users/{user}/links/{id}`   |
//!
//! The actual HTTP client is abstracted via a trait so the adapter can run
//! over reqwest in production and over a loopback in tests.

use crate::error::{SyncError, SyncResult};
use crate::remote::{MemoryRemoteStore, RemoteStore};
use linksync_core::LinkDocument;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// HTTP method used by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request issued by [`HttpRemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Vec<u8>>,
}

/// A response received by [`HttpRemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Creates a JSON response, or a 500 if `value` cannot be encoded.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status, body),
            Err(e) => Self::new(500, e.to_string().into_bytes()),
        }
    }

    /// Creates an empty response.
    pub fn empty(status: u16) -> Self {
        Self::new(status, Vec::new())
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport.
pub trait HttpClient: Send + Sync {
    /// Sends a request. `Err` means no response was received at all.
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;

    /// Checks if the client is healthy.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// REST implementation of [`RemoteStore`].
pub struct HttpRemoteStore<C: HttpClient> {
    /// Base URL of the remote service (e.g., "https://links.example.com/api").
    base_url: Url,
    /// Owner of the link collection.
    user_id: String,
    /// Optional bearer token.
    token: Option<String>,
    /// HTTP client implementation.
    client: C,
    /// Whether the last request got a response.
    connected: AtomicBool,
    /// Last error message.
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpRemoteStore<C> {
    /// Creates a new REST remote store.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Protocol`] if `base_url` is not an absolute URL
    /// that can carry path segments.
    pub fn new(base_url: &str, user_id: impl Into<String>, client: C) -> SyncResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SyncError::Protocol(format!("invalid remote URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::Protocol(format!(
                "remote URL cannot carry a path: {base_url}"
            )));
        }
        Ok(Self {
            base_url,
            user_id: user_id.into(),
            token: None,
            client,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        })
    }

    /// Sets the bearer token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Returns the user whose collection is addressed.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns true if the last request got a response and the client is healthy.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn endpoint(&self, id: Option<&str>) -> SyncResult<String> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| SyncError::Protocol("remote URL cannot carry a path".into()))?;
            segments.pop_if_empty().extend(["users", self.user_id.as_str(), "links"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url.into())
    }

    fn send<B: Serialize>(
        &self,
        method: HttpMethod,
        url: String,
        body: Option<&B>,
    ) -> SyncResult<HttpResponse> {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| SyncError::Protocol(format!("failed to encode request: {e}")))?;

        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        if body.is_some() {
            headers.push(("content-type".into(), "application/json".into()));
        }
        if let Some(token) = &self.token {
            headers.push(("authorization".into(), format!("Bearer {token}")));
        }

        tracing::debug!(%method, %url, "remote request");
        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };

        let response = self.client.send(request).map_err(|e| {
            self.set_error(&e);
            self.connected.store(false, Ordering::SeqCst);
            SyncError::unavailable(e)
        })?;
        self.connected.store(true, Ordering::SeqCst);

        if response.status >= 500 {
            let message = format!(
                "server error {}: {}",
                response.status,
                String::from_utf8_lossy(&response.body)
            );
            self.set_error(&message);
            return Err(SyncError::unavailable(message));
        }
        Ok(response)
    }

    fn expect_success(&self, id: &str, response: &HttpResponse) -> SyncResult<()> {
        if response.is_success() {
            return Ok(());
        }
        let message = format!(
            "status {}: {}",
            response.status,
            String::from_utf8_lossy(&response.body)
        );
        self.set_error(&message);
        Err(SyncError::rejected(id, message))
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> SyncResult<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| SyncError::Protocol(format!("failed to decode response: {e}")))
}

impl<C: HttpClient> RemoteStore for HttpRemoteStore<C> {
    fn list_all(&self) -> SyncResult<Vec<LinkDocument>> {
        let response = self.send::<()>(HttpMethod::Get, self.endpoint(None)?, None)?;
        self.expect_success("*", &response)?;
        let documents: Vec<LinkDocument> = decode(&response)?;
        Ok(documents.into_iter().filter(|d| d.active).collect())
    }

    fn get(&self, id: &str) -> SyncResult<Option<LinkDocument>> {
        let response = self.send::<()>(HttpMethod::Get, self.endpoint(Some(id))?, None)?;
        if response.status == 404 {
            return Ok(None);
        }
        self.expect_success(id, &response)?;
        decode(&response).map(Some)
    }

    fn create(&self, doc: &LinkDocument) -> SyncResult<LinkDocument> {
        let response = self.send(HttpMethod::Post, self.endpoint(None)?, Some(doc))?;
        self.expect_success(&doc.id, &response)?;
        decode(&response)
    }

    fn update(&self, id: &str, doc: &LinkDocument) -> SyncResult<LinkDocument> {
        let response = self.send(HttpMethod::Patch, self.endpoint(Some(id))?, Some(doc))?;
        self.expect_success(id, &response)?;
        decode(&response)
    }

    fn delete(&self, id: &str) -> SyncResult<()> {
        let response = self.send::<()>(HttpMethod::Delete, self.endpoint(Some(id))?, None)?;
        self.expect_success(id, &response)
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer: Send + Sync {
    /// Handles one request. `path` starts at `/users/`.
    fn handle(&self, method: HttpMethod, path: &str, body: &[u8]) -> HttpResponse;
}

impl<S: LoopbackServer + ?Sized> LoopbackServer for Arc<S> {
    fn handle(&self, method: HttpMethod, path: &str, body: &[u8]) -> HttpResponse {
        (**self).handle(method, path, body)
    }
}

/// A loopback HTTP client that routes requests directly to a server object.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
    healthy: AtomicBool,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self {
            server,
            healthy: AtomicBool::new(true),
        }
    }

    /// Simulates a network outage while false.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        if !self.is_healthy() {
            return Err("connection refused".into());
        }
        let path = request
            .url
            .find("/users/")
            .map(|i| &request.url[i..])
            .unwrap_or(&request.url);
        let body = request.body.unwrap_or_default();
        Ok(self.server.handle(request.method, path, &body))
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

fn error_response(err: &SyncError) -> HttpResponse {
    let status = match err {
        SyncError::RemoteUnavailable { .. } => 503,
        SyncError::RemoteRejected { .. } => 404,
        SyncError::Protocol(_) => 400,
        SyncError::Buffer(_) => 500,
    };
    HttpResponse::new(status, err.to_string().into_bytes())
}

fn respond<T: Serialize>(status: u16, result: SyncResult<T>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::json(status, &value),
        Err(e) => error_response(&e),
    }
}

impl LoopbackServer for MemoryRemoteStore {
    fn handle(&self, method: HttpMethod, path: &str, body: &[u8]) -> HttpResponse {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let id = match segments.as_slice() {
            ["users", _, "links"] => None,
            ["users", _, "links", id] => Some(*id),
            _ => return HttpResponse::empty(404),
        };

        let parse = || -> SyncResult<LinkDocument> {
            serde_json::from_slice(body)
                .map_err(|e| SyncError::Protocol(format!("bad document: {e}")))
        };

        match (method, id) {
            (HttpMethod::Get, None) => respond(200, self.list_all()),
            (HttpMethod::Post, None) => respond(201, parse().and_then(|d| self.create(&d))),
            (HttpMethod::Get, Some(id)) => match self.get(id) {
                Ok(Some(doc)) => HttpResponse::json(200, &doc),
                Ok(None) => HttpResponse::empty(404),
                Err(e) => error_response(&e),
            },
            (HttpMethod::Patch, Some(id)) => {
                respond(200, parse().and_then(|d| self.update(id, &d)))
            }
            (HttpMethod::Delete, Some(id)) => match self.delete(id) {
                Ok(()) => HttpResponse::empty(204),
                Err(e) => error_response(&e),
            },
            _ => HttpResponse::empty(405),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct TestClient {
        response: RwLock<Option<HttpResponse>>,
        requests: RwLock<Vec<HttpRequest>>,
    }

    impl TestClient {
        fn new() -> Self {
            Self {
                response: RwLock::new(None),
                requests: RwLock::new(Vec::new()),
            }
        }

        fn set_response(&self, resp: HttpResponse) {
            *self.response.write() = Some(resp);
        }
    }

    impl HttpClient for &TestClient {
        fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
            self.requests.write().push(request);
            self.response
                .read()
                .clone()
                .ok_or_else(|| "No response set".into())
        }
    }

    fn doc(id: &str) -> LinkDocument {
        let now = Utc::now();
        LinkDocument {
            id: id.into(),
            name: "Docs".into(),
            icon_url: "https://docs.rs/i.ico".into(),
            destination_url: "https://docs.rs".into(),
            position: 1,
            created_at: now,
            modified_at: now,
            active: true,
        }
    }

    #[test]
    fn rejects_invalid_base_url() {
        let client = TestClient::new();
        assert!(HttpRemoteStore::new("not a url", "u1", &client).is_err());
        assert!(HttpRemoteStore::new("mailto:someone@example.com", "u1", &client).is_err());
    }

    #[test]
    fn builds_document_urls_and_headers() {
        let client = TestClient::new();
        client.set_response(HttpResponse::json(200, &doc("a b")));
        let store = HttpRemoteStore::new("https://api.example.com/v1/", "user 1", &client)
            .unwrap()
            .with_token("secret");

        store.get("a b").unwrap();

        let requests = client.requests.read();
        let request = &requests[0];
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(
            request.url,
            "https://api.example.com/v1/users/user%201/links/a%20b"
        );
        assert!(request
            .headers
            .contains(&("authorization".to_string(), "Bearer secret".to_string())));
    }

    #[test]
    fn status_mapping() {
        let client = TestClient::new();
        let store = HttpRemoteStore::new("https://api.example.com", "u1", &client).unwrap();

        client.set_response(HttpResponse::empty(404));
        assert!(store.get("1").unwrap().is_none());
        assert!(matches!(
            store.update("1", &doc("1")),
            Err(SyncError::RemoteRejected { .. })
        ));

        client.set_response(HttpResponse::empty(503));
        assert!(store.get("1").unwrap_err().is_unavailable());

        client.set_response(HttpResponse::new(200, b"not json".to_vec()));
        assert!(matches!(store.list_all(), Err(SyncError::Protocol(_))));
    }

    #[test]
    fn transport_failure_is_unavailable() {
        let client = TestClient::new();
        let store = HttpRemoteStore::new("https://api.example.com", "u1", &client).unwrap();

        let err = store.list_all().unwrap_err();
        assert!(err.is_unavailable());
        assert!(!store.is_connected());
        assert_eq!(store.last_error().as_deref(), Some("No response set"));
    }

    #[test]
    fn loopback_round_trip() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let store =
            HttpRemoteStore::new("http://loopback", "u1", LoopbackClient::new(remote.clone()))
                .unwrap();

        let created = store.create(&doc("1")).unwrap();
        assert_eq!(created.id, "1");
        assert_eq!(store.list_all().unwrap().len(), 1);

        let mut changed = doc("1");
        changed.name = "Renamed".into();
        store.update("1", &changed).unwrap();
        assert_eq!(remote.document("1").unwrap().name, "Renamed");

        store.delete("1").unwrap();
        assert!(store.list_all().unwrap().is_empty());
        assert!(!store.get("1").unwrap().unwrap().active);
    }

    #[test]
    fn loopback_outage() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let client = LoopbackClient::new(remote.clone());
        client.set_healthy(false);
        let store = HttpRemoteStore::new("http://loopback", "u1", client).unwrap();

        assert!(store.list_all().unwrap_err().is_unavailable());
        assert!(!store.is_connected());

        remote.set_available(false);
        assert_eq!(
            remote.handle(HttpMethod::Get, "/users/u1/links", &[]).status,
            503
        );
    }
}
