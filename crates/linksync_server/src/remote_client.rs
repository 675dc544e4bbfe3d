//! reqwest-backed [`HttpClient`] for the REST remote store.

use crate::error::{ServerError, ServerResult};
use linksync_sync_engine::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use reqwest::blocking::Client;
use reqwest::Method;
use std::time::Duration;

/// Blocking HTTP client.
///
/// Must be created and dropped outside of an async context; requests must be
/// sent from blocking threads.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Builds a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> ServerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("linksync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServerError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let mut builder = self.client.request(method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.to_string())?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
