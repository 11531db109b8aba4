//! HTTP transport to the cache bucket and the packager

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::FetchError;
use crate::manifest::ErrorBody;

/// A raw backend answer; interpretation is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    pub status: u16,
    /// Canonical reason phrase of the status, if it has one
    pub reason: Option<String>,
    pub body: String,
}

impl BackendResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: None,
            body: body.into(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        serde_json::from_str(&self.body).map_err(|err| FetchError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    /// The backend's `{error}` text, else the reason phrase, else the status code.
    pub fn error_message(&self) -> String {
        serde_json::from_str::<ErrorBody>(&self.body)
            .ok()
            .and_then(|body| body.error)
            .or_else(|| self.reason.clone())
            .unwrap_or_else(|| self.status.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Transport used by [`PackagerClient`](crate::PackagerClient).
///
/// Only transport failures are errors; every HTTP status comes back as a
/// [`BackendResponse`].
#[async_trait]
pub trait PackagerBackend: Send + Sync {
    async fn request(&self, method: Method, url: &str) -> Result<BackendResponse, FetchError>;
}

/// [`PackagerBackend`] over `reqwest`
#[derive(Debug, Clone, Default)]
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PackagerBackend for HttpBackend {
    async fn request(&self, method: Method, url: &str) -> Result<BackendResponse, FetchError> {
        let transport = |err: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        };

        let request = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        Ok(BackendResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_body() {
        let response = BackendResponse::new(500, r#"{"error":"Package not found"}"#).with_reason("Internal Server Error");
        assert_eq!(response.error_message(), "Package not found");

        let response = BackendResponse::new(500, "<html>").with_reason("Internal Server Error");
        assert_eq!(response.error_message(), "Internal Server Error");

        assert_eq!(BackendResponse::new(599, "").error_message(), "599");
    }
}
