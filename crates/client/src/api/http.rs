//! HTTP transport shared by all API endpoint groups.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::api::ApiError;
use crate::config::ClientConfig;
use crate::session::Session;

/// Client for the Lakshmi backend API.
///
/// Normalizes HTTP calls and errors, injects the session credential, and
/// enforces the configured request timeout. Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    session: Session,
}

impl ApiClient {
    /// Create a new API client.
    #[must_use]
    pub fn new(config: &ClientConfig, session: Session) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: config.api_base_url.clone(),
                timeout: config.request_timeout,
                session,
            }),
        }
    }

    /// The session this client injects credentials from.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Execute a request and deserialize a 2xx response body.
    ///
    /// Attaches `Authorization: Bearer <token>` when a session credential
    /// exists. A 401 response drops the credential and broadcasts a forced
    /// logout before returning `SessionExpired`.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let url = self
            .inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::Validation(format!("invalid request path {path}: {e}")))?;

        let mut request = self
            .inner
            .client
            .request(method, url)
            .timeout(self.inner.timeout)
            .header("Content-Type", "application/json");

        if let Some(token) = self.inner.session.token() {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::NetworkUnavailable("request timed out".to_string())
            } else {
                ApiError::NetworkUnavailable(e.to_string())
            }
        })?;

        let status = response.status();

        // 401 means the session credential is no longer valid. Clear it and
        // force a redirect to login, distinct from ordinary 4xx errors.
        if status == StatusCode::UNAUTHORIZED {
            self.inner.session.expire();
            return Err(ApiError::SessionExpired);
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| ApiError::NetworkUnavailable(e.to_string()))?;

        if !status.is_success() {
            let message = extract_message(&response_text);
            tracing::warn!(status = %status, message = %message, "API request failed");
            if status.is_server_error() {
                return Err(ApiError::ServerFault {
                    status: status.as_u16(),
                    message,
                });
            }
            return Err(ApiError::ServerRejected {
                status: status.as_u16(),
                message,
            });
        }

        // Some endpoints (e.g. clear cart) return an empty body.
        if response_text.is_empty() {
            return serde_json::from_str("{}").map_err(ApiError::Parse);
        }

        serde_json::from_str(&response_text).map_err(ApiError::Parse)
    }
}

/// Pull the structured `message` (or `error`) field out of an error body.
///
/// Returns an empty string when no structured field is present; callers
/// fall back to a generic message at display time.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_field() {
        assert_eq!(
            extract_message(r#"{"message":"Insufficient stock"}"#),
            "Insufficient stock"
        );
        assert_eq!(extract_message(r#"{"error":"Bad request"}"#), "Bad request");
    }

    #[test]
    fn test_extract_message_missing_or_unstructured() {
        assert_eq!(extract_message("{}"), "");
        assert_eq!(extract_message("<html>502</html>"), "");
        assert_eq!(extract_message(""), "");
    }
}
