//! Backend API client for the Lakshmi storefront.
//!
//! # Architecture
//!
//! - The backend is a REST API; the cart endpoints all return the full
//!   authoritative item list so callers can replace local state wholesale
//! - A bearer token from [`crate::session::Session`] is attached when a
//!   session exists
//! - HTTP 401 is special-cased as session expiry: the credential is
//!   dropped and a forced-logout event is broadcast, distinct from other
//!   4xx/5xx which surface as ordinary user-visible errors
//!
//! # Example
//!
//! ```rust,ignore
//! use lakshmi_client::api::ApiClient;
//!
//! let api = ApiClient::new(&config, session);
//! let items = api.get_cart().await?;
//! let items = api.add_cart_item(&product_id, 1).await?;
//! ```

mod http;

pub mod cart;
pub mod orders;

pub use http::ApiClient;

use thiserror::Error;

/// Errors that can occur when interacting with the backend API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Operation requires an authenticated session; blocked pre-network.
    #[error("authentication required")]
    AuthRequired,

    /// Local validation failed; never reaches the network layer.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Request did not reach the server or timed out.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The backend rejected the session credential (HTTP 401).
    #[error("session expired")]
    SessionExpired,

    /// Server responded 4xx with a business reason (e.g. insufficient stock).
    #[error("server rejected request ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    /// Server responded 5xx.
    #[error("server fault ({status}): {message}")]
    ServerFault { status: u16, message: String },

    /// A 2xx response body failed to parse.
    #[error("response parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where an error should surface in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSurface {
    /// Inline next to the offending field or control.
    Inline,
    /// Dismissible banner, auto-cleared after a delay.
    Banner,
    /// Hard redirect to the login view; never shown as a banner.
    Redirect,
}

impl ApiError {
    /// The UI surface this error belongs on.
    ///
    /// Server rejections prefer an inline surface when the triggering
    /// control still exists; callers without one fall back to a banner.
    #[must_use]
    pub const fn surface(&self) -> ErrorSurface {
        match self {
            Self::AuthRequired | Self::SessionExpired => ErrorSurface::Redirect,
            Self::Validation(_) | Self::ServerRejected { .. } => ErrorSurface::Inline,
            Self::NetworkUnavailable(_) | Self::ServerFault { .. } | Self::Parse(_) => {
                ErrorSurface::Banner
            }
        }
    }

    /// Message suitable for showing to the shopper.
    ///
    /// Uses the server's structured message when one was present, otherwise
    /// a generic network-failure message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired | Self::SessionExpired => {
                "Please sign in to continue.".to_string()
            }
            Self::Validation(message) => message.clone(),
            Self::ServerRejected { message, .. } | Self::ServerFault { message, .. }
                if !message.is_empty() =>
            {
                message.clone()
            }
            _ => "Something went wrong. Please check your connection and try again.".to_string(),
        }
    }
}
