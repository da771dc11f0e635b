//! Lakshmi Client - Cart synchronization and checkout core.
//!
//! This crate keeps a shopper's cart consistent between optimistic local
//! edits and the authoritative backend, derives monetary totals
//! deterministically, and drives the transition from cart to a submitted
//! order.
//!
//! # Architecture
//!
//! - The backend is the source of truth for cart contents. Every
//!   successful mutation returns the full item list, which replaces local
//!   state wholesale - never merged.
//! - Local edits exist purely for immediate UI feedback and are
//!   superseded by the next authoritative replacement.
//! - Pricing is a pure function recomputed on every read, so different
//!   views can never disagree about totals.
//!
//! # Modules
//!
//! - [`config`] - Environment-based configuration
//! - [`session`] - Session credential and forced-logout signaling
//! - [`api`] - Backend API client (cart and order endpoints)
//! - [`cart`] - Cart state store and synchronization engine
//! - [`pricing`] - Monetary breakdown of a cart
//! - [`checkout`] - Order assembly and submission state machine
//! - [`alerts`] - Dismissible error banner with auto-clear
//!
//! # Example
//!
//! ```rust,ignore
//! use lakshmi_client::{api::ApiClient, cart::CartEngine, config::ClientConfig, session::Session};
//!
//! let config = ClientConfig::from_env()?;
//! let session = Session::new();
//! session.sign_in(token);
//!
//! let api = ApiClient::new(&config, session);
//! let engine = CartEngine::new(api);
//!
//! engine.fetch_cart().await?;
//! engine.add_item(&product_id, 1).await?;
//! let totals = lakshmi_client::pricing::price(&engine.store().read().items);
//! ```
//!
//! Error presentation follows each error's surface: banner-surface errors
//! (network failures, server faults) go through [`AlertBanner::publish`],
//! which shows them and reports the surface so inline errors and login
//! redirects can be routed by the caller:
//!
//! ```rust,ignore
//! use lakshmi_client::{AlertBanner, ErrorSurface};
//!
//! let banner = AlertBanner::new(config.banner_dismiss_after);
//! if let Err(err) = engine.add_item(&product_id, 1).await {
//!     match banner.publish(&err) {
//!         ErrorSurface::Banner => {} // shown by the banner, auto-clears
//!         ErrorSurface::Inline => show_next_to_control(&err),
//!         ErrorSurface::Redirect => navigate_to_login(),
//!     }
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod alerts;
pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod pricing;
pub mod session;

pub use alerts::AlertBanner;
pub use api::{ApiClient, ApiError, ErrorSurface};
pub use cart::{CartEngine, CartItem, CartState, CartStatus, CartStore, ProductSnapshot};
pub use checkout::{
    CheckoutError, CheckoutFlow, CheckoutPhase, Navigation, PaymentMethod, ShippingAddress,
};
pub use config::ClientConfig;
pub use pricing::PricingBreakdown;
pub use session::{AuthEvent, Session};
