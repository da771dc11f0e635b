//! Cart synchronization engine.
//!
//! Orchestrates asynchronous cart operations against the backend and is
//! the only writer of the [`CartStore`]. Each operation follows the same
//! optimistic-then-reconcile protocol:
//!
//! 1. fail fast with [`ApiError::AuthRequired`] when unauthenticated - no
//!    network call is issued;
//! 2. apply a provisional local edit for immediate UI feedback where one
//!    is possible;
//! 3. on success, replace the store's items wholesale with the server's
//!    authoritative list - never a field-level merge;
//! 4. on failure, undo only the failed operation's own optimistic edit,
//!    in one atomic write, against whatever the items are by then - a
//!    concurrently confirmed operation on another product is never
//!    clobbered by a stale snapshot.
//!
//! Operations on different products may be in flight simultaneously; each
//! tracks its own per-product busy flag so the UI can disable only the
//! affected control. Operations are deliberately not serialized: when two
//! updates to the same product race, the store reflects whichever
//! successful response is applied last, not necessarily the one issued
//! last. Completions that arrive after every observer is gone are
//! harmless; watch channels simply drop unobserved values.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::instrument;

use lakshmi_core::ProductId;

use crate::api::{ApiClient, ApiError};
use crate::cart::store::{CartItem, CartStore};
use crate::session::AuthEvent;

/// Asynchronous cart operations with optimistic local edits.
///
/// Cheaply cloneable via `Arc`; every clone drives the same store.
#[derive(Clone)]
pub struct CartEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    api: ApiClient,
    store: CartStore,
    busy: watch::Sender<HashSet<ProductId>>,
}

impl CartEngine {
    /// Create an engine with an empty cart store.
    ///
    /// The engine observes session events and resets the store to empty
    /// when the session ends, whether by user sign-out or expiry. Must be
    /// called from within a tokio runtime.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let (busy, _) = watch::channel(HashSet::new());
        let store = CartStore::new();

        let mut auth_events = api.session().subscribe();
        let observer_store = store.clone();
        tokio::spawn(async move {
            while auth_events.changed().await.is_ok() {
                let signed_out = matches!(
                    *auth_events.borrow_and_update(),
                    AuthEvent::SignedOut { .. }
                );
                if signed_out {
                    observer_store.clear_local();
                }
            }
        });

        Self {
            inner: Arc::new(EngineInner { api, store, busy }),
        }
    }

    /// The cart store this engine writes into. Read-only for callers.
    #[must_use]
    pub fn store(&self) -> &CartStore {
        &self.inner.store
    }

    /// The API client this engine issues calls through.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Whether an operation for this product is currently in flight.
    #[must_use]
    pub fn is_busy(&self, product_id: &ProductId) -> bool {
        self.inner.busy.borrow().contains(product_id)
    }

    /// Subscribe to the set of products with in-flight operations.
    #[must_use]
    pub fn subscribe_busy(&self) -> watch::Receiver<HashSet<ProductId>> {
        self.inner.busy.subscribe()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch the authoritative cart, replacing local state wholesale.
    ///
    /// # Errors
    ///
    /// `AuthRequired` when unauthenticated (no network call), otherwise any
    /// network-level error. On failure the prior items are left untouched.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<(), ApiError> {
        self.ensure_authenticated()?;
        self.inner.store.set_loading();

        match self.inner.api.get_cart().await {
            Ok(items) => {
                self.inner.store.replace(items);
                Ok(())
            }
            Err(err) => {
                self.settle_failure(&err, None);
                Err(err)
            }
        }
    }

    /// Add a product to the cart.
    ///
    /// When the product already has a cart line, its quantity is bumped
    /// optimistically and the requested total is checked against the last
    /// known stock. The soft stock guard cannot see server-side stock
    /// changes; a `ServerRejected` from the backend is the authoritative
    /// check and is surfaced to the caller when it occurs.
    ///
    /// # Errors
    ///
    /// `AuthRequired`, `Validation` (stock guard), or a network-level
    /// error. A zero quantity is a local no-op.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_item(&self, product_id: &ProductId, quantity: u32) -> Result<(), ApiError> {
        self.ensure_authenticated()?;
        if quantity == 0 {
            return Ok(());
        }

        let prior_line = self.prior_line(product_id);
        if let Some(existing) = &prior_line {
            let requested = existing.quantity + quantity;
            Self::check_stock(requested, existing.product.stock)?;
            self.inner.store.apply_local_update(product_id, requested);
        }

        let _busy = self.mark_busy(product_id);
        match self.inner.api.add_cart_item(product_id, quantity).await {
            Ok(items) => {
                self.inner.store.replace(items);
                Ok(())
            }
            Err(err) => {
                self.settle_failure(&err, Some((product_id, prior_line)));
                Err(err)
            }
        }
    }

    /// Set a cart line's quantity.
    ///
    /// A quantity below 1 is rejected locally without any network call - a
    /// no-op, not an error. A quantity above the last known stock fails
    /// the soft guard with `Validation`.
    ///
    /// # Errors
    ///
    /// `AuthRequired`, `Validation`, or a network-level error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_item(&self, product_id: &ProductId, quantity: u32) -> Result<(), ApiError> {
        self.ensure_authenticated()?;
        if quantity < 1 {
            return Ok(());
        }

        let prior_line = self.prior_line(product_id);
        if let Some(existing) = &prior_line {
            Self::check_stock(quantity, existing.product.stock)?;
        }
        self.inner.store.apply_local_update(product_id, quantity);

        let _busy = self.mark_busy(product_id);
        match self.inner.api.update_cart_item(product_id, quantity).await {
            Ok(items) => {
                self.inner.store.replace(items);
                Ok(())
            }
            Err(err) => {
                self.settle_failure(&err, Some((product_id, prior_line)));
                Err(err)
            }
        }
    }

    /// Remove a product's line from the cart.
    ///
    /// # Errors
    ///
    /// `AuthRequired` or a network-level error. On failure the line
    /// reappears untouched.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: &ProductId) -> Result<(), ApiError> {
        self.ensure_authenticated()?;

        let prior_line = self.prior_line(product_id);
        self.inner.store.apply_local_remove(product_id);

        let _busy = self.mark_busy(product_id);
        match self.inner.api.remove_cart_item(product_id).await {
            Ok(items) => {
                self.inner.store.replace(items);
                Ok(())
            }
            Err(err) => {
                self.settle_failure(&err, Some((product_id, prior_line)));
                Err(err)
            }
        }
    }

    /// Empty the cart, server-side and locally.
    ///
    /// Idempotent: clearing an already-empty cart succeeds and leaves the
    /// items empty.
    ///
    /// # Errors
    ///
    /// `AuthRequired` or a network-level error. On failure the items are
    /// left untouched.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), ApiError> {
        self.ensure_authenticated()?;

        match self.inner.api.clear_cart().await {
            Ok(()) => {
                self.inner.store.replace(Vec::new());
                Ok(())
            }
            Err(err) => {
                self.settle_failure(&err, None);
                Err(err)
            }
        }
    }

    /// Number of items in the cart according to the server (badge count).
    /// Does not touch the store.
    ///
    /// # Errors
    ///
    /// `AuthRequired` or a network-level error.
    #[instrument(skip(self))]
    pub async fn cart_count(&self) -> Result<u32, ApiError> {
        self.ensure_authenticated()?;
        self.inner.api.cart_count().await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_authenticated(&self) -> Result<(), ApiError> {
        if self.inner.api.session().is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::AuthRequired)
        }
    }

    fn check_stock(requested: u32, stock: u32) -> Result<(), ApiError> {
        if requested > stock {
            return Err(ApiError::Validation(format!(
                "Only {stock} in stock"
            )));
        }
        Ok(())
    }

    /// The product's current cart line, if any, captured before an
    /// optimistic edit so the edit can be undone on failure.
    fn prior_line(&self, product_id: &ProductId) -> Option<CartItem> {
        self.inner
            .store
            .read()
            .items
            .into_iter()
            .find(|item| &item.product_id == product_id)
    }

    /// Write the failure outcome into the store.
    ///
    /// A session that ended resets the cart to empty without a cart error;
    /// the login redirect is signaled elsewhere. Everything else undoes
    /// only the failed operation's own line and records the server's
    /// structured message (or a generic one), so a concurrently confirmed
    /// operation on another product keeps its result.
    fn settle_failure(&self, err: &ApiError, edited: Option<(&ProductId, Option<CartItem>)>) {
        match err {
            ApiError::AuthRequired | ApiError::SessionExpired => self.inner.store.clear_local(),
            _ => match edited {
                Some((product_id, prior_line)) => {
                    self.inner
                        .store
                        .revert_line(product_id, prior_line, err.user_message());
                }
                None => self.inner.store.set_error(err.user_message()),
            },
        }
    }

    fn mark_busy(&self, product_id: &ProductId) -> BusyGuard {
        self.inner.busy.send_modify(|set| {
            set.insert(product_id.clone());
        });
        BusyGuard {
            inner: Arc::clone(&self.inner),
            product_id: product_id.clone(),
        }
    }
}

/// Clears a product's busy flag when the operation completes, including on
/// early return or panic.
struct BusyGuard {
    inner: Arc<EngineInner>,
    product_id: ProductId,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.inner.busy.send_modify(|set| {
            set.remove(&self.product_id);
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::store::ProductSnapshot;
    use crate::config::ClientConfig;
    use crate::session::Session;
    use lakshmi_core::{LineId, Money};
    use secrecy::SecretString;

    fn engine_with_session(authenticated: bool) -> CartEngine {
        let session = Session::new();
        if authenticated {
            session.sign_in(SecretString::from("tok-test"));
        }
        // Port 9 is discard; these tests never reach the network.
        let config = ClientConfig::new("http://127.0.0.1:9".parse().unwrap());
        CartEngine::new(ApiClient::new(&config, session))
    }

    fn seeded_item(product_id: &str, stock: u32, quantity: u32) -> CartItem {
        CartItem {
            line_id: LineId::new(format!("line-{product_id}")),
            product_id: ProductId::new(product_id),
            product: ProductSnapshot {
                name: product_id.to_string(),
                price: Money::from_major(300),
                stock,
                images: vec![],
            },
            quantity,
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_fails_before_network() {
        let engine = engine_with_session(false);

        assert!(matches!(
            engine.fetch_cart().await,
            Err(ApiError::AuthRequired)
        ));
        assert!(matches!(
            engine.add_item(&ProductId::new("p1"), 1).await,
            Err(ApiError::AuthRequired)
        ));
        assert!(matches!(
            engine.clear_cart().await,
            Err(ApiError::AuthRequired)
        ));

        // No loading flicker, no error banner.
        let state = engine.store().read();
        assert_eq!(state.status, crate::cart::CartStatus::Idle);
        assert_eq!(state.error_message, None);
    }

    #[tokio::test]
    async fn test_update_below_one_is_local_noop() {
        let engine = engine_with_session(true);
        engine.store().replace(vec![seeded_item("p1", 10, 2)]);

        let result = engine.update_item(&ProductId::new("p1"), 0).await;
        assert!(result.is_ok());
        assert_eq!(engine.store().read().total_items(), 2);
    }

    #[tokio::test]
    async fn test_stock_soft_guard_rejects_locally() {
        let engine = engine_with_session(true);
        engine.store().replace(vec![seeded_item("p1", 5, 2)]);

        let err = engine
            .update_item(&ProductId::new("p1"), 6)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.user_message(), "Only 5 in stock");

        // Adding past the last known stock is also rejected.
        let err = engine
            .add_item(&ProductId::new("p1"), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // Items untouched by the rejected operations.
        assert_eq!(engine.store().read().total_items(), 2);
    }

    #[tokio::test]
    async fn test_busy_flag_clears_after_failure() {
        let engine = engine_with_session(true);
        engine.store().replace(vec![seeded_item("p1", 10, 1)]);

        let p1 = ProductId::new("p1");
        // The discard port refuses the connection, so the call fails fast.
        let result = engine.update_item(&p1, 3).await;
        assert!(result.is_err());
        assert!(!engine.is_busy(&p1));
    }

    #[tokio::test]
    async fn test_sign_out_clears_local_cart() {
        let engine = engine_with_session(true);
        engine.store().replace(vec![seeded_item("p1", 10, 2)]);

        let mut states = engine.store().subscribe();
        engine.api().session().sign_out();
        tokio::time::timeout(std::time::Duration::from_secs(1), states.changed())
            .await
            .unwrap()
            .unwrap();

        let state = engine.store().read();
        assert!(state.is_empty());
        assert_eq!(state.error_message, None);
    }

    #[tokio::test]
    async fn test_rollback_after_network_failure() {
        let engine = engine_with_session(true);
        let prior = vec![seeded_item("p1", 10, 1)];
        engine.store().replace(prior.clone());

        let result = engine.update_item(&ProductId::new("p1"), 3).await;
        assert!(matches!(result, Err(ApiError::NetworkUnavailable(_))));

        let state = engine.store().read();
        assert_eq!(state.items, prior);
        assert!(state.error_message.is_some());
    }
}
