//! The shared cart state container.
//!
//! A single [`CartState`] value lives in a `tokio::sync::watch` channel.
//! Every write publishes one complete state, so observers never see a torn
//! mix of old and new fields. Local `apply_*` operations exist purely for
//! immediate UI feedback before a network round trip completes; the next
//! authoritative [`CartStore::replace`] supersedes them wholesale.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use lakshmi_core::{LineId, Money, ProductId};

/// Server-confirmed product data carried on a cart line.
///
/// `price` is always the most recently server-confirmed value and is never
/// mutated client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Product display name.
    pub name: String,
    /// Last server-confirmed unit price.
    pub price: Money,
    /// Last known stock level; a soft guard only, the server remains
    /// authoritative.
    pub stock: u32,
    /// Product image URLs.
    pub images: Vec<String>,
}

/// One entry in the cart associating a product with a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Server-assigned line ID, or a provisional one for optimistic adds.
    pub line_id: LineId,
    /// Product this line refers to; unique within a cart.
    pub product_id: ProductId,
    /// Server-confirmed product data.
    pub product: ProductSnapshot,
    /// Quantity, always >= 1.
    pub quantity: u32,
}

impl CartItem {
    /// Price of this line (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.product.price * self.quantity
    }
}

/// Whether the cart is idle, mid-fetch, or showing an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CartStatus {
    #[default]
    Idle,
    Loading,
    Error,
}

/// The whole cart state. Totals are derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartState {
    /// Cart lines in server order.
    pub items: Vec<CartItem>,
    /// Current status.
    pub status: CartStatus,
    /// User-visible error message, if any.
    pub error_message: Option<String>,
}

impl CartState {
    /// Total quantity across all lines.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of unit price times quantity across all lines.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The single shared mutable structure holding cart state.
///
/// Constructed once per session and passed by clone to every consumer.
/// Exactly one logical writer (the synchronization engine) replaces the
/// state; everything else reads or subscribes.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    state: watch::Sender<CartState>,
}

impl CartStore {
    /// Create an empty cart store.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            inner: Arc::new(CartStoreInner { state }),
        }
    }

    /// Snapshot of the current cart state.
    #[must_use]
    pub fn read(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes. Each published value is a complete state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    /// Replace the item list wholesale with the server's authoritative
    /// response. Clears status and any error.
    pub fn replace(&self, items: Vec<CartItem>) {
        self.inner.state.send_replace(CartState {
            items,
            status: CartStatus::Idle,
            error_message: None,
        });
    }

    /// Mark the cart as loading, keeping items visible.
    pub fn set_loading(&self) {
        self.inner.state.send_modify(|state| {
            state.status = CartStatus::Loading;
            state.error_message = None;
        });
    }

    /// Record a user-visible error, keeping items untouched.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.inner.state.send_modify(|state| {
            state.status = CartStatus::Error;
            state.error_message = Some(message);
        });
    }

    /// Clear a previously recorded error.
    pub fn clear_error(&self) {
        self.inner.state.send_modify(|state| {
            if state.status == CartStatus::Error {
                state.status = CartStatus::Idle;
            }
            state.error_message = None;
        });
    }

    /// Reset to an empty cart. Used when the session ends; the next
    /// sign-in starts from a fresh fetch.
    pub fn clear_local(&self) {
        self.inner.state.send_replace(CartState::default());
    }

    /// Undo a failed operation's optimistic edit for one product and
    /// record the error, as one atomic write.
    ///
    /// Only the affected product's line is touched: a `prior` line is put
    /// back in place of whatever the failed operation left there, and
    /// `None` removes a line the operation added. Lines for other products
    /// keep their current values, so a concurrently confirmed operation is
    /// never clobbered by a stale snapshot.
    pub fn revert_line(
        &self,
        product_id: &ProductId,
        prior: Option<CartItem>,
        message: impl Into<String>,
    ) {
        let message = message.into();
        self.inner.state.send_modify(|state| {
            match prior {
                Some(line) => {
                    if let Some(item) = state
                        .items
                        .iter_mut()
                        .find(|item| &item.product_id == product_id)
                    {
                        *item = line;
                    } else {
                        // The failed operation removed the line; reinsert
                        // it. The next authoritative replace restores
                        // server order.
                        state.items.push(line);
                    }
                }
                None => state.items.retain(|item| &item.product_id != product_id),
            }
            state.status = CartStatus::Error;
            state.error_message = Some(message);
        });
    }

    /// Optimistically add a product, merging quantity into an existing line
    /// for the same product. Provisional until the next `replace`.
    pub fn apply_local_add(&self, product_id: &ProductId, quantity: u32, product: ProductSnapshot) {
        self.inner.state.send_modify(|state| {
            if let Some(item) = state
                .items
                .iter_mut()
                .find(|item| &item.product_id == product_id)
            {
                item.quantity += quantity;
            } else {
                state.items.push(CartItem {
                    line_id: LineId::provisional(),
                    product_id: product_id.clone(),
                    product,
                    quantity,
                });
            }
        });
    }

    /// Optimistically set a line's quantity. No-op for unknown products.
    pub fn apply_local_update(&self, product_id: &ProductId, quantity: u32) {
        self.inner.state.send_modify(|state| {
            if let Some(item) = state
                .items
                .iter_mut()
                .find(|item| &item.product_id == product_id)
            {
                item.quantity = quantity;
            }
        });
    }

    /// Optimistically remove a product's line.
    pub fn apply_local_remove(&self, product_id: &ProductId) {
        self.inner.state.send_modify(|state| {
            state.items.retain(|item| &item.product_id != product_id);
        });
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}
