//! Cart persistence endpoints.
//!
//! All mutating endpoints return the full authoritative item list, which
//! is what lets the engine replace local state wholesale instead of
//! merging. Wire types mirror the backend's document shape and are
//! converted to domain types at the boundary.

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use lakshmi_core::{LineId, Money, ProductId};

use crate::api::{ApiClient, ApiError};
use crate::cart::{CartItem, ProductSnapshot};

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct CartResponse {
    #[serde(default)]
    products: Vec<CartEntry>,
}

#[derive(Debug, Deserialize)]
struct CartEntry {
    #[serde(rename = "_id")]
    id: LineId,
    #[serde(rename = "productId")]
    product: ProductDoc,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct ProductDoc {
    #[serde(rename = "_id")]
    id: ProductId,
    name: String,
    price: Money,
    #[serde(default)]
    stock: u32,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CartCountResponse {
    count: u32,
}

impl From<CartEntry> for CartItem {
    fn from(entry: CartEntry) -> Self {
        Self {
            line_id: entry.id,
            product_id: entry.product.id,
            product: ProductSnapshot {
                name: entry.product.name,
                price: entry.product.price,
                stock: entry.product.stock,
                images: entry.product.images,
            },
            quantity: entry.quantity,
        }
    }
}

impl CartResponse {
    fn into_items(self) -> Vec<CartItem> {
        self.products.into_iter().map(CartItem::from).collect()
    }
}

// =============================================================================
// Endpoints
// =============================================================================

impl ApiClient {
    /// Fetch the authoritative cart contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session has expired.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Vec<CartItem>, ApiError> {
        let response: CartResponse = self.send(Method::GET, "/api/cart", None).await?;
        Ok(response.into_items())
    }

    /// Add a product to the cart; returns the full updated item list.
    ///
    /// # Errors
    ///
    /// Returns `ServerRejected` when the backend refuses the add (e.g.
    /// insufficient stock), which is the authoritative stock check.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_cart_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Vec<CartItem>, ApiError> {
        let body = json!({ "productId": product_id, "quantity": quantity });
        let response: CartResponse = self
            .send(Method::POST, "/api/cart/add", Some(&body))
            .await?;
        Ok(response.into_items())
    }

    /// Set a cart line's quantity; returns the full updated item list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects the
    /// quantity.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_cart_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Vec<CartItem>, ApiError> {
        let body = json!({ "productId": product_id, "quantity": quantity });
        let response: CartResponse = self
            .send(Method::PUT, "/api/cart/update", Some(&body))
            .await?;
        Ok(response.into_items())
    }

    /// Remove a product's line; returns the full updated item list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_cart_item(
        &self,
        product_id: &ProductId,
    ) -> Result<Vec<CartItem>, ApiError> {
        let response: CartResponse = self
            .send(
                Method::DELETE,
                &format!("/api/cart/remove/{product_id}"),
                None,
            )
            .await?;
        Ok(response.into_items())
    }

    /// Empty the cart server-side. Returns no item list; an empty cart is
    /// implied.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), ApiError> {
        let _: serde_json::Value = self.send(Method::DELETE, "/api/cart/clear", None).await?;
        Ok(())
    }

    /// Number of items in the cart (badge count).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn cart_count(&self) -> Result<u32, ApiError> {
        let response: CartCountResponse = self.send(Method::GET, "/api/cart/count", None).await?;
        Ok(response.count)
    }
}
