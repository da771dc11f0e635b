//! Order service endpoints.
//!
//! The order service persists submitted orders; this module consumes its
//! create/list/cancel operations. The [`OrderDraft`] payload is assembled
//! by the checkout orchestrator at submission time and never persisted
//! client-side.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use lakshmi_core::{Money, OrderId, ProductId};

use crate::api::{ApiClient, ApiError};

// =============================================================================
// Order Types
// =============================================================================

/// How the shopper pays.
///
/// Only cash on delivery is live; online payment exists in the UI but is
/// disabled until a payment processor is integrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "cod")]
    CashOnDelivery,
    #[serde(rename = "online")]
    Online,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CashOnDelivery => write!(f, "Cash on Delivery"),
            Self::Online => write!(f, "Online Payment"),
        }
    }
}

/// Delivery address entered at checkout. All fields are required for
/// submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    /// Street address.
    #[serde(rename = "address")]
    pub address_line: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// One line of a submitted order: the product, quantity, and the unit
/// price the shopper saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

/// The transient payload assembled at checkout submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    #[serde(rename = "products")]
    pub line_items: Vec<OrderLineItem>,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
}

/// Fulfillment status of a persisted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Payment status of a persisted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// A persisted order as returned by the order history endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(rename = "products")]
    pub line_items: Vec<OrderLineItem>,
    pub total_amount: Money,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Wire Types
// =============================================================================

/// Response to a create-order call.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderResponse {
    /// Whether the order was persisted.
    pub success: bool,
    /// ID of the created order, when reported.
    #[serde(rename = "orderId", default)]
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Deserialize)]
struct OrdersResponse {
    #[serde(default)]
    orders: Vec<Order>,
}

// =============================================================================
// Endpoints
// =============================================================================

impl ApiClient {
    /// Submit an order draft to the order service.
    ///
    /// One call per user-initiated submit; the caller is responsible for
    /// preventing duplicate submissions while a call is in flight.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects the
    /// draft.
    #[instrument(skip(self, draft))]
    pub async fn create_order(&self, draft: &OrderDraft) -> Result<CreateOrderResponse, ApiError> {
        let body = serde_json::to_value(draft)?;
        self.send(Method::POST, "/api/orders", Some(&body)).await
    }

    /// Fetch the shopper's order history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, ApiError> {
        let response: OrdersResponse = self.send(Method::GET, "/api/orders", None).await?;
        Ok(response.orders)
    }

    /// Cancel a previously submitted order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the order can no longer be
    /// cancelled.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .send(Method::PUT, &format!("/api/orders/{order_id}/cancel"), None)
            .await?;
        Ok(())
    }
}
