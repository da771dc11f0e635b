//! Checkout orchestrator.
//!
//! Drives the transition from cart to a submitted order:
//! `Editing -> Submitting -> Success`, or `Submitting -> Failed` with
//! retry (entered form data is kept). The order draft is assembled only at
//! submission time from the current cart items and the pricing
//! calculator's total; it is never persisted client-side.
//!
//! Exactly one create-order call is issued per user-initiated submit; a
//! second submit while one is in flight is rejected locally. This is a
//! client-side guard only - the order service is not known to deduplicate
//! identical orders.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

use lakshmi_core::OrderId;

use crate::api::ApiError;
use crate::api::orders::OrderLineItem;
pub use crate::api::orders::{OrderDraft, PaymentMethod, ShippingAddress};
use crate::cart::CartEngine;
use crate::pricing;

/// Errors raised by the checkout orchestrator.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No submission path is reachable from an empty cart.
    #[error("cart is empty")]
    EmptyCart,

    /// A required address field is missing. Shown inline next to the
    /// offending field; never reaches the network layer.
    #[error("{field} is required")]
    Validation { field: &'static str },

    /// The selected payment method is reserved but not yet available.
    #[error("payment method not available yet")]
    PaymentMethodUnavailable,

    /// A submission is already in flight; repeated submits are dropped.
    #[error("an order submission is already in flight")]
    SubmitInFlight,

    /// The order service answered 2xx but did not accept the order.
    #[error("order was not accepted: {0}")]
    NotAccepted(String),

    /// The create-order call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Where the checkout flow wants the UI to navigate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Back to the cart view (checkout refused entry on an empty cart).
    CartView,
    /// To order history (scheduled after a successful submission).
    OrderHistory,
}

/// Checkout state machine phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutPhase {
    /// Form entry; submission has not started or a failure was shown and
    /// the shopper may retry with the retained form data.
    Editing,
    /// A create-order call is in flight; the submit control is disabled.
    Submitting,
    /// The order was accepted; a one-time navigation to order history is
    /// scheduled.
    Success { order_id: Option<OrderId> },
    /// The submission failed; form data and cart items are untouched.
    Failed { message: String },
}

/// Form data entered at checkout, retained across failed submissions.
#[derive(Debug, Clone, Default)]
pub struct CheckoutForm {
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Orchestrates order assembly and submission.
///
/// Reads the cart store and the pricing calculator; never mutates cart
/// state itself except by asking the engine to clear it after success.
#[derive(Clone)]
pub struct CheckoutFlow {
    inner: Arc<FlowInner>,
}

struct FlowInner {
    engine: CartEngine,
    phase: watch::Sender<CheckoutPhase>,
    navigation: watch::Sender<Option<Navigation>>,
    form: Mutex<CheckoutForm>,
    submitting: AtomicBool,
    redirect_after_success: Duration,
}

impl CheckoutFlow {
    /// Create a checkout flow over the given engine.
    ///
    /// `redirect_after_success` is the delay before the one-time
    /// navigation to order history (see `ClientConfig`).
    #[must_use]
    pub fn new(engine: CartEngine, redirect_after_success: Duration) -> Self {
        let (phase, _) = watch::channel(CheckoutPhase::Editing);
        let (navigation, _) = watch::channel(None);
        Self {
            inner: Arc::new(FlowInner {
                engine,
                phase,
                navigation,
                form: Mutex::new(CheckoutForm::default()),
                submitting: AtomicBool::new(false),
                redirect_after_success,
            }),
        }
    }

    /// Entry guard: refuse checkout on an empty cart and signal a redirect
    /// back to the cart view.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart` when there is nothing to check out.
    pub fn begin(&self) -> Result<(), CheckoutError> {
        if self.inner.engine.store().read().is_empty() {
            let _ = self.inner.navigation.send(Some(Navigation::CartView));
            return Err(CheckoutError::EmptyCart);
        }
        self.inner.phase.send_replace(CheckoutPhase::Editing);
        Ok(())
    }

    /// Current phase snapshot.
    #[must_use]
    pub fn phase(&self) -> CheckoutPhase {
        self.inner.phase.borrow().clone()
    }

    /// Subscribe to phase transitions.
    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<CheckoutPhase> {
        self.inner.phase.subscribe()
    }

    /// Subscribe to navigation requests.
    #[must_use]
    pub fn subscribe_navigation(&self) -> watch::Receiver<Option<Navigation>> {
        self.inner.navigation.subscribe()
    }

    /// The entered form data (retained across failed submissions).
    #[must_use]
    pub fn form(&self) -> CheckoutForm {
        self.lock_form().clone()
    }

    /// Update the shipping address fields.
    pub fn set_address(&self, address: ShippingAddress) {
        self.lock_form().address = address;
    }

    /// Select a payment method.
    ///
    /// # Errors
    ///
    /// Returns `PaymentMethodUnavailable` for the reserved online option.
    pub fn set_payment_method(&self, method: PaymentMethod) -> Result<(), CheckoutError> {
        if method == PaymentMethod::Online {
            return Err(CheckoutError::PaymentMethodUnavailable);
        }
        self.lock_form().payment_method = method;
        Ok(())
    }

    /// Submit the order.
    ///
    /// Validates locally, assembles the draft, and issues exactly one
    /// create-order call. On success the cart is cleared (server and
    /// local) and a one-time navigation to order history is scheduled
    /// after the configured delay. On failure the form data and cart items
    /// are untouched and the flow returns to an editable state for retry.
    ///
    /// # Errors
    ///
    /// `SubmitInFlight`, `EmptyCart`, `Validation`, `NotAccepted`, or the
    /// underlying `ApiError`.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> Result<Option<OrderId>, CheckoutError> {
        // Disable the submit control for the duration of the call so
        // repeated clicks cannot create duplicate orders.
        if self.inner.submitting.swap(true, Ordering::SeqCst) {
            return Err(CheckoutError::SubmitInFlight);
        }
        let _guard = SubmitGuard(Arc::clone(&self.inner));

        let items = self.inner.engine.store().read().items;
        if items.is_empty() {
            let _ = self.inner.navigation.send(Some(Navigation::CartView));
            return Err(CheckoutError::EmptyCart);
        }

        let form = self.form();
        validate_address(&form.address)?;

        self.inner.phase.send_replace(CheckoutPhase::Submitting);

        let draft = OrderDraft {
            line_items: items
                .iter()
                .map(|item| OrderLineItem {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                    price: item.product.price,
                })
                .collect(),
            total_amount: pricing::price(&items).total,
            payment_method: form.payment_method,
            shipping_address: form.address,
        };

        let response = match self.inner.engine.api().create_order(&draft).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(CheckoutError::Api(err))),
        };
        if !response.success {
            return Err(self.fail(CheckoutError::NotAccepted(
                "The order could not be placed. Please try again.".to_string(),
            )));
        }

        // The order exists on the server now. A failed cart clear must not
        // demote the submission to a failure; the next fetch reconciles.
        if let Err(err) = self.inner.engine.clear_cart().await {
            tracing::warn!(error = %err, "cart clear after successful order failed");
        }

        self.inner.phase.send_replace(CheckoutPhase::Success {
            order_id: response.order_id.clone(),
        });
        self.schedule_redirect();

        Ok(response.order_id)
    }

    /// Record a failure, keep form data, and return to an editable state.
    fn fail(&self, err: CheckoutError) -> CheckoutError {
        let message = match &err {
            CheckoutError::Api(api_err) => api_err.user_message(),
            other => other.to_string(),
        };
        self.inner
            .phase
            .send_replace(CheckoutPhase::Failed { message });
        err
    }

    /// Schedule the one-time post-success navigation to order history.
    fn schedule_redirect(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.redirect_after_success).await;
            // If every observer is gone the send is a harmless no-op.
            let _ = inner.navigation.send(Some(Navigation::OrderHistory));
        });
    }

    fn lock_form(&self) -> std::sync::MutexGuard<'_, CheckoutForm> {
        self.inner.form.lock().expect("checkout form lock poisoned")
    }
}

/// Re-enables the submit control when a submission attempt ends, whether
/// by success, validation failure, or network error.
struct SubmitGuard(Arc<FlowInner>);

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.0.submitting.store(false, Ordering::SeqCst);
    }
}

/// All shipping address fields are required, checked in display order.
fn validate_address(address: &ShippingAddress) -> Result<(), CheckoutError> {
    let fields = [
        ("Street address", address.address_line.trim()),
        ("City", address.city.trim()),
        ("Postal code", address.postal_code.trim()),
        ("Country", address.country.trim()),
    ];
    for (field, value) in fields {
        if value.is_empty() {
            return Err(CheckoutError::Validation { field });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::cart::{CartItem, ProductSnapshot};
    use crate::config::ClientConfig;
    use crate::session::Session;
    use lakshmi_core::{LineId, Money, ProductId};
    use secrecy::SecretString;

    fn flow_with_cart(items: Vec<CartItem>) -> CheckoutFlow {
        let session = Session::new();
        session.sign_in(SecretString::from("tok-test"));
        let config = ClientConfig::new("http://127.0.0.1:9".parse().unwrap());
        let engine = CartEngine::new(ApiClient::new(&config, session));
        engine.store().replace(items);
        CheckoutFlow::new(engine, Duration::from_secs(3))
    }

    fn one_item() -> Vec<CartItem> {
        vec![CartItem {
            line_id: LineId::new("line-p1"),
            product_id: ProductId::new("p1"),
            product: ProductSnapshot {
                name: "Brass Diya".to_string(),
                price: Money::from_major(300),
                stock: 10,
                images: vec![],
            },
            quantity: 1,
        }]
    }

    fn valid_address() -> ShippingAddress {
        ShippingAddress {
            address_line: "14 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            postal_code: "560001".to_string(),
            country: "India".to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_cart_refuses_entry() {
        let flow = flow_with_cart(vec![]);

        let result = flow.begin();
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(
            *flow.subscribe_navigation().borrow(),
            Some(Navigation::CartView)
        );
    }

    #[tokio::test]
    async fn test_missing_city_fails_validation_locally() {
        let flow = flow_with_cart(one_item());
        flow.begin().unwrap();
        flow.set_address(ShippingAddress {
            city: String::new(),
            ..valid_address()
        });

        let err = flow.submit().await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation { field: "City" }));
        // Still editing; no phase transition happened.
        assert_eq!(flow.phase(), CheckoutPhase::Editing);
    }

    #[tokio::test]
    async fn test_whitespace_only_field_is_missing() {
        let err = validate_address(&ShippingAddress {
            postal_code: "   ".to_string(),
            ..valid_address()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Validation {
                field: "Postal code"
            }
        ));
    }

    #[tokio::test]
    async fn test_online_payment_is_reserved() {
        let flow = flow_with_cart(one_item());
        let err = flow.set_payment_method(PaymentMethod::Online).unwrap_err();
        assert!(matches!(err, CheckoutError::PaymentMethodUnavailable));
        // Selection unchanged.
        assert_eq!(flow.form().payment_method, PaymentMethod::CashOnDelivery);
    }

    #[tokio::test]
    async fn test_form_retained_after_failed_submit() {
        let flow = flow_with_cart(one_item());
        flow.begin().unwrap();
        flow.set_address(valid_address());

        // The discard port refuses the connection, so submission fails.
        let err = flow.submit().await.unwrap_err();
        assert!(matches!(err, CheckoutError::Api(_)));
        assert!(matches!(flow.phase(), CheckoutPhase::Failed { .. }));
        assert_eq!(flow.form().address, valid_address());
        // Cart untouched on failure.
        assert_eq!(flow.inner.engine.store().read().total_items(), 1);
        // Submit guard released; a retry is allowed.
        let err = flow.submit().await.unwrap_err();
        assert!(matches!(err, CheckoutError::Api(_)));
    }
}
