//! Checkout flow tests against a mock order service.
//!
//! Covers local validation short-circuits, the success path (order
//! created, cart cleared, navigation scheduled), failure handling with
//! retained form data, and the duplicate-submit guard.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lakshmi_client::api::ApiClient;
use lakshmi_client::cart::{CartEngine, CartItem, ProductSnapshot};
use lakshmi_client::checkout::{
    CheckoutError, CheckoutFlow, CheckoutPhase, Navigation, ShippingAddress,
};
use lakshmi_client::config::ClientConfig;
use lakshmi_client::session::Session;
use lakshmi_core::{LineId, Money, OrderId, ProductId};

fn flow_for(server: &MockServer, items: Vec<CartItem>) -> CheckoutFlow {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let session = Session::new();
    session.sign_in(SecretString::from("tok-123"));
    let config = ClientConfig::new(server.uri().parse().unwrap());
    let engine = CartEngine::new(ApiClient::new(&config, session));
    engine.store().replace(items);
    CheckoutFlow::new(engine, Duration::from_millis(50))
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
async fn validation_failure_issues_no_network_call() {
    let server = MockServer::start().await;

    let flow = flow_for(&server, one_item());
    flow.begin().unwrap();
    flow.set_address(ShippingAddress {
        city: String::new(),
        ..valid_address()
    });

    let err = flow.submit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::Validation { field: "City" }));
    assert_eq!(flow.phase(), CheckoutPhase::Editing);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn successful_submit_creates_order_clears_cart_and_navigates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(body_partial_json(json!({
            "paymentMethod": "cod",
            "shippingAddress": {
                "address": "14 MG Road",
                "city": "Bengaluru",
                "postalCode": "560001",
                "country": "India"
            }
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "success": true, "orderId": "ord-1" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/cart/clear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let flow = flow_for(&server, one_item());
    flow.begin().unwrap();
    flow.set_address(valid_address());
    let mut navigation = flow.subscribe_navigation();

    let order_id = flow.submit().await.unwrap();
    assert_eq!(order_id, Some(OrderId::new("ord-1")));
    assert_eq!(
        flow.phase(),
        CheckoutPhase::Success {
            order_id: Some(OrderId::new("ord-1"))
        }
    );

    // The order draft carried the priced total: 300 + 50 shipping + 18% tax.
    let requests = server.received_requests().await.unwrap();
    let create = requests
        .iter()
        .find(|request| request.url.path() == "/api/orders")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&create.body).unwrap();
    assert_eq!(body["totalAmount"], "404.00");

    // Navigation to order history arrives after the configured delay.
    tokio::time::timeout(Duration::from_secs(1), navigation.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*navigation.borrow(), Some(Navigation::OrderHistory));
}

#[tokio::test]
async fn server_fault_fails_submission_and_keeps_cart_and_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "message": "Order service unavailable" })),
        )
        .mount(&server)
        .await;

    let flow = flow_for(&server, one_item());
    flow.begin().unwrap();
    flow.set_address(valid_address());

    let err = flow.submit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::Api(_)));
    assert_eq!(
        flow.phase(),
        CheckoutPhase::Failed {
            message: "Order service unavailable".to_string()
        }
    );
    // Cart and form untouched; the shopper can retry.
    assert_eq!(flow.form().address, valid_address());
}

#[tokio::test]
async fn unaccepted_order_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    let flow = flow_for(&server, one_item());
    flow.set_address(valid_address());

    let err = flow.submit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::NotAccepted(_)));
    assert!(matches!(flow.phase(), CheckoutPhase::Failed { .. }));
}

#[tokio::test]
async fn concurrent_submits_issue_one_create_order_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "success": true, "orderId": "ord-1" }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/cart/clear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let flow = flow_for(&server, one_item());
    flow.set_address(valid_address());

    let first = {
        let flow = flow.clone();
        tokio::spawn(async move { flow.submit().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The second click lands while the first call is in flight.
    let err = flow.submit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::SubmitInFlight));

    let order_id = first.await.unwrap().unwrap();
    assert_eq!(order_id, Some(OrderId::new("ord-1")));
}

#[tokio::test]
async fn failed_cart_clear_does_not_demote_a_placed_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "success": true, "orderId": "ord-2" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/cart/clear"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let flow = flow_for(&server, one_item());
    flow.set_address(valid_address());

    // The clear failed, but the order exists on the server.
    let order_id = flow.submit().await.unwrap();
    assert_eq!(order_id, Some(OrderId::new("ord-2")));
    assert!(matches!(flow.phase(), CheckoutPhase::Success { .. }));
}
