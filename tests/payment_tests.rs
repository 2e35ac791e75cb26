//! Integration tests for the order/payment lifecycle.
//!
//! Gateway order creation needs the network, so orders under test are seeded
//! through the store; verification itself is pure HMAC and runs offline.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use duka::config::Config;
use duka::db::{OrderLine, PaymentStatus, OrderStatus, ProductInput};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use sha2::Sha256;
use std::sync::Arc;
use tower::ServiceExt;

const KEY_SECRET: &str = "test-secret";

async fn spawn_app() -> (Arc<duka::api::AppState>, Router) {
    let db_path = std::env::temp_dir().join(format!("duka-pay-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.auth.admin_emails = vec!["boss@duka.test".to_string()];
    config.razorpay.key_secret = KEY_SECRET.to_string();
    config.server.secure_cookies = false;

    let state = duka::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");

    let router = duka::api::router(state.clone());
    (state, router)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn bearer_for(app: &Router, state: &Arc<duka::api::AppState>, email: &str) -> String {
    app.clone()
        .oneshot(request(
            "POST",
            "/api/auth/send-otp",
            None,
            Some(serde_json::json!({"email": email})),
        ))
        .await
        .unwrap();

    let otp = state
        .store()
        .get_credential_state(email)
        .await
        .unwrap()
        .unwrap()
        .otp_code
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/verify-otp",
            None,
            Some(serde_json::json!({"email": email, "otp": otp})),
        ))
        .await
        .unwrap();

    json_body(response).await["token"].as_str().unwrap().to_string()
}

async fn user_id(state: &Arc<duka::api::AppState>, email: &str) -> i32 {
    state
        .store()
        .get_user_by_email(email)
        .await
        .unwrap()
        .unwrap()
        .id
}

/// Seed a pending order with a known gateway order id, skipping the network.
async fn seed_pending_order(state: &Arc<duka::api::AppState>, owner: i32, gateway_id: &str) -> i32 {
    let product = state
        .store()
        .create_product(&ProductInput {
            name: "Teapot".to_string(),
            description: None,
            category: "kitchen".to_string(),
            price: 1999,
            image_url: None,
            in_stock: true,
        })
        .await
        .expect("seed product");

    let lines = [OrderLine {
        product_id: product.id,
        product_name: "Teapot".to_string(),
        unit_price: 1999,
        quantity: 2,
    }];

    let order = state
        .store()
        .create_order(owner, 3998, "INR", None, &lines)
        .await
        .expect("seed order");
    state
        .store()
        .set_order_gateway_id(order.id, gateway_id)
        .await
        .expect("set gateway id");
    order.id
}

fn sign(gateway_order_id: &str, payment_id: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(KEY_SECRET.as_bytes()).unwrap();
    mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[tokio::test]
async fn test_verify_payment_accepts_genuine_signature() {
    let (state, app) = spawn_app().await;
    let token = bearer_for(&app, &state, "ann@duka.test").await;
    let ann = user_id(&state, "ann@duka.test").await;
    let order_id = seed_pending_order(&state, ann, "order_gw_1").await;

    // A leftover cart clears once payment lands
    let product = state
        .store()
        .create_product(&ProductInput {
            name: "Teapot".to_string(),
            description: None,
            category: "kitchen".to_string(),
            price: 1999,
            image_url: None,
            in_stock: true,
        })
        .await
        .unwrap();
    state.store().upsert_cart_item(ann, product.id, 2).await.unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/payments/verify",
            Some(&token),
            Some(serde_json::json!({
                "orderId": order_id,
                "razorpay_order_id": "order_gw_1",
                "razorpay_payment_id": "pay_1",
                "razorpay_signature": sign("order_gw_1", "pay_1"),
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);

    let order = state.store().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.gateway_payment_id.as_deref(), Some("pay_1"));
    assert!(state.store().list_cart(ann).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_verify_payment_rejects_forged_signature() {
    let (state, app) = spawn_app().await;
    let token = bearer_for(&app, &state, "ann@duka.test").await;
    let ann = user_id(&state, "ann@duka.test").await;
    let order_id = seed_pending_order(&state, ann, "order_gw_2").await;

    let before = state.store().get_order(order_id).await.unwrap().unwrap();

    let mut forged = sign("order_gw_2", "pay_2");
    // Flip the last hex digit
    let last = forged.pop().unwrap();
    forged.push(if last == '0' { '1' } else { '0' });

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/payments/verify",
            Some(&token),
            Some(serde_json::json!({
                "orderId": order_id,
                "razorpay_order_id": "order_gw_2",
                "razorpay_payment_id": "pay_2",
                "razorpay_signature": forged,
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // No mutation on rejection
    let after = state.store().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(after.payment_status, before.payment_status);
    assert_eq!(after.status, before.status);
    assert!(after.gateway_payment_id.is_none());
}

#[tokio::test]
async fn test_verify_payment_rejects_signature_for_other_order() {
    let (state, app) = spawn_app().await;
    let token = bearer_for(&app, &state, "ann@duka.test").await;
    let ann = user_id(&state, "ann@duka.test").await;
    let order_id = seed_pending_order(&state, ann, "order_gw_3").await;

    // Valid signature, but over a different gateway order
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/payments/verify",
            Some(&token),
            Some(serde_json::json!({
                "orderId": order_id,
                "razorpay_order_id": "order_gw_other",
                "razorpay_payment_id": "pay_3",
                "razorpay_signature": sign("order_gw_other", "pay_3"),
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let order = state.store().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_verify_payment_is_authenticated_and_owner_scoped() {
    let (state, app) = spawn_app().await;
    let _ann_token = bearer_for(&app, &state, "ann@duka.test").await;
    let bob_token = bearer_for(&app, &state, "bob@duka.test").await;
    let ann = user_id(&state, "ann@duka.test").await;
    let order_id = seed_pending_order(&state, ann, "order_gw_4").await;

    let payload = serde_json::json!({
        "orderId": order_id,
        "razorpay_order_id": "order_gw_4",
        "razorpay_payment_id": "pay_4",
        "razorpay_signature": sign("order_gw_4", "pay_4"),
    });

    // No token: rejected before verification is attempted
    let response = app
        .clone()
        .oneshot(request("POST", "/api/payments/verify", None, Some(payload.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A foreign order reads as missing
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/payments/verify",
            Some(&bob_token),
            Some(payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let order = state.store().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_checkout_with_empty_cart_is_rejected() {
    let (state, app) = spawn_app().await;
    let token = bearer_for(&app, &state, "ann@duka.test").await;

    let response = app
        .oneshot(request(
            "POST",
            "/api/orders",
            Some(&token),
            Some(serde_json::json!({})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_orders_listing_is_owner_scoped() {
    let (state, app) = spawn_app().await;
    let ann_token = bearer_for(&app, &state, "ann@duka.test").await;
    let bob_token = bearer_for(&app, &state, "bob@duka.test").await;
    let ann = user_id(&state, "ann@duka.test").await;
    let order_id = seed_pending_order(&state, ann, "order_gw_5").await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/orders", Some(&ann_token), None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/orders", Some(&bob_token), None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert!(body["orders"].as_array().unwrap().is_empty());

    // Detail view includes line items for the owner only
    let response = app
        .clone()
        .oneshot(request("GET", &format!("/api/orders/{order_id}"), Some(&ann_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["order"]["items"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/api/orders/{order_id}"), Some(&bob_token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_advances_status_forward_only() {
    let (state, app) = spawn_app().await;
    let admin_token = bearer_for(&app, &state, "boss@duka.test").await;
    let user_token = bearer_for(&app, &state, "ann@duka.test").await;
    let ann = user_id(&state, "ann@duka.test").await;
    let order_id = seed_pending_order(&state, ann, "order_gw_6").await;

    // Not an admin action for regular users
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/admin/orders/{order_id}/status"),
            Some(&user_token),
            Some(serde_json::json!({"status": "confirmed"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // pending -> confirmed
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/admin/orders/{order_id}/status"),
            Some(&admin_token),
            Some(serde_json::json!({"status": "confirmed"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["order"]["status"], "confirmed");

    // confirmed -> shipped skips processing but still moves forward
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/admin/orders/{order_id}/status"),
            Some(&admin_token),
            Some(serde_json::json!({"status": "shipped"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Backward is refused
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/admin/orders/{order_id}/status"),
            Some(&admin_token),
            Some(serde_json::json!({"status": "pending"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown status string
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/admin/orders/{order_id}/status"),
            Some(&admin_token),
            Some(serde_json::json!({"status": "cancelled"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let order = state.store().get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);
}
