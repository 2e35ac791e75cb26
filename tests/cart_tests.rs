//! Integration tests for cart mutation and catalog endpoints.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use duka::config::Config;
use duka::db::ProductInput;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app() -> (Arc<duka::api::AppState>, Router) {
    let db_path = std::env::temp_dir().join(format!("duka-cart-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.auth.admin_emails = vec!["boss@duka.test".to_string()];
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

/// Complete the OTP flow for an address and return its bearer token.
async fn bearer_for(app: &Router, state: &Arc<duka::api::AppState>, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/auth/send-otp",
            None,
            Some(serde_json::json!({"email": email})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

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
    assert_eq!(response.status(), StatusCode::OK);

    json_body(response).await["token"].as_str().unwrap().to_string()
}

async fn seed_product(state: &Arc<duka::api::AppState>, name: &str, category: &str, price: i64) -> i32 {
    state
        .store()
        .create_product(&ProductInput {
            name: name.to_string(),
            description: None,
            category: category.to_string(),
            price,
            image_url: None,
            in_stock: true,
        })
        .await
        .expect("seed product")
        .id
}

#[tokio::test]
async fn test_cart_mutation_requires_auth_and_leaves_rows_unchanged() {
    let (state, app) = spawn_app().await;
    let token = bearer_for(&app, &state, "ann@duka.test").await;
    let product_id = seed_product(&state, "Teapot", "kitchen", 1999).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/cart",
            Some(&token),
            Some(serde_json::json!({"productId": product_id, "quantity": 2})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let user = state.store().get_user_by_email("ann@duka.test").await.unwrap().unwrap();
    let before = state.store().list_cart(user.id).await.unwrap();
    let item_id = before[0].id;

    // Missing token
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/cart/{item_id}"),
            None,
            Some(serde_json::json!({"quantity": 9})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Garbage token
    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/cart/{item_id}"),
            Some("not.a.token"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // State before == state after
    let after = state.store().list_cart(user.id).await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].quantity, before[0].quantity);
}

#[tokio::test]
async fn test_cart_add_is_an_upsert() {
    let (state, app) = spawn_app().await;
    let token = bearer_for(&app, &state, "ann@duka.test").await;
    let product_id = seed_product(&state, "Teapot", "kitchen", 1999).await;

    for quantity in [2, 5] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/cart",
                Some(&token),
                Some(serde_json::json!({"productId": product_id, "quantity": quantity})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(request("GET", "/api/cart", Some(&token), None))
        .await
        .unwrap();
    let body = json_body(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 5);
    assert_eq!(body["total"], 5 * 1999);
}

#[tokio::test]
async fn test_cart_quantity_zero_or_below_deletes_the_row() {
    let (state, app) = spawn_app().await;
    let token = bearer_for(&app, &state, "ann@duka.test").await;
    let product_id = seed_product(&state, "Teapot", "kitchen", 1999).await;

    app.clone()
        .oneshot(request(
            "POST",
            "/api/cart",
            Some(&token),
            Some(serde_json::json!({"productId": product_id, "quantity": 1})),
        ))
        .await
        .unwrap();

    let user = state.store().get_user_by_email("ann@duka.test").await.unwrap().unwrap();
    let item_id = state.store().list_cart(user.id).await.unwrap()[0].id;

    // Positive quantity is stored exactly
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/cart/{item_id}"),
            Some(&token),
            Some(serde_json::json!({"quantity": 3})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.store().list_cart(user.id).await.unwrap()[0].quantity, 3);

    // Zero deletes
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/cart/{item_id}"),
            Some(&token),
            Some(serde_json::json!({"quantity": 0})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.store().list_cart(user.id).await.unwrap().is_empty());

    // Negative on an absent row is still a success, still absent
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/cart/{item_id}"),
            Some(&token),
            Some(serde_json::json!({"quantity": -2})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.store().list_cart(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_update_on_missing_row_is_404_delete_is_idempotent() {
    let (state, app) = spawn_app().await;
    let token = bearer_for(&app, &state, "ann@duka.test").await;

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/api/cart/4242",
            Some(&token),
            Some(serde_json::json!({"quantity": 2})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(request("DELETE", "/api/cart/4242", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_cart_rows_are_scoped_per_user() {
    let (state, app) = spawn_app().await;
    let ann = bearer_for(&app, &state, "ann@duka.test").await;
    let bob = bearer_for(&app, &state, "bob@duka.test").await;
    let product_id = seed_product(&state, "Teapot", "kitchen", 1999).await;

    app.clone()
        .oneshot(request(
            "POST",
            "/api/cart",
            Some(&ann),
            Some(serde_json::json!({"productId": product_id, "quantity": 2})),
        ))
        .await
        .unwrap();

    let ann_user = state.store().get_user_by_email("ann@duka.test").await.unwrap().unwrap();
    let item_id = state.store().list_cart(ann_user.id).await.unwrap()[0].id;

    // Bob cannot touch Ann's row
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/cart/{item_id}"),
            Some(&bob),
            Some(serde_json::json!({"quantity": 7})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(state.store().list_cart(ann_user.id).await.unwrap()[0].quantity, 2);
}

#[tokio::test]
async fn test_categories_aggregate_product_counts() {
    let (state, app) = spawn_app().await;
    seed_product(&state, "Teapot", "kitchen", 1999).await;
    seed_product(&state, "Kettle", "kitchen", 3499).await;
    seed_product(&state, "Lamp", "lighting", 2599).await;

    let response = app
        .oneshot(request("GET", "/api/categories", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let categories = body.as_array().unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0]["category"], "kitchen");
    assert_eq!(categories[0]["_count"], 2);
    assert_eq!(categories[1]["category"], "lighting");
    assert_eq!(categories[1]["_count"], 1);
}

#[tokio::test]
async fn test_admin_product_crud_and_role_gating() {
    let (state, app) = spawn_app().await;
    let admin = bearer_for(&app, &state, "boss@duka.test").await;
    let user = bearer_for(&app, &state, "ann@duka.test").await;

    let product = serde_json::json!({
        "name": "Teapot",
        "category": "kitchen",
        "price": 1999
    });

    // Role mismatch is 403, not 401
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/admin/products",
            Some(&user),
            Some(product.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/admin/products",
            Some(&admin),
            Some(product),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = json_body(response).await;
    let id = created["product"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/admin/products/{id}"),
            Some(&admin),
            Some(serde_json::json!({
                "name": "Teapot XL",
                "category": "kitchen",
                "price": 2999
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/api/products/{id}"), None, None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["name"], "Teapot XL");
    assert_eq!(body["price"], 2999);

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/admin/products/{id}"),
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/api/products/{id}"), None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
