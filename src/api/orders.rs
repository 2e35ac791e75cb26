use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::{AuthUser, require_admin};
use super::types::{
    CheckoutRequest, CheckoutResponse, OrderResponse, OrdersResponse, UpdateOrderStatusRequest,
};
use super::validation::validate_id;
use super::{ApiError, AppState};
use crate::db::OrderStatus;

/// POST /orders
/// Materialize the caller's cart into a pending order + gateway order
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let checkout = state
        .order_service()
        .checkout(user.id, payload.shipping_address.as_deref())
        .await?;

    Ok(Json(CheckoutResponse {
        success: true,
        checkout,
    }))
}

/// GET /orders
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<OrdersResponse>, ApiError> {
    let orders = state.order_service().list_for_user(user.id).await?;

    Ok(Json(OrdersResponse {
        success: true,
        orders,
    }))
}

/// GET /orders/{id}
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = validate_id(id)?;

    let order = state.order_service().get_for_user(id, user.id).await?;

    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}

/// GET /admin/orders
pub async fn list_all_orders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<OrdersResponse>, ApiError> {
    require_admin(&user)?;

    let orders = state.order_service().list_all().await?;

    Ok(Json(OrdersResponse {
        success: true,
        orders,
    }))
}

/// PUT /admin/orders/{id}/status
/// Fulfilment only moves forward along the fixed sequence
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    require_admin(&user)?;
    let id = validate_id(id)?;

    let target = OrderStatus::parse(&payload.status)
        .ok_or_else(|| ApiError::validation(format!("Unknown status: {}", payload.status)))?;

    let order = state.order_service().advance_status(id, target).await?;

    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}
