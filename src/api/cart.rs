use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;
use tracing::debug;

use super::auth::AuthUser;
use super::types::{CartAddRequest, CartLineDto, CartResponse, CartUpdateRequest, SuccessResponse};
use super::validation::{validate_id, validate_quantity};
use super::{ApiError, AppState};

/// GET /cart
pub async fn list_cart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CartResponse>, ApiError> {
    let lines = state.store().list_cart(user.id).await?;

    let total = lines
        .iter()
        .map(|l| l.unit_price * i64::from(l.quantity))
        .sum();

    Ok(Json(CartResponse {
        items: lines.into_iter().map(CartLineDto::from).collect(),
        total,
    }))
}

/// POST /cart
/// Put a product in the cart (or replace its quantity)
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CartAddRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let product_id = validate_id(payload.product_id)?;
    let quantity = validate_quantity(payload.quantity)?;

    if quantity <= 0 {
        return Err(ApiError::validation("Quantity must be positive"));
    }

    state
        .store()
        .get_product(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))?;

    state
        .store()
        .upsert_cart_item(user.id, product_id, quantity)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

/// PUT /cart/{id}
/// A quantity of zero or below deletes the row instead of storing it
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<CartUpdateRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let id = validate_id(id)?;
    let quantity = validate_quantity(payload.quantity)?;

    if quantity <= 0 {
        let removed = state.store().delete_cart_item(id, user.id).await?;
        if !removed {
            debug!(cart_item = id, "Quantity update removed an already absent row");
        }
        return Ok(Json(SuccessResponse { success: true }));
    }

    let updated = state.store().set_cart_quantity(id, user.id, quantity).await?;
    if !updated {
        return Err(ApiError::not_found("Cart item", id));
    }

    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /cart/{id}
/// Idempotent: deleting an absent row still succeeds
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let id = validate_id(id)?;

    let removed = state.store().delete_cart_item(id, user.id).await?;
    if !removed {
        debug!(cart_item = id, "Delete on absent cart row");
    }

    Ok(Json(SuccessResponse { success: true }))
}
