use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{AuthUser, require_admin};
use super::types::{
    CategoryDto, ProductDto, ProductRequest, ProductResponse, ProductsResponse, SuccessResponse,
};
use super::validation::{validate_id, validate_price};
use super::{ApiError, AppState};
use crate::db::ProductInput;

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
}

/// GET /categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryDto>>, ApiError> {
    let counts = state.store().category_counts().await?;
    Ok(Json(counts.into_iter().map(CategoryDto::from).collect()))
}

/// GET /products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let products = state
        .store()
        .list_products(query.category.as_deref())
        .await?;

    Ok(Json(ProductsResponse {
        products: products.into_iter().map(ProductDto::from).collect(),
    }))
}

/// GET /products/{id}
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ProductDto>, ApiError> {
    let id = validate_id(id)?;

    let product = state
        .store()
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;

    Ok(Json(ProductDto::from(product)))
}

fn to_input(payload: ProductRequest) -> Result<ProductInput, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Product name is required"));
    }
    if payload.category.trim().is_empty() {
        return Err(ApiError::validation("Category is required"));
    }
    validate_price(payload.price)?;

    Ok(ProductInput {
        name: payload.name.trim().to_string(),
        description: payload.description,
        category: payload.category.trim().to_string(),
        price: payload.price,
        image_url: payload.image,
        in_stock: payload.in_stock,
    })
}

/// POST /admin/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    require_admin(&user)?;

    let input = to_input(payload)?;
    let product = state.store().create_product(&input).await?;

    Ok(Json(ProductResponse {
        success: true,
        product: ProductDto::from(product),
    }))
}

/// PUT /admin/products/{id}
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<ProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    require_admin(&user)?;
    let id = validate_id(id)?;

    let input = to_input(payload)?;
    let product = state
        .store()
        .update_product(id, &input)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))?;

    Ok(Json(ProductResponse {
        success: true,
        product: ProductDto::from(product),
    }))
}

/// DELETE /admin/products/{id}
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require_admin(&user)?;
    let id = validate_id(id)?;

    if !state.store().delete_product(id).await? {
        return Err(ApiError::not_found("Product", id));
    }

    Ok(Json(SuccessResponse { success: true }))
}
