use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use super::auth::AuthUser;
use super::types::{MessageResponse, VerifyPaymentRequest};
use super::validation::validate_id;
use super::{ApiError, AppState};

/// POST /payments/verify
/// Recomputes the gateway signature; the paid/processing transition happens
/// if and only if it matches
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let order_id = validate_id(payload.order_id)?;

    if payload.razorpay_order_id.is_empty()
        || payload.razorpay_payment_id.is_empty()
        || payload.razorpay_signature.is_empty()
    {
        return Err(ApiError::validation("Missing gateway ids or signature"));
    }

    state
        .order_service()
        .verify_payment(
            user.id,
            order_id,
            &payload.razorpay_order_id,
            &payload.razorpay_payment_id,
            &payload.razorpay_signature,
        )
        .await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Payment verified".to_string(),
    }))
}
