use super::ApiError;
use crate::constants::limits;

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    if trimmed.len() > 254 {
        return Err(ApiError::validation("Email is too long"));
    }

    let Some((local, domain)) = trimmed.split_once('@') else {
        return Err(ApiError::validation("Invalid email address"));
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ApiError::validation("Invalid email address"));
    }

    Ok(trimmed)
}

pub fn validate_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid id: {}. Id must be a positive integer",
            id
        )));
    }
    Ok(id)
}

/// Upper bound only: non-positive quantities are valid input meaning "remove".
pub fn validate_quantity(quantity: i32) -> Result<i32, ApiError> {
    if quantity > limits::MAX_CART_QUANTITY {
        return Err(ApiError::validation(format!(
            "Quantity must be at most {}",
            limits::MAX_CART_QUANTITY
        )));
    }
    Ok(quantity)
}

pub fn validate_price(price: i64) -> Result<i64, ApiError> {
    if price <= 0 {
        return Err(ApiError::validation("Price must be positive"));
    }
    Ok(price)
}

pub fn validate_otp(otp: &str) -> Result<&str, ApiError> {
    let trimmed = otp.trim();
    if trimmed.len() != 6 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation("Invalid code format"));
    }
    Ok(trimmed)
}
