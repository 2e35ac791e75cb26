//! Domain service for the order/payment lifecycle: cart materialization,
//! gateway order creation, signature verification and status transitions.

use serde::Serialize;
use thiserror::Error;

use crate::db::{Order, OrderLine, OrderStatus, PaymentStatus};

/// Errors specific to order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Order not found")]
    NotFound,

    #[error("Order is not awaiting payment")]
    NotAwaitingPayment,

    #[error("Signature verification failed")]
    SignatureMismatch,

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for OrderError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for OrderError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Order DTO for responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInfo {
    pub id: i32,
    pub amount: i64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderLineInfo>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInfo {
    pub product_id: i32,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i32,
}

impl OrderInfo {
    #[must_use]
    pub fn from_order(order: Order) -> Self {
        Self {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
            payment_status: order.payment_status,
            status: order.status,
            created_at: order.created_at,
            items: None,
        }
    }

    #[must_use]
    pub fn with_lines(order: Order, lines: Vec<OrderLine>) -> Self {
        let mut info = Self::from_order(order);
        info.items = Some(
            lines
                .into_iter()
                .map(|l| OrderLineInfo {
                    product_id: l.product_id,
                    product_name: l.product_name,
                    unit_price: l.unit_price,
                    quantity: l.quantity,
                })
                .collect(),
        );
        info
    }
}

/// Everything the checkout widget needs to collect the payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInfo {
    pub order: OrderInfo,
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

/// Domain service trait for the order lifecycle.
#[async_trait::async_trait]
pub trait OrderService: Send + Sync {
    /// Materializes the user's cart into a pending order and creates the
    /// matching gateway order. The cart is kept until payment succeeds.
    async fn checkout(
        &self,
        user_id: i32,
        shipping_address: Option<&str>,
    ) -> Result<CheckoutInfo, OrderError>;

    /// Verifies the gateway signature for the order and, only on success,
    /// moves payment `pending -> paid` and status `pending -> processing`.
    async fn verify_payment(
        &self,
        user_id: i32,
        order_id: i32,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), OrderError>;

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<OrderInfo>, OrderError>;

    async fn get_for_user(&self, order_id: i32, user_id: i32) -> Result<OrderInfo, OrderError>;

    async fn list_all(&self) -> Result<Vec<OrderInfo>, OrderError>;

    /// Admin action: advance the fulfilment status strictly forward along the
    /// fixed sequence.
    async fn advance_status(
        &self,
        order_id: i32,
        target: OrderStatus,
    ) -> Result<OrderInfo, OrderError>;
}
