//! `SeaORM` implementation of the `OrderService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::clients::razorpay::RazorpayClient;
use crate::db::{Store, OrderStatus};
use crate::services::order_service::{
    CheckoutInfo, OrderError, OrderInfo, OrderService,
};

pub struct SeaOrmOrderService {
    store: Store,
    razorpay: Arc<RazorpayClient>,
}

impl SeaOrmOrderService {
    #[must_use]
    pub const fn new(store: Store, razorpay: Arc<RazorpayClient>) -> Self {
        Self { store, razorpay }
    }
}

#[async_trait]
impl OrderService for SeaOrmOrderService {
    async fn checkout(
        &self,
        user_id: i32,
        shipping_address: Option<&str>,
    ) -> Result<CheckoutInfo, OrderError> {
        let cart = self.store.list_cart(user_id).await?;
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let amount: i64 = cart
            .iter()
            .map(|line| line.unit_price * i64::from(line.quantity))
            .sum();

        let lines: Vec<crate::db::OrderLine> = cart
            .into_iter()
            .map(|line| crate::db::OrderLine {
                product_id: line.product_id,
                product_name: line.product_name,
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();

        let order = self
            .store
            .create_order(
                user_id,
                amount,
                self.razorpay.currency(),
                shipping_address,
                &lines,
            )
            .await?;

        let receipt = format!("order_{}", order.id);
        let gateway_order = self
            .razorpay
            .create_order(amount, &receipt)
            .await
            .map_err(|e| {
                // The pending order row stays; checkout can be retried
                warn!(order_id = order.id, error = %e, "Gateway order creation failed");
                OrderError::Gateway(e.to_string())
            })?;

        self.store
            .set_order_gateway_id(order.id, &gateway_order.id)
            .await?;

        info!(
            order_id = order.id,
            gateway_order_id = %gateway_order.id,
            amount,
            "Order created"
        );

        Ok(CheckoutInfo {
            currency: gateway_order.currency.clone(),
            amount: gateway_order.amount,
            gateway_order_id: gateway_order.id,
            key_id: self.razorpay.key_id().to_string(),
            order: OrderInfo::from_order(order),
        })
    }

    async fn verify_payment(
        &self,
        user_id: i32,
        order_id: i32,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), OrderError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        // A foreign order is indistinguishable from a missing one
        if order.user_id != user_id {
            return Err(OrderError::NotFound);
        }

        let stored_gateway_id = order
            .gateway_order_id
            .as_deref()
            .ok_or(OrderError::NotAwaitingPayment)?;

        // The caller's gateway order id must be the one we created, and the
        // signature is recomputed over the stored id, so a response replayed
        // against another order can never match
        if stored_gateway_id != gateway_order_id {
            warn!(order_id, "Gateway order id mismatch");
            return Err(OrderError::SignatureMismatch);
        }

        if !self
            .razorpay
            .verify_signature(stored_gateway_id, payment_id, signature)
        {
            warn!(order_id, "Payment signature mismatch");
            return Err(OrderError::SignatureMismatch);
        }

        let transitioned = self.store.mark_order_paid(order_id, payment_id).await?;
        if transitioned {
            self.store.clear_cart(user_id).await?;
            info!(order_id, payment_id = %payment_id, "Payment verified");
        } else {
            info!(order_id, "Payment already recorded");
        }

        Ok(())
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<OrderInfo>, OrderError> {
        let orders = self.store.list_orders_for_user(user_id).await?;
        Ok(orders.into_iter().map(OrderInfo::from_order).collect())
    }

    async fn get_for_user(&self, order_id: i32, user_id: i32) -> Result<OrderInfo, OrderError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(OrderError::NotFound)?;

        let lines = self.store.get_order_lines(order_id).await?;
        Ok(OrderInfo::with_lines(order, lines))
    }

    async fn list_all(&self) -> Result<Vec<OrderInfo>, OrderError> {
        let orders = self.store.list_all_orders().await?;
        Ok(orders.into_iter().map(OrderInfo::from_order).collect())
    }

    async fn advance_status(
        &self,
        order_id: i32,
        target: OrderStatus,
    ) -> Result<OrderInfo, OrderError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if !order.status.can_advance_to(target) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }

        self.store.update_order_status(order_id, target).await?;
        info!(order_id, from = %order.status, to = %target, "Order status advanced");

        let updated = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        Ok(OrderInfo::from_order(updated))
    }
}
