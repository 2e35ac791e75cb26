use crate::entities::{order_items, orders, prelude::*};
use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fulfilment states in delivery order. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "out_for_delivery" => Some(Self::OutForDelivery),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
            Self::Processing => 2,
            Self::Shipped => 3,
            Self::OutForDelivery => 4,
            Self::Delivered => 5,
        }
    }

    /// Strictly-forward check along the fixed sequence.
    #[must_use]
    pub const fn can_advance_to(self, target: Self) -> bool {
        target.rank() > self.rank()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub amount: i64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub shipping_address: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct OrderLine {
    pub product_id: i32,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i32,
}

/// Repository for orders and their line items
pub struct OrderRepository {
    conn: DatabaseConnection,
}

impl OrderRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(o: orders::Model) -> Order {
        Order {
            id: o.id,
            user_id: o.user_id,
            amount: o.amount,
            currency: o.currency,
            payment_status: PaymentStatus::parse(&o.payment_status)
                .unwrap_or(PaymentStatus::Pending),
            status: OrderStatus::parse(&o.status).unwrap_or(OrderStatus::Pending),
            gateway_order_id: o.gateway_order_id,
            gateway_payment_id: o.gateway_payment_id,
            shipping_address: o.shipping_address,
            created_at: o.created_at,
        }
    }

    fn map_line(i: order_items::Model) -> OrderLine {
        OrderLine {
            product_id: i.product_id,
            product_name: i.product_name,
            unit_price: i.unit_price,
            quantity: i.quantity,
        }
    }

    /// Insert a pending order with its line-item snapshots.
    pub async fn create(
        &self,
        user_id: i32,
        amount: i64,
        currency: &str,
        shipping_address: Option<&str>,
        lines: &[OrderLine],
    ) -> Result<Order> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = orders::ActiveModel {
            user_id: Set(user_id),
            amount: Set(amount),
            currency: Set(currency.to_string()),
            payment_status: Set(PaymentStatus::Pending.as_str().to_string()),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            shipping_address: Set(shipping_address.map(ToString::to_string)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let order = active.insert(&self.conn).await?;

        for line in lines {
            let item = order_items::ActiveModel {
                order_id: Set(order.id),
                product_id: Set(line.product_id),
                product_name: Set(line.product_name.clone()),
                unit_price: Set(line.unit_price),
                quantity: Set(line.quantity),
                ..Default::default()
            };
            item.insert(&self.conn).await?;
        }

        Ok(Self::map_model(order))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Order>> {
        let row = Orders::find_by_id(id).one(&self.conn).await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn get_lines(&self, order_id: i32) -> Result<Vec<OrderLine>> {
        let rows = OrderItems::find()
            .filter(order_items::Column::OrderId.eq(order_id))
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_line).collect())
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<Order>> {
        let rows = Orders::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_desc(orders::Column::CreatedAt)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<Order>> {
        let rows = Orders::find()
            .order_by_desc(orders::Column::CreatedAt)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn set_gateway_order(&self, id: i32, gateway_order_id: &str) -> Result<()> {
        let result = Orders::update_many()
            .col_expr(
                orders::Column::GatewayOrderId,
                sea_orm::sea_query::Expr::value(gateway_order_id),
            )
            .col_expr(
                orders::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(orders::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        anyhow::ensure!(result.rows_affected > 0, "Order {id} not found");
        Ok(())
    }

    /// Record the verified payment: pending -> paid, fulfilment moves to
    /// processing. The caller must have verified the gateway signature.
    pub async fn mark_paid(&self, id: i32, gateway_payment_id: &str) -> Result<bool> {
        let result = Orders::update_many()
            .col_expr(
                orders::Column::PaymentStatus,
                sea_orm::sea_query::Expr::value(PaymentStatus::Paid.as_str()),
            )
            .col_expr(
                orders::Column::Status,
                sea_orm::sea_query::Expr::value(OrderStatus::Processing.as_str()),
            )
            .col_expr(
                orders::Column::GatewayPaymentId,
                sea_orm::sea_query::Expr::value(gateway_payment_id),
            )
            .col_expr(
                orders::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(orders::Column::Id.eq(id))
            .filter(orders::Column::PaymentStatus.eq(PaymentStatus::Pending.as_str()))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn update_status(&self, id: i32, status: OrderStatus) -> Result<bool> {
        let result = Orders::update_many()
            .col_expr(
                orders::Column::Status,
                sea_orm::sea_query::Expr::value(status.as_str()),
            )
            .col_expr(
                orders::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(orders::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            assert_eq!(OrderStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(OrderStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_status_only_advances_forward() {
        assert!(OrderStatus::Pending.can_advance_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Pending.can_advance_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_advance_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Processing.can_advance_to(OrderStatus::Pending));
        assert!(!OrderStatus::Shipped.can_advance_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivered.can_advance_to(OrderStatus::Confirmed));
    }

    #[test]
    fn test_payment_status_parse() {
        assert_eq!(PaymentStatus::parse("paid"), Some(PaymentStatus::Paid));
        assert_eq!(
            PaymentStatus::parse("pending"),
            Some(PaymentStatus::Pending)
        );
        assert_eq!(PaymentStatus::parse("refunded"), None);
    }
}
