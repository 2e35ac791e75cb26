use crate::entities::{cart_items, prelude::*, products};
use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

/// Repository for per-user cart rows
pub struct CartRepository {
    conn: DatabaseConnection,
}

/// A cart row joined with its product snapshot for display
#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub unit_price: i64,
    pub image_url: Option<String>,
    pub quantity: i32,
}

impl CartRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<CartLine>> {
        let rows = CartItems::find()
            .filter(cart_items::Column::UserId.eq(user_id))
            .find_also_related(Products)
            .order_by_asc(cart_items::Column::CreatedAt)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| product.map(|p| Self::map_line(item, &p)))
            .collect())
    }

    pub async fn get_for_user(&self, id: i32, user_id: i32) -> Result<Option<CartLine>> {
        let row = CartItems::find_by_id(id)
            .filter(cart_items::Column::UserId.eq(user_id))
            .find_also_related(Products)
            .one(&self.conn)
            .await?;

        Ok(row.and_then(|(item, product)| product.map(|p| Self::map_line(item, &p))))
    }

    /// Insert or bump the row for (user, product). Quantity must be positive;
    /// non-positive quantities are handled by the caller as deletion.
    pub async fn upsert(&self, user_id: i32, product_id: i32, quantity: i32) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = cart_items::ActiveModel {
            user_id: Set(user_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        CartItems::insert(active)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    cart_items::Column::UserId,
                    cart_items::Column::ProductId,
                ])
                .update_columns([
                    cart_items::Column::Quantity,
                    cart_items::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    /// Set the quantity on an existing row owned by the user.
    /// Returns false when no such row exists.
    pub async fn set_quantity(&self, id: i32, user_id: i32, quantity: i32) -> Result<bool> {
        let result = CartItems::update_many()
            .col_expr(
                cart_items::Column::Quantity,
                sea_orm::sea_query::Expr::value(quantity),
            )
            .col_expr(
                cart_items::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(cart_items::Column::Id.eq(id))
            .filter(cart_items::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Delete one row owned by the user. Returns false when it was absent.
    pub async fn delete(&self, id: i32, user_id: i32) -> Result<bool> {
        let result = CartItems::delete_many()
            .filter(cart_items::Column::Id.eq(id))
            .filter(cart_items::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Drop every row for the user (after successful payment).
    pub async fn clear_for_user(&self, user_id: i32) -> Result<u64> {
        let result = CartItems::delete_many()
            .filter(cart_items::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }

    fn map_line(item: cart_items::Model, product: &products::Model) -> CartLine {
        CartLine {
            id: item.id,
            product_id: item.product_id,
            product_name: product.name.clone(),
            unit_price: product.price,
            image_url: product.image_url.clone(),
            quantity: item.quantity,
        }
    }
}
