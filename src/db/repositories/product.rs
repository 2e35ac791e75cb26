use crate::entities::{prelude::*, products};
use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

/// Repository for catalog products
pub struct ProductRepository {
    conn: DatabaseConnection,
}

#[derive(Debug, Clone)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub in_stock: bool,
    pub created_at: String,
}

/// Input for create/update; id and timestamps are repository-managed
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub in_stock: bool,
}

#[derive(Debug, Clone)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

impl ProductRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(p: products::Model) -> Product {
        Product {
            id: p.id,
            name: p.name,
            description: p.description,
            category: p.category,
            price: p.price,
            image_url: p.image_url,
            in_stock: p.in_stock,
            created_at: p.created_at,
        }
    }

    pub async fn list(&self, category: Option<&str>) -> Result<Vec<Product>> {
        let mut query = Products::find().order_by_asc(products::Column::Name);

        if let Some(category) = category {
            query = query.filter(products::Column::Category.eq(category));
        }

        let rows = query.all(&self.conn).await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<Product>> {
        let row = Products::find_by_id(id).one(&self.conn).await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn create(&self, input: &ProductInput) -> Result<Product> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = products::ActiveModel {
            name: Set(input.name.clone()),
            description: Set(input.description.clone()),
            category: Set(input.category.clone()),
            price: Set(input.price),
            image_url: Set(input.image_url.clone()),
            in_stock: Set(input.in_stock),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(Self::map_model(model))
    }

    pub async fn update(&self, id: i32, input: &ProductInput) -> Result<Option<Product>> {
        let Some(model) = Products::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: products::ActiveModel = model.into();
        active.name = Set(input.name.clone());
        active.description = Set(input.description.clone());
        active.category = Set(input.category.clone());
        active.price = Set(input.price);
        active.image_url = Set(input.image_url.clone());
        active.in_stock = Set(input.in_stock);
        active.updated_at = Set(now);
        let model = active.update(&self.conn).await?;

        Ok(Some(Self::map_model(model)))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Products::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    /// Category names with the number of products in each.
    pub async fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let rows: Vec<(String, i64)> = Products::find()
            .select_only()
            .column(products::Column::Category)
            .column_as(products::Column::Id.count(), "count")
            .group_by(products::Column::Category)
            .order_by_asc(products::Column::Category)
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect())
    }
}
