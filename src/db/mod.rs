use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;

pub mod migrator;
pub mod repositories;

pub use repositories::cart::CartLine;
pub use repositories::order::{Order, OrderLine, OrderStatus, PaymentStatus};
pub use repositories::product::{CategoryCount, Product, ProductInput};
pub use repositories::user::{CredentialState, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains("memory") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn cart_repo(&self) -> repositories::cart::CartRepository {
        repositories::cart::CartRepository::new(self.conn.clone())
    }

    fn product_repo(&self) -> repositories::product::ProductRepository {
        repositories::product::ProductRepository::new(self.conn.clone())
    }

    fn order_repo(&self) -> repositories::order::OrderRepository {
        repositories::order::OrderRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_credential_state(&self, email: &str) -> Result<Option<CredentialState>> {
        self.user_repo().get_credential_state(email).await
    }

    pub async fn create_user_with_otp(
        &self,
        email: &str,
        name: Option<&str>,
        phone: Option<&str>,
        role: &str,
        otp_code: &str,
        otp_expires_at: &str,
    ) -> Result<User> {
        self.user_repo()
            .create_with_otp(email, name, phone, role, otp_code, otp_expires_at)
            .await
    }

    pub async fn refresh_user_otp(
        &self,
        email: &str,
        otp_code: &str,
        otp_expires_at: &str,
    ) -> Result<()> {
        self.user_repo()
            .refresh_otp(email, otp_code, otp_expires_at)
            .await
    }

    pub async fn mark_user_verified(&self, email: &str) -> Result<User> {
        self.user_repo().mark_verified(email).await
    }

    pub async fn set_user_password(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
        phone: Option<&str>,
        security: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo()
            .set_password(email, password, name, phone, security)
            .await
    }

    pub async fn verify_user_password(&self, email: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(email, password).await
    }

    pub async fn set_user_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: &str,
    ) -> Result<()> {
        self.user_repo()
            .set_reset_token(email, token, expires_at)
            .await
    }

    // ========================================================================
    // Cart
    // ========================================================================

    pub async fn list_cart(&self, user_id: i32) -> Result<Vec<CartLine>> {
        self.cart_repo().list_for_user(user_id).await
    }

    pub async fn get_cart_item(&self, id: i32, user_id: i32) -> Result<Option<CartLine>> {
        self.cart_repo().get_for_user(id, user_id).await
    }

    pub async fn upsert_cart_item(
        &self,
        user_id: i32,
        product_id: i32,
        quantity: i32,
    ) -> Result<()> {
        self.cart_repo().upsert(user_id, product_id, quantity).await
    }

    pub async fn set_cart_quantity(&self, id: i32, user_id: i32, quantity: i32) -> Result<bool> {
        self.cart_repo().set_quantity(id, user_id, quantity).await
    }

    pub async fn delete_cart_item(&self, id: i32, user_id: i32) -> Result<bool> {
        self.cart_repo().delete(id, user_id).await
    }

    pub async fn clear_cart(&self, user_id: i32) -> Result<u64> {
        self.cart_repo().clear_for_user(user_id).await
    }

    // ========================================================================
    // Products
    // ========================================================================

    pub async fn list_products(&self, category: Option<&str>) -> Result<Vec<Product>> {
        self.product_repo().list(category).await
    }

    pub async fn get_product(&self, id: i32) -> Result<Option<Product>> {
        self.product_repo().get(id).await
    }

    pub async fn create_product(&self, input: &ProductInput) -> Result<Product> {
        self.product_repo().create(input).await
    }

    pub async fn update_product(&self, id: i32, input: &ProductInput) -> Result<Option<Product>> {
        self.product_repo().update(id, input).await
    }

    pub async fn delete_product(&self, id: i32) -> Result<bool> {
        self.product_repo().delete(id).await
    }

    pub async fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        self.product_repo().category_counts().await
    }

    // ========================================================================
    // Orders
    // ========================================================================

    pub async fn create_order(
        &self,
        user_id: i32,
        amount: i64,
        currency: &str,
        shipping_address: Option<&str>,
        lines: &[OrderLine],
    ) -> Result<Order> {
        self.order_repo()
            .create(user_id, amount, currency, shipping_address, lines)
            .await
    }

    pub async fn get_order(&self, id: i32) -> Result<Option<Order>> {
        self.order_repo().get(id).await
    }

    pub async fn get_order_lines(&self, order_id: i32) -> Result<Vec<OrderLine>> {
        self.order_repo().get_lines(order_id).await
    }

    pub async fn list_orders_for_user(&self, user_id: i32) -> Result<Vec<Order>> {
        self.order_repo().list_for_user(user_id).await
    }

    pub async fn list_all_orders(&self) -> Result<Vec<Order>> {
        self.order_repo().list_all().await
    }

    pub async fn set_order_gateway_id(&self, id: i32, gateway_order_id: &str) -> Result<()> {
        self.order_repo().set_gateway_order(id, gateway_order_id).await
    }

    pub async fn mark_order_paid(&self, id: i32, gateway_payment_id: &str) -> Result<bool> {
        self.order_repo().mark_paid(id, gateway_payment_id).await
    }

    pub async fn update_order_status(&self, id: i32, status: OrderStatus) -> Result<bool> {
        self.order_repo().update_status(id, status).await
    }
}
