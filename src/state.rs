use std::sync::Arc;

use crate::clients::cloudinary::CloudinaryClient;
use crate::clients::razorpay::RazorpayClient;
use crate::clients::smtp::Mailer;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, OrderService, SeaOrmAuthService, SeaOrmOrderService, TokenService,
};

/// Process-wide wiring, built once at startup. Configuration and the external
/// clients are immutable after construction; every request shares them.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub tokens: Arc<TokenService>,

    pub razorpay: Arc<RazorpayClient>,

    pub cloudinary: Arc<CloudinaryClient>,

    pub mailer: Option<Arc<Mailer>>,

    pub auth_service: Arc<dyn AuthService>,

    pub order_service: Arc<dyn OrderService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let tokens = Arc::new(TokenService::new(
            config.auth.token_secret.clone(),
            config.auth.token_ttl_hours,
        ));

        let razorpay = Arc::new(RazorpayClient::new(config.razorpay.clone())?);
        let cloudinary = Arc::new(CloudinaryClient::new(config.cloudinary.clone())?);

        let mailer = if config.email.enabled {
            Some(Arc::new(
                Mailer::new(&config.email)
                    .map_err(|e| anyhow::anyhow!("Failed to build SMTP transport: {e}"))?,
            ))
        } else {
            None
        };

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.clone(),
            tokens.clone(),
            mailer.clone(),
        )) as Arc<dyn AuthService>;

        let order_service = Arc::new(SeaOrmOrderService::new(store.clone(), razorpay.clone()))
            as Arc<dyn OrderService>;

        Ok(Self {
            config,
            store,
            tokens,
            razorpay,
            cloudinary,
            mailer,
            auth_service,
            order_service,
        })
    }
}
