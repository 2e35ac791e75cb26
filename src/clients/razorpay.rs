use anyhow::{Context, Result, anyhow};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use crate::config::RazorpayConfig;

type HmacSha256 = Hmac<Sha256>;

/// Order created on the gateway; its id is what the checkout widget needs.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Clone)]
pub struct RazorpayClient {
    config: RazorpayConfig,
    client: Client,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(
                config.request_timeout_seconds.into(),
            ))
            .user_agent("Duka/1.0")
            .build()
            .context("Failed to build Razorpay HTTP client")?;

        Ok(Self { config, client })
    }

    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    #[must_use]
    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    /// Create a gateway order for `amount` minor units. `receipt` is our own
    /// order id, echoed back in the dashboard.
    pub async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder> {
        let url = format!("{}/orders", self.config.base_url);
        let body = CreateOrderBody {
            amount,
            currency: &self.config.currency,
            receipt,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Razorpay order creation failed: {status} - {text}"));
        }

        let order: GatewayOrder = response.json().await?;
        debug!(gateway_order_id = %order.id, amount, "Gateway order created");
        Ok(order)
    }

    /// Recompute the checkout signature over `order_id|payment_id` and compare
    /// in constant time. Equality is the sole acceptance criterion.
    #[must_use]
    pub fn verify_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        let payload = format!("{gateway_order_id}|{payment_id}");
        let expected = compute_signature(&payload, &self.config.key_secret);
        constant_time_compare(&expected, signature)
    }
}

fn compute_signature(message: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let result = mac.finalize();
    hex::encode(result.into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
