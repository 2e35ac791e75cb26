use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub razorpay: RazorpayConfig,

    pub cloudinary: CloudinaryConfig,

    pub email: EmailConfig,

    pub security: SecurityConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/duka.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Default: true for production safety. Set to false for local development without HTTPS.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 7600,
            cors_allowed_origins: vec![
                "http://localhost:7600".to_string(),
                "http://127.0.0.1:7600".to_string(),
            ],
            secure_cookies: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC key for bearer tokens. Must be overridden outside development.
    pub token_secret: String,

    /// Bearer token lifetime in hours (default: 72)
    pub token_ttl_hours: i64,

    /// One-time code lifetime in minutes (default: 10)
    pub otp_expiry_minutes: i64,

    /// Password-reset token lifetime in minutes (default: 60)
    pub reset_token_expiry_minutes: i64,

    /// Emails granted the admin role at first sign-in, matched case-insensitively.
    pub admin_emails: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: "change-me-token-secret".to_string(),
            token_ttl_hours: 72,
            otp_expiry_minutes: 10,
            reset_token_expiry_minutes: 60,
            admin_emails: vec![],
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|e| e.eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RazorpayConfig {
    pub key_id: String,

    pub key_secret: String,

    pub base_url: String,

    pub currency: String,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u32,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: "rzp_test_change_me".to_string(),
            key_secret: "change-me".to_string(),
            base_url: "https://api.razorpay.com/v1".to_string(),
            currency: "INR".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudinaryConfig {
    pub cloud_name: String,

    /// Unsigned upload preset configured in the Cloudinary dashboard
    pub upload_preset: String,

    pub base_url: String,

    pub product_folder: String,

    pub media_folder: String,

    /// Request timeout in seconds (default: 60; uploads are slow)
    pub request_timeout_seconds: u32,
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: "change-me".to_string(),
            upload_preset: "duka_unsigned".to_string(),
            base_url: "https://api.cloudinary.com/v1_1".to_string(),
            product_folder: "products".to_string(),
            media_folder: "media".to_string(),
            request_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,

    pub smtp_host: String,

    pub smtp_port: u16,

    pub smtp_username: String,

    pub smtp_password: String,

    pub from_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: "no-reply@duka.local".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    /// Lower values reduce memory usage but decrease GPU resistance.
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            razorpay: RazorpayConfig::default(),
            cloudinary: CloudinaryConfig::default(),
            email: EmailConfig::default(),
            security: SecurityConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("duka").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".duka").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.token_secret.is_empty() {
            anyhow::bail!("auth.token_secret cannot be empty");
        }

        if self.auth.otp_expiry_minutes <= 0 || self.auth.reset_token_expiry_minutes <= 0 {
            anyhow::bail!("OTP and reset token expiries must be positive");
        }

        if self.razorpay.key_secret.is_empty() {
            anyhow::bail!("razorpay.key_secret cannot be empty");
        }

        if self.email.enabled && self.email.smtp_host.is_empty() {
            anyhow::bail!("SMTP host cannot be empty when email is enabled");
        }

        Ok(())
    }
}
