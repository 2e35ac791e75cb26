use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::users;

/// User data returned from repository (without credential material)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub is_email_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            phone: model.phone,
            role: model.role,
            is_email_verified: model.is_email_verified,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Credential snapshot used by the auth flows. Never serialized.
#[derive(Debug, Clone)]
pub struct CredentialState {
    pub user: User,
    pub has_password: bool,
    pub otp_code: Option<String>,
    pub otp_expires_at: Option<String>,
    pub reset_token: Option<String>,
    pub reset_expires_at: Option<String>,
}

impl From<users::Model> for CredentialState {
    fn from(model: users::Model) -> Self {
        Self {
            has_password: model.password_hash.is_some(),
            otp_code: model.otp_code.clone(),
            otp_expires_at: model.otp_expires_at.clone(),
            reset_token: model.reset_token.clone(),
            reset_expires_at: model.reset_expires_at.clone(),
            user: User::from(model),
        }
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    /// Full credential snapshot for the auth flows (OTP/reset comparison).
    pub async fn get_credential_state(&self, email: &str) -> Result<Option<CredentialState>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query credential state")?;

        Ok(user.map(CredentialState::from))
    }

    /// Create a user carrying a fresh OTP. Role is decided by the caller.
    pub async fn create_with_otp(
        &self,
        email: &str,
        name: Option<&str>,
        phone: Option<&str>,
        role: &str,
        otp_code: &str,
        otp_expires_at: &str,
    ) -> Result<User> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            email: Set(email.to_string()),
            name: Set(name.map(ToString::to_string)),
            phone: Set(phone.map(ToString::to_string)),
            role: Set(role.to_string()),
            otp_code: Set(Some(otp_code.to_string())),
            otp_expires_at: Set(Some(otp_expires_at.to_string())),
            is_email_verified: Set(false),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    /// Overwrite the OTP fields. Any prior code stops validating here.
    pub async fn refresh_otp(
        &self,
        email: &str,
        otp_code: &str,
        otp_expires_at: &str,
    ) -> Result<()> {
        let user = self.find_model(email).await?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.otp_code = Set(Some(otp_code.to_string()));
        active.otp_expires_at = Set(Some(otp_expires_at.to_string()));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Mark the email verified and clear the OTP fields.
    pub async fn mark_verified(&self, email: &str) -> Result<User> {
        let user = self.find_model(email).await?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.is_email_verified = Set(true);
        active.otp_code = Set(None);
        active.otp_expires_at = Set(None);
        active.updated_at = Set(now);
        let model = active.update(&self.conn).await?;

        Ok(User::from(model))
    }

    /// Set the password hash, mark verified and drop all one-time credentials.
    /// Optional profile fields are updated when provided.
    pub async fn set_password(
        &self,
        email: &str,
        new_password: &str,
        name: Option<&str>,
        phone: Option<&str>,
        config: &SecurityConfig,
    ) -> Result<User> {
        let user = self.find_model(email).await?;

        let password = new_password.to_string();
        let config = config.clone();
        // Argon2 is CPU-heavy; keep it off the async runtime
        let new_hash = task::spawn_blocking(move || hash_password(&password, &config))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(Some(new_hash));
        active.is_email_verified = Set(true);
        active.otp_code = Set(None);
        active.otp_expires_at = Set(None);
        active.reset_token = Set(None);
        active.reset_expires_at = Set(None);
        if let Some(name) = name {
            active.name = Set(Some(name.to_string()));
        }
        if let Some(phone) = phone {
            active.phone = Set(Some(phone.to_string()));
        }
        active.updated_at = Set(now);
        let model = active.update(&self.conn).await?;

        Ok(User::from(model))
    }

    pub async fn verify_password(&self, email: &str, password: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(hash) = user.and_then(|u| u.password_hash) else {
            return Ok(false);
        };

        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    pub async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: &str,
    ) -> Result<()> {
        let user = self.find_model(email).await?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.reset_token = Set(Some(token.to_string()));
        active.reset_expires_at = Set(Some(expires_at.to_string()));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    async fn find_model(&self, email: &str) -> Result<users::Model> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {email}"))
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
