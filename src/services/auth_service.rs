//! Domain service for OTP-based authentication and credential management.
//!
//! Covers code issuance, verification, password set/reset and password login.

use serde::Serialize;
use thiserror::Error;

use crate::db::User;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Account already exists")]
    AlreadyRegistered,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// User info DTO for responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub is_email_verified: bool,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            role: user.role,
            is_email_verified: user.is_email_verified,
        }
    }
}

/// Outcome of an OTP issuance (send-otp / signup).
#[derive(Debug, Clone)]
pub struct OtpIssued {
    pub is_admin: bool,
    pub expires_in_seconds: i64,
}

/// A verified identity plus its freshly minted bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub token: String,
    pub user: UserInfo,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates the user if needed, issues a fresh OTP and hands it to the
    /// mailer. Delivery failure does not fail the operation.
    async fn request_otp(&self, email: &str) -> Result<OtpIssued, AuthError>;

    /// Like [`Self::request_otp`] but records name/phone and refuses emails
    /// that already completed signup.
    async fn signup(
        &self,
        email: &str,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<OtpIssued, AuthError>;

    /// Compares code and expiry; success verifies the email, clears the OTP
    /// and returns a bearer token.
    async fn verify_otp(&self, email: &str, code: &str) -> Result<Authenticated, AuthError>;

    /// Sets the password while an OTP flow is open (or the user is already
    /// verified); clears all one-time credentials.
    async fn set_password(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Authenticated, AuthError>;

    /// Password login.
    async fn login(&self, email: &str, password: &str) -> Result<Authenticated, AuthError>;

    /// Issues a reset token for an existing account. Always succeeds from the
    /// caller's point of view so account existence is not leaked.
    async fn forgot_password(&self, email: &str) -> Result<(), AuthError>;

    /// Consumes a reset token and sets the new password.
    async fn reset_password(
        &self,
        email: &str,
        token: &str,
        password: &str,
    ) -> Result<Authenticated, AuthError>;

    /// Looks up a user by id (session identity).
    async fn get_user(&self, id: i32) -> Result<Option<UserInfo>, AuthError>;
}
