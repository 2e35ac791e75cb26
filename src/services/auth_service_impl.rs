//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::clients::smtp::Mailer;
use crate::config::Config;
use crate::constants::{auth as auth_constants, roles};
use crate::db::Store;
use crate::services::auth_service::{
    AuthError, AuthService, Authenticated, OtpIssued, UserInfo,
};
use crate::services::otp::{expiry_from_now, generate_otp, generate_reset_token, is_expired};
use crate::services::token::TokenService;

pub struct SeaOrmAuthService {
    store: Store,
    config: Arc<Config>,
    tokens: Arc<TokenService>,
    mailer: Option<Arc<Mailer>>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(
        store: Store,
        config: Arc<Config>,
        tokens: Arc<TokenService>,
        mailer: Option<Arc<Mailer>>,
    ) -> Self {
        Self {
            store,
            config,
            tokens,
            mailer,
        }
    }

    fn role_for(&self, email: &str) -> &'static str {
        if self.config.auth.is_admin_email(email) {
            roles::ADMIN
        } else {
            roles::USER
        }
    }

    /// Issue a fresh code for the email, creating the account if needed.
    /// Each call overwrites any prior code.
    async fn issue_otp(
        &self,
        email: &str,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<OtpIssued, AuthError> {
        let code = generate_otp();
        let expires_at = expiry_from_now(self.config.auth.otp_expiry_minutes);

        let role = match self.store.get_user_by_email(email).await? {
            Some(user) => {
                self.store
                    .refresh_user_otp(email, &code, &expires_at)
                    .await?;
                user.role
            }
            None => {
                let role = self.role_for(email);
                self.store
                    .create_user_with_otp(email, name, phone, role, &code, &expires_at)
                    .await?;
                role.to_string()
            }
        };

        self.deliver_otp(email, &code).await;

        Ok(OtpIssued {
            is_admin: role.eq_ignore_ascii_case(roles::ADMIN),
            expires_in_seconds: self.config.auth.otp_expiry_minutes * 60,
        })
    }

    /// Delivery is best-effort: the flow must succeed even when the mail
    /// bounces, so the code is logged server-side as the fallback channel.
    async fn deliver_otp(&self, email: &str, code: &str) {
        match &self.mailer {
            Some(mailer) => {
                if let Err(e) = mailer
                    .send_otp(email, code, self.config.auth.otp_expiry_minutes)
                    .await
                {
                    warn!(email = %email, error = %e, "OTP mail delivery failed");
                    info!(email = %email, code = %code, "OTP issued (delivery failed)");
                }
            }
            None => {
                info!(email = %email, code = %code, "OTP issued (mailer disabled)");
            }
        }
    }

    fn authenticate(&self, user: UserInfo) -> Authenticated {
        let token = self.tokens.mint(user.id, &user.email, &user.role);
        Authenticated { token, user }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn request_otp(&self, email: &str) -> Result<OtpIssued, AuthError> {
        self.issue_otp(email, None, None).await
    }

    async fn signup(
        &self,
        email: &str,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<OtpIssued, AuthError> {
        if let Some(state) = self.store.get_credential_state(email).await? {
            if state.has_password && state.user.is_email_verified {
                return Err(AuthError::AlreadyRegistered);
            }
        }

        self.issue_otp(email, name, phone).await
    }

    async fn verify_otp(&self, email: &str, code: &str) -> Result<Authenticated, AuthError> {
        let state = self
            .store
            .get_credential_state(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let (Some(stored), Some(expires_at)) = (state.otp_code, state.otp_expires_at) else {
            return Err(AuthError::InvalidCredentials);
        };

        if stored != code || is_expired(&expires_at) {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self.store.mark_user_verified(email).await?;
        info!(email = %email, "OTP verified");

        Ok(self.authenticate(UserInfo::from(user)))
    }

    async fn set_password(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Authenticated, AuthError> {
        if password.len() < auth_constants::MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                auth_constants::MIN_PASSWORD_LENGTH
            )));
        }

        let state = self
            .store
            .get_credential_state(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // Allowed only mid-OTP-flow or for an already verified account
        let otp_flow_open = state
            .otp_expires_at
            .as_deref()
            .is_some_and(|t| !is_expired(t));

        if !state.user.is_email_verified && !otp_flow_open {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .set_user_password(email, password, name, phone, &self.config.security)
            .await?;
        info!(email = %email, "Password set");

        Ok(self.authenticate(UserInfo::from(user)))
    }

    async fn login(&self, email: &str, password: &str) -> Result<Authenticated, AuthError> {
        let is_valid = self.store.verify_user_password(email, password).await?;

        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .get_user_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(self.authenticate(UserInfo::from(user)))
    }

    async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let Some(_user) = self.store.get_user_by_email(email).await? else {
            // Same outcome as the happy path so account existence stays hidden
            info!("Password reset requested for unknown address");
            return Ok(());
        };

        let token = generate_reset_token();
        let expires_at = expiry_from_now(self.config.auth.reset_token_expiry_minutes);
        self.store
            .set_user_reset_token(email, &token, &expires_at)
            .await?;

        match &self.mailer {
            Some(mailer) => {
                if let Err(e) = mailer
                    .send_password_reset(email, &token, self.config.auth.reset_token_expiry_minutes)
                    .await
                {
                    warn!(email = %email, error = %e, "Reset mail delivery failed");
                    info!(email = %email, token = %token, "Reset token issued (delivery failed)");
                }
            }
            None => {
                info!(email = %email, token = %token, "Reset token issued (mailer disabled)");
            }
        }

        Ok(())
    }

    async fn reset_password(
        &self,
        email: &str,
        token: &str,
        password: &str,
    ) -> Result<Authenticated, AuthError> {
        if password.len() < auth_constants::MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                auth_constants::MIN_PASSWORD_LENGTH
            )));
        }

        let state = self
            .store
            .get_credential_state(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let (Some(stored), Some(expires_at)) = (state.reset_token, state.reset_expires_at) else {
            return Err(AuthError::InvalidCredentials);
        };

        if stored != token || is_expired(&expires_at) {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .set_user_password(email, password, None, None, &self.config.security)
            .await?;
        info!(email = %email, "Password reset completed");

        Ok(self.authenticate(UserInfo::from(user)))
    }

    async fn get_user(&self, id: i32) -> Result<Option<UserInfo>, AuthError> {
        let user = self.store.get_user_by_id(id).await?;
        Ok(user.map(UserInfo::from))
    }
}
