use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use thiserror::Error;

use crate::config::EmailConfig;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Transactional mailer for OTP codes and password-reset tokens.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl Mailer {
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    pub async fn send_otp(&self, to: &str, code: &str, expiry_minutes: i64) -> Result<(), MailError> {
        self.send_plain(to, "Your sign-in code", &otp_body(code, expiry_minutes))
            .await
    }

    pub async fn send_password_reset(
        &self,
        to: &str,
        token: &str,
        expiry_minutes: i64,
    ) -> Result<(), MailError> {
        self.send_plain(
            to,
            "Reset your password",
            &reset_body(token, expiry_minutes),
        )
        .await
    }

    async fn send_plain(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

fn otp_body(code: &str, expiry_minutes: i64) -> String {
    format!(
        "Your one-time sign-in code is {code}.\n\n\
         It expires in {expiry_minutes} minutes. If you did not request it, ignore this mail."
    )
}

fn reset_body(token: &str, expiry_minutes: i64) -> String {
    format!(
        "Use this token to reset your password: {token}\n\n\
         It expires in {expiry_minutes} minutes. If you did not request a reset, ignore this mail."
    )
}
