//! One-time credential generators: numeric sign-in codes and reset tokens.
//! Stateless functions over random values and clock reads.

use rand::Rng;

/// Generate a 6-digit one-time code.
#[must_use]
pub fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

/// Generate a random password-reset token (64 character hex string)
#[must_use]
pub fn generate_reset_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// RFC 3339 timestamp `minutes` from now.
#[must_use]
pub fn expiry_from_now(minutes: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::minutes(minutes)).to_rfc3339()
}

/// Unparseable timestamps count as expired.
#[must_use]
pub fn is_expired(timestamp: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map_or(true, |t| t < chrono::Utc::now())
}
