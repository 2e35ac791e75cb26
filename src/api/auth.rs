use axum::{
    Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, AppState};
use super::types::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, MeResponse, MessageResponse,
    ResetPasswordRequest, SendOtpRequest, SendOtpResponse, SetPasswordRequest, SignupRequest,
    SignupResponse, VerifyOtpRequest,
};
use super::validation::{validate_email, validate_otp};
use crate::constants::roles;
use crate::services::Authenticated;

const SESSION_USER_KEY: &str = "user_id";

// ============================================================================
// Middleware
// ============================================================================

/// Identity recovered from a verified bearer token, attached to the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case(roles::ADMIN)
    }
}

/// Role predicate for admin-gated handlers.
pub fn require_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin access required"))
    }
}

/// Bearer authentication. Decode/verify failure yields 401 before any handler
/// runs; there is no partial identity.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let claims = state
        .tokens()
        .verify(&token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    tracing::Span::current().record("user_id", claims.sub);

    request.extensions_mut().insert(AuthUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer` header
fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/send-otp
/// Issue (or refresh) a one-time sign-in code for the address
pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>, ApiError> {
    let email = validate_email(&payload.email)?;

    let issued = state.auth_service().request_otp(email).await?;

    Ok(Json(SendOtpResponse {
        success: true,
        message: "A sign-in code has been sent to your email".to_string(),
        is_admin: issued.is_admin,
    }))
}

/// POST /auth/signup
/// Like send-otp but records profile fields and refuses completed accounts
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<SignupResponse>, ApiError> {
    let email = validate_email(&payload.email)?;

    let issued = state
        .auth_service()
        .signup(
            email,
            payload.name.as_deref(),
            payload.phone_number.as_deref(),
        )
        .await?;

    Ok(Json(SignupResponse {
        success: true,
        message: "A verification code has been sent to your email".to_string(),
        expires_in: issued.expires_in_seconds,
    }))
}

/// POST /auth/verify-otp
/// The login half of the OTP flow; success establishes the session
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = validate_email(&payload.email)?;
    let otp = validate_otp(&payload.otp)?;

    let authenticated = state.auth_service().verify_otp(email, otp).await?;
    establish_session(&session, &authenticated).await?;

    Ok(Json(auth_response(authenticated)))
}

/// POST /auth/set-password
/// Completes an open OTP flow with a password; responds with a usable token
pub async fn set_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = validate_email(&payload.email)?;

    let authenticated = state
        .auth_service()
        .set_password(
            email,
            &payload.password,
            payload.name.as_deref(),
            payload.phone.as_deref(),
        )
        .await?;
    establish_session(&session, &authenticated).await?;

    Ok(Json(auth_response(authenticated)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = validate_email(&payload.email)?;

    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let authenticated = state.auth_service().login(email, &payload.password).await?;
    establish_session(&session, &authenticated).await?;

    Ok(Json(auth_response(authenticated)))
}

/// POST /auth/forgot-password
/// The response is identical whether or not the account exists
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = validate_email(&payload.email)?;

    state.auth_service().forgot_password(email).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "If an account exists for that address, a reset link has been sent".to_string(),
    }))
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = validate_email(&payload.email)?;

    let authenticated = state
        .auth_service()
        .reset_password(email, &payload.token, &payload.password)
        .await?;
    establish_session(&session, &authenticated).await?;

    Ok(Json(auth_response(authenticated)))
}

/// POST /auth/signout
/// Invalidate the current session
pub async fn signout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    Json(MessageResponse {
        success: true,
        message: "Signed out".to_string(),
    })
}

/// GET /auth/me
/// Session-cookie identity; 200 with `user: null` when unauthenticated
pub async fn me(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<MeResponse>, ApiError> {
    let user_id: Option<i32> = session
        .get(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

    let user = match user_id {
        Some(id) => state.auth_service().get_user(id).await?,
        None => None,
    };

    Ok(Json(MeResponse { user }))
}

// ============================================================================
// Helpers
// ============================================================================

async fn establish_session(
    session: &Session,
    authenticated: &Authenticated,
) -> Result<(), ApiError> {
    session
        .insert(SESSION_USER_KEY, authenticated.user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))
}

fn auth_response(authenticated: Authenticated) -> AuthResponse {
    AuthResponse {
        success: true,
        token: authenticated.token,
        user: authenticated.user,
    }
}
