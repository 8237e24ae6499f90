//! Account registration, login, and MFA endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use chrono::Utc;
use folio_schemas::UserAccount;
use tracing::info;
use uuid::Uuid;

use crate::api_types::{
    AuthResponse, LoginRequest, MfaEnableRequest, MfaEnableResponse, MfaSetupResponse,
    RegisterRequest,
};
use crate::state::AppState;

use super::{bad_request, store_error, unauthorized, AuthedUser};

const MIN_PASSWORD_LEN: usize = 8;

// ---------------------------------------------------------------------------
// POST /v1/auth/register
// ---------------------------------------------------------------------------

pub(crate) async fn register(
    State(st): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Response {
    let email = req.email.trim().to_ascii_lowercase();
    if email.is_empty() || !email.contains('@') {
        return bad_request("invalid email address");
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return bad_request("password must be at least 8 characters");
    }

    match st.users.find_by_email(&email).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(crate::api_types::ErrorBody {
                    error: "email already registered".to_string(),
                }),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(e) => return store_error(e),
    }

    let password_hash = match folio_auth::hash_password(&req.password) {
        Ok(h) => h,
        Err(e) => return bad_request(&e.to_string()),
    };

    let user = UserAccount {
        user_id: Uuid::new_v4(),
        email: email.clone(),
        password_hash,
        mfa_secret: None,
        mfa_enabled: false,
        created_at_utc: Utc::now(),
    };
    if let Err(e) = st.users.insert_user(&user).await {
        return store_error(e);
    }

    let token = match st.tokens.issue(user.user_id, &user.email) {
        Ok(t) => t,
        Err(e) => return unauthorized(&e.to_string()),
    };

    info!(user_id = %user.user_id, "auth/register");
    (
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user_id: user.user_id,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/auth/login
// ---------------------------------------------------------------------------

pub(crate) async fn login(
    State(st): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    let email = req.email.trim().to_ascii_lowercase();

    let user = match st.users.find_by_email(&email).await {
        Ok(Some(u)) => u,
        // same response for unknown email and bad password
        Ok(None) => return unauthorized("invalid credentials"),
        Err(e) => return store_error(e),
    };

    match folio_auth::verify_password(&req.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return unauthorized("invalid credentials"),
        Err(e) => return unauthorized(&e.to_string()),
    }

    if user.mfa_enabled {
        let Some(secret) = user.mfa_secret.as_deref() else {
            return unauthorized("mfa misconfigured for this account");
        };
        let Some(code) = req.mfa_code.as_deref() else {
            return unauthorized("mfa code required");
        };
        match folio_auth::mfa_verify(secret, &st.issuer, &user.email, code) {
            Ok(true) => {}
            Ok(false) => return unauthorized("invalid mfa code"),
            Err(e) => return unauthorized(&e.to_string()),
        }
    }

    let token = match st.tokens.issue(user.user_id, &user.email) {
        Ok(t) => t,
        Err(e) => return unauthorized(&e.to_string()),
    };

    info!(user_id = %user.user_id, "auth/login");
    (
        StatusCode::OK,
        Json(AuthResponse {
            token,
            user_id: user.user_id,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/auth/mfa/setup
// ---------------------------------------------------------------------------

/// Generate and store a fresh TOTP secret. MFA stays disabled until the user
/// confirms a valid code via `mfa/enable`.
pub(crate) async fn mfa_setup(State(st): State<Arc<AppState>>, user: AuthedUser) -> Response {
    let enrollment = match folio_auth::mfa_enroll(&st.issuer, &user.email) {
        Ok(e) => e,
        Err(e) => return bad_request(&e.to_string()),
    };

    if let Err(e) = st
        .users
        .set_mfa_secret(user.user_id, &enrollment.secret_base32)
        .await
    {
        return store_error(e);
    }

    info!(user_id = %user.user_id, "auth/mfa/setup");
    (
        StatusCode::OK,
        Json(MfaSetupResponse {
            secret_base32: enrollment.secret_base32,
            otpauth_url: enrollment.otpauth_url,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/auth/mfa/enable
// ---------------------------------------------------------------------------

pub(crate) async fn mfa_enable(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<MfaEnableRequest>,
) -> Response {
    let account = match st.users.find_by_id(user.user_id).await {
        Ok(Some(a)) => a,
        Ok(None) => return unauthorized("unknown user"),
        Err(e) => return store_error(e),
    };
    let Some(secret) = account.mfa_secret.as_deref() else {
        return bad_request("run mfa/setup first");
    };

    match folio_auth::mfa_verify(secret, &st.issuer, &account.email, &req.code) {
        Ok(true) => {}
        Ok(false) => return unauthorized("invalid mfa code"),
        Err(e) => return bad_request(&e.to_string()),
    }

    if let Err(e) = st.users.enable_mfa(user.user_id).await {
        return store_error(e);
    }

    info!(user_id = %user.user_id, "auth/mfa/enable");
    (StatusCode::OK, Json(MfaEnableResponse { mfa_enabled: true })).into_response()
}
