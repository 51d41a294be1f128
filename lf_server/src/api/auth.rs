//! Visitor authentication API handlers.
//!
//! This module provides HTTP REST endpoints for the lead-capture flow:
//! - Visitor registration with source attribution and optional file association
//! - Login with email/password
//! - Token verification for the registration gate
//! - The attribution redirect that resolves which platform sent the visitor
//!
//! All endpoints return JSON responses with either a token or an error message.
//!
//! # Examples
//!
//! Register a new visitor:
//! ```bash
//! curl -X POST http://localhost:5000/api/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Lead One", "email": "lead@example.com", "whatsapp": "+8801700000000", "password": "secret1", "fileId": 3, "sourcePlatform": "Facebook"}'
//! ```

use axum::{
    Json,
    extract::{Extension, Query, State},
    http::{StatusCode, header::REFERER},
    response::Redirect,
};
use leadflow::Mailer;
use leadflow::auth::{Account, AuthClaims, RegisterRequest};
use leadflow::source::derive_source_platform;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, AppState, ErrorResponse, auth_error};

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// Subset of the account echoed back after register/login.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub whatsapp: Option<String>,
}

impl From<&Account> for UserSummary {
    fn from(account: &Account) -> Self {
        UserSummary {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            whatsapp: account.whatsapp.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: Account,
}

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    pub source: Option<String>,
    #[serde(rename = "fileId")]
    pub file_id: Option<String>,
}

/// Register a new visitor and hand back a token for the download gate.
///
/// On success the welcome email is dispatched on a detached task; its outcome
/// never affects the response.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Lead One",
///   "email": "lead@example.com",
///   "whatsapp": "+8801700000000",
///   "password": "secret1",
///   "eduLevel": "Honors Level",       // Optional
///   "knowledgeLevel": "Beginner",     // Optional
///   "sourcePlatform": "Facebook",     // Optional, defaults to "Direct"
///   "fileId": 3                       // Optional
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, weak password, or duplicate email
/// - `500 Internal Server Error`: Database or hashing failure
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let account = match state.auth_manager.register(payload).await {
        Ok(account) => account,
        Err(e) => return Err(auth_error(e)),
    };

    let token = match state.auth_manager.issue_token(account.id, account.role) {
        Ok(token) => token,
        Err(e) => return Err(auth_error(e)),
    };

    if let Some(mailer) = state.mailer.clone() {
        spawn_welcome_email(&state, mailer, &account);
    }

    let user = UserSummary::from(&account);
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Registration successful! You can now download your file.".to_string(),
            token,
            user,
        }),
    ))
}

/// Dispatch the welcome email without blocking the registration response.
///
/// The file topic is resolved from the association stored on the account;
/// failures are logged and dropped.
fn spawn_welcome_email(state: &AppState, mailer: Arc<Mailer>, account: &Account) {
    let file_manager = state.file_manager.clone();
    let public_url = state.public_url.clone();
    let file_id = account.registered_for_file;
    let email = account.email.clone();
    let name = account.name.clone();

    tokio::spawn(async move {
        let (topic, download_url) = match file_id {
            Some(id) => match file_manager.get(id).await {
                Ok(record) => (record.topic, format!("{public_url}/download/{id}")),
                Err(_) => ("Your Requested File".to_string(), public_url.clone()),
            },
            None => ("Your Requested File".to_string(), public_url.clone()),
        };

        if let Err(e) = mailer
            .send_welcome_email(&email, &name, &topic, &download_url)
            .await
        {
            tracing::warn!("Failed to send welcome email to {email}: {e}");
        }
    });
}

/// Authenticate a visitor and return a fresh token.
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    match state
        .auth_manager
        .login(&payload.email, &payload.password)
        .await
    {
        Ok((account, token)) => {
            let user = UserSummary::from(&account);
            Ok(Json(LoginResponse {
                message: "Login successful".to_string(),
                token,
                user,
            }))
        }
        Err(e) => Err(auth_error(e)),
    }
}

/// Validate the bearer token and return the account behind it.
///
/// The middleware already checked the signature; this also confirms the
/// account still exists, so deleted leads cannot keep using old tokens.
pub async fn verify(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let account = match state.auth_manager.find_by_id(claims.sub).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid token".to_string(),
                }),
            ));
        }
        Err(e) => return Err(auth_error(e)),
    };

    Ok(Json(VerifyResponse {
        valid: true,
        user: account,
    }))
}

/// Attribution redirect for shared campaign links.
///
/// Resolves the source platform from the explicit `source` query parameter,
/// else the `Referer` header, else `Direct`, then forwards the visitor to the
/// registration page with the resolved label attached.
pub async fn register_redirect(
    Query(query): Query<RedirectQuery>,
    headers: axum::http::HeaderMap,
) -> Redirect {
    let referrer = headers.get(REFERER).and_then(|v| v.to_str().ok());
    let source = derive_source_platform(query.source.as_deref(), referrer);

    let mut target = format!(
        "/register-page?source={}",
        utf8_percent_encode(&source, NON_ALPHANUMERIC)
    );
    if let Some(file_id) = query.file_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        target.push_str("&fileId=");
        target.push_str(&utf8_percent_encode(file_id, NON_ALPHANUMERIC).to_string());
    }

    Redirect::to(&target)
}
