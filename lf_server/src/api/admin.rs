//! Admin API handlers.
//!
//! One admin account manages the whole system: it is bootstrapped once,
//! logs in with email/password, and owns the collected leads (list, CSV
//! export, deletion).

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use leadflow::auth::{Account, AuthClaims, UserWithFile};
use leadflow::export::users_to_csv;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState, ErrorResponse, auth_error, require_admin};

#[derive(Debug, Deserialize)]
pub struct AdminRegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<&Account> for AdminSummary {
    fn from(account: &Account) -> Self {
        AdminSummary {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminAuthResponse {
    pub message: String,
    pub token: String,
    pub admin: AdminSummary,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeletePayload {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: usize,
}

/// One-time admin bootstrap.
///
/// # Errors
///
/// - `400 Bad Request`: An admin already exists, or the payload is invalid
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<AdminRegisterPayload>,
) -> Result<(StatusCode, Json<AdminAuthResponse>), ApiError> {
    let account = match state
        .auth_manager
        .register_admin(&payload.name, &payload.email, &payload.password)
        .await
    {
        Ok(account) => account,
        Err(e) => return Err(auth_error(e)),
    };

    let token = state
        .auth_manager
        .issue_token(account.id, account.role)
        .map_err(auth_error)?;

    Ok((
        StatusCode::CREATED,
        Json(AdminAuthResponse {
            message: "Admin registered successfully".to_string(),
            token,
            admin: AdminSummary::from(&account),
        }),
    ))
}

/// Admin login.
///
/// A matching `user`-role account is rejected exactly like a wrong password.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginPayload>,
) -> Result<Json<AdminAuthResponse>, ApiError> {
    match state
        .auth_manager
        .login_admin(&payload.email, &payload.password)
        .await
    {
        Ok((account, token)) => Ok(Json(AdminAuthResponse {
            message: "Login successful".to_string(),
            token,
            admin: AdminSummary::from(&account),
        })),
        Err(e) => Err(auth_error(e)),
    }
}

/// Return the authenticated admin's own account.
pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
) -> Result<Json<Account>, ApiError> {
    require_admin(&claims)?;

    match state.auth_manager.find_by_id(claims.sub).await {
        Ok(Some(account)) => Ok(Json(account)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Admin not found".to_string(),
            }),
        )),
        Err(e) => Err(auth_error(e)),
    }
}

/// List all collected leads, newest first, each with the topic of the file
/// it registered for. Password hashes never appear in the payload.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
) -> Result<Json<Vec<UserWithFile>>, ApiError> {
    require_admin(&claims)?;

    match state.auth_manager.list_users().await {
        Ok(users) => Ok(Json(users)),
        Err(e) => Err(auth_error(e)),
    }
}

/// Export all leads as a CSV attachment.
pub async fn export_users(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&claims)?;

    let users = state.auth_manager.list_users().await.map_err(auth_error)?;

    let csv = users_to_csv(&users).map_err(|e| {
        tracing::error!("CSV export failed: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to export users".to_string(),
            }),
        )
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"users.csv\"",
            ),
        ],
        csv,
    ))
}

/// Delete a single lead.
///
/// Only `user`-role accounts can be deleted; the admin cannot remove itself
/// through this endpoint.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&claims)?;

    match state.auth_manager.delete_user(id).await {
        Ok(true) => Ok(Json(
            serde_json::json!({"message": "User deleted successfully"}),
        )),
        Ok(false) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "User not found".to_string(),
            }),
        )),
        Err(e) => Err(auth_error(e)),
    }
}

/// Delete several leads in one call; missing ids are skipped and the count
/// reflects the rows actually removed.
pub async fn bulk_delete_users(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Json(payload): Json<BulkDeletePayload>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    require_admin(&claims)?;

    let deleted = state.auth_manager.delete_users(&payload.ids).await;
    Ok(Json(BulkDeleteResponse { deleted }))
}
