//! HTTP API for the lead-generation gate.
//!
//! This module provides the REST API for registration-gated file downloads.
//! Visitors register in exchange for a download; the admin manages the file
//! catalog and the collected leads.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework
//! - **Tower**: Middleware for CORS and authentication
//! - **JWT**: Token-based authentication
//!
//! # Modules
//!
//! - [`auth`]: Visitor registration, login, token verification, the
//!   source-attribution redirect
//! - [`admin`]: Admin bootstrap/login and lead management (list, export, delete)
//! - [`files`]: File upload, catalog listing, streaming downloads, deletion
//! - [`middleware`]: Authentication middleware for protected endpoints
//! - [`request_id`]: Request ID correlation
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `POST /api/auth/register` - Register a visitor
//! - `POST /api/auth/login` - Login with email/password
//! - `POST /api/admin/register` - One-time admin bootstrap
//! - `POST /api/admin/login` - Admin login
//! - `GET /register` - Source-attribution redirect to the registration page
//! - `GET /health` - Server health status
//!
//! ## Bearer-protected
//! - `GET /api/auth/verify` - Validate a token and return its account
//! - `GET /api/files/{id}` - File record lookup
//! - `GET /api/files/{id}/download` - Stream the file bytes
//!
//! ## Admin-only
//! - `POST /api/files/upload` - Multipart upload
//! - `GET /api/files` - List the catalog
//! - `DELETE /api/files/{id}` / `POST /api/files/delete` - Delete files
//! - `GET /api/admin/users` - List leads
//! - `GET /api/admin/users/export` - CSV export
//! - `GET /api/admin/profile` - Admin account
//! - `DELETE /api/admin/users/{id}` / `POST /api/admin/users/delete` - Delete leads
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod admin;
pub mod auth;
pub mod files;
pub mod middleware;
pub mod request_id;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
};
use leadflow::auth::{AuthClaims, AuthError, AuthManager, Role};
use leadflow::files::{FileError, FileManager};
use leadflow::notify::Mailer;
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Multipart bodies may exceed the file cap by the boundary and field
/// overhead, so the HTTP limit sits above the 10 MiB upload cap and the
/// precise check happens in the upload handler.
const BODY_LIMIT_BYTES: usize = 12 * 1024 * 1024;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub auth_manager: Arc<AuthManager>,
    pub file_manager: Arc<FileManager>,
    /// `None` when SMTP is unconfigured; registration then skips the email.
    pub mailer: Option<Arc<Mailer>>,
    pub pool: Arc<PgPool>,
    /// External base URL embedded in download links, no trailing slash.
    pub public_url: String,
}

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Rejection type shared by all handlers.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map an auth failure to its HTTP status and sanitized client message.
pub(crate) fn auth_error(err: AuthError) -> ApiError {
    let status = match &err {
        AuthError::MissingFields
        | AuthError::WeakPassword(_)
        | AuthError::DuplicateEmail
        | AuthError::AdminExists => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
        AuthError::AccountNotFound => StatusCode::NOT_FOUND,
        AuthError::Database(_) | AuthError::HashingFailed | AuthError::Jwt(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Auth operation failed: {err}");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

/// Map a file-store failure to its HTTP status and sanitized client message.
pub(crate) fn file_error(err: FileError) -> ApiError {
    let status = match &err {
        FileError::NoFileProvided
        | FileError::MissingTopic
        | FileError::FileTooLarge
        | FileError::UnsupportedType => StatusCode::BAD_REQUEST,
        FileError::NotFound => StatusCode::NOT_FOUND,
        FileError::Database(_) | FileError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("File operation failed: {err}");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

/// Reject non-admin callers on admin-only endpoints.
pub(crate) fn require_admin(claims: &AuthClaims) -> Result<(), ApiError> {
    if claims.role == Role::Admin {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "Access denied. Admin only.".to_string(),
            }),
        ))
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use lf_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    // Public routes (no authentication middleware)
    let public_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/admin/register", post(admin::register))
        .route("/api/admin/login", post(admin::login))
        .route("/register", get(auth::register_redirect));

    // Protected routes (require a valid bearer token; admin-only checks
    // happen per handler so the status can be 403 rather than 401)
    let protected_routes = Router::new()
        .route("/api/auth/verify", get(auth::verify))
        .route("/api/files/upload", post(files::upload))
        .route("/api/files", get(files::list))
        .route("/api/files/delete", post(files::bulk_delete))
        .route("/api/files/{id}", get(files::get_record))
        .route("/api/files/{id}", delete(files::delete_record))
        .route("/api/files/{id}/download", get(files::download))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/export", get(admin::export_users))
        .route("/api/admin/users/delete", post(admin::bulk_delete_users))
        .route("/api/admin/users/{id}", delete(admin::delete_user))
        .route("/api/admin/profile", get(admin::profile))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers a trivial query, or
/// `503 Service Unavailable` otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:5000/health
/// # {"status":"healthy","database":true,"timestamp":"2026-08-30T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1")
        .fetch_one(&*state.pool)
        .await
        .is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
