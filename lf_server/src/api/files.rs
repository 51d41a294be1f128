//! File catalog API handlers.
//!
//! The admin uploads the gated files (multipart, 10 MiB cap, extension
//! allowlist); registered visitors fetch records and stream the bytes back.
//! Original filenames survive the round trip, including non-ASCII ones, via
//! the dual `Content-Disposition` form.

use axum::{
    Json,
    body::Body,
    extract::{Extension, Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use leadflow::auth::AuthClaims;
use leadflow::files::{FileRecord, UploadRequest};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use super::{ApiError, AppState, ErrorResponse, file_error, require_admin};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: FileRecord,
    #[serde(rename = "downloadLink")]
    pub download_link: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeletePayload {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: usize,
}

/// Upload a gated file (admin only).
///
/// Expects a multipart body with one `file` part and a `topic` text part.
///
/// # Errors
///
/// - `400 Bad Request`: No file, blank topic, oversized file, or a file type
///   outside the allowlist
/// - `403 Forbidden`: Caller is not the admin
pub async fn upload(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    require_admin(&claims)?;

    let mut topic = String::new();
    let mut original_name = None;
    let mut content_type = None;
    let mut bytes = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(invalid_upload)? {
        match field.name().map(str::to_string).as_deref() {
            Some("file") => {
                original_name = field.file_name().map(str::to_string);
                content_type = field.content_type().map(str::to_string);
                bytes = field.bytes().await.map_err(invalid_upload)?.to_vec();
            }
            Some("topic") => {
                topic = field.text().await.map_err(invalid_upload)?;
            }
            _ => {}
        }
    }

    let request = UploadRequest {
        topic,
        original_name,
        content_type,
        bytes,
    };

    match state.file_manager.store_upload(request).await {
        Ok(record) => {
            let download_link = format!("{}/download/{}", state.public_url, record.id);
            Ok((
                StatusCode::CREATED,
                Json(UploadResponse {
                    message: "File uploaded successfully".to_string(),
                    file: record,
                    download_link,
                }),
            ))
        }
        Err(e) => Err(file_error(e)),
    }
}

/// List the file catalog, newest first (admin only).
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
) -> Result<Json<Vec<FileRecord>>, ApiError> {
    require_admin(&claims)?;

    match state.file_manager.list().await {
        Ok(records) => Ok(Json(records)),
        Err(e) => Err(file_error(e)),
    }
}

/// Look up one file record. Any authenticated account may call this; the
/// registration page uses it to show what the visitor is signing up for.
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FileRecord>, ApiError> {
    match state.file_manager.get(id).await {
        Ok(record) => Ok(Json(record)),
        Err(e) => Err(file_error(e)),
    }
}

/// Stream the file bytes back to an authenticated caller.
///
/// The response carries both `Content-Disposition` filename forms so
/// non-ASCII original names download under their exact name.
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.file_manager.get(id).await.map_err(file_error)?;
    let file = state
        .file_manager
        .open_bytes(&record)
        .await
        .map_err(file_error)?;

    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(&record.original_name),
    );

    Ok((headers, body))
}

/// Delete one file record and its bytes (admin only).
pub async fn delete_record(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&claims)?;

    match state.file_manager.delete(id).await {
        Ok(()) => Ok(Json(
            serde_json::json!({"message": "File deleted successfully"}),
        )),
        Err(e) => Err(file_error(e)),
    }
}

/// Delete several files in one call; missing ids are skipped and the count
/// reflects the records actually removed.
pub async fn bulk_delete(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Json(payload): Json<BulkDeletePayload>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    require_admin(&claims)?;

    let deleted = state.file_manager.delete_many(&payload.ids).await;
    Ok(Json(BulkDeleteResponse { deleted }))
}

/// Map a malformed or truncated multipart body to a client error.
fn invalid_upload(err: axum::extract::multipart::MultipartError) -> ApiError {
    tracing::debug!("Rejected multipart body: {err}");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "Invalid upload payload".to_string(),
        }),
    )
}

/// Build the attachment header carrying both filename forms.
///
/// The plain `filename` keeps quote and newline characters out; the
/// RFC 5987 `filename*` form percent-encodes the UTF-8 original so
/// non-ASCII names round-trip exactly. Raw UTF-8 bytes are legal in a
/// header value, so this goes through `from_bytes` rather than `from_str`.
fn content_disposition(original_name: &str) -> HeaderValue {
    let plain: String = original_name
        .chars()
        .map(|c| if matches!(c, '"' | '\r' | '\n') { '_' } else { c })
        .collect();
    let encoded = utf8_percent_encode(original_name, NON_ALPHANUMERIC);
    let value = format!("attachment; filename=\"{plain}\"; filename*=UTF-8''{encoded}");

    HeaderValue::from_bytes(value.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii_name() {
        let value = content_disposition("notes.pdf");
        let s = value.to_str().unwrap();
        assert!(s.contains("filename=\"notes.pdf\""));
        assert!(s.contains("filename*=UTF-8''notes%2Epdf"));
    }

    #[test]
    fn test_content_disposition_strips_quotes_from_plain_form() {
        let value = content_disposition("my\"file\".pdf");
        let bytes = value.as_bytes();
        let s = std::str::from_utf8(bytes).unwrap();
        assert!(s.contains("filename=\"my_file_.pdf\""));
    }

    #[test]
    fn test_content_disposition_encodes_non_ascii() {
        let name = "বাংলা নোট.pdf";
        let value = content_disposition(name);
        let s = std::str::from_utf8(value.as_bytes()).unwrap();

        // The extended form must decode back to the exact original name.
        let encoded = s.split("filename*=UTF-8''").nth(1).unwrap();
        let decoded = percent_encoding::percent_decode_str(encoded)
            .decode_utf8()
            .unwrap();
        assert_eq!(decoded, name);
    }
}
