//! File record data models.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// File record ID type
pub type FileId = i64;

/// Metadata for one distributable asset, distinct from its stored bytes.
///
/// `stored_name` carries an ingestion-timestamp prefix so two uploads that
/// share an original name never collide on disk; `original_name` preserves
/// the full original character set, including non-Latin scripts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: FileId,
    pub topic: String,
    /// Relative path of the bytes inside the managed content directory.
    #[serde(rename = "fileName")]
    pub stored_name: String,
    pub original_name: String,
    pub uploaded_at: DateTime<Utc>,
}
