//! File manager implementation.

use super::{
    errors::{FileError, FileResult},
    models::{FileId, FileRecord},
};
use chrono::Utc;
use futures_util::future::join_all;
use log::warn;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Upload size cap
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Accepted file extensions, lowercase
const ALLOWED_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "pdf", "doc", "docx", "txt"];

/// Content types browsers commonly send for the allowed extensions. The
/// extension allowlist is authoritative; a supplied content type outside
/// this set is rejected anyway.
const ALLOWED_CONTENT_TYPES: [&str; 7] = [
    "image/jpeg",
    "image/png",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "application/octet-stream",
];

/// A validated-on-entry upload: one file plus a topic label.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub topic: String,
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// File manager: record store plus on-disk byte storage.
#[derive(Clone)]
pub struct FileManager {
    pool: Arc<PgPool>,
    content_dir: PathBuf,
}

impl FileManager {
    /// Create a new file manager
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `content_dir` - Directory holding uploaded bytes
    pub fn new(pool: Arc<PgPool>, content_dir: PathBuf) -> Self {
        Self { pool, content_dir }
    }

    /// Persist an upload: validate, write bytes, then insert the record.
    ///
    /// The byte write strictly precedes the record insert, so a crash in
    /// between leaves orphaned bytes but never a record pointing at bytes
    /// that were never written.
    ///
    /// # Errors
    ///
    /// * `FileError::NoFileProvided` - no file part, or empty bytes
    /// * `FileError::MissingTopic` - topic empty after trimming
    /// * `FileError::FileTooLarge` - more than 10 MiB
    /// * `FileError::UnsupportedType` - extension or content type not allowed
    pub async fn store_upload(&self, request: UploadRequest) -> FileResult<FileRecord> {
        let original_name = request.original_name.ok_or(FileError::NoFileProvided)?;
        if request.bytes.is_empty() {
            return Err(FileError::NoFileProvided);
        }

        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(FileError::MissingTopic);
        }

        if request.bytes.len() > MAX_FILE_SIZE {
            return Err(FileError::FileTooLarge);
        }

        let original_name = sanitize_file_name(&original_name).ok_or(FileError::NoFileProvided)?;
        if !extension_allowed(&original_name) {
            return Err(FileError::UnsupportedType);
        }
        if let Some(content_type) = request.content_type.as_deref() {
            if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
                return Err(FileError::UnsupportedType);
            }
        }

        let stored_name = stored_name_for(&original_name);
        tokio::fs::write(self.content_dir.join(&stored_name), &request.bytes).await?;

        let row = sqlx::query(
            "INSERT INTO file_records (topic, stored_name, original_name) \
             VALUES ($1, $2, $3) \
             RETURNING id, topic, stored_name, original_name, uploaded_at",
        )
        .bind(topic)
        .bind(&stored_name)
        .bind(&original_name)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(record_from_row(&row))
    }

    /// Look up a file record
    pub async fn get(&self, id: FileId) -> FileResult<FileRecord> {
        let row = sqlx::query(
            "SELECT id, topic, stored_name, original_name, uploaded_at \
             FROM file_records WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(FileError::NotFound)?;

        Ok(record_from_row(&row))
    }

    /// List all file records, newest upload first
    pub async fn list(&self) -> FileResult<Vec<FileRecord>> {
        let rows = sqlx::query(
            "SELECT id, topic, stored_name, original_name, uploaded_at \
             FROM file_records ORDER BY uploaded_at DESC",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(record_from_row).collect())
    }

    /// Open the stored bytes of a record for streaming.
    ///
    /// # Errors
    ///
    /// * `FileError::NotFound` - the bytes are missing from disk
    pub async fn open_bytes(&self, record: &FileRecord) -> FileResult<tokio::fs::File> {
        let path = self.resolve_path(&record.stored_name)?;
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FileError::NotFound),
            Err(e) => Err(FileError::Io(e)),
        }
    }

    /// Delete a record and, best-effort, its bytes.
    ///
    /// Missing bytes do not fail the delete: removing a record whose file
    /// was already cleaned off disk is idempotent.
    pub async fn delete(&self, id: FileId) -> FileResult<()> {
        let record = self.get(id).await?;

        sqlx::query("DELETE FROM file_records WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        if let Ok(path) = self.resolve_path(&record.stored_name) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove bytes for file {id}: {e}"),
            }
        }

        Ok(())
    }

    /// Bulk delete by identifier set: one independent delete per id, run
    /// concurrently. Missing identifiers are skipped; only the aggregate
    /// count of records removed is reported.
    pub async fn delete_many(&self, ids: &[FileId]) -> usize {
        let outcomes = join_all(ids.iter().map(|id| self.delete(*id))).await;
        outcomes
            .into_iter()
            .filter(|outcome| match outcome {
                Ok(()) => true,
                Err(FileError::NotFound) => false,
                Err(e) => {
                    warn!("Bulk file delete failed for one id: {e}");
                    false
                }
            })
            .count()
    }

    /// Directory holding the uploaded bytes
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Resolve a stored name inside the content directory. Stored names are
    /// sanitized on the way in; this guards the invariant on the way out.
    fn resolve_path(&self, stored_name: &str) -> FileResult<PathBuf> {
        if stored_name.contains(['/', '\\']) || stored_name == "." || stored_name == ".." {
            return Err(FileError::NotFound);
        }
        Ok(self.content_dir.join(stored_name))
    }
}

/// Reduce an uploaded filename to its final path component, preserving the
/// original character set (Bengali and other non-Latin scripts included).
/// Returns `None` when nothing usable remains.
pub fn sanitize_file_name(original: &str) -> Option<String> {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .replace('\0', "");
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Build the on-disk name: ingestion timestamp in milliseconds, a dash, the
/// sanitized original name. The prefix guarantees collision-freedom for
/// same-named uploads.
pub fn stored_name_for(original_name: &str) -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), original_name)
}

/// Check the file extension against the allowlist
pub fn extension_allowed(file_name: &str) -> bool {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
        }
        _ => false,
    }
}

fn record_from_row(row: &PgRow) -> FileRecord {
    FileRecord {
        id: row.get("id"),
        topic: row.get("topic"),
        stored_name: row.get("stored_name"),
        original_name: row.get("original_name"),
        uploaded_at: row.get("uploaded_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_traversal_components() {
        assert_eq!(
            sanitize_file_name("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_file_name("C:\\Users\\x\\report.pdf").as_deref(),
            Some("report.pdf")
        );
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name("   "), None);
        assert_eq!(sanitize_file_name("a/"), None);
    }

    #[test]
    fn test_sanitize_preserves_bengali_script() {
        let name = "বাংলা নোট.pdf";
        assert_eq!(sanitize_file_name(name).as_deref(), Some(name));
    }

    #[test]
    fn test_stored_name_carries_timestamp_prefix() {
        let stored = stored_name_for("notes.pdf");
        let (prefix, rest) = stored.split_once('-').unwrap();
        assert!(prefix.parse::<i64>().is_ok());
        assert_eq!(rest, "notes.pdf");
    }

    #[test]
    fn test_extension_allowlist() {
        assert!(extension_allowed("notes.pdf"));
        assert!(extension_allowed("photo.JPEG"));
        assert!(extension_allowed("বাংলা নোট.docx"));
        assert!(!extension_allowed("archive.zip"));
        assert!(!extension_allowed("script.sh"));
        assert!(!extension_allowed("noextension"));
        assert!(!extension_allowed(".pdf"));
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected_without_touching_store() {
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let manager = FileManager::new(Arc::new(pool), dir.path().to_path_buf());

        let request = UploadRequest {
            topic: "Big".to_string(),
            original_name: Some("big.pdf".to_string()),
            content_type: Some("application/pdf".to_string()),
            bytes: vec![0u8; MAX_FILE_SIZE + 1],
        };
        assert!(matches!(
            manager.store_upload(request).await,
            Err(FileError::FileTooLarge)
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_without_file_part_rejected() {
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let manager = FileManager::new(Arc::new(pool), dir.path().to_path_buf());

        let request = UploadRequest {
            topic: "Topic".to_string(),
            original_name: None,
            content_type: None,
            bytes: Vec::new(),
        };
        assert!(matches!(
            manager.store_upload(request).await,
            Err(FileError::NoFileProvided)
        ));
    }

    #[tokio::test]
    async fn test_upload_with_blank_topic_rejected() {
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let manager = FileManager::new(Arc::new(pool), dir.path().to_path_buf());

        let request = UploadRequest {
            topic: "   ".to_string(),
            original_name: Some("notes.pdf".to_string()),
            content_type: None,
            bytes: b"content".to_vec(),
        };
        assert!(matches!(
            manager.store_upload(request).await,
            Err(FileError::MissingTopic)
        ));
    }

    #[tokio::test]
    async fn test_unsupported_extension_rejected() {
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let manager = FileManager::new(Arc::new(pool), dir.path().to_path_buf());

        let request = UploadRequest {
            topic: "Malware".to_string(),
            original_name: Some("tool.exe".to_string()),
            content_type: None,
            bytes: b"MZ".to_vec(),
        };
        assert!(matches!(
            manager.store_upload(request).await,
            Err(FileError::UnsupportedType)
        ));
    }
}
