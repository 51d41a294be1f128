//! File record store and byte storage.
//!
//! Uploaded-file metadata lives in Postgres, the bytes on disk under a
//! managed content directory. Records and bytes are deliberately not
//! transactional: bytes are written before the record is inserted, so a
//! crash can orphan bytes but can never record a file whose bytes were
//! never written.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{FileError, FileResult};
pub use manager::{FileManager, UploadRequest, MAX_FILE_SIZE};
pub use models::{FileId, FileRecord};
