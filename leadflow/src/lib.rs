//! # LeadFlow
//!
//! A lead-generation gate: visitors arriving from social-media links register
//! with contact details in exchange for a file download, while an
//! administrator uploads files, tracks registrants, and exports leads.
//!
//! ## Core Modules
//!
//! - [`auth`]: credential store, password hashing, and stateless JWT tokens
//! - [`files`]: uploaded-file metadata plus on-disk byte storage
//! - [`db`]: PostgreSQL connection pooling and schema migrations
//! - [`source`]: source-platform attribution from query params and referrers
//! - [`export`]: delimited-text lead export
//! - [`notify`]: best-effort welcome email pointing at the download link
//!
//! The HTTP surface lives in the companion `lf_server` crate; nothing in this
//! library depends on a web framework.

pub mod auth;
pub mod db;
pub mod export;
pub mod files;
pub mod notify;
pub mod source;

pub use auth::{AuthManager, AuthClaims, Role};
pub use db::{Database, DatabaseConfig};
pub use files::FileManager;
pub use notify::Mailer;
