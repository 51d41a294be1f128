//! Authentication and credential store.
//!
//! Persists accounts (registrants and the singleton admin) with argon2
//! password hashes and issues stateless, time-limited JWT bearer tokens.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{AuthError, AuthResult};
pub use manager::AuthManager;
pub use models::{
    Account, AccountId, AuthClaims, EduLevel, KnowledgeLevel, RegisterRequest, Role, UserWithFile,
};
