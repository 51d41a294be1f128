//! Authentication manager implementation.

use super::{
    errors::{AuthError, AuthResult},
    models::{
        Account, AccountId, AuthClaims, EduLevel, KnowledgeLevel, RegisterRequest, Role,
        UserWithFile,
    },
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use futures_util::future::join_all;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::warn;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::sync::Arc;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Bearer tokens expire after this window; there is no server-side
/// revocation, logout is client-side token discard.
const TOKEN_LIFETIME_HOURS: i64 = 24;

const ACCOUNT_COLUMNS: &str = "id, name, email, whatsapp, edu_level, knowledge_level, role, \
     source_platform, registered_for_file, created_at, updated_at";

/// Authentication manager: credential store plus stateless token service.
#[derive(Clone)]
pub struct AuthManager {
    pool: Arc<PgPool>,
    pepper: String,
    jwt_secret: String,
    token_duration: Duration,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `pepper` - Server-side pepper for password hashing
    /// * `jwt_secret` - Secret key for JWT signing
    pub fn new(pool: Arc<PgPool>, pepper: String, jwt_secret: String) -> Self {
        Self {
            pool,
            pepper,
            jwt_secret,
            token_duration: Duration::hours(TOKEN_LIFETIME_HOURS),
        }
    }

    /// Register a new visitor account with role `user`.
    ///
    /// The email is lowercased before storage so uniqueness is
    /// case-insensitive. A concurrent registration racing on the same email
    /// loses on the unique index and gets `DuplicateEmail`, same as the
    /// pre-check path.
    ///
    /// # Errors
    ///
    /// * `AuthError::MissingFields` - a required field is empty
    /// * `AuthError::WeakPassword` - password shorter than 6 characters
    /// * `AuthError::DuplicateEmail` - email already registered
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<Account> {
        let name = request.name.trim();
        let whatsapp = request.whatsapp.trim();
        let email = request.email.trim().to_lowercase();

        if name.is_empty() || email.is_empty() || whatsapp.is_empty() || request.password.is_empty()
        {
            return Err(AuthError::MissingFields);
        }
        self.validate_password(&request.password)?;

        let existing = sqlx::query("SELECT id FROM accounts WHERE lower(email) = $1")
            .bind(&email)
            .fetch_optional(self.pool.as_ref())
            .await?;
        if existing.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        // Associate the registrant with the requested file only when the
        // record actually exists; a stale id degrades to no association.
        let file_id = match request.file_id {
            Some(id) => sqlx::query("SELECT id FROM file_records WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?
                .map(|_| id),
            None => None,
        };

        let password_hash = self.hash_password(&request.password)?;
        let source_platform = request
            .source_platform
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Direct");

        let row = sqlx::query(&format!(
            "INSERT INTO accounts \
                 (name, email, whatsapp, edu_level, knowledge_level, password_hash, role, \
                  source_platform, registered_for_file) \
             VALUES ($1, $2, $3, $4, $5, $6, 'user', $7, $8) \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(name)
        .bind(&email)
        .bind(whatsapp)
        .bind(request.edu_level.map(|l| l.as_str()))
        .bind(request.knowledge_level.map(|l| l.as_str()))
        .bind(&password_hash)
        .bind(source_platform)
        .bind(file_id)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| {
            if unique_violation(&e, "accounts_email_key") {
                AuthError::DuplicateEmail
            } else {
                AuthError::Database(e)
            }
        })?;

        Ok(account_from_row(&row))
    }

    /// Bootstrap the singleton admin account.
    ///
    /// Only permitted while no admin exists. The insert carries its own
    /// `WHERE NOT EXISTS` guard and the schema holds a partial unique index
    /// on the admin role, so two concurrent bootstrap calls cannot both
    /// succeed.
    pub async fn register_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<Account> {
        let name = name.trim();
        let email = email.trim().to_lowercase();
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }
        self.validate_password(password)?;

        if self.find_admin().await?.is_some() {
            return Err(AuthError::AdminExists);
        }

        let password_hash = self.hash_password(password)?;

        let row = sqlx::query(&format!(
            "INSERT INTO accounts (name, email, password_hash, role) \
             SELECT $1, $2, $3, 'admin' \
             WHERE NOT EXISTS (SELECT 1 FROM accounts WHERE role = 'admin') \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(name)
        .bind(&email)
        .bind(&password_hash)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| {
            if unique_violation(&e, "accounts_admin_singleton") {
                AuthError::AdminExists
            } else if unique_violation(&e, "accounts_email_key") {
                AuthError::DuplicateEmail
            } else {
                AuthError::Database(e)
            }
        })?;

        row.map(|r| account_from_row(&r)).ok_or(AuthError::AdminExists)
    }

    /// Authenticate any account by email and password and mint a token.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidCredentials` - unknown email or wrong password;
    ///   the two cases are deliberately indistinguishable
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<(Account, String)> {
        let (account, password_hash) = self
            .fetch_with_hash(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        self.verify_password(password, &password_hash)?;

        let token = self.issue_token(account.id, account.role)?;
        Ok((account, token))
    }

    /// Authenticate the admin account. A matching `user`-role account is
    /// rejected exactly like a wrong password.
    pub async fn login_admin(&self, email: &str, password: &str) -> AuthResult<(Account, String)> {
        let (account, password_hash) = self
            .fetch_with_hash(email)
            .await?
            .filter(|(account, _)| account.role == Role::Admin)
            .ok_or(AuthError::InvalidCredentials)?;

        self.verify_password(password, &password_hash)?;

        let token = self.issue_token(account.id, account.role)?;
        Ok((account, token))
    }

    /// Issue a signed bearer token asserting identity and role.
    pub fn issue_token(&self, account_id: AccountId, role: Role) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AuthClaims {
            sub: account_id,
            role,
            exp: (now + self.token_duration).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Verify a bearer token. Verification is a pure function of the token
    /// and the shared secret; no session state is consulted.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - missing, malformed, expired, or badly
    ///   signed
    pub fn verify_token(&self, token: &str) -> AuthResult<AuthClaims> {
        let token_data = decode::<AuthClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidToken)?;

        Ok(token_data.claims)
    }

    /// Find an account by id
    pub async fn find_by_id(&self, id: AccountId) -> AuthResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| account_from_row(&r)))
    }

    /// Find an account by email, case-insensitively
    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE lower(email) = $1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| account_from_row(&r)))
    }

    /// Return the singleton admin account, if bootstrapped
    pub async fn find_admin(&self) -> AuthResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = 'admin'"
        ))
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| account_from_row(&r)))
    }

    /// List all `user`-role accounts, newest first, each expanded with the
    /// topic of the file it registered for. Password hashes never leave the
    /// store.
    pub async fn list_users(&self) -> AuthResult<Vec<UserWithFile>> {
        let rows = sqlx::query(
            "SELECT a.id, a.name, a.email, a.whatsapp, a.edu_level, a.knowledge_level, a.role, \
                    a.source_platform, a.registered_for_file, a.created_at, a.updated_at, \
                    f.topic AS registered_file_topic \
             FROM accounts a \
             LEFT JOIN file_records f ON a.registered_for_file = f.id \
             WHERE a.role = 'user' \
             ORDER BY a.created_at DESC",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .iter()
            .map(|row| UserWithFile {
                account: account_from_row(row),
                registered_file_topic: row.get("registered_file_topic"),
            })
            .collect())
    }

    /// Delete a `user`-role account. Returns whether a row was removed.
    /// The admin account cannot be deleted through this path.
    pub async fn delete_user(&self, id: AccountId) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1 AND role = 'user'")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bulk delete by identifier set: one independent delete per id, run
    /// concurrently with no cross-operation atomicity. Missing identifiers
    /// are skipped; only the aggregate count of removed rows is reported.
    pub async fn delete_users(&self, ids: &[AccountId]) -> usize {
        let outcomes = join_all(ids.iter().map(|id| self.delete_user(*id))).await;
        outcomes
            .into_iter()
            .filter(|outcome| match outcome {
                Ok(deleted) => *deleted,
                Err(e) => {
                    warn!("Bulk user delete failed for one id: {e}");
                    false
                }
            })
            .count()
    }

    /// Reset the password hash of an existing account. This is the only
    /// mutation an account undergoes after creation.
    pub async fn reset_password(&self, email: &str, new_password: &str) -> AuthResult<()> {
        self.validate_password(new_password)?;
        let password_hash = self.hash_password(new_password)?;

        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $1, updated_at = now() WHERE lower(email) = $2",
        )
        .bind(&password_hash)
        .bind(email.trim().to_lowercase())
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::AccountNotFound);
        }
        Ok(())
    }

    /// Reset the singleton admin's password (maintenance path).
    pub async fn reset_admin_password(&self, new_password: &str) -> AuthResult<Account> {
        let admin = self.find_admin().await?.ok_or(AuthError::AccountNotFound)?;
        self.reset_password(&admin.email, new_password).await?;
        Ok(admin)
    }

    async fn fetch_with_hash(&self, email: &str) -> AuthResult<Option<(Account, String)>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS}, password_hash FROM accounts WHERE lower(email) = $1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| {
            let hash: String = r.get("password_hash");
            (account_from_row(&r), hash)
        }))
    }

    /// Hash password with Argon2id + pepper
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        Ok(argon2
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash; the argon2 verifier compares digests in
    /// constant time, plaintext is never compared.
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
        let argon2 = Argon2::default();

        argon2
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    fn validate_password(&self, password: &str) -> AuthResult<()> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }
        Ok(())
    }
}

fn account_from_row(row: &PgRow) -> Account {
    let role: String = row.get("role");
    let edu_level: Option<String> = row.get("edu_level");
    let knowledge_level: Option<String> = row.get("knowledge_level");
    Account {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        whatsapp: row.get("whatsapp"),
        edu_level: edu_level.as_deref().and_then(EduLevel::from_label),
        knowledge_level: knowledge_level
            .as_deref()
            .and_then(KnowledgeLevel::from_label),
        role: Role::parse(&role),
        source_platform: row.get("source_platform"),
        registered_for_file: row.get("registered_for_file"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => db.constraint() == Some(constraint),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    // A lazy pool never opens a connection, so the pure hashing and token
    // paths can be exercised without Postgres.
    fn test_manager() -> AuthManager {
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        AuthManager::new(
            Arc::new(pool),
            "test_pepper_for_testing_only".to_string(),
            "test_secret_key_for_testing_only".to_string(),
        )
    }

    #[tokio::test]
    async fn test_password_hash_and_verify() {
        let manager = test_manager();
        let hash = manager.hash_password("secret1").unwrap();
        assert_ne!(hash, "secret1");
        manager.verify_password("secret1", &hash).unwrap();
        assert!(matches!(
            manager.verify_password("secret2", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_token_round_trip_carries_identity_and_role() {
        let manager = test_manager();
        let token = manager.issue_token(42, Role::Admin).unwrap();
        let claims = manager.verify_token(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let manager = test_manager();
        let now = Utc::now().timestamp();
        let claims = AuthClaims {
            sub: 1,
            role: Role::User,
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test_secret_key_for_testing_only".as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            manager.verify_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_token_with_wrong_secret_rejected() {
        let manager = test_manager();
        let claims = AuthClaims {
            sub: 1,
            role: Role::Admin,
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
        };
        let forged = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"some_other_secret_entirely_here"),
        )
        .unwrap();

        assert!(matches!(
            manager.verify_token(&forged),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let manager = test_manager();
        assert!(matches!(
            manager.verify_token("not-a-jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_missing_fields_before_touching_store() {
        let manager = test_manager();
        let request = RegisterRequest {
            name: "  ".to_string(),
            email: "x@example.com".to_string(),
            whatsapp: "+880".to_string(),
            password: "secret1".to_string(),
            edu_level: None,
            knowledge_level: None,
            source_platform: None,
            file_id: None,
        };
        assert!(matches!(
            manager.register(request).await,
            Err(AuthError::MissingFields)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let manager = test_manager();
        let request = RegisterRequest {
            name: "Rahim".to_string(),
            email: "rahim@example.com".to_string(),
            whatsapp: "+8801700000000".to_string(),
            password: "12345".to_string(),
            edu_level: None,
            knowledge_level: None,
            source_platform: None,
            file_id: None,
        };
        assert!(matches!(
            manager.register(request).await,
            Err(AuthError::WeakPassword(6))
        ));
    }
}
