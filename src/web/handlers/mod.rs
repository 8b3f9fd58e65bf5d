//! API handlers and their shared state.

pub mod admin;
pub mod auth;
pub mod file;

pub use admin::*;
pub use auth::*;
pub use file::*;

use jsonwebtoken::{encode, EncodingKey, Header};

use crate::db::{User, UserRepository};
use crate::file::{AccessScope, FileService, FileStorage, DEFAULT_MAX_FILE_SIZE};
use crate::web::error::ApiError;
use crate::web::middleware::JwtClaims;
use crate::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database pool.
    pub db: Database,
    /// Backing store for file contents.
    pub storage: FileStorage,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
    /// Largest accepted upload, per file, in bytes.
    pub max_upload_size: u64,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, storage: FileStorage, jwt_secret: &str, access_expiry: u64) -> Self {
        Self {
            db,
            storage,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            access_token_expiry: access_expiry,
            max_upload_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set the per-file upload limit.
    pub fn with_max_upload_size(mut self, bytes: u64) -> Self {
        self.max_upload_size = bytes;
        self
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user: &User) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    /// File operations bound to this state's database and storage.
    pub fn files(&self) -> FileService<'_> {
        FileService::new(&self.db, &self.storage).with_max_file_size(self.max_upload_size)
    }

    /// Load the account behind a verified token.
    ///
    /// Tokens of deleted accounts are rejected as unauthenticated; those of
    /// deactivated accounts as forbidden.
    pub async fn current_user(&self, claims: &JwtClaims) -> Result<User, ApiError> {
        let user = UserRepository::new(self.db.pool())
            .get_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("User not found"))?;

        if !user.is_active {
            return Err(ApiError::forbidden("Account is disabled"));
        }

        Ok(user)
    }

    /// Resolve the access scope of a request from its token and `?user_id=`.
    pub async fn scope(
        &self,
        claims: &JwtClaims,
        requested_owner: Option<i64>,
    ) -> Result<AccessScope, ApiError> {
        let actor = self.current_user(claims).await?;
        let users = UserRepository::new(self.db.pool());
        Ok(AccessScope::resolve(&users, actor, requested_owner).await?)
    }
}
