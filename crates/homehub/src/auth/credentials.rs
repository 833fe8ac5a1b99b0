use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::store::{Database, Record, StoreError};

pub type UserId = u64;

/// Longest accepted email address (RFC 5321 path limit)
const MAX_EMAIL_LENGTH: usize = 254;

/// A registered account. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Username must be at least {0} characters long")]
    InvalidUsername(usize),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Password must be at least {0} characters long")]
    WeakPassword(usize),

    #[error("Username already registered")]
    UsernameTaken,

    #[error("Email already registered")]
    EmailTaken,

    #[error("user not found")]
    NotFound,

    #[error("password mismatch")]
    BadPassword,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Holds user records and checks passwords against their stored hashes
pub struct CredentialStore {
    db: Arc<Database>,
    min_username_length: usize,
    min_password_length: usize,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>, auth: &AuthConfig) -> Self {
        Self {
            db,
            min_username_length: auth.min_username_length,
            min_password_length: auth.min_password_length,
        }
    }

    /// Register a new user.
    ///
    /// Username and email uniqueness are checked inside a write
    /// transaction, so of two racing signups for the same name exactly one
    /// succeeds.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, CredentialError> {
        if username.chars().count() < self.min_username_length {
            return Err(CredentialError::InvalidUsername(self.min_username_length));
        }
        if !is_valid_email(email) {
            return Err(CredentialError::InvalidEmail);
        }
        if password.chars().count() < self.min_password_length {
            return Err(CredentialError::WeakPassword(self.min_password_length));
        }

        let password_hash = hash_password(password.to_string()).await?;

        let tx = self.db.begin().await;

        let conflict = if self.db.users.find(|u| u.username == username).await.is_some() {
            Some(CredentialError::UsernameTaken)
        } else if self
            .db
            .users
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .await
            .is_some()
        {
            Some(CredentialError::EmailTaken)
        } else {
            None
        };
        if let Some(e) = conflict {
            warn!("Signup rejected for {}: {}", username, e);
            return Err(e);
        }

        let id = self.db.users.last_key().await.map_or(1, |last| last + 1);
        let user = User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
        };
        tx.commit(Record::User(user.clone())).await?;

        info!("Created user {} (id {})", user.username, user.id);
        Ok(user)
    }

    /// Check a username/password pair
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<User, CredentialError> {
        let user = self
            .find_by_username(username)
            .await
            .ok_or(CredentialError::NotFound)?;

        verify_password(password.to_string(), user.password_hash.clone()).await?;
        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Option<User> {
        self.db.users.find(|u| u.username == username).await
    }

    pub async fn get(&self, id: UserId) -> Option<User> {
        self.db.users.get(&id).await
    }
}

/// Syntactic email check: one `@`, non-empty local part, dotted domain, no whitespace
fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

/// Hash a password with Argon2id on the blocking pool
async fn hash_password(password: String) -> Result<String, CredentialError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hash(e.to_string()))
    })
    .await
    .map_err(|e| CredentialError::Hash(e.to_string()))?
}

/// Verify a password against a stored PHC hash string
async fn verify_password(password: String, hash: String) -> Result<(), CredentialError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash).map_err(|e| CredentialError::Hash(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| CredentialError::BadPassword)
    })
    .await
    .map_err(|e| CredentialError::Hash(e.to_string()))?
}
