//! # User Repository
//!
//! Login accounts. Passwords are stored as Argon2 PHC strings and are never
//! read back out of this module in plain form.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use rand_core::OsRng;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::User;

const USER_COLUMNS: &str = "id, username, password_hash, is_staff, is_admin, is_active, created_at";

/// An account to create.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub is_staff: bool,
    pub is_admin: bool,
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an active account with a hashed password.
    ///
    /// ## Returns
    /// * `Err(UniqueViolation)` - username already taken
    pub async fn create(&self, new: &NewUser) -> DbResult<User> {
        debug!(username = %new.username, "Creating user");

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new.username.clone(),
            password_hash: hash_password(&new.password)?,
            is_staff: new.is_staff,
            is_admin: new.is_admin,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, is_staff, is_admin, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(user.is_admin)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &new.username),
            other => other,
        })?;

        info!(username = %user.username, is_staff = user.is_staff, is_admin = user.is_admin, "User created");
        Ok(user)
    }

    /// Gets a user by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets a user by username.
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Checks credentials.
    ///
    /// Returns `None` for an unknown username, a wrong password, or an
    /// inactive account. Callers cannot tell these apart.
    pub async fn authenticate(&self, username: &str, password: &str) -> DbResult<Option<User>> {
        let Some(user) = self.find_by_username(username).await? else {
            debug!(username = %username, "Login for unknown user");
            return Ok(None);
        };

        if !user.is_active {
            warn!(username = %username, "Login attempt on inactive account");
            return Ok(None);
        }

        if !verify_password(password, &user.password_hash) {
            debug!(username = %username, "Password mismatch");
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Counts all users.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Hashes a password for storage.
fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {e}")))?;

    Ok(hash.to_string())
}

/// Verifies a password against its stored hash. A malformed hash never
/// matches.
fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================
