//! # Category Repository
//!
//! Category names are a label registry. Products store the name itself, and
//! writing a product with a new name registers it here (get-or-create).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::Category;

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Lists categories alphabetically.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Creates a category.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name already registered
    pub async fn create(&self, name: &str) -> DbResult<Category> {
        debug!(name = %name, "Creating category");

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(category.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                    field,
                    value: name.to_string(),
                },
                other => other,
            })?;

        Ok(category)
    }

    /// Gets a category by exact name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }
}

/// Registers `name` unless it already exists. Runs on the caller's
/// connection so product writes and the registration commit together.
pub(crate) async fn ensure_category(conn: &mut SqliteConnection, name: &str) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT (name) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};

    #[tokio::test]
    async fn test_create_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.categories().create("Mobiles").await.unwrap();
        db.categories().create("Accessories").await.unwrap();

        let names: Vec<String> = db
            .categories()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Accessories", "Mobiles"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.categories().create("Mobiles").await.unwrap();

        let err = db.categories().create("Mobiles").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "Mobiles"));
    }

    #[tokio::test]
    async fn test_ensure_category_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        super::ensure_category(&mut conn, "Chargers").await.unwrap();
        super::ensure_category(&mut conn, "Chargers").await.unwrap();
        drop(conn);

        assert_eq!(db.categories().list().await.unwrap().len(), 1);
        assert!(db.categories().get_by_name("Chargers").await.unwrap().is_some());
    }
}
