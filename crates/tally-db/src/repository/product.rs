//! # Product Repository
//!
//! The inventory ledger: product records and their stock counts.
//!
//! ## Stock Movements
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock is only ever changed by delta                  │
//! │                                                                         │
//! │  ❌ WRONG: read, compute, write back (lost update under concurrency)   │
//! │     SELECT stock ...;  UPDATE products SET stock = 7 ...               │
//! │                                                                         │
//! │  ✅ CORRECT: guarded delta in one statement                             │
//! │     UPDATE products SET stock = stock - 3                              │
//! │     WHERE id = ? AND stock >= 3                                        │
//! │                                                                         │
//! │  rows_affected = 0  ──►  InsufficientStock (nothing changed)           │
//! │  CHECK (stock >= 0) on the column catches anything that slips past.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Deletion
//! A product referenced by any invoice or proforma line cannot be deleted.
//! The repository counts references first and reports
//! [`CoreError::ProductInUse`]; the `ON DELETE RESTRICT` foreign keys back
//! that up at the schema level.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::begin_write;
use crate::repository::category::ensure_category;
use tally_core::{CoreError, Product, ValidationError, MAX_STOCK};

const PRODUCT_COLUMNS: &str = "id, name, imei, selling_price_cents, purchase_price_cents, \
     tax_rate_bps, category, stock, agency_name, created_at, updated_at";

// =============================================================================
// Inputs
// =============================================================================

/// Fields for a new product. Validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub imei: Option<String>,
    pub selling_price_cents: i64,
    pub purchase_price_cents: i64,
    pub tax_rate_bps: u32,
    pub category: Option<String>,
    pub stock: i64,
    pub agency_name: String,
}

/// Partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub imei: Option<String>,
    pub selling_price_cents: Option<i64>,
    pub purchase_price_cents: Option<i64>,
    pub tax_rate_bps: Option<u32>,
    pub category: Option<String>,
    pub stock: Option<i64>,
    pub agency_name: Option<String>,
}

impl ProductUpdate {
    fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(imei) = self.imei {
            product.imei = if imei.is_empty() { None } else { Some(imei) };
        }
        if let Some(price) = self.selling_price_cents {
            product.selling_price_cents = price;
        }
        if let Some(price) = self.purchase_price_cents {
            product.purchase_price_cents = price;
        }
        if let Some(bps) = self.tax_rate_bps {
            product.tax_rate_bps = bps;
        }
        if let Some(category) = self.category {
            product.category = if category.is_empty() { None } else { Some(category) };
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(agency) = self.agency_name {
            product.agency_name = agency;
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let products = db.products().list().await?;
/// let product = db.products().get_by_id("uuid-here").await?;
/// db.products().restock("uuid-here", 10).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists all products, newest first.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts a new product, registering its category name.
    pub async fn create(&self, new: NewProduct) -> DbResult<Product> {
        debug!(name = %new.name, "Inserting product");

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            imei: new.imei.filter(|s| !s.is_empty()),
            selling_price_cents: new.selling_price_cents,
            purchase_price_cents: new.purchase_price_cents,
            tax_rate_bps: new.tax_rate_bps,
            category: new.category.filter(|s| !s.is_empty()),
            stock: new.stock,
            agency_name: new.agency_name,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        if let Some(category) = &product.category {
            ensure_category(&mut tx, category).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, imei, selling_price_cents, purchase_price_cents,
                tax_rate_bps, category, stock, agency_name, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.imei)
        .bind(product.selling_price_cents)
        .bind(product.purchase_price_cents)
        .bind(product.tax_rate_bps)
        .bind(&product.category)
        .bind(product.stock)
        .bind(&product.agency_name)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %product.id, name = %product.name, stock = product.stock, "Product created");
        Ok(product)
    }

    /// Applies a partial update.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, id: &str, update: ProductUpdate) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let mut tx = begin_write(&self.pool).await?;

        let mut product = fetch_product(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        update.apply(&mut product);
        product.updated_at = Utc::now();

        if let Some(category) = &product.category {
            ensure_category(&mut tx, category).await?;
        }

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                imei = ?3,
                selling_price_cents = ?4,
                purchase_price_cents = ?5,
                tax_rate_bps = ?6,
                category = ?7,
                stock = ?8,
                agency_name = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.imei)
        .bind(product.selling_price_cents)
        .bind(product.purchase_price_cents)
        .bind(product.tax_rate_bps)
        .bind(&product.category)
        .bind(product.stock)
        .bind(&product.agency_name)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(product)
    }

    /// Deletes a product that no line item references.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    /// * `Err(DbError::Domain(CoreError::ProductInUse))` - still referenced
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let mut tx = begin_write(&self.pool).await?;

        let references: i64 = sqlx::query_scalar(
            r#"
            SELECT
                (SELECT COUNT(*) FROM invoice_items WHERE product_id = ?1) +
                (SELECT COUNT(*) FROM proforma_items WHERE product_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if references > 0 {
            return Err(CoreError::ProductInUse {
                product_id: id.to_string(),
            }
            .into());
        }

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => CoreError::ProductInUse {
                    product_id: id.to_string(),
                }
                .into(),
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        tx.commit().await?;

        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// Adds units to stock.
    ///
    /// ## Arguments
    /// * `id` - Product ID
    /// * `quantity` - Units received (positive, validated by the caller)
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    /// * `Err(Domain(Validation(OutOfRange)))` - stock would pass [`MAX_STOCK`]
    pub async fn restock(&self, id: &str, quantity: i64) -> DbResult<Product> {
        debug!(id = %id, quantity = quantity, "Restocking product");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE products SET stock = stock + ?2, updated_at = ?3 \
             WHERE id = ?1 AND stock <= ?4 - ?2",
        )
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .bind(MAX_STOCK)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return match fetch_product(&mut tx, id).await? {
                Some(_) => Err(CoreError::from(ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 1,
                    max: MAX_STOCK,
                })
                .into()),
                None => Err(DbError::not_found("Product", id)),
            };
        }

        let product = fetch_product(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        tx.commit().await?;

        info!(id = %id, stock = product.stock, "Product restocked");
        Ok(product)
    }
}

// =============================================================================
// Connection-level helpers (used inside document transactions)
// =============================================================================

/// Loads one product on the given connection.
pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Loads every product referenced by the given table's `product_id` column.
pub(crate) async fn fetch_referenced_products(
    pool: &SqlitePool,
    items_table: &str,
) -> DbResult<Vec<Product>> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE id IN (SELECT DISTINCT product_id FROM {items_table})"
    );
    let products = sqlx::query_as::<_, Product>(&sql).fetch_all(pool).await?;

    Ok(products)
}

/// Takes `quantity` units from stock, refusing to go below zero.
///
/// Single guarded statement: the check and the decrement cannot be split
/// by a concurrent writer.
pub(crate) async fn deduct_stock(
    conn: &mut SqliteConnection,
    product: &Product,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE products SET stock = stock - ?1, updated_at = ?2 WHERE id = ?3 AND stock >= ?1",
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(&product.id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(&product.id)
            .fetch_optional(&mut *conn)
            .await?;

        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available: available.unwrap_or(0),
            requested: quantity,
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
