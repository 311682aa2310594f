//! # Service Repository
//!
//! Service jobs carry two business numbers, a job id (`SVC-`) and a service
//! invoice number (`SIN-`), both unique. No stock interaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::with_fresh_number;
use tally_core::{DocumentKind, Service};

const SERVICE_COLUMNS: &str = "id, service_id, service_invoice_no, customer_name, customer_phone, \
     service_type, issue, service_price_cents, created_by, created_at";

/// A service job to record. Validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewService {
    pub customer_name: String,
    pub customer_phone: String,
    pub service_type: String,
    pub issue: Option<String>,
    pub service_price_cents: i64,
    pub created_by: Option<String>,
}

/// Repository for service database operations.
#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
}

impl ServiceRepository {
    /// Creates a new ServiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ServiceRepository { pool }
    }

    /// Records a service job with fresh `SVC-` and `SIN-` numbers.
    pub async fn create(&self, new: &NewService) -> DbResult<Service> {
        with_fresh_number(
            DocumentKind::ServiceJob,
            &["services.service_id", "services.service_invoice_no"],
            |service_id| {
                let service_invoice_no = DocumentKind::ServiceInvoice.generate();
                self.insert_with_numbers(new, service_id, service_invoice_no)
            },
        )
        .await
    }

    async fn insert_with_numbers(
        &self,
        new: &NewService,
        service_id: String,
        service_invoice_no: String,
    ) -> DbResult<Service> {
        debug!(service_id = %service_id, "Creating service");

        let service = Service {
            id: Uuid::new_v4().to_string(),
            service_id,
            service_invoice_no,
            customer_name: new.customer_name.clone(),
            customer_phone: new.customer_phone.clone(),
            service_type: new.service_type.clone(),
            issue: new.issue.clone().filter(|s| !s.is_empty()),
            service_price_cents: new.service_price_cents,
            created_by: new.created_by.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO services (
                id, service_id, service_invoice_no, customer_name, customer_phone,
                service_type, issue, service_price_cents, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&service.id)
        .bind(&service.service_id)
        .bind(&service.service_invoice_no)
        .bind(&service.customer_name)
        .bind(&service.customer_phone)
        .bind(&service.service_type)
        .bind(&service.issue)
        .bind(service.service_price_cents)
        .bind(&service.created_by)
        .bind(service.created_at)
        .execute(&self.pool)
        .await?;

        info!(
            service_id = %service.service_id,
            service_invoice_no = %service.service_invoice_no,
            "Service recorded"
        );
        Ok(service)
    }

    /// Lists all services, newest first.
    pub async fn list(&self) -> DbResult<Vec<Service>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY created_at DESC, id");
        let services = sqlx::query_as::<_, Service>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(services)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use std::time::Duration;

    fn screen_repair() -> NewService {
        NewService {
            customer_name: "Ravi".to_string(),
            customer_phone: "9876543210".to_string(),
            service_type: "Screen replacement".to_string(),
            issue: Some("Cracked display".to_string()),
            service_price_cents: 250_000,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_both_numbers() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let service = db.services().create(&screen_repair()).await.unwrap();
        assert!(DocumentKind::ServiceJob.matches(&service.service_id));
        assert!(DocumentKind::ServiceInvoice.matches(&service.service_invoice_no));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let first = db.services().create(&screen_repair()).await.unwrap();
        std::thread::sleep(Duration::from_millis(2));
        let second = db.services().create(&screen_repair()).await.unwrap();

        let listed = db.services().list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }
}
