//! # tally-db: Database Layer for Tally Billing
//!
//! This crate provides database access for the Tally Billing system.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Billing Data Flow                          │
//! │                                                                         │
//! │  HTTP handler (POST /api/bills/create/)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo    │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InvoiceRepo    │   │ 001_initial_ │  │   │
//! │  │   │ Connection    │    │ ProformaRepo   │   │   schema.sql │  │   │
//! │  │   │ Management    │    │ ReportRepo ... │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (./tally.db)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, invoice, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! // Migrations run on connect unless disabled in the config
//! let db = Database::new(DbConfig::new("./tally.db")).await?;
//!
//! let products = db.products().list().await?;
//! let report = db.reports().summary(None, Utc::now().date_naive()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::invoice::{InvoiceDetails, InvoiceLine, InvoiceRepository, LineRequest, NewInvoice};
pub use repository::product::{NewProduct, ProductRepository, ProductUpdate};
pub use repository::proforma::{
    NewProforma, ProformaDetails, ProformaLine, ProformaLineRequest, ProformaRepository,
};
pub use repository::report::{DateRange, ReportRepository, SalesReport};
pub use repository::returns::{NewReturn, ReturnDetails, ReturnRepository};
pub use repository::service::{NewService, ServiceRepository};
pub use repository::user::{NewUser, UserRepository};
