//! # tally-web: HTTP Application
//!
//! axum server for the billing pages and the JSON API.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Request Pipeline                                │
//! │                                                                         │
//! │  TraceLayer (span per request)                                          │
//! │     │                                                                   │
//! │     ├── /health ─────────────────────────────► handlers::health         │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  access_policy middleware                                               │
//! │     │  session: Bearer token or tally_session cookie                    │
//! │     │  path rules: public / authenticated / staff-or-admin              │
//! │     ▼                                                                   │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────────┐  ┌──────────────────┐    │
//! │  │ /login   │  │ pages    │  │ /api/...     │  │ /static (files)  │    │
//! │  │ /logout  │  │ shells   │  │ JSON         │  │                  │    │
//! │  └──────────┘  └──────────┘  └──────┬───────┘  └──────────────────┘    │
//! │                                     │ per-endpoint role check          │
//! │                                     ▼                                   │
//! │                               tally-db repositories                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put, MethodRouter};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use config::WebConfig;
pub use state::AppState;

use handlers::{auth as login, bill, category, pages, product, proforma, report, returns, service};

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let app = Router::new()
        // Login
        .route("/", get(login::login_page))
        .route("/login", get(login::login_page).post(login::login))
        .route("/login/", get(login::login_page).post(login::login))
        .route("/logout", get(login::logout).post(login::logout))
        .route("/logout/", get(login::logout).post(login::logout));

    // Pages
    let app = with_slash(app, "/billing", get(pages::billing));
    let app = with_slash(app, "/inventory", get(pages::inventory));
    let app = with_slash(app, "/invoice", get(pages::invoice));
    let app = with_slash(app, "/service", get(pages::service));
    let app = with_slash(app, "/reports", get(pages::reports));
    let app = with_slash(app, "/proforma-invoice", get(pages::proforma_invoice));

    let app = app
        // Products
        .route("/api/products/", get(product::list))
        .route("/api/products/create/", post(product::create))
        .route("/api/products/{id}/", put(product::update))
        .route("/api/products/{id}/delete/", delete(product::delete))
        .route("/api/products/{id}/restock/", post(product::restock))
        // Categories
        .route("/api/categories/", get(category::list))
        .route("/api/categories/create/", post(category::create))
        // Bills
        .route("/api/bills/", get(bill::list))
        .route("/api/bills/create/", post(bill::create))
        // Services
        .route("/api/services/", get(service::list))
        .route("/api/services/create/", post(service::create))
        // Proformas
        .route("/api/proforma/", get(proforma::list))
        .route("/api/proforma/create/", post(proforma::create))
        .route("/api/proforma/{id}/link/", post(proforma::link))
        // Returns
        .route("/api/returns/", get(returns::list))
        .route("/api/returns/create/", post(returns::create))
        // Reports
        .route("/api/reports/", get(report::summary))
        // Assets
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(from_fn_with_state(state.clone(), middleware::access_policy))
        // Outside the access policy
        .route("/health", get(handlers::health));

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Registers `path` and `path/` with the same handler.
fn with_slash(
    router: Router<AppState>,
    path: &str,
    handler: MethodRouter<AppState>,
) -> Router<AppState> {
    router
        .route(path, handler.clone())
        .route(&format!("{path}/"), handler)
}
