//! Page shells.
//!
//! The pages are static HTML frames; the browser fills them in by calling
//! the JSON API. A refused staff-only or admin-only page lands on `/billing`
//! with a `denied` query flag that is rendered here as a flash message.

use axum::extract::Query;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tally_core::access::{BILLING_PATH, STAFF_ONLY_MESSAGE};
use tracing::warn;

use crate::middleware::{CurrentUser, DENIED_ADMIN, DENIED_STAFF};

/// Shown when a non-admin opens the proforma page.
pub const ADMIN_ONLY_MESSAGE: &str = "Only administrators can create proforma invoices.";

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub denied: Option<String>,
}

impl PageQuery {
    fn flash(&self) -> Option<&'static str> {
        match self.denied.as_deref() {
            Some(DENIED_STAFF) => Some(STAFF_ONLY_MESSAGE),
            Some(DENIED_ADMIN) => Some(ADMIN_ONLY_MESSAGE),
            _ => None,
        }
    }
}

pub async fn billing(user: CurrentUser, Query(query): Query<PageQuery>) -> Html<String> {
    render_page("Billing", Some(&user), query.flash(), r#"<section id="billing" data-api="/api/bills/"></section>"#)
}

pub async fn inventory(user: CurrentUser, Query(query): Query<PageQuery>) -> Html<String> {
    render_page(
        "Inventory",
        Some(&user),
        query.flash(),
        r#"<section id="inventory" data-api="/api/products/"></section>"#,
    )
}

pub async fn invoice(user: CurrentUser, Query(query): Query<PageQuery>) -> Html<String> {
    render_page("Invoices", Some(&user), query.flash(), r#"<section id="invoices" data-api="/api/bills/"></section>"#)
}

pub async fn service(user: CurrentUser, Query(query): Query<PageQuery>) -> Html<String> {
    render_page(
        "Service",
        Some(&user),
        query.flash(),
        r#"<section id="services" data-api="/api/services/"></section>"#,
    )
}

pub async fn reports(user: CurrentUser, Query(query): Query<PageQuery>) -> Html<String> {
    render_page("Reports", Some(&user), query.flash(), r#"<section id="reports" data-api="/api/reports/"></section>"#)
}

/// Admin-only page. Everyone else goes back to billing with a message.
pub async fn proforma_invoice(user: CurrentUser, Query(query): Query<PageQuery>) -> Response {
    if !user.level.is_admin() {
        warn!(username = %user.username, "Proforma page refused");
        return Redirect::to(&format!("{BILLING_PATH}?denied={DENIED_ADMIN}")).into_response();
    }

    render_page(
        "Proforma Invoice",
        Some(&user),
        query.flash(),
        r#"<section id="proforma" data-api="/api/proforma/"></section>"#,
    )
    .into_response()
}

// =============================================================================
// Layout
// =============================================================================

/// Wraps `body` in the shared layout.
///
/// `flash` is always one of the fixed messages in this crate, never user
/// input, so it is written without escaping.
pub fn render_page(
    title: &str,
    user: Option<&CurrentUser>,
    flash: Option<&str>,
    body: &str,
) -> Html<String> {
    let nav = match user {
        Some(user) => {
            let mut links = vec![
                r#"<a href="/billing">Billing</a>"#,
                r#"<a href="/service">Service</a>"#,
            ];
            if user.level.is_staff_or_admin() {
                links.push(r#"<a href="/inventory">Inventory</a>"#);
                links.push(r#"<a href="/invoice">Invoices</a>"#);
                links.push(r#"<a href="/reports">Reports</a>"#);
            }
            if user.level.is_admin() {
                links.push(r#"<a href="/proforma-invoice">Proforma</a>"#);
            }
            links.push(r#"<a href="/logout">Log out</a>"#);
            format!("<nav>{}</nav>", links.join(" "))
        }
        None => String::new(),
    };

    let flash = flash
        .map(|message| format!(r#"<p class="flash error">{message}</p>"#))
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Tally</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
{nav}
<main>
<h1>{title}</h1>
{flash}
{body}
</main>
</body>
</html>
"#
    ))
}
