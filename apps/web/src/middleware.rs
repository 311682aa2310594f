//! # Access Middleware
//!
//! Resolves the caller's session and applies the path policy from
//! [`tally_core::access`] before any handler runs.
//!
//! ```text
//! request
//!   │
//!   ├── Authorization: Bearer <jwt>  ─┐
//!   ├── Cookie: tally_session=<jwt>  ─┴─► validate ─► users row (active?)
//!   │                                                    │
//!   │                        AccessLevel ◄───────────────┘
//!   ▼
//! evaluate(path, level)
//!   ├── Allow               → CurrentUser in extensions, run handler
//!   ├── RedirectToLogin     → pages: 303 /login      api: 401 JSON
//!   └── RedirectWithMessage → pages: 303 /billing?denied=staff
//!                                                     api: 403 JSON
//! ```
//!
//! An invalid or expired token is treated as no session at all, so a stale
//! cookie never locks anyone out of the login page.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use tally_core::access::{evaluate, AccessDecision, LOGIN_PATH};
use tally_core::{AccessLevel, Requirement};
use tracing::{debug, warn};

use crate::auth::{extract_bearer_token, SESSION_COOKIE};
use crate::error::ApiError;
use crate::state::AppState;

/// Query flag appended to the billing redirect for staff-only paths.
pub const DENIED_STAFF: &str = "staff";

/// Query flag appended to the billing redirect for admin-only pages.
pub const DENIED_ADMIN: &str = "admin";

/// The logged-in caller, as resolved by [`access_policy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub level: AccessLevel,
}

impl CurrentUser {
    /// Fails with 403 unless the caller meets `requirement`.
    pub fn require(&self, requirement: Requirement) -> Result<(), ApiError> {
        if self.level.satisfies(requirement) {
            return Ok(());
        }

        warn!(username = %self.username, ?requirement, "Endpoint refused");
        let message = match requirement {
            Requirement::Admin => "Admin access required",
            _ => "Staff or admin access required",
        };
        Err(ApiError::forbidden(message))
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthenticated("Authentication required"))
    }
}

impl<S> OptionalFromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}

/// Middleware applying the access policy to every routed request.
pub async fn access_policy(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let user = match resolve_session(&state, &jar, req.headers()).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    let level = user.as_ref().map_or(AccessLevel::Anonymous, |u| u.level);
    let path = req.uri().path().to_owned();
    let is_api = is_api_path(&path);

    match evaluate(&path, level) {
        AccessDecision::Allow => {
            if let Some(user) = user {
                req.extensions_mut().insert(user);
            }
            next.run(req).await
        }
        AccessDecision::RedirectToLogin => {
            debug!(path = %path, "Anonymous request refused");
            if is_api {
                ApiError::unauthenticated("Authentication required").into_response()
            } else {
                Redirect::to(LOGIN_PATH).into_response()
            }
        }
        AccessDecision::RedirectWithMessage { location, message } => {
            warn!(
                path = %path,
                username = user.as_ref().map(|u| u.username.as_str()).unwrap_or_default(),
                "Staff-only path refused"
            );
            if is_api {
                ApiError::forbidden(message).into_response()
            } else {
                Redirect::to(&format!("{location}?denied={DENIED_STAFF}")).into_response()
            }
        }
    }
}

/// Finds the session token and loads the user it names.
///
/// Returns `Ok(None)` for no token, a bad token, or a user that no longer
/// exists or was deactivated.
async fn resolve_session(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Result<Option<CurrentUser>, ApiError> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer_token);

    let token = match bearer {
        Some(token) => token.to_string(),
        None => match jar.get(SESSION_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => return Ok(None),
        },
    };

    let claims = match state.jwt.validate_token(&token) {
        Ok(claims) => claims,
        Err(_) => {
            debug!("Ignoring invalid session token");
            return Ok(None);
        }
    };

    let user = match state.db.users().get_by_id(&claims.sub).await? {
        Some(user) if user.is_active => user,
        _ => {
            debug!(user_id = %claims.sub, "Session for missing or inactive user");
            return Ok(None);
        }
    };

    Ok(Some(CurrentUser {
        level: user.access_level(),
        id: user.id,
        username: user.username,
    }))
}

/// `true` for JSON endpoints, which get status codes instead of redirects.
pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}
