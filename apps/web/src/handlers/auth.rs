//! Login and logout.
//!
//! `POST /login` accepts either a browser form or a JSON body:
//!
//! ```text
//! form  ─► success: Set-Cookie + 303 /billing    failure: 401 login page
//! JSON  ─► success: Set-Cookie + {token, user}   failure: 401 JSON error
//! ```
//!
//! The same token works as a cookie and as `Authorization: Bearer`.

use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tally_core::access::{BILLING_PATH, LOGIN_PATH};
use tally_core::User;
use tracing::{info, warn};

use crate::auth::SESSION_COOKIE;
use crate::error::{ApiError, ApiResult};
use crate::handlers::pages::render_page;
use crate::middleware::CurrentUser;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub is_staff: bool,
    pub is_admin: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        SessionUser {
            id: user.id.clone(),
            username: user.username.clone(),
            is_staff: user.is_staff,
            is_admin: user.is_admin,
        }
    }
}

/// `GET /` and `GET /login`. Logged-in callers go straight to billing.
pub async fn login_page(user: Option<CurrentUser>) -> Response {
    if user.is_some() {
        return Redirect::to(BILLING_PATH).into_response();
    }
    login_form(None).into_response()
}

/// `POST /login`.
pub async fn login(State(state): State<AppState>, jar: CookieJar, req: Request) -> ApiResult<Response> {
    let json = is_json(req.headers());

    let credentials = if json {
        let Json(body) = Json::<LoginRequest>::from_request(req, &state).await?;
        body
    } else {
        match Form::<LoginRequest>::from_request(req, &state).await {
            Ok(Form(body)) => body,
            Err(_) => {
                return Ok((StatusCode::BAD_REQUEST, login_form(Some(INVALID_CREDENTIALS))).into_response());
            }
        }
    };

    let user = state
        .db
        .users()
        .authenticate(credentials.username.trim(), &credentials.password)
        .await?;

    let Some(user) = user else {
        warn!(username = %credentials.username, "Login failed");
        if json {
            return Err(ApiError::unauthenticated(INVALID_CREDENTIALS));
        }
        return Ok((StatusCode::UNAUTHORIZED, login_form(Some(INVALID_CREDENTIALS))).into_response());
    };

    let token = state.jwt.generate_session_token(&user)?;
    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Lax)
        .build();
    let jar = jar.add(cookie);

    info!(username = %user.username, "User logged in");

    if json {
        let body = LoginResponse {
            token,
            user: SessionUser::from(&user),
        };
        Ok((jar, Json(body)).into_response())
    } else {
        Ok((jar, Redirect::to(BILLING_PATH)).into_response())
    }
}

/// `GET /logout` and `POST /logout`. Always succeeds.
pub async fn logout(user: Option<CurrentUser>, jar: CookieJar) -> Response {
    if let Some(user) = user {
        info!(username = %user.username, "User logged out");
    }
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"));
    (jar, Redirect::to(LOGIN_PATH)).into_response()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

fn login_form(error: Option<&str>) -> Html<String> {
    render_page(
        "Log in",
        None,
        error,
        r#"<form method="post" action="/login">
<label>Username <input name="username" autocomplete="username" required></label>
<label>Password <input name="password" type="password" autocomplete="current-password" required></label>
<button type="submit">Log in</button>
</form>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_is_json() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        assert!(is_json(&headers));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        assert!(!is_json(&headers));
    }
}
