//! Form login, logout and the current-principal endpoint.
//!
//! Flow Overview:
//! 0) `GET /login` issues a login CSRF token in a cookie and in the page model.
//! 1) `POST /login` checks the echoed CSRF token, then verifies the pair through
//!    the authenticator.
//! 2) On success a fresh session token is issued in the session cookie and the
//!    client is sent to `/books`. Any previous session on the request is revoked.
//! 3) Every failure looks the same to the client: `303 /login?error`.

use axum::{
    Form, Json,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{
        Permission, Principal, Role, clear_login_csrf_cookie, clear_session_cookie,
        extract_session_token, generate_login_csrf_token, login_csrf_cookie, login_csrf_matches,
        session_cookie,
    },
    bookstore::AppState,
};

const LOGIN_FAILED: &str = "/login?error";
const LOGGED_OUT: &str = "/login?logout";
const AFTER_LOGIN: &str = "/books";

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Present after a failed login.
    error: Option<String>,
    /// Present after logging out.
    logout: Option<String>,
}

#[derive(Serialize, ToSchema, Debug, PartialEq, Eq)]
pub struct LoginPage {
    pub error: bool,
    pub logout: bool,
    pub message: Option<String>,
    /// Must be posted back as the `csrf_token` form field.
    pub csrf_token: String,
}

/// Submitted credentials. No `Debug` so the password never reaches a log line.
#[derive(Deserialize, ToSchema)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    csrf_token: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct MeResponse {
    pub identity: String,
    pub role: Role,
    pub authorities: Vec<String>,
    pub permissions: Vec<Permission>,
}

impl LoginPage {
    fn new(query: &LoginQuery, csrf_token: String) -> Self {
        let error = query.error.is_some();
        let logout = query.logout.is_some();
        let message = if error {
            Some("Invalid credentials".to_string())
        } else if logout {
            Some("You have been logged out".to_string())
        } else {
            None
        };
        Self {
            error,
            logout,
            message,
            csrf_token,
        }
    }
}

impl From<&Principal> for MeResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            identity: principal.identity().to_string(),
            role: principal.role(),
            authorities: principal.authorities(),
            permissions: principal.permissions().to_vec(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/login",
    params(LoginQuery),
    responses (
        (status = 200, description = "Login page model; sets the login CSRF cookie", body = LoginPage),
        (status = 500, description = "Could not issue a CSRF token")
    ),
    tag = "auth",
)]
pub async fn login_page(
    state: Extension<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let secure = state.config().session_cookie_secure();
    let issued = generate_login_csrf_token().and_then(|token| {
        let cookie = login_csrf_cookie(&token, secure)?;
        Ok((token, cookie))
    });

    match issued {
        Ok((token, cookie)) => {
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, cookie);
            (headers, Json(LoginPage::new(&query, token))).into_response()
        }
        Err(err) => {
            error!("Failed to issue login CSRF token: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 303, description = "Redirect to /books with a session cookie, or to /login?error on failure")
    ),
    tag = "auth",
)]
#[instrument(skip_all)]
pub async fn login(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let LoginForm {
        username,
        password,
        csrf_token,
    } = form;

    if !login_csrf_matches(&headers, &csrf_token) {
        debug!("Login rejected: missing or mismatched CSRF token");
        return Redirect::to(LOGIN_FAILED).into_response();
    }

    let password = SecretString::from(password);

    let Ok(principal) = state.authenticator().authenticate(&username, &password).await else {
        return Redirect::to(LOGIN_FAILED).into_response();
    };

    if let Some(previous) = extract_session_token(&headers) {
        state.sessions().revoke(&previous).await;
    }

    let token = match state.sessions().create(principal).await {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to create session: {err:#}");
            return Redirect::to(LOGIN_FAILED).into_response();
        }
    };

    let config = state.config();
    let cookie = match session_cookie(&token, config.session_ttl(), config.session_cookie_secure()) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            state.sessions().revoke(&token).await;
            return Redirect::to(LOGIN_FAILED).into_response();
        }
    };

    info!(identity = username.as_str(), "User logged in");

    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, cookie);
    // The form token is single use.
    if let Ok(cleared) = clear_login_csrf_cookie(config.session_cookie_secure()) {
        response_headers.append(SET_COOKIE, cleared);
    }
    (response_headers, Redirect::to(AFTER_LOGIN)).into_response()
}

#[utoipa::path(
    post,
    path = "/logout",
    responses (
        (status = 303, description = "Session revoked, cookie cleared, redirect to /login?logout")
    ),
    tag = "auth",
)]
#[instrument(skip_all)]
pub async fn logout(state: Extension<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_session_token(&headers) {
        state.sessions().revoke(&token).await;
    }

    // Always clear the cookie, even if the session was already gone.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(state.config().session_cookie_secure()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (response_headers, Redirect::to(LOGGED_OUT)).into_response()
}

#[utoipa::path(
    get,
    path = "/me",
    responses (
        (status = 200, description = "The logged-in principal", body = MeResponse),
        (status = 401, description = "No valid session")
    ),
    tag = "auth",
)]
pub async fn me(principal: Option<Extension<Principal>>) -> Response {
    match principal {
        Some(Extension(principal)) => Json(MeResponse::from(&principal)).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}
