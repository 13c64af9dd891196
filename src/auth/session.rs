//! Login sessions: opaque tokens mapped to principals.
//!
//! The raw token only travels in the cookie (or a bearer header); the store keys
//! entries by its SHA-256 hash.
//!
//! The login form is protected with a double-submit token: `GET /login` sets it
//! in a `Path=/login; SameSite=Strict` cookie and returns it in the page model,
//! and `POST /login` must echo it back in the form.

use anyhow::{Context, Result};
use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE, InvalidHeaderValue},
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::debug;

use super::model::Principal;

pub const SESSION_COOKIE_NAME: &str = "bookstore_session";
pub const LOGIN_CSRF_COOKIE_NAME: &str = "bookstore_login_csrf";

const LOGIN_CSRF_MAX_AGE_SECONDS: u64 = 60 * 60;

#[derive(Debug)]
struct SessionEntry {
    principal: Principal,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<Vec<u8>, SessionEntry>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session and return the raw token for the cookie.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails or the TTL does not fit
    /// the monotonic clock.
    pub async fn create(&self, principal: Principal) -> Result<String> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(self.ttl)
            .with_context(|| format!("session TTL of {}s is out of range", self.ttl.as_secs()))?;
        let token = generate_token()?;

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.insert(
            hash_session_token(&token),
            SessionEntry {
                principal,
                expires_at,
            },
        );

        Ok(token)
    }

    /// Resolve a raw token to its principal. Expired sessions resolve to `None`.
    pub async fn resolve(&self, token: &str) -> Option<Principal> {
        let token_hash = hash_session_token(token);
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&token_hash) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.principal.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        debug!("Session expired");
        self.sessions.write().await.remove(&token_hash);
        None
    }

    /// End a session. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) {
        self.sessions.write().await.remove(&hash_session_token(token));
    }
}

fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate random token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Build the `HttpOnly` session cookie.
///
/// # Errors
/// Returns an error if the token contains characters not allowed in a header.
pub fn session_cookie(
    token: &str,
    ttl: Duration,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Build a cookie that removes the session cookie from the browser.
///
/// # Errors
/// Never fails in practice; the value is a fixed ASCII string.
pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Read the session token from a bearer header or the session cookie.
#[must_use]
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    extract_bearer_token(headers).or_else(|| cookie_value(headers, SESSION_COOKIE_NAME))
}

/// Fresh token for the login form.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_login_csrf_token() -> Result<String> {
    generate_token()
}

/// # Errors
/// Returns an error if the token contains characters not allowed in a header.
pub fn login_csrf_cookie(token: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{LOGIN_CSRF_COOKIE_NAME}={token}; Path=/login; HttpOnly; SameSite=Strict; \
         Max-Age={LOGIN_CSRF_MAX_AGE_SECONDS}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// # Errors
/// Never fails in practice; the value is a fixed ASCII string.
pub fn clear_login_csrf_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{LOGIN_CSRF_COOKIE_NAME}=; Path=/login; HttpOnly; SameSite=Strict; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// True when the submitted form token equals the one in the login cookie.
/// Digests are compared so the check does not stop at the first differing byte.
#[must_use]
pub fn login_csrf_matches(headers: &HeaderMap, submitted: &str) -> bool {
    match cookie_value(headers, LOGIN_CSRF_COOKIE_NAME) {
        Some(expected) if !submitted.is_empty() => {
            hash_session_token(&expected) == hash_session_token(submitted)
        }
        _ => false,
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == name && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn pedro() -> Principal {
        Principal::new("pedro".to_string(), Role::Admin)
    }

    #[tokio::test]
    async fn create_then_resolve() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(pedro()).await.unwrap();

        assert_eq!(store.resolve(&token).await, Some(pedro()));
        assert_eq!(store.resolve("not-a-token").await, None);
    }

    #[tokio::test]
    async fn revoked_session_no_longer_resolves() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(pedro()).await.unwrap();

        store.revoke(&token).await;
        assert_eq!(store.resolve(&token).await, None);

        // Revoking twice is fine.
        store.revoke(&token).await;
    }

    #[tokio::test]
    async fn expired_session_does_not_resolve() {
        let store = SessionStore::new(Duration::ZERO);
        let token = store.create(pedro()).await.unwrap();
        assert_eq!(store.resolve(&token).await, None);
    }

    #[tokio::test]
    async fn tokens_are_unique() {
        let store = SessionStore::new(Duration::from_secs(60));
        let first = store.create(pedro()).await.unwrap();
        let second = store.create(pedro()).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
    }

    #[tokio::test]
    async fn oversized_ttl_is_an_error() {
        let store = SessionStore::new(Duration::MAX);
        let err = store.create(pedro()).await.unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(store.sessions.read().await.is_empty());
    }

    #[test]
    fn token_hash_is_not_the_token() {
        let hash = hash_session_token("abc");
        assert_eq!(hash.len(), 32);
        assert_ne!(hash, b"abc".to_vec());
    }

    #[test]
    fn session_cookie_flags() {
        let cookie = session_cookie("tok", Duration::from_secs(30), false).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "bookstore_session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=30"
        );

        let secure = session_cookie("tok", Duration::from_secs(30), true).unwrap();
        assert!(secure.to_str().unwrap().ends_with("; Secure"));

        let cleared = clear_session_cookie(false).unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn extracts_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; bookstore_session=abc123; lang=pt"),
        );
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn login_csrf_requires_matching_cookie() {
        let mut headers = HeaderMap::new();
        assert!(!login_csrf_matches(&headers, "abc"));

        headers.insert(
            COOKIE,
            HeaderValue::from_static("bookstore_session=s; bookstore_login_csrf=abc"),
        );
        assert!(login_csrf_matches(&headers, "abc"));
        assert!(!login_csrf_matches(&headers, "abd"));
        assert!(!login_csrf_matches(&headers, ""));
        // The CSRF cookie is not a session token.
        assert_eq!(extract_session_token(&headers), Some("s".to_string()));
    }

    #[test]
    fn login_csrf_cookie_flags() {
        let cookie = login_csrf_cookie("tok", true).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "bookstore_login_csrf=tok; Path=/login; HttpOnly; SameSite=Strict; Max-Age=3600; Secure"
        );
        let cleared = clear_login_csrf_cookie(false).unwrap();
        assert!(cleared.to_str().unwrap().ends_with("Max-Age=0"));
        assert_eq!(generate_login_csrf_token().unwrap().len(), 43);
    }

    #[test]
    fn bearer_token_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("bookstore_session=cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header"));
        assert_eq!(extract_session_token(&headers), Some("header".to_string()));
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("bookstore_session="));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_session_token(&headers), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }
}
