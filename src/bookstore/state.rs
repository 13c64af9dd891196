//! Shared server state and tunables.

use std::{sync::Arc, time::Duration};

use crate::{
    auth::{Authenticator, AuthorizationPolicy, DEFAULT_BCRYPT_COST, SessionStore},
    catalog::{BookStore, DEFAULT_PRICE_LIMIT},
};

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;
/// One year.
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    session_ttl_seconds: u64,
    session_cookie_secure: bool,
    price_limit: u32,
    bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_cookie_secure: false,
            price_limit: DEFAULT_PRICE_LIMIT,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    /// Mark the session cookie `Secure`; enable when served over HTTPS.
    #[must_use]
    pub fn with_session_cookie_secure(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_price_limit(mut self, limit: u32) -> Self {
        self.price_limit = limit;
        self
    }

    /// Cost of the dummy hash verified for unknown users. Keep it equal to the
    /// cost stored users were hashed with, or login timing reveals which exist.
    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }

    #[must_use]
    pub fn price_limit(&self) -> u32 {
        self.price_limit
    }

    #[must_use]
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }
}

pub struct AppState {
    authenticator: Authenticator,
    policy: AuthorizationPolicy,
    sessions: SessionStore,
    books: Arc<dyn BookStore>,
    config: ServerConfig,
}

impl AppState {
    #[must_use]
    pub fn new(
        authenticator: Authenticator,
        policy: AuthorizationPolicy,
        books: Arc<dyn BookStore>,
        config: ServerConfig,
    ) -> Self {
        Self {
            authenticator,
            policy,
            sessions: SessionStore::new(config.session_ttl()),
            books,
            config,
        }
    }

    #[must_use]
    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    #[must_use]
    pub fn policy(&self) -> &AuthorizationPolicy {
        &self.policy
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    #[must_use]
    pub fn books(&self) -> &dyn BookStore {
        self.books.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
