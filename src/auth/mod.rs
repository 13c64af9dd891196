//! Credential verification and request authorization.
//!
//! Flow Overview: `POST /login` hands the submitted pair to [`Authenticator`],
//! which consults a [`CredentialStore`] and a [`PasswordHasher`]. A successful
//! login yields a [`Principal`] kept in the [`SessionStore`]; every later request
//! resolves its session token back to that principal and asks the
//! [`AuthorizationPolicy`] whether the requested path is allowed.

mod authenticator;
mod error;
mod hasher;
mod model;
mod policy;
mod session;
mod store;

pub use authenticator::{Authenticator, Rejection};
pub use error::{AuthFailure, ConfigurationError, PolicyError, StoreError};
pub use hasher::{
    BcryptHasher, DEFAULT_BCRYPT_COST, MAX_BCRYPT_COST, MIN_BCRYPT_COST, PasswordHasher,
};
pub use model::{CredentialRecord, Permission, Principal, Role};
pub use policy::{
    AuthorizationPolicy, AuthorizationRule, Decision, PolicyConfig, ResourceDescriptor,
    ResourcePattern, RuleConfig,
};
pub use session::{
    LOGIN_CSRF_COOKIE_NAME, SESSION_COOKIE_NAME, SessionStore, clear_login_csrf_cookie,
    clear_session_cookie, extract_session_token, generate_login_csrf_token, login_csrf_cookie,
    login_csrf_matches, session_cookie,
};
pub use store::{CreateUserOutcome, CredentialStore, InMemoryCredentialStore, PgCredentialStore};
