//! Username/password verification.
//!
//! The caller only ever learns "valid" or "invalid". The precise reason is a
//! [`Rejection`], logged here for operators and collapsed into
//! [`AuthFailure::InvalidCredentials`] before it leaves the module.

use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::{
    error::{AuthFailure, ConfigurationError, StoreError},
    hasher::PasswordHasher,
    model::{CredentialRecord, Principal, Role},
    store::CredentialStore,
};

// Verified against when no real hash is available, so failures cost the same.
const TIMING_DUMMY_PASSWORD: &str = "bookstore-timing-dummy";

/// Why a login attempt was refused.
#[derive(Debug)]
pub enum Rejection {
    NotFound,
    WrongPassword,
    StoreUnavailable(StoreError),
    Configuration(ConfigurationError),
}

impl From<Rejection> for AuthFailure {
    fn from(_: Rejection) -> Self {
        AuthFailure::InvalidCredentials
    }
}

pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    dummy_hash: String,
}

impl Authenticator {
    /// Build an authenticator over a store and hasher.
    ///
    /// # Errors
    /// Returns an error if the hasher cannot produce the timing dummy hash.
    pub fn new(store: Arc<dyn CredentialStore>, hasher: Arc<dyn PasswordHasher>) -> Result<Self> {
        let dummy_hash = hasher.hash(&SecretString::from(TIMING_DUMMY_PASSWORD.to_string()))?;
        Ok(Self {
            store,
            hasher,
            dummy_hash,
        })
    }

    /// Verify a claimed identity and password.
    ///
    /// # Errors
    /// Returns [`AuthFailure::InvalidCredentials`] for every kind of failure.
    pub async fn authenticate(
        &self,
        identity: &str,
        credential: &SecretString,
    ) -> Result<Principal, AuthFailure> {
        self.verify(identity, credential).await.map_err(|rejection| {
            log_rejection(identity, &rejection);
            AuthFailure::from(rejection)
        })
    }

    /// Same as [`Self::authenticate`] but keeps the internal reason.
    ///
    /// # Errors
    /// Returns the [`Rejection`] describing why the attempt failed.
    #[instrument(skip(self, credential))]
    pub async fn verify(
        &self,
        identity: &str,
        credential: &SecretString,
    ) -> Result<Principal, Rejection> {
        let record = match self.store.find_by_identity(identity).await {
            Ok(Some(record)) if record.identity == identity => record,
            Ok(_) => {
                self.burn_verify(credential).await;
                return Err(Rejection::NotFound);
            }
            Err(err) => {
                self.burn_verify(credential).await;
                return Err(Rejection::StoreUnavailable(err));
            }
        };

        let role = match derive_role(&record) {
            Ok(role) => role,
            Err(err) => {
                self.burn_verify(credential).await;
                return Err(Rejection::Configuration(err));
            }
        };

        if self.check(credential, record.password_hash).await {
            debug!("Credentials verified");
            Ok(Principal::new(record.identity, role))
        } else {
            Err(Rejection::WrongPassword)
        }
    }

    async fn burn_verify(&self, credential: &SecretString) {
        let _ = self.check(credential, self.dummy_hash.clone()).await;
    }

    // bcrypt is deliberately slow; keep it off the async workers.
    async fn check(&self, credential: &SecretString, hash: String) -> bool {
        let hasher = Arc::clone(&self.hasher);
        let credential = credential.clone();
        match tokio::task::spawn_blocking(move || hasher.verify(&credential, &hash)).await {
            Ok(matches) => matches,
            Err(err) => {
                error!("Password verification task failed: {err}");
                false
            }
        }
    }
}

fn derive_role(record: &CredentialRecord) -> Result<Role, ConfigurationError> {
    let Some(name) = record.role.as_deref() else {
        return Err(ConfigurationError::MissingRole {
            identity: record.identity.clone(),
        });
    };
    name.parse().map_err(|_| ConfigurationError::UnknownRole {
        identity: record.identity.clone(),
        role: name.to_string(),
    })
}

fn log_rejection(identity: &str, rejection: &Rejection) {
    match rejection {
        Rejection::NotFound => debug!(identity, "Login rejected: unknown identity"),
        Rejection::WrongPassword => debug!(identity, "Login rejected: wrong password"),
        Rejection::StoreUnavailable(err) => {
            error!(identity, "Login rejected: credential store unavailable: {err:?}");
        }
        Rejection::Configuration(err) => {
            error!(identity, "Login rejected: {err}");
        }
    }
}
