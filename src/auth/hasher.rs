use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

/// One-way salted password hashing.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password for storage.
    ///
    /// # Errors
    /// Returns an error if the underlying hash function fails.
    fn hash(&self, plaintext: &SecretString) -> Result<String>;

    /// Compare a plaintext password with a stored hash. Malformed hashes never match.
    fn verify(&self, plaintext: &SecretString, hash: &str) -> bool;
}

pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

#[derive(Clone, Copy, Debug)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    #[must_use]
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &SecretString) -> Result<String> {
        bcrypt::hash(plaintext.expose_secret(), self.cost).context("failed to hash password")
    }

    fn verify(&self, plaintext: &SecretString, hash: &str) -> bool {
        match bcrypt::verify(plaintext.expose_secret(), hash) {
            Ok(matches) => matches,
            Err(err) => {
                warn!("Stored password hash is not valid bcrypt: {err}");
                false
            }
        }
    }
}
