//! # Bookstore
//!
//! `bookstore` serves a small books catalogue (title, price) behind a form login.
//!
//! ## Authentication
//!
//! Users live in the credential store with a bcrypt hash and exactly one role.
//! [`auth::Authenticator`] turns a submitted username/password into a
//! [`auth::Principal`]. Every failure (unknown user, wrong password, store outage,
//! broken role reference) reaches the caller as the same
//! [`auth::AuthFailure::InvalidCredentials`] so accounts cannot be enumerated.
//!
//! ## Authorization
//!
//! [`auth::AuthorizationPolicy`] is an ordered rule table loaded at start-up.
//! The first matching rule wins; unmatched paths require an authenticated session.
//!
//! | patterns | access |
//! |---|---|
//! | `/`, `/books`, `/login`, `/logout` | public |
//! | `/books/add`, `/books/edit/**`, `/books/delete/**` | `ADMIN` |
//! | anything else | authenticated |

pub mod auth;
pub mod bookstore;
pub mod catalog;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }
}
