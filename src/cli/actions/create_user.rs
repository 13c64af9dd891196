use crate::auth::{BcryptHasher, CreateUserOutcome, PasswordHasher, PgCredentialStore, Role};
use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::io::BufRead;
use tracing::info;

pub const PASSWORD_ENV: &str = "BOOKSTORE_USER_PASSWORD";

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
    pub username: String,
    pub role: Role,
    pub bcrypt_cost: u32,
}

/// Hash the password and insert the user.
/// # Errors
/// Returns an error if no password is supplied, hashing or the database fails,
/// or the user already exists.
pub async fn execute(args: Args) -> Result<()> {
    let password = resolve_password(std::env::var(PASSWORD_ENV).ok(), std::io::stdin().lock())?;

    let hasher = BcryptHasher::new(args.bcrypt_cost);
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .context("Password hashing task failed")??;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    let store = PgCredentialStore::new(pool);
    match store
        .create_user(&args.username, &password_hash, args.role.as_str())
        .await
        .context("Failed to create user")?
    {
        CreateUserOutcome::Created => {
            info!(username = args.username.as_str(), role = %args.role, "User created");
            Ok(())
        }
        CreateUserOutcome::Conflict => bail!("User {} already exists", args.username),
    }
}

// The environment wins; otherwise the first line of input without its terminator.
fn resolve_password(from_env: Option<String>, mut input: impl BufRead) -> Result<SecretString> {
    let password = match from_env {
        Some(password) => password,
        None => {
            let mut line = String::new();
            input
                .read_line(&mut line)
                .context("Failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(SecretString::from(password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_password_from_stdin_strips_line_ending() {
        let password = resolve_password(None, "s3cret pass\r\nignored\n".as_bytes()).unwrap();
        assert_eq!(password.expose_secret(), "s3cret pass");
    }

    #[test]
    fn test_env_password_takes_precedence() {
        let password =
            resolve_password(Some("from-env".to_string()), "from-stdin\n".as_bytes()).unwrap();
        assert_eq!(password.expose_secret(), "from-env");
    }

    #[test]
    fn test_empty_password_is_rejected() {
        let err = resolve_password(None, "".as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "Password must not be empty");

        assert!(resolve_password(Some(String::new()), "x\n".as_bytes()).is_err());
        assert!(resolve_password(None, "\n".as_bytes()).is_err());
    }
}
