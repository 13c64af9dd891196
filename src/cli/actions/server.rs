use crate::{
    auth::AuthorizationPolicy,
    bookstore::{self, ServerConfig},
};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub policy: Option<PathBuf>,
    pub session_ttl_seconds: u64,
    pub secure_cookie: bool,
    pub price_limit: u32,
    pub bcrypt_cost: u32,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the policy file is invalid, the database is unreachable,
/// or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let policy = load_policy(args.policy.as_deref())?;
    info!("Loaded {} authorization rule(s)", policy.rules().len());

    let config = ServerConfig::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_session_cookie_secure(args.secure_cookie)
        .with_price_limit(args.price_limit)
        .with_bcrypt_cost(args.bcrypt_cost);

    bookstore::new(args.port, &args.dsn, policy, config).await
}

fn load_policy(path: Option<&std::path::Path>) -> Result<AuthorizationPolicy> {
    match path {
        Some(path) => AuthorizationPolicy::load(path)
            .with_context(|| format!("Invalid authorization policy in {}", path.display())),
        None => AuthorizationPolicy::builtin().context("Invalid built-in authorization policy"),
    }
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        (
            "policy",
            args.policy
                .as_ref()
                .map_or_else(|| "built-in".to_string(), |p| p.display().to_string()),
        ),
        ("session_ttl_seconds", args.session_ttl_seconds.to_string()),
        ("secure_cookie", args.secure_cookie.to_string()),
        ("price_limit", args.price_limit.to_string()),
        ("bcrypt_cost", args.bcrypt_cost.to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "bookstore {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        &trimmed[..7]
    } else {
        trimmed
    }
}
