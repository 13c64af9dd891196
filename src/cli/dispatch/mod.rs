use crate::{
    auth::{DEFAULT_BCRYPT_COST, Role},
    cli::{
        actions::{Action, create_user, server},
        commands::CMD_CREATE_USER,
    },
};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((CMD_CREATE_USER, sub_m)) => create_user_action(matches, sub_m),
        _ => server_action(matches),
    }
}

fn dsn(matches: &clap::ArgMatches) -> Result<String> {
    matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")
}

// Shared by the server's timing baseline and create-user so both hash alike.
fn bcrypt_cost(matches: &clap::ArgMatches) -> u32 {
    matches
        .get_one::<u32>("bcrypt-cost")
        .copied()
        .unwrap_or(DEFAULT_BCRYPT_COST)
}

fn server_action(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server(server::Args {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: dsn(matches)?,
        policy: matches.get_one::<String>("policy").map(PathBuf::from),
        session_ttl_seconds: matches
            .get_one::<u64>("session-ttl-seconds")
            .copied()
            .unwrap_or(43_200),
        secure_cookie: matches.get_flag("secure-cookie"),
        price_limit: matches.get_one::<u32>("price-limit").copied().unwrap_or(500),
        bcrypt_cost: bcrypt_cost(matches),
    }))
}

// `--dsn` is global, so it may be given before or after the subcommand name.
fn create_user_action(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::CreateUser(create_user::Args {
        dsn: dsn(sub_m).or_else(|_| dsn(matches))?,
        username: sub_m
            .get_one::<String>("username")
            .cloned()
            .context("missing required argument: --username")?,
        role: sub_m
            .get_one::<Role>("role")
            .copied()
            .context("missing required argument: --role")?,
        bcrypt_cost: bcrypt_cost(sub_m),
    }))
}
