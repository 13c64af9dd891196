pub mod logging;

use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::{
        ValueParser,
        styling::{AnsiColor, Effects, Styles},
    },
};

use crate::{
    auth::{MAX_BCRYPT_COST, MIN_BCRYPT_COST, Role},
    bookstore::MAX_SESSION_TTL_SECONDS,
    catalog::MAX_PRICE_LIMIT,
};

pub const CMD_CREATE_USER: &str = "create-user";

fn validator_role() -> ValueParser {
    ValueParser::from(|role: &str| -> std::result::Result<Role, String> { role.parse::<Role>() })
}

fn create_user_command() -> Command {
    Command::new(CMD_CREATE_USER)
        .about("Add a user to the credential store")
        .long_about(
            "Add a user to the credential store. The password is read from \
             BOOKSTORE_USER_PASSWORD or, when unset, from the first line of stdin.",
        )
        .arg(
            Arg::new("username")
                .short('u')
                .long("username")
                .help("Login name, matched exactly")
                .required(true),
        )
        .arg(
            Arg::new("role")
                .short('r')
                .long("role")
                .help("Role: ADMIN, STUDENT or GUEST")
                .required(true)
                .value_parser(validator_role()),
        )
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("bookstore")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("BOOKSTORE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("BOOKSTORE_DSN")
                .global(true),
        )
        .arg(
            Arg::new("policy")
                .long("policy")
                .help("JSON authorization rule table (default: built-in rules)")
                .env("BOOKSTORE_POLICY"),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session lifetime in seconds")
                .default_value("43200")
                .env("BOOKSTORE_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_SESSION_TTL_SECONDS)),
        )
        .arg(
            Arg::new("secure-cookie")
                .long("secure-cookie")
                .help("Mark the session cookie Secure (serve over HTTPS)")
                .env("BOOKSTORE_SECURE_COOKIE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("price-limit")
                .long("price-limit")
                .help("Book prices must be lower than this value")
                .default_value("500")
                .env("BOOKSTORE_PRICE_LIMIT")
                .value_parser(clap::value_parser!(u32).range(1..=i64::from(MAX_PRICE_LIMIT))),
        )
        .arg(
            Arg::new("bcrypt-cost")
                .long("bcrypt-cost")
                .help("bcrypt work factor for new hashes and the login timing baseline")
                .long_help(
                    "bcrypt work factor. create-user hashes with it and the server uses it \
                     for the dummy hash checked on unknown users, so both must agree.",
                )
                .default_value("12")
                .env("BOOKSTORE_BCRYPT_COST")
                .global(true)
                .value_parser(
                    clap::value_parser!(u32)
                        .range(i64::from(MIN_BCRYPT_COST)..=i64::from(MAX_BCRYPT_COST)),
                ),
        )
        .subcommand(create_user_command());

    logging::with_args(command)
}
