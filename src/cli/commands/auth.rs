use crate::auth::config::{DEFAULT_LOGIN_RATE_LIMIT, DEFAULT_TOKEN_TTL_SECONDS};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SECRET_KEY: &str = "secret-key";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_LOGIN_RATE_LIMIT: &str = "login-rate-limit";
pub const ARG_ENFORCE_REVOCATION: &str = "enforce-revocation";

#[derive(Debug)]
pub struct Options {
    pub secret_key: SecretString,
    pub token_ttl_seconds: i64,
    pub login_rate_limit: u32,
    pub enforce_revocation: bool,
}

impl Options {
    /// # Errors
    /// Returns an error if the signing secret is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let secret_key = matches
            .get_one::<String>(ARG_SECRET_KEY)
            .cloned()
            .context("missing required argument: --secret-key")?;

        Ok(Self {
            secret_key: SecretString::from(secret_key),
            token_ttl_seconds: matches
                .get_one::<i64>(ARG_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS),
            login_rate_limit: matches
                .get_one::<u32>(ARG_LOGIN_RATE_LIMIT)
                .copied()
                .unwrap_or(DEFAULT_LOGIN_RATE_LIMIT),
            enforce_revocation: matches
                .get_one::<bool>(ARG_ENFORCE_REVOCATION)
                .copied()
                .unwrap_or(true),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SECRET_KEY)
                .long("secret-key")
                .help("Secret used to sign bearer tokens (HS256)")
                .env("FINTRACK_SECRET_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long("token-ttl-seconds")
                .help("Bearer token lifetime in seconds")
                .env("FINTRACK_TOKEN_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOGIN_RATE_LIMIT)
                .long("login-rate-limit")
                .help("Login attempts allowed per origin")
                .env("FINTRACK_LOGIN_RATE_LIMIT")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_ENFORCE_REVOCATION)
                .long("enforce-revocation")
                .help("Reject tokens whose session was closed by logout")
                .env("FINTRACK_ENFORCE_REVOCATION")
                .default_value("true")
                .value_parser(clap::value_parser!(bool)),
        )
}
