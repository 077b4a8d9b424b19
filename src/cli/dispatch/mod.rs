//! Map validated CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, ARG_APPLY_SCHEMA, ARG_DSN, ARG_MAX_CONNECTIONS, ARG_PORT};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let max_connections = matches
        .get_one::<u32>(ARG_MAX_CONNECTIONS)
        .copied()
        .unwrap_or(5);
    let apply_schema = matches.get_flag(ARG_APPLY_SCHEMA);

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        max_connections,
        apply_schema,
        secret_key: auth_opts.secret_key,
        token_ttl_seconds: auth_opts.token_ttl_seconds,
        login_rate_limit: auth_opts.login_rate_limit,
        enforce_revocation: auth_opts.enforce_revocation,
    }))
}
