//! Personal finance API.
//!
//! Users register with an email and password, log in for a signed bearer
//! token, and manage their own transactions, budgets and reminders. Each
//! login is tracked as a session keyed by the token's `jti`, so logging out
//! (or deactivating the account) revokes the token before it expires.
//!
//! - [`auth`]: password hashing, tokens, sessions and the auth gate.
//! - [`store`]: persistence, with `PostgreSQL` and in-memory backends.
//! - [`api`]: the axum router and its handlers.
//! - [`cli`]: command line parsing, logging setup and server startup.

pub mod api;
pub mod auth;
pub mod cli;
pub mod error;
pub mod store;

pub use error::Error;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
