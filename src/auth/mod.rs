//! Authentication and session lifecycle.
//!
//! Components, leaf to root:
//!
//! - [`password`]: Argon2id hashing and verification.
//! - [`token`]: HS256 bearer tokens carrying `sub`, `iat`, `exp`, `jti`.
//! - [`sessions`]: persistent record of issued tokens by `jti`.
//! - [`gate`]: request-time check that turns a bearer header into a user.
//!
//! [`AuthService`] ties them together for registration, login, logout and
//! password changes.

pub mod config;
pub mod gate;
pub mod password;
pub mod rate_limit;
pub mod service;
pub mod sessions;
pub mod token;
mod utils;

pub use config::AuthConfig;
pub use gate::{AuthGate, Authenticated, GateOutcome, RejectReason};
pub use rate_limit::{NoopRateLimiter, RateLimitDecision, RateLimiter};
pub use service::AuthService;
pub use sessions::{Origin, SessionRegistry};
pub use token::{Claims, IssuedToken, TokenError, TokenIssuer};
