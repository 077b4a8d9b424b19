//! `/auth` routes: registration, login, logout, profile, sessions.

pub mod account;
pub mod principal;
pub mod session;
pub mod types;

pub use principal::CurrentUser;
