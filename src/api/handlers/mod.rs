//! Route handlers.
//!
//! Every ledger handler takes a [`auth::CurrentUser`], so none of them can run
//! for an unauthenticated request, and every store call is scoped to that
//! caller's id.

pub mod auth;
pub mod budgets;
pub mod health;
pub mod reminders;
pub mod transactions;
