//! Input checks for credentials.

use regex::Regex;
use std::sync::LazyLock;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 256;
const MAX_EMAIL_LEN: usize = 255;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Normalize an email for lookup and uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    email_normalized.len() <= MAX_EMAIL_LEN
        && EMAIL_RE
            .as_ref()
            .is_some_and(|regex| regex.is_match(email_normalized))
}

/// Length is counted in characters, not bytes.
pub(crate) fn valid_password(password: &str) -> bool {
    (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password.chars().count())
}
