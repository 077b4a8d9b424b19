//! Rate limiting seam for login attempts.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    /// Consulted once per login attempt with the caller's origin address.
    fn check_login(&self, ip: Option<&str>) -> RateLimitDecision;
}

/// Allows everything. The configured attempt budget is kept for a real
/// limiter to pick up.
#[derive(Clone, Debug)]
pub struct NoopRateLimiter {
    attempts_per_origin: u32,
}

impl NoopRateLimiter {
    #[must_use]
    pub fn new(attempts_per_origin: u32) -> Self {
        Self {
            attempts_per_origin,
        }
    }

    #[must_use]
    pub fn attempts_per_origin(&self) -> u32 {
        self.attempts_per_origin
    }
}

impl RateLimiter for NoopRateLimiter {
    fn check_login(&self, _ip: Option<&str>) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter::new(5);
        assert_eq!(limiter.attempts_per_origin(), 5);
        for _ in 0..10 {
            assert_eq!(
                limiter.check_login(Some("10.0.0.1")),
                RateLimitDecision::Allowed
            );
        }
        assert_eq!(limiter.check_login(None), RateLimitDecision::Allowed);
    }
}
