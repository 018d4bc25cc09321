//! Per-request timeout override shared by the provider, model backend and
//! aggregator

use std::time::Duration;

/// Environment variable holding the timeout in whole seconds
pub const TIMEOUT_ENV: &str = "TALLY_REQUEST_TIMEOUT_SECS";

/// Parse a timeout in whole seconds; zero and junk are ignored
pub fn parse_timeout(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// The override from [`TIMEOUT_ENV`], if set to a positive number
pub fn timeout_from_env() -> Option<Duration> {
    parse_timeout(std::env::var(TIMEOUT_ENV).ok().as_deref())
}
