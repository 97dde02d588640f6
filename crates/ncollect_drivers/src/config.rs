use once_cell::sync::Lazy;
use std::time::Duration;

static CONNECT_TIMEOUT: Lazy<Option<Duration>> =
    Lazy::new(|| env_duration("NCOLLECT_CONNECT_TIMEOUT_SECS"));

static COMMAND_TIMEOUT: Lazy<Option<Duration>> =
    Lazy::new(|| env_duration("NCOLLECT_COMMAND_TIMEOUT_SECS"));

static STRICT_HOST_KEYS: Lazy<bool> = Lazy::new(|| env_flag("NCOLLECT_SSH_STRICT_HOST_KEYS"));

/// `None` unless `NCOLLECT_CONNECT_TIMEOUT_SECS` is set to a positive value.
pub fn ssh_connect_timeout() -> Option<Duration> {
    *CONNECT_TIMEOUT
}

/// `None` unless `NCOLLECT_COMMAND_TIMEOUT_SECS` is set to a positive value.
pub fn ssh_command_timeout() -> Option<Duration> {
    *COMMAND_TIMEOUT
}

pub fn strict_host_keys() -> bool {
    *STRICT_HOST_KEYS
}

fn env_duration(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|value| parse_secs(&value))
}

fn env_flag(var: &str) -> bool {
    std::env::var(var)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn parse_secs(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
