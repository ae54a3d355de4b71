//! Logging utilities

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system, using `default_level` when `RUST_LOG` is unset
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_level(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    if env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .is_err()
    {
        log::debug!("Logger already initialized");
    }
}

/// Parse a textual level such as `"info"` or `"off"`
pub fn parse_level(level: &str) -> Option<log::LevelFilter> {
    level.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info"), Some(log::LevelFilter::Info));
        assert_eq!(parse_level("WARN"), Some(log::LevelFilter::Warn));
        assert_eq!(parse_level("off"), Some(log::LevelFilter::Off));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_with_level("debug");
        init_with_level("info");
    }
}
