//! Environment variable helpers shared by the producer and sink configs

use crate::error::{Result, UserflowError};
use std::str::FromStr;

/// Read a string setting, falling back to `default` when unset.
pub fn string_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Read an optional string setting. Empty values count as unset.
pub fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a setting, falling back to `default` when unset.
///
/// Unlike a silent fallback, a value that is present but does not parse is an error.
pub fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| UserflowError::invalid_setting(name, format!("'{raw}': {e}"))),
        None => Ok(default),
    }
}

/// Read a comma-separated list setting.
pub fn list_or(name: &str, default: &str) -> Vec<String> {
    string_or(name, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_uses_default_when_unset() {
        std::env::remove_var("USERFLOW_TEST_UNSET_PORT");
        let port: u16 = parse_or("USERFLOW_TEST_UNSET_PORT", 9042).unwrap();
        assert_eq!(port, 9042);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        std::env::set_var("USERFLOW_TEST_BAD_PORT", "ninety");
        let err = parse_or::<u16>("USERFLOW_TEST_BAD_PORT", 9042).unwrap_err();
        assert!(err.to_string().contains("USERFLOW_TEST_BAD_PORT"));
        std::env::remove_var("USERFLOW_TEST_BAD_PORT");
    }

    #[test]
    fn test_list_or_splits_and_trims() {
        std::env::set_var("USERFLOW_TEST_NODES", " a:9042, b:9042 ,,");
        assert_eq!(list_or("USERFLOW_TEST_NODES", "x"), vec!["a:9042", "b:9042"]);
        std::env::remove_var("USERFLOW_TEST_NODES");
    }
}
