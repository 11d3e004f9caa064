use anyhow::{anyhow, Result};
use std::env;
use std::str::FromStr;

/// Retrieves an environment variable, treating unset and blank values alike.
pub fn get_env_var(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Retrieves an environment variable and parses it, falling back to `default` when unset.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `default`: Value used when the variable is missing or blank.
///
/// # Returns
/// - `Err` if the variable is set but cannot be parsed.
pub fn get_env_var_or<T>(var: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_var(var) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow!("Invalid value '{}' for {}: {}", raw, var, e)),
        None => Ok(default),
    }
}

/// Retrieves a boolean flag, accepting `1/0`, `true/false`, `yes/no`, `on/off`.
pub fn get_env_flag(var: &str, default: bool) -> Result<bool> {
    match get_env_var(var) {
        Some(raw) => parse_flag(&raw).ok_or_else(|| anyhow!("Invalid flag '{}' for {}", raw, var)),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_missing_var_uses_default() {
        let value: u32 = get_env_var_or("STORYLINE_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
        assert!(get_env_flag("STORYLINE_TEST_SURELY_UNSET_FLAG", true).unwrap());
    }
}
