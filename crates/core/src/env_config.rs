//! Environment variable parsing with warn-level logging for invalid values.

/// Parse an environment variable with a default fallback.
///
/// - If the variable is not set: returns `default` silently (expected case).
/// - If the variable is set but cannot be parsed: logs a warning and returns `default`.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    default: T,
) -> T {
    match std::env::var(var) {
        Ok(v) => match v.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(
                    var,
                    value = %v,
                    default = %default,
                    "invalid env var value, using default"
                );
                default
            },
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_valid_value() {
        let var_name = "NUTRILOG_TEST_ENV_PARSE_VALID_40117";
        unsafe { std::env::set_var(var_name, "250") };
        let result: usize = env_parse_with_default(var_name, 100);
        assert_eq!(result, 250);
        unsafe { std::env::remove_var(var_name) };
    }

    #[test]
    fn test_env_parse_trims_whitespace() {
        let var_name = "NUTRILOG_TEST_ENV_PARSE_TRIM_40118";
        unsafe { std::env::set_var(var_name, " 8 ") };
        let result: usize = env_parse_with_default(var_name, 4);
        assert_eq!(result, 8);
        unsafe { std::env::remove_var(var_name) };
    }

    #[test]
    fn test_env_parse_invalid_value() {
        let var_name = "NUTRILOG_TEST_ENV_PARSE_INVALID_40119";
        unsafe { std::env::set_var(var_name, "lots") };
        let result: u64 = env_parse_with_default(var_name, 30);
        assert_eq!(result, 30);
        unsafe { std::env::remove_var(var_name) };
    }

    #[test]
    fn test_env_parse_missing_var() {
        let var_name = "NUTRILOG_TEST_ENV_PARSE_MISSING_40120";
        unsafe { std::env::remove_var(var_name) };
        let result: usize = env_parse_with_default(var_name, 100);
        assert_eq!(result, 100);
    }
}
