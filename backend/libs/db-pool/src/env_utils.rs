//! Environment variable parsing

use std::str::FromStr;

/// Missing and unparsable values both fall back to `default`
pub fn parse_env_with_default<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn test_garbage_and_missing_fall_back() {
        std::env::set_var("DB_POOL_TEST_VALUE", "not-a-number");
        assert_eq!(parse_env_with_default("DB_POOL_TEST_VALUE", 7u32), 7);

        std::env::set_var("DB_POOL_TEST_VALUE", "42");
        assert_eq!(parse_env_with_default("DB_POOL_TEST_VALUE", 7u32), 42);

        std::env::remove_var("DB_POOL_TEST_VALUE");
        assert_eq!(parse_env_with_default("DB_POOL_TEST_VALUE", 7u32), 7);
    }
}
