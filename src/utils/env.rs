/// Get environment variable with TIDEWAY_ prefix, falling back to unprefixed version
///
/// This helper function checks for `TIDEWAY_{key}` first, then falls back to `{key}`
/// for compatibility with standard environment variable naming.
///
/// # Examples
///
/// ```rust,ignore
/// // Checks TIDEWAY_WEBHOOK_MAX_AGE_SECONDS first, then WEBHOOK_MAX_AGE_SECONDS
/// let max_age = get_env_with_prefix("WEBHOOK_MAX_AGE_SECONDS");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("TIDEWAY_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Parse a prefixed environment variable, ignoring values that don't parse
pub fn parse_env_with_prefix<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = get_env_with_prefix(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}
