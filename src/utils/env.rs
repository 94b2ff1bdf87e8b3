use std::str::FromStr;

/// Get environment variable with ORGWARD_ prefix, falling back to unprefixed version
///
/// This helper function checks for `ORGWARD_{key}` first, then falls back to `{key}`
/// for compatibility with standard environment variable naming.
///
/// # Examples
///
/// ```rust
/// use orgward::utils::get_env_with_prefix;
///
/// // Checks ORGWARD_JWT_SECRET first, then JWT_SECRET
/// let secret = get_env_with_prefix("JWT_SECRET");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("ORGWARD_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Like [`get_env_with_prefix`], parsed into `T`.
///
/// Unparseable values are logged and treated as unset.
pub fn get_env_parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = get_env_with_prefix(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}
