/// Get environment variable with FLOODGATE_ prefix, falling back to the
/// unprefixed version
///
/// Checks `FLOODGATE_{key}` first, then `{key}`, so deployments that already
/// export standard names (`PORT`, `LOG_LEVEL`) keep working.
///
/// # Examples
///
/// ```rust
/// use floodgate::utils::get_env_with_prefix;
///
/// // Checks FLOODGATE_PORT first, then PORT
/// let port = get_env_with_prefix("PORT");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("FLOODGATE_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}
