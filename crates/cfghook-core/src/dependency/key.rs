//! Key path helpers. Keys are `.`-separated segments such as
//! `interfaces.eth0.mtu`.
use crate::dependency::error::DependencyError;
use crate::kernel::constants::KEY_SEPARATOR;

/// Reject empty keys, empty segments and leading or trailing separators
pub fn validate_key(key: &str) -> Result<(), DependencyError> {
    let invalid = |reason| {
        Err(DependencyError::InvalidKey {
            key: key.to_string(),
            reason,
        })
    };
    if key.is_empty() {
        return invalid("key is empty");
    }
    if key.starts_with(KEY_SEPARATOR) || key.ends_with(KEY_SEPARATOR) {
        return invalid("leading or trailing separator");
    }
    if key.split(KEY_SEPARATOR).any(str::is_empty) {
        return invalid("empty segment");
    }
    Ok(())
}

/// Whether the subtree rooted at `root` contains `key`
pub fn covers(root: &str, key: &str) -> bool {
    match key.strip_prefix(root) {
        Some("") => true,
        Some(rest) => rest.starts_with(KEY_SEPARATOR),
        None => false,
    }
}

/// `key` followed by each of its ancestors, nearest first:
/// `a.b.c`, `a.b`, `a`.
pub fn ancestors(key: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(key), |current| {
        current.rfind(KEY_SEPARATOR).map(|pos| &current[..pos])
    })
}
