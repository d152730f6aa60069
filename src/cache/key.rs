use crate::error::CacheError;

/// Rejects keys that could never name a resource.
///
/// Keys are otherwise opaque: they are not trimmed or case-folded, so
/// `"Pikachu"` and `"pikachu"` are distinct entries.
pub fn validate_key(key: &str) -> Result<(), CacheError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.trim().is_empty() {
        "key is blank"
    } else if key.chars().any(char::is_control) {
        "key contains control characters"
    } else {
        return Ok(());
    };

    Err(CacheError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}
