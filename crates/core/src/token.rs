//! Opaque QR token generation and normalization.
//!
//! Tokens are random (v4) UUIDs rendered in lowercase hyphenated form. They
//! are never derived from batch ids, so they are neither sequential nor
//! guessable. Because every token parses as a UUID, a normalized token is
//! always safe to use as a file name.

use uuid::Uuid;

/// Suffix accepted (and stripped) on image/download paths.
pub const IMAGE_SUFFIX: &str = ".png";

/// Mint a new token with 122 bits of randomness.
pub fn generate_token() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Normalize a token supplied by a client.
///
/// Trims whitespace, strips an optional `.png` suffix and canonicalizes the
/// UUID to lowercase hyphenated form. Returns `None` for anything that is
/// not a UUID; such input can never match a stored token.
pub fn normalize_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let split = trimmed.len().saturating_sub(IMAGE_SUFFIX.len());
    let without_suffix = match (trimmed.get(..split), trimmed.get(split..)) {
        (Some(stem), Some(suffix))
            if !stem.is_empty() && suffix.eq_ignore_ascii_case(IMAGE_SUFFIX) =>
        {
            stem
        }
        _ => trimmed,
    };
    Uuid::parse_str(without_suffix)
        .ok()
        .map(|uuid| uuid.hyphenated().to_string())
}

/// Artifact file name for a token.
pub fn artifact_file_name(token: &str) -> String {
    format!("{token}{IMAGE_SUFFIX}")
}
