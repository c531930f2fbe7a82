//! Display-name normalization.
//!
//! Names arrive as arbitrary UTF-8. Normalization trims surrounding
//! whitespace and caps length in characters, never splitting a multi-byte
//! sequence.

/// Maximum display-name length in characters.
pub const MAX_NAME_CHARS: usize = 30;

/// Trim surrounding whitespace and cap at [`MAX_NAME_CHARS`] characters.
///
/// Returns an empty string for whitespace-only input; the caller decides
/// whether that is a validation failure.
pub fn normalize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(MAX_NAME_CHARS) {
        Some((byte_idx, _)) => trimmed[..byte_idx].to_owned(),
        None => trimmed.to_owned(),
    }
}
