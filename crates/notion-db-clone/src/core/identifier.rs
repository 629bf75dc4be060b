//! Validation and normalization of Notion object identifiers.
//!
//! Notion identifiers are UUIDs that the API hands out in hyphenated form but
//! accepts with or without hyphens (share links carry the compact form). Any
//! identifier supplied from outside the process goes through [`validate_id`]
//! before it is used in a request path.

use crate::error::{Error, Result};

/// Number of hex digits in an identifier once separators are removed.
const ID_HEX_LENGTH: usize = 32;

/// Validate an externally supplied identifier.
///
/// Hyphens are stripped and the remainder must be exactly 32 hexadecimal
/// characters (either case).
///
/// # Errors
///
/// Returns `Error::Validation` naming `param` when the identifier is malformed.
pub fn validate_id(value: &str, param: &str) -> Result<()> {
    let compact = strip_separators(value);

    if compact.len() != ID_HEX_LENGTH {
        return Err(Error::validation(
            param,
            format!(
                "expected {} hex characters (hyphens optional), got {:?}",
                ID_HEX_LENGTH, value
            ),
        ));
    }

    if !compact.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::validation(
            param,
            format!("contains non-hexadecimal characters: {:?}", value),
        ));
    }

    Ok(())
}

/// Canonical form of an identifier: lower-case, hyphenated 8-4-4-4-12.
///
/// Validates first, so the result is always well formed.
pub fn canonical_id(value: &str, param: &str) -> Result<String> {
    validate_id(value, param)?;
    let compact = strip_separators(value).to_ascii_lowercase();
    Ok(format!(
        "{}-{}-{}-{}-{}",
        &compact[0..8],
        &compact[8..12],
        &compact[12..16],
        &compact[16..20],
        &compact[20..32]
    ))
}

/// Compare two identifiers ignoring hyphens and case.
pub fn same_id(a: &str, b: &str) -> bool {
    strip_separators(a).eq_ignore_ascii_case(&strip_separators(b))
}

fn strip_separators(value: &str) -> String {
    value.chars().filter(|c| *c != '-').collect()
}
