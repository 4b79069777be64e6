//! Name and version rules for distribution identifiers.

use crate::manifest::ManifestError;
use regex::Regex;
use std::sync::OnceLock;

/// Longest accepted package name.
const MAX_NAME_LEN: usize = 128;

/// Public version identifiers: `[N!]N(.N)*[{a|b|rc}N][.postN][.devN][+local]`.
const PUBLIC_VERSION: &str = r"(?ix)
    ^v?
    (?:[0-9]+!)?
    [0-9]+(?:\.[0-9]+)*
    (?:[-_.]?(?:a|b|c|rc|alpha|beta|pre|preview)[-_.]?[0-9]*)?
    (?:-[0-9]+|[-_.]?(?:post|rev|r)[-_.]?[0-9]*)?
    (?:[-_.]?dev[-_.]?[0-9]*)?
    (?:\+[a-z0-9]+(?:[-_.][a-z0-9]+)*)?
    $";

fn public_version() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PUBLIC_VERSION).expect("version pattern compiles"))
}

/// Validate a package or requirement name.
///
/// Names are ASCII letters, digits, `-`, `_` and `.`, and must start and end
/// with a letter or digit.
pub fn validate_name(name: &str) -> Result<(), ManifestError> {
    if name.is_empty() {
        return Err(ManifestError::InvalidName(
            name.to_string(),
            "name cannot be empty",
        ));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ManifestError::InvalidName(
            name.to_string(),
            "name cannot exceed 128 characters",
        ));
    }

    let first = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let last = name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    if !first || !last {
        return Err(ManifestError::InvalidName(
            name.to_string(),
            "name must start and end with a letter or number",
        ));
    }

    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.') {
            return Err(ManifestError::InvalidName(
                name.to_string(),
                "name can only contain letters, numbers, hyphens, underscores, and periods",
            ));
        }
    }

    Ok(())
}

/// Validate a version string.
///
/// Character rules are always enforced. The full public version grammar is
/// only checked when `strict` is set; otherwise the format is left to
/// whatever consumes the archive.
pub fn validate_version(version: &str, strict: bool) -> Result<(), ManifestError> {
    if version.is_empty() {
        return Err(ManifestError::InvalidVersion(
            version.to_string(),
            String::from("version cannot be empty"),
        ));
    }

    if let Some(c) = version
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '+' | '-' | '_' | '!'))
    {
        return Err(ManifestError::InvalidVersion(
            version.to_string(),
            format!("character {c:?} is not allowed"),
        ));
    }

    if strict && !public_version().is_match(version) {
        return Err(ManifestError::InvalidVersion(
            version.to_string(),
            String::from("not a valid public version identifier (e.g. 1.0, 2.1.3rc1, 1.0.post2)"),
        ));
    }

    Ok(())
}
