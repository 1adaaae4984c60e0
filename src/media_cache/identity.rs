//! Deterministic video identity derivation

/// Separator between identity components
///
/// ASCII unit separator: not something ordinary filenames contain, so a
/// name with digits or dashes cannot forge another file's identity.
const FIELD_SEPARATOR: char = '\u{1f}';

/// Derive the identity key for a video from its source-file attributes
///
/// Pure and deterministic. Two files with identical name, size, and
/// last-modified timestamp collide; that is an accepted limitation of
/// skipping content hashing, not something this function papers over.
pub fn derive_id(name: &str, size: u64, last_modified: i64) -> String {
    format!(
        "{}{}{}{}{}",
        name, FIELD_SEPARATOR, size, FIELD_SEPARATOR, last_modified
    )
}
