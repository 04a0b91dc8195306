//! Pure helpers over slash-delimited object keys.
//!
//! Object storage has no directories. A "folder" is either a common prefix
//! returned by a delimited listing or a zero-byte marker object whose key
//! ends in `/`. These helpers derive names and prefixes from keys without
//! touching the network.

use crate::error::TypeError;

/// Normalize a generation-qualified id returned by a listing to a bare key.
///
/// Listings return ids of the form `{bucket}/{key}/{generation}`. The bare
/// key is what get, delete, and copy calls expect. The id is rewritten only
/// when it carries both the leading `{bucket}/` segment and a trailing
/// all-digit generation segment; anything else is returned unchanged.
///
/// Applying the function to its own output is a no-op unless the bare key
/// itself looks like an id: a key such as `{bucket}/x/7` (first segment
/// equal to the bucket name, last segment all digits) is indistinguishable
/// from a generation-qualified id and is shortened again to `x`. Apply it
/// exactly once, to ids taken from a listing.
///
/// ```
/// use gcsb_types::to_path;
///
/// assert_eq!(to_path("my-bucket", "my-bucket/a/b.txt/100"), "a/b.txt");
/// assert_eq!(to_path("my-bucket", "my-bucket/a/c//7"), "a/c/");
/// assert_eq!(to_path("my-bucket", "a/b.txt"), "a/b.txt");
/// ```
pub fn to_path(bucket: &str, raw_id: &str) -> String {
    let Some(rest) = raw_id
        .strip_prefix(bucket)
        .and_then(|r| r.strip_prefix('/'))
    else {
        return raw_id.to_string();
    };
    match rest.rsplit_once('/') {
        Some((key, generation)) if !key.is_empty() && is_generation(generation) => key.to_string(),
        _ => raw_id.to_string(),
    }
}

fn is_generation(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// The display name of a key: one trailing `/` removed, then everything up
/// to and including the last remaining `/` removed.
///
/// `"a/b.txt"` → `"b.txt"`, `"a/c/"` → `"c"`, `"top"` → `"top"`.
pub fn basename(key: &str) -> &str {
    let trimmed = key.strip_suffix('/').unwrap_or(key);
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Everything up to and including the last `/`, or `""` for a top-level key.
///
/// `"a/b/c.txt"` → `"a/b/"`.
pub fn parent_prefix(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[..=idx],
        None => "",
    }
}

/// Returns `true` if the key names a folder (marker object or common prefix).
pub fn is_folder_key(key: &str) -> bool {
    key.ends_with('/')
}

/// Key of the folder marker for `name` under `prefix`.
pub fn folder_key(prefix: &str, name: &str) -> String {
    format!("{prefix}{name}/")
}

/// Validate a single name typed by the user (new folder, upload target,
/// rename target). Only emptiness is rejected locally; everything else is
/// left to the store.
pub fn validate_name(name: &str) -> Result<(), TypeError> {
    if name.is_empty() {
        return Err(TypeError::InvalidObjectName {
            name: name.to_string(),
            reason: "name must not be empty".into(),
        });
    }
    Ok(())
}
