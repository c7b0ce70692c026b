//! Entry naming rules.
//!
//! Identifiers are plain file names directly under the storage root. Uploaded
//! files get a generated identifier of the form `<uuid>_<display name>`, so the
//! display name survives on disk without a separate manifest.

use uuid::Uuid;

/// Length of the hex uuid prefix of generated upload ids.
const UPLOAD_PREFIX_LEN: usize = 32;

/// Longest file name most filesystems accept, in bytes.
const MAX_FILE_NAME_LEN: usize = 255;

/// Longest display name that still fits in a generated upload id.
pub const MAX_DISPLAY_NAME_LEN: usize = MAX_FILE_NAME_LEN - UPLOAD_PREFIX_LEN - 1;

/// Prefix of in-flight upload temp files. Hidden, so never listed.
pub const TEMP_PREFIX: &str = ".upload-";

/// Whether `name` is a hidden entry (starts with a dot).
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Whether `name` is exactly one plain path component.
///
/// Rejects empty names, `.`/`..`, and anything containing a path separator or
/// NUL, so joining the name onto the root can never escape it.
pub fn is_single_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Reduce a client-supplied file name to a safe display name.
///
/// Non-ASCII characters are dropped, separators and whitespace runs become a
/// single `_`, anything outside `[A-Za-z0-9._-]` is removed and leading or
/// trailing dots and underscores are stripped. Names longer than
/// [`MAX_DISPLAY_NAME_LEN`] lose the end of their stem, keeping the extension.
/// The result may be empty.
pub fn sanitize_display_name(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect::<String>();

    truncate_display_name(cleaned.trim_matches(|c| c == '.' || c == '_'))
}

// Input is ASCII, so any byte index is a char boundary.
fn truncate_display_name(name: &str) -> String {
    if name.len() <= MAX_DISPLAY_NAME_LEN {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot < MAX_DISPLAY_NAME_LEN => name.split_at(dot),
        _ => (name, ""),
    };

    let stem = stem[..MAX_DISPLAY_NAME_LEN - ext.len()]
        .trim_end_matches(|c| c == '.' || c == '_');
    format!("{}{}", stem, ext)
}

/// Generate a fresh storage id for an upload with the given display name.
pub fn upload_id(display_name: &str) -> String {
    let prefix = Uuid::new_v4().simple().to_string();
    if display_name.is_empty() {
        prefix
    } else {
        format!("{}_{}", prefix, display_name)
    }
}

/// Name of a temp file for an upload in progress.
pub fn temp_name() -> String {
    format!("{}{}.tmp", TEMP_PREFIX, Uuid::new_v4().simple())
}

/// Display name for an id.
///
/// Generated upload ids yield the name after the uuid prefix; every other id
/// is its own display name.
pub fn display_name(id: &str) -> &str {
    let bytes = id.as_bytes();
    let generated = bytes.len() > UPLOAD_PREFIX_LEN + 1
        && bytes[UPLOAD_PREFIX_LEN] == b'_'
        && bytes[..UPLOAD_PREFIX_LEN]
            .iter()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b));

    if generated {
        &id[UPLOAD_PREFIX_LEN + 1..]
    } else {
        id
    }
}
