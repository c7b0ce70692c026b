//! Entry kind classification.
//!
//! Every entry exposed by the API carries a coarse kind derived purely from
//! the extension of its display name. Directories are always [`EntryKind::Folder`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse classification of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Folder,
    Image,
    Video,
    Audio,
    Document,
    Code,
    Archive,
    /// Anything without a known extension.
    #[default]
    Default,
}

/// Extension (lowercase, without the dot) to kind lookup table.
const EXTENSION_KINDS: &[(&str, EntryKind)] = &[
    // Images
    ("jpg", EntryKind::Image),
    ("jpeg", EntryKind::Image),
    ("png", EntryKind::Image),
    ("gif", EntryKind::Image),
    ("webp", EntryKind::Image),
    // Video
    ("mp4", EntryKind::Video),
    ("avi", EntryKind::Video),
    ("mkv", EntryKind::Video),
    ("mov", EntryKind::Video),
    ("wmv", EntryKind::Video),
    // Audio
    ("mp3", EntryKind::Audio),
    ("wav", EntryKind::Audio),
    ("flac", EntryKind::Audio),
    ("aac", EntryKind::Audio),
    ("m4a", EntryKind::Audio),
    // Documents
    ("pdf", EntryKind::Document),
    ("doc", EntryKind::Document),
    ("docx", EntryKind::Document),
    ("txt", EntryKind::Document),
    ("rtf", EntryKind::Document),
    ("xls", EntryKind::Document),
    ("xlsx", EntryKind::Document),
    // Code
    ("js", EntryKind::Code),
    ("ts", EntryKind::Code),
    ("py", EntryKind::Code),
    ("java", EntryKind::Code),
    ("cpp", EntryKind::Code),
    ("html", EntryKind::Code),
    ("css", EntryKind::Code),
    ("json", EntryKind::Code),
    // Archives
    ("zip", EntryKind::Archive),
    ("rar", EntryKind::Archive),
    ("7z", EntryKind::Archive),
    ("tar", EntryKind::Archive),
    ("gz", EntryKind::Archive),
];

impl EntryKind {
    /// Classify a file by the extension of its name.
    ///
    /// Matching is case-insensitive. Names without an extension, and dotfiles
    /// such as `.bashrc`, classify as [`EntryKind::Default`].
    pub fn from_file_name(name: &str) -> Self {
        match extension(name) {
            Some(ext) => Self::from_extension(&ext),
            None => EntryKind::Default,
        }
    }

    /// Classify a bare extension (no leading dot).
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_ascii_lowercase();
        EXTENSION_KINDS
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, kind)| *kind)
            .unwrap_or_default()
    }

    /// The lowercase wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Folder => "folder",
            EntryKind::Image => "image",
            EntryKind::Video => "video",
            EntryKind::Audio => "audio",
            EntryKind::Document => "document",
            EntryKind::Code => "code",
            EntryKind::Archive => "archive",
            EntryKind::Default => "default",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercased extension of `name`, if any.
///
/// A leading dot does not start an extension, so `.env` has none.
pub fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
