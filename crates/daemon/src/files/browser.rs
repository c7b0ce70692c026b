//! Storage root browsing and mutation.
//!
//! This module owns the storage root directory. Every operation addresses an
//! entry by id, a single file name directly under the root. Ids are validated
//! and canonicalized against the root before any filesystem call, so entries
//! (including symlinks) can never reach outside of it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use protocol::{EntryKind, FileEntry};
use thiserror::Error;
use tracing::{debug, warn};

use super::names;

/// Errors that can occur while browsing or mutating the storage root.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The id does not resolve to an entry under the root.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// A required name was empty or not a single path component.
    #[error("{0}")]
    InvalidName(&'static str),

    /// The target name is already taken.
    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A root-level entry with its filesystem metadata.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// File name on disk, used as the id.
    pub id: String,
    /// Full path under the root.
    pub path: PathBuf,
    /// Whether this is a directory.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Creation time, or modification time where unsupported.
    pub created: SystemTime,
    /// Last modified timestamp.
    pub modified: SystemTime,
}

impl DirectoryEntry {
    fn from_metadata(id: String, path: PathBuf, metadata: &fs::Metadata) -> Self {
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let created = metadata.created().unwrap_or(modified);
        let is_dir = metadata.is_dir();

        Self {
            id,
            path,
            is_dir,
            size: if is_dir { 0 } else { metadata.len() },
            created,
            modified,
        }
    }

    /// Display name shown to clients.
    pub fn display_name(&self) -> &str {
        if self.is_dir {
            &self.id
        } else {
            names::display_name(&self.id)
        }
    }

    /// Kind derived from the display name.
    pub fn kind(&self) -> EntryKind {
        if self.is_dir {
            EntryKind::Folder
        } else {
            EntryKind::from_file_name(self.display_name())
        }
    }

    /// Convert to the protocol FileEntry.
    pub fn to_protocol(&self) -> FileEntry {
        FileEntry {
            id: self.id.clone(),
            name: self.display_name().to_string(),
            kind: self.kind(),
            size: self.size,
            created: self.created.into(),
            modified: self.modified.into(),
        }
    }
}

/// Browser over the single storage root.
#[derive(Debug)]
pub struct DirectoryBrowser {
    /// Canonical root path.
    root: PathBuf,
}

impl DirectoryBrowser {
    /// Open the storage root, creating it if it does not exist.
    pub fn open(root: &Path) -> Result<Self, BrowserError> {
        fs::create_dir_all(root)?;
        let root = fs::canonicalize(root)?;
        if !root.is_dir() {
            return Err(BrowserError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("storage root is not a directory: {}", root.display()),
            )));
        }
        Ok(Self { root })
    }

    /// The canonical storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an id to its path under the root.
    ///
    /// The returned path is not canonicalized, so a symlink id yields the link
    /// itself. Ids that are not a single component, do not exist, or whose
    /// target lies outside the root are reported as [`BrowserError::NotFound`].
    pub fn resolve(&self, id: &str) -> Result<PathBuf, BrowserError> {
        if !names::is_single_component(id) {
            return Err(BrowserError::NotFound(id.to_string()));
        }

        let path = self.root.join(id);
        let canonical = fs::canonicalize(&path).map_err(|e| not_found_or_io(e, id))?;

        if !canonical.starts_with(&self.root) {
            warn!("Entry {} resolves outside the storage root", id);
            return Err(BrowserError::NotFound(id.to_string()));
        }

        Ok(path)
    }

    /// List the root's immediate children.
    ///
    /// Hidden entries are skipped. Directories come first, then files, both
    /// sorted case-insensitively by display name. Failing to read the root is
    /// logged and yields an empty listing.
    pub fn list(&self) -> Vec<DirectoryEntry> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Error scanning directory {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut results = Vec::new();

        for entry_result in entries {
            let entry = match entry_result {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            let id = match entry.file_name().into_string() {
                Ok(id) => id,
                Err(name) => {
                    debug!("Skipping non UTF-8 entry name: {:?}", name);
                    continue;
                }
            };

            if names::is_hidden(&id) {
                continue;
            }

            let path = entry.path();
            let is_symlink = entry.file_type().map(|t| t.is_symlink()).unwrap_or(false);
            if is_symlink && self.resolve(&id).is_err() {
                debug!("Skipping symlink {} pointing outside the root", id);
                continue;
            }

            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping {}: {}", id, e);
                    continue;
                }
            };

            results.push(DirectoryEntry::from_metadata(id, path, &metadata));
        }

        results.sort_by(|a, b| match (a.is_dir, b.is_dir) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a
                .display_name()
                .to_lowercase()
                .cmp(&b.display_name().to_lowercase())
                .then_with(|| a.id.cmp(&b.id)),
        });

        results
    }

    /// Get metadata for a single entry without scanning the root.
    pub fn get_entry(&self, id: &str) -> Result<DirectoryEntry, BrowserError> {
        let path = self.resolve(id)?;
        let metadata = fs::metadata(&path).map_err(|e| not_found_or_io(e, id))?;
        Ok(DirectoryEntry::from_metadata(id.to_string(), path, &metadata))
    }

    /// Create an empty folder directly under the root.
    ///
    /// The name is trimmed first. An existing entry with that name is reported
    /// by the filesystem itself, so concurrent creations cannot both succeed.
    pub fn create_folder(&self, name: &str) -> Result<DirectoryEntry, BrowserError> {
        let name = name.trim();
        if !names::is_single_component(name) {
            return Err(BrowserError::InvalidName("Invalid folder name"));
        }

        fs::create_dir(self.root.join(name)).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => BrowserError::AlreadyExists("Folder"),
            _ => BrowserError::Io(e),
        })?;

        debug!("Created folder {}", name);
        self.get_entry(name)
    }

    /// Delete an entry. Folders are removed recursively; a symlink is removed
    /// itself, never its target.
    pub fn delete(&self, id: &str) -> Result<(), BrowserError> {
        let path = self.resolve(id)?;
        let metadata = fs::symlink_metadata(&path).map_err(|e| not_found_or_io(e, id))?;

        let result = if metadata.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| not_found_or_io(e, id))?;

        debug!("Deleted {}", id);
        Ok(())
    }

    /// Rename an entry and return its new id.
    ///
    /// The new name is trimmed first. An existing destination is never
    /// overwritten.
    pub fn rename(&self, id: &str, new_name: &str) -> Result<String, BrowserError> {
        let new_name = new_name.trim();
        if !names::is_single_component(new_name) {
            return Err(BrowserError::InvalidName("Invalid name"));
        }

        let source = self.resolve(id)?;
        let destination = self.root.join(new_name);

        rename_no_replace(&source, &destination).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => BrowserError::AlreadyExists("Name"),
            _ => not_found_or_io(e, id),
        })?;

        debug!("Renamed {} to {}", id, new_name);
        Ok(new_name.to_string())
    }
}

fn not_found_or_io(e: io::Error, id: &str) -> BrowserError {
    if e.kind() == io::ErrorKind::NotFound {
        BrowserError::NotFound(id.to_string())
    } else {
        BrowserError::Io(e)
    }
}

/// Rename `from` to `to`, failing with `AlreadyExists` if `to` exists.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
pub(crate) fn rename_no_replace(from: &Path, to: &Path) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::fcntl::{renameat2, RenameFlags};

    match renameat2(None, from, None, to, RenameFlags::RENAME_NOREPLACE) {
        Ok(()) => Ok(()),
        // Filesystem or kernel without RENAME_NOREPLACE support.
        Err(Errno::EINVAL) | Err(Errno::ENOSYS) => rename_checked(from, to),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

/// Rename `from` to `to`, failing with `AlreadyExists` if `to` exists.
#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
pub(crate) fn rename_no_replace(from: &Path, to: &Path) -> io::Result<()> {
    rename_checked(from, to)
}

// Not atomic: a destination created between the check and the rename is replaced.
fn rename_checked(from: &Path, to: &Path) -> io::Result<()> {
    if fs::symlink_metadata(to).is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("destination exists: {}", to.display()),
        ));
    }
    fs::rename(from, to)
}
