//! Upload storage and download access.
//!
//! Uploads are written to a hidden temp file inside the root and renamed into
//! place once complete, so a partially written upload is never listed.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::browser::{BrowserError, DirectoryBrowser, DirectoryEntry};
use super::names;
use crate::config::StorageConfig;

/// Errors that can occur during file transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The requested entry is a folder, not a file.
    #[error("entry is a folder: {0}")]
    IsADirectory(String),

    /// The upload's extension is not on the enforced allow-list.
    #[error("file type not allowed: {0}")]
    ExtensionNotAllowed(String),

    /// Root lookup failed.
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An open file ready to be streamed to a client.
#[derive(Debug)]
pub struct Download {
    /// Open handle positioned at the start of the file.
    pub file: File,
    /// Suggested file name for the client.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
}

/// File transfer handler.
///
/// Stores uploads under generated ids and opens files for download.
pub struct FileTransfer {
    /// Browser for id resolution.
    browser: Arc<DirectoryBrowser>,
    /// Allow-list settings.
    storage: StorageConfig,
}

impl FileTransfer {
    /// Create a new file transfer handler.
    pub fn new(browser: Arc<DirectoryBrowser>, storage: &StorageConfig) -> Self {
        Self {
            browser,
            storage: storage.clone(),
        }
    }

    /// Store one uploaded file and return its new entry.
    ///
    /// The client-supplied name is sanitized into a display name and a fresh
    /// id is generated from it, so two uploads with the same name never collide.
    pub fn store_upload(
        &self,
        original_name: &str,
        data: &[u8],
    ) -> Result<DirectoryEntry, TransferError> {
        let display_name = names::sanitize_display_name(original_name);

        if !self.storage.is_extension_allowed(&display_name) {
            if self.storage.enforce_allowed_extensions {
                return Err(TransferError::ExtensionNotAllowed(display_name));
            }
            debug!(
                "Extension of {:?} is not on the allow-list, storing anyway",
                display_name
            );
        }

        let id = names::upload_id(&display_name);
        let root = self.browser.root();
        let temp_path = root.join(names::temp_name());

        let written = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .and_then(|mut file| {
                file.write_all(data)?;
                file.sync_all()
            })
            .and_then(|()| super::browser::rename_no_replace(&temp_path, &root.join(&id)));

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                debug!(path = ?temp_path, error = %cleanup, "Temp file already gone after failed upload");
            }
            return Err(TransferError::Io(e));
        }

        debug!("Stored upload {:?} as {} ({} bytes)", original_name, id, data.len());
        Ok(self.browser.get_entry(&id)?)
    }

    /// Open a file for download.
    pub fn open_download(&self, id: &str) -> Result<Download, TransferError> {
        let entry = self.browser.get_entry(id)?;
        if entry.is_dir {
            return Err(TransferError::IsADirectory(id.to_string()));
        }

        let file = File::open(&entry.path)?;

        Ok(Download {
            file,
            name: entry.display_name().to_string(),
            size: entry.size,
        })
    }

    /// Remove upload temp files older than `max_age` left behind by a crash.
    ///
    /// Returns the number of files removed.
    pub fn cleanup_stale_uploads(&self, max_age: Duration) -> Result<usize, TransferError> {
        let mut removed = 0;

        for entry in fs::read_dir(self.browser.root())? {
            let entry = entry?;
            let name = entry.file_name();
            let is_temp = name
                .to_str()
                .map(|n| n.starts_with(names::TEMP_PREFIX) && n.ends_with(".tmp"))
                .unwrap_or(false);
            if !is_temp {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok());

            if age.map(|age| age >= max_age).unwrap_or(false) {
                match fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        warn!(path = ?entry.path(), error = %e, "Failed to cleanup stale temp file");
                    }
                }
            }
        }

        if removed > 0 {
            info!("Removed {} stale upload temp file(s)", removed);
        }
        Ok(removed)
    }
}
