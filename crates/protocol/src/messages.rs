//! JSON message definitions for the Filedir HTTP API.
//!
//! This module defines the request and response bodies exchanged between the
//! server and its clients. All bodies are serialized as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kind::EntryKind;

/// Status string reported by the health endpoint.
pub const HEALTH_STATUS: &str = "Server is running";

/// A single file or folder directly under the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Identifier used to address the entry (its name on disk).
    pub id: String,
    /// Display name. Differs from `id` for uploaded files.
    pub name: String,
    /// Kind derived from the display name's extension.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size in bytes (0 for folders).
    pub size: u64,
    /// Creation time, falling back to modification time where unsupported.
    pub created: DateTime<Utc>,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

impl FileEntry {
    /// Whether this entry is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// Response to a listing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListResponse {
    pub files: Vec<FileEntry>,
}

/// Response to a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    /// Entries that were stored; failed files are omitted.
    pub files: Vec<FileEntry>,
    pub message: String,
}

impl UploadResponse {
    /// Build a successful response for the stored entries.
    pub fn new(files: Vec<FileEntry>) -> Self {
        let message = format!("Successfully uploaded {} file(s)", files.len());
        Self {
            success: true,
            files,
            message,
        }
    }
}

/// Request to create a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CreateFolderRequest {
    #[serde(default)]
    pub name: String,
}

/// Response confirming folder creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFolderResponse {
    pub success: bool,
    pub folder: FileEntry,
}

/// Response confirming deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Request to rename an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RenameRequest {
    #[serde(default)]
    pub name: String,
}

/// Response confirming a rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameResponse {
    pub success: bool,
    pub message: String,
    /// The identifier the entry is now addressed by.
    #[serde(rename = "newId")]
    pub new_id: String,
}

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: HEALTH_STATUS.to_string(),
        }
    }
}

/// Body returned alongside every non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
