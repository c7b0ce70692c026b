//! # Filedir Protocol Library
//!
//! Wire types for the Filedir file directory service.
//!
//! ## Overview
//!
//! The service exposes one storage directory over a small JSON/HTTP API. This
//! crate holds everything a client and the server have to agree on:
//!
//! - **Entries**: [`FileEntry`], the metadata record for a file or folder
//! - **Kinds**: [`EntryKind`], the closed classification derived from extensions
//! - **Bodies**: request and response types for every endpoint
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{EntryKind, FileListResponse};
//!
//! assert_eq!(EntryKind::from_file_name("photo.png"), EntryKind::Image);
//!
//! let listing: FileListResponse = serde_json::from_str(r#"{"files":[]}"#).unwrap();
//! assert!(listing.files.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`kind`]: Extension to kind lookup
//! - [`messages`]: Request and response bodies

pub mod kind;
pub mod messages;

pub use kind::EntryKind;
pub use messages::{
    CreateFolderRequest, CreateFolderResponse, DeleteResponse, ErrorResponse, FileEntry,
    FileListResponse, HealthResponse, RenameRequest, RenameResponse, UploadResponse,
    HEALTH_STATUS,
};
