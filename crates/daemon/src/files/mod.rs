//! File manager module for the storage root.
//!
//! This module provides the filesystem side of every API operation:
//! - Shallow listing and single-entry metadata
//! - Folder creation, rename and recursive delete
//! - Upload storage under generated ids and download access
//!
//! # Security
//!
//! Entries are addressed by a single file name directly under the root. Ids
//! containing separators or `..` never resolve, and symlinks whose target lies
//! outside the root are treated as missing.

pub mod browser;
pub mod names;
pub mod transfer;

pub use browser::{BrowserError, DirectoryBrowser, DirectoryEntry};
pub use transfer::{Download, FileTransfer, TransferError};
