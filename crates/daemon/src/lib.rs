//! # Filedir Daemon Library
//!
//! This crate provides the server side of Filedir, a small HTTP service that
//! manages the files and folders of a single storage directory.
//!
//! ## Overview
//!
//! The daemon exposes one root directory over a JSON API:
//!
//! - **Listing**: Shallow listing of the root, hidden entries skipped
//! - **Transfer**: Multipart uploads under collision-free ids, streamed downloads
//! - **Management**: Folder creation, rename and recursive delete
//! - **Frontend**: Static assets served from a configured directory
//!
//! The filesystem is the only index: there is no database and no manifest.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  HttpServer                  │
//! ├──────────────────────────────────────────────┤
//! │   Router (axum)  ──►  ApiError / protocol    │
//! ├──────────────────────────────────────────────┤
//! │  DirectoryBrowser   │    FileTransfer        │
//! ├──────────────────────────────────────────────┤
//! │              storage root on disk            │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use filedir::{Config, HttpServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let server = HttpServer::bind(config).await?;
//!     server.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`files`]: Storage root browsing, uploads and downloads
//! - [`router`]: HTTP routes and error mapping
//! - [`server`]: Listener and shutdown handling

pub mod config;
pub mod files;
pub mod router;
pub mod server;

// Re-export protocol for convenience
pub use protocol;

pub use config::Config;
pub use files::{BrowserError, DirectoryBrowser, DirectoryEntry, FileTransfer, TransferError};
pub use router::{build_router, ApiError, AppState};
pub use server::HttpServer;
