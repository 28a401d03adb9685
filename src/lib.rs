//! # runxar
//!
//! A Rust XAR extractor with HTTP URL support using Range requests.
//!
//! XAR archives (macOS `.pkg`, `.xip` and friends) keep their table of
//! contents at the front of the file. This library reads that table of
//! contents and extracts members by name, either from a local file or from
//! an HTTP server. For remote archives only the header and table of contents
//! are streamed, and each member is fetched with one Range request, so a
//! single file can be pulled out of a large package without downloading it.
//!
//! ## Features
//!
//! - Extract XAR members from the local filesystem
//! - Extract XAR members from HTTP/HTTPS URLs using Range requests
//! - Header padding detection (0, 4 or 36 bytes)
//! - Bounded, configurable retry of the remote table of contents fetch
//!
//! Checksums recorded in the archive are parsed but never verified.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use runxar::{FetchConfig, HttpRangeReader, RemoteXar};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = FetchConfig::default();
//!     let reader = HttpRangeReader::new("https://example.com/Installer.pkg".to_string(), &config)?;
//!     let remote = RemoteXar::new(Arc::new(reader), config.retry.clone());
//!
//!     // List all members of the archive
//!     let index = remote.fetch_toc().await?;
//!     for entry in index.entries() {
//!         println!("{}", entry.name);
//!     }
//!
//!     // Pull a single member with one Range request
//!     let scripts = remote.extract_with(&index, "Scripts").await?;
//!     println!("Scripts: {} bytes", scripts.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod retry;
pub mod xar;

pub use cli::Cli;
pub use config::FetchConfig;
pub use error::{Result, XarError};
pub use io::{ChunkStream, HttpRangeReader, LocalFileReader, MemorySource, RangeSource, ReadAt};
pub use retry::RetryPolicy;
pub use xar::{ManifestEntry, RemoteXar, XarArchive, XarIndex};
