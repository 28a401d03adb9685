//! XAR archive parsing and extraction.
//!
//! ## Architecture
//!
//! - [`header`]: the fixed header and the location of the table of contents
//! - [`manifest`]: inflating and parsing the table of contents
//! - [`archive`]: extraction over a random access source such as a local file
//! - [`remote`]: extraction over streaming and range requests
//!
//! ## XAR Format Overview
//!
//! A XAR file consists of:
//! 1. A 28-byte big-endian header, followed by 0, 4 or 36 bytes of zero padding
//! 2. The zlib-compressed XML table of contents (TOC)
//! 3. The heap: member payloads, addressed relative to the end of the TOC
//!
//! Since everything needed to locate members sits at the front of the file,
//! a remote archive can be listed by streaming only its prefix, and each
//! member then costs a single range request.
//!
//! ## Limitations
//!
//! - Read-only
//! - Header and TOC checksums are not verified
//! - Payloads are returned as stored; their own encoding (gzip, bzip2...) is
//!   left to the caller

pub mod archive;
pub mod header;
mod index;
pub mod manifest;
pub mod remote;

pub use archive::XarArchive;
pub use header::{ArchiveHeader, ChecksumKind, MemberLocation, TocLocation, parse_header_shape};
pub use index::XarIndex;
pub use manifest::{Manifest, ManifestEntry, decode_manifest};
pub use remote::RemoteXar;
