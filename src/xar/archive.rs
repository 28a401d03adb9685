use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, XarError};
use crate::io::{LocalFileReader, ReadAt};

use super::header::{ArchiveHeader, MemberLocation, parse_header_shape};
use super::index::XarIndex;
use super::manifest::{ManifestEntry, decode_manifest};

/// XAR archive opened over a random access source
///
/// The index is read once in [`XarArchive::open`]; every extraction is a
/// fresh positioned read, so one archive can serve concurrent extractions.
pub struct XarArchive<R: ReadAt> {
    reader: Arc<R>,
    index: XarIndex,
}

impl XarArchive<LocalFileReader> {
    /// Open a XAR file on disk
    pub async fn open_path(path: &Path) -> Result<Self> {
        let reader = LocalFileReader::new(path)?;
        Self::open(Arc::new(reader)).await
    }
}

impl<R: ReadAt> XarArchive<R> {
    /// Read the header and table of contents
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        let size = reader.size();
        let mut prefix = [0u8; ArchiveHeader::PREFIX_SIZE];
        if size < prefix.len() as u64 {
            return Err(XarError::InsufficientData {
                needed: prefix.len() as u64,
                available: size,
            });
        }
        reader.read_exact_at(0, &mut prefix).await?;
        let location = parse_header_shape(&prefix)?;

        // Refuse to allocate for a TOC the source cannot contain.
        if location.end() > size {
            return Err(XarError::short_read(
                location.start_offset,
                location.compressed_size as usize,
                size.saturating_sub(location.start_offset) as usize,
            ));
        }
        debug!(
            start = location.start_offset,
            size = location.compressed_size,
            "reading table of contents"
        );

        let mut toc = vec![0u8; location.compressed_size as usize];
        reader.read_exact_at(location.start_offset, &mut toc).await?;
        let manifest = decode_manifest(&toc)?;

        Ok(Self {
            reader,
            index: XarIndex::new(location, manifest),
        })
    }

    pub fn index(&self) -> &XarIndex {
        &self.index
    }

    /// List all members in the archive
    pub fn entries(&self) -> &[ManifestEntry] {
        self.index.entries()
    }

    /// Extract the first member named `name`
    pub async fn extract(&self, name: &str) -> Result<Vec<u8>> {
        let location = self.index.locate(name)?;
        self.read_member(location).await
    }

    /// Extract a member previously taken from [`XarArchive::entries`]
    pub async fn extract_entry(&self, entry: &ManifestEntry) -> Result<Vec<u8>> {
        let location = self.index.location.member_location(entry)?;
        self.read_member(location).await
    }

    async fn read_member(&self, location: MemberLocation) -> Result<Vec<u8>> {
        if location.end() > self.reader.size() {
            return Err(XarError::short_read(
                location.absolute_offset,
                location.length as usize,
                self.reader.size().saturating_sub(location.absolute_offset) as usize,
            ));
        }
        debug!(
            offset = location.absolute_offset,
            size = location.length,
            "reading member"
        );
        let mut buf = vec![0u8; location.length as usize];
        self.reader
            .read_exact_at(location.absolute_offset, &mut buf)
            .await?;
        Ok(buf)
    }
}
