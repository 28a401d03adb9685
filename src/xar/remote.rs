//! Reading XAR archives through streaming and range requests.
//!
//! Only the archive prefix holding the header and the table of contents is
//! streamed; member payloads are then fetched with one range request each.

use bytes::Bytes;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Result, XarError};
use crate::io::RangeSource;
use crate::retry::RetryPolicy;

use super::header::{ArchiveHeader, MemberLocation, TocLocation, parse_header_shape};
use super::index::XarIndex;
use super::manifest::{ManifestEntry, decode_manifest};

/// XAR archive reachable only through a [`RangeSource`]
pub struct RemoteXar<S: RangeSource> {
    source: Arc<S>,
    retry: RetryPolicy,
}

impl<S: RangeSource> RemoteXar<S> {
    pub fn new(source: Arc<S>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Fetch and decode the table of contents.
    ///
    /// The whole fetch is restarted when connectivity is lost, up to the
    /// retry ceiling. Format errors are returned at once.
    pub async fn fetch_toc(&self) -> Result<XarIndex> {
        self.retry.run(move || self.fetch_toc_once()).await
    }

    async fn fetch_toc_once(&self) -> Result<XarIndex> {
        let mut stream = self.source.open_stream().await?;
        let mut buf: Vec<u8> = Vec::new();
        let mut location: Option<TocLocation> = None;
        let mut chunks = 0u64;

        let location = loop {
            if location.is_none() && buf.len() >= ArchiveHeader::PREFIX_SIZE {
                location = Some(parse_header_shape(&buf[..ArchiveHeader::PREFIX_SIZE])?);
            }
            if let Some(loc) = location
                && buf.len() as u64 >= loc.end()
            {
                break loc;
            }

            match stream.next_chunk().await? {
                Some(chunk) => {
                    chunks += 1;
                    buf.extend_from_slice(&chunk);
                }
                None => {
                    let needed = location.map_or(ArchiveHeader::PREFIX_SIZE as u64, |l| l.end());
                    return Err(XarError::InsufficientData {
                        needed,
                        available: buf.len() as u64,
                    });
                }
            }
        };
        trace!(chunks, fetched = buf.len(), "have full table of contents");

        // Header, padding and anything past the TOC never reach the inflater.
        let start = location.start_offset as usize;
        let end = location.end() as usize;
        let manifest = decode_manifest(&buf[start..end])?;
        Ok(XarIndex::new(location, manifest))
    }

    /// Fetch the table of contents, then the bytes of the member `name`.
    ///
    /// The body of the range response is returned as-is; callers needing a
    /// length check compare it against the manifest entry themselves.
    pub async fn extract(&self, name: &str) -> Result<Bytes> {
        let index = self.fetch_toc().await?;
        self.extract_with(&index, name).await
    }

    /// Extract `name` using an index obtained from [`RemoteXar::fetch_toc`].
    pub async fn extract_with(&self, index: &XarIndex, name: &str) -> Result<Bytes> {
        let location = index.locate(name)?;
        self.fetch_member(location).await
    }

    /// Extract a specific entry of `index`, even one whose name is repeated.
    pub async fn extract_entry(&self, index: &XarIndex, entry: &ManifestEntry) -> Result<Bytes> {
        let location = index.location.member_location(entry)?;
        self.fetch_member(location).await
    }

    async fn fetch_member(&self, location: MemberLocation) -> Result<Bytes> {
        if location.length == 0 {
            return Ok(Bytes::new());
        }
        debug!(
            offset = location.absolute_offset,
            size = location.length,
            "requesting member range"
        );
        self.source
            .get_range(location.absolute_offset, location.end())
            .await
    }
}
