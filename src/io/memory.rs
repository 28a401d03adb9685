use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{ChunkStream, RangeSource, ReadAt};
use crate::error::{Result, XarError};

/// An archive held in memory, usable both as a local and a remote source
///
/// Streams hand out fixed-size chunks and count what they deliver, which
/// makes this the reference source for checking how much of an archive a
/// fetch actually touched.
#[derive(Clone)]
pub struct MemorySource {
    data: Bytes,
    chunk_size: usize,
    streamed_bytes: Arc<AtomicU64>,
    chunks: Arc<AtomicU64>,
    range_requests: Arc<AtomicU64>,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>, chunk_size: usize) -> Self {
        Self {
            data: data.into(),
            chunk_size: chunk_size.max(1),
            streamed_bytes: Arc::new(AtomicU64::new(0)),
            chunks: Arc::new(AtomicU64::new(0)),
            range_requests: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Bytes handed out by streams so far
    pub fn streamed_bytes(&self) -> u64 {
        self.streamed_bytes.load(Ordering::Relaxed)
    }

    /// Chunks handed out by streams so far
    pub fn chunks_served(&self) -> u64 {
        self.chunks.load(Ordering::Relaxed)
    }

    /// Range requests answered so far
    pub fn range_requests(&self) -> u64 {
        self.range_requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReadAt for MemorySource {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

struct MemoryStream {
    remaining: Bytes,
    chunk_size: usize,
    streamed_bytes: Arc<AtomicU64>,
    chunks: Arc<AtomicU64>,
}

#[async_trait]
impl ChunkStream for MemoryStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.remaining.is_empty() {
            return Ok(None);
        }
        let n = self.chunk_size.min(self.remaining.len());
        let chunk = self.remaining.split_to(n);
        self.streamed_bytes.fetch_add(n as u64, Ordering::Relaxed);
        self.chunks.fetch_add(1, Ordering::Relaxed);
        Ok(Some(chunk))
    }
}

#[async_trait]
impl RangeSource for MemorySource {
    async fn open_stream(&self) -> Result<Box<dyn ChunkStream>> {
        Ok(Box::new(MemoryStream {
            remaining: self.data.clone(),
            chunk_size: self.chunk_size,
            streamed_bytes: self.streamed_bytes.clone(),
            chunks: self.chunks.clone(),
        }))
    }

    async fn get_range(&self, start: u64, end: u64) -> Result<Bytes> {
        self.range_requests.fetch_add(1, Ordering::Relaxed);
        let len = self.data.len() as u64;
        if start > end || start > len {
            return Err(XarError::Http {
                status: 416,
                url: format!("memory:{start}-{end}"),
            });
        }
        // Like an HTTP server, clamp the end to the resource size.
        let end = end.min(len);
        Ok(self.data.slice(start as usize..end as usize))
    }
}
