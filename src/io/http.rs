use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{ChunkStream, RangeSource};
use crate::config::FetchConfig;
use crate::error::{Result, XarError};
use tracing::trace;

/// HTTP Range reader for remote XAR files
pub struct HttpRangeReader {
    client: Client,
    url: String,
    chunk_size: usize,
    transferred_bytes: Arc<AtomicU64>,
}

impl HttpRangeReader {
    /// Create a new HTTP Range reader
    ///
    /// No request is sent until the archive is streamed or a range is fetched.
    pub fn new(url: String, config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| XarError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            url,
            chunk_size: config.chunk_size.max(1),
            transferred_bytes: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    fn status_error(&self, status: StatusCode) -> XarError {
        XarError::Http {
            status: status.as_u16(),
            url: self.url.clone(),
        }
    }
}

/// Response body re-cut into chunks of a fixed size
struct HttpPrefixStream {
    response: Response,
    pending: BytesMut,
    chunk_size: usize,
    finished: bool,
    transferred_bytes: Arc<AtomicU64>,
}

#[async_trait]
impl ChunkStream for HttpPrefixStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        while self.pending.len() < self.chunk_size && !self.finished {
            match self.response.chunk().await? {
                Some(piece) => {
                    self.transferred_bytes
                        .fetch_add(piece.len() as u64, Ordering::Relaxed);
                    self.pending.extend_from_slice(&piece);
                }
                None => self.finished = true,
            }
        }

        if self.pending.is_empty() {
            return Ok(None);
        }
        let n = self.chunk_size.min(self.pending.len());
        Ok(Some(self.pending.split_to(n).freeze()))
    }
}

#[async_trait]
impl RangeSource for HttpRangeReader {
    async fn open_stream(&self) -> Result<Box<dyn ChunkStream>> {
        let resp = self
            .client
            .get(&self.url)
            .header("Range", "bytes=0-")
            .send()
            .await?;

        // A server that ignores Range answers 200 with the whole body from
        // offset 0, which is just as good for a prefix read.
        let status = resp.status();
        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            return Err(self.status_error(status));
        }
        trace!(url = %self.url, %status, "streaming archive prefix");

        Ok(Box::new(HttpPrefixStream {
            response: resp,
            pending: BytesMut::with_capacity(self.chunk_size),
            chunk_size: self.chunk_size,
            finished: false,
            transferred_bytes: self.transferred_bytes.clone(),
        }))
    }

    async fn get_range(&self, start: u64, end: u64) -> Result<Bytes> {
        if end <= start {
            return Ok(Bytes::new());
        }

        let range = format!("bytes={}-{}", start, end - 1);
        let resp = self
            .client
            .get(&self.url)
            .header("Range", &range)
            .send()
            .await?;

        if resp.status() != StatusCode::PARTIAL_CONTENT {
            return Err(self.status_error(resp.status()));
        }

        let bytes = resp.bytes().await?;
        self.transferred_bytes
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        trace!(url = %self.url, %range, received = bytes.len(), "range request");
        Ok(bytes)
    }
}
