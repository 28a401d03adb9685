mod http;
mod local;
mod memory;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;
pub use memory::MemorySource;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, XarError};

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill the whole buffer, treating a short read as an error
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..]).await?;
            if n == 0 {
                return Err(XarError::short_read(offset, buf.len(), filled));
            }
            filled += n;
        }
        Ok(())
    }
}

/// Sequential source of byte chunks, read once from the start
#[async_trait]
pub trait ChunkStream: Send {
    /// Next chunk, or `None` once the source is exhausted
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// A resource reachable only through streaming reads and range requests
#[async_trait]
pub trait RangeSource: Send + Sync {
    /// Start streaming the resource from offset 0 with no end bound
    async fn open_stream(&self) -> Result<Box<dyn ChunkStream>>;

    /// Fetch bytes `[start, end)`
    async fn get_range(&self, start: u64, end: u64) -> Result<Bytes>;
}
