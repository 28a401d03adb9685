//! Tunables for remote access.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default size of the chunks the TOC prefix is accumulated in.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Default per-request timeout of the HTTP client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for fetching archives over HTTP.
///
/// The chunk size only affects how many reads the prefix fetch takes, never
/// its result.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Bytes per chunk while streaming the archive prefix (at least 1).
    pub chunk_size: usize,
    /// Timeout applied to each HTTP request.
    pub timeout: Duration,
    /// How connectivity failures during the prefix fetch are retried.
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_never_drops_to_zero() {
        let config = FetchConfig::default().with_chunk_size(0);
        assert_eq!(config.chunk_size, 1);
    }

    #[test]
    fn defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.retry, RetryPolicy::default());
    }
}
