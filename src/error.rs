//! Error types shared by the header parser, manifest decoder and extractors.

use thiserror::Error;

/// All errors produced by the runxar library.
///
/// The variants fall into three groups a caller can react to differently:
/// format errors (the bytes are not a usable XAR archive), lookup errors
/// (the archive is fine but lacks the member) and transport errors (the
/// resource could not be reached).
#[derive(Error, Debug)]
pub enum XarError {
    /// Fewer bytes were available than the operation requires.
    #[error("Insufficient data: need {needed} bytes, have {available}")]
    InsufficientData { needed: u64, available: u64 },

    /// The first four bytes are not the XAR signature.
    #[error("Incorrect magic: {0:02x?}")]
    BadMagic([u8; 4]),

    /// Header version other than 1.
    #[error("Unknown version: {0}")]
    UnsupportedVersion(u16),

    /// Header size field other than 28.
    #[error("Unknown header size: {0}")]
    UnexpectedHeaderSize(u16),

    /// The table of contents could not be inflated.
    #[error("Corrupt table of contents: {0}")]
    CorruptToc(String),

    /// The inflated table of contents is not the expected XML shape.
    #[error("Malformed manifest: {0}")]
    MalformedManifest(String),

    /// No manifest entry carries the requested name.
    #[error("Cannot find file '{0}'")]
    MemberNotFound(String),

    /// Local I/O failure, including short reads.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connectivity was lost while talking to the remote resource.
    #[error("Remote resource unavailable: {0}")]
    TransportUnavailable(String),

    /// The request could not be built or its response not decoded.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered, but not with a usable status.
    #[error("HTTP request failed with status {status} for URL: {url}")]
    Http { status: u16, url: String },
}

/// Convenience alias for `Result<T, XarError>`.
pub type Result<T> = std::result::Result<T, XarError>;

impl XarError {
    /// Only lost connectivity is worth retrying; malformed data stays malformed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportUnavailable(_))
    }

    /// True when the bytes themselves are not a valid archive of this format.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. }
                | Self::BadMagic(_)
                | Self::UnsupportedVersion(_)
                | Self::UnexpectedHeaderSize(_)
                | Self::CorruptToc(_)
                | Self::MalformedManifest(_)
        )
    }

    pub(crate) fn short_read(offset: u64, wanted: usize, got: usize) -> Self {
        Self::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("short read at offset {offset}: wanted {wanted} bytes, got {got}"),
        ))
    }
}

impl From<reqwest::Error> for XarError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Self::Http {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        if e.is_builder() || e.is_redirect() || e.is_decode() {
            return Self::InvalidRequest(e.to_string());
        }
        // Connect, timeout, body and other send failures all mean the
        // resource could not be reached.
        Self::TransportUnavailable(e.to_string())
    }
}
