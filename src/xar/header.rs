//! Fixed XAR header and the derived location of the table of contents.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

use tracing::debug;

use crate::error::{Result, XarError};

use super::manifest::ManifestEntry;

/// Checksum algorithm named in the header.
///
/// Parsed for display only: the checksum itself is never verified, so a
/// successfully opened archive carries no integrity guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    None,
    Sha1,
    Md5,
    Sha256,
    Sha512,
    Unknown(u32),
}

impl ChecksumKind {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => ChecksumKind::None,
            1 => ChecksumKind::Sha1,
            2 => ChecksumKind::Md5,
            3 => ChecksumKind::Sha256,
            4 => ChecksumKind::Sha512,
            _ => ChecksumKind::Unknown(value),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            ChecksumKind::None => 0,
            ChecksumKind::Sha1 => 1,
            ChecksumKind::Md5 => 2,
            ChecksumKind::Sha256 => 3,
            ChecksumKind::Sha512 => 4,
            ChecksumKind::Unknown(v) => *v,
        }
    }
}

/// XAR header - 28 bytes, big-endian
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub magic: [u8; 4],
    pub header_size: u16,
    pub version: u16,
    pub toc_compressed_size: u64,
    pub toc_uncompressed_size: u64,
    pub checksum_kind: ChecksumKind,
}

impl ArchiveHeader {
    pub const MAGIC: &'static [u8; 4] = b"xar!";
    pub const SIZE: usize = 28;
    pub const VERSION: u16 = 1;

    /// Bytes needed to both parse the header and infer the padding.
    pub const PREFIX_SIZE: usize = 64;

    /// Parse and validate the fixed header fields.
    ///
    /// The magic is checked before anything else is decoded, then the
    /// version, then the header size.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(XarError::InsufficientData {
                needed: Self::SIZE as u64,
                available: data.len() as u64,
            });
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&data[0..4]);
        if &magic != Self::MAGIC {
            return Err(XarError::BadMagic(magic));
        }

        let mut cursor = Cursor::new(&data[4..Self::SIZE]);
        let header_size = cursor.read_u16::<BigEndian>()?;
        let version = cursor.read_u16::<BigEndian>()?;
        let toc_compressed_size = cursor.read_u64::<BigEndian>()?;
        let toc_uncompressed_size = cursor.read_u64::<BigEndian>()?;
        let checksum_kind = ChecksumKind::from_u32(cursor.read_u32::<BigEndian>()?);

        if version != Self::VERSION {
            return Err(XarError::UnsupportedVersion(version));
        }
        if header_size as usize != Self::SIZE {
            return Err(XarError::UnexpectedHeaderSize(header_size));
        }

        Ok(Self {
            magic,
            header_size,
            version,
            toc_compressed_size,
            toc_uncompressed_size,
            checksum_kind,
        })
    }
}

/// Infer the zero padding between the header and the table of contents.
///
/// Writers emit 0, 4 or 36 bytes. The longer run wins when both tests match.
/// `bytes` must hold at least [`ArchiveHeader::PREFIX_SIZE`] bytes from the
/// start of the archive.
pub fn padding_size(bytes: &[u8]) -> Result<usize> {
    let Some(tail) = bytes.get(ArchiveHeader::SIZE..ArchiveHeader::PREFIX_SIZE) else {
        return Err(XarError::InsufficientData {
            needed: ArchiveHeader::PREFIX_SIZE as u64,
            available: bytes.len() as u64,
        });
    };
    if tail.iter().all(|&b| b == 0) {
        Ok(36)
    } else if tail[..4].iter().all(|&b| b == 0) {
        Ok(4)
    } else {
        Ok(0)
    }
}

/// Where the compressed table of contents lives in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocLocation {
    pub start_offset: u64,
    pub compressed_size: u64,
}

/// Absolute byte range of one member's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberLocation {
    pub absolute_offset: u64,
    pub length: u64,
}

impl MemberLocation {
    /// Exclusive end of the payload.
    pub fn end(&self) -> u64 {
        self.absolute_offset + self.length
    }
}

impl TocLocation {
    /// First byte past the table of contents; member offsets count from here.
    pub fn end(&self) -> u64 {
        self.start_offset.saturating_add(self.compressed_size)
    }

    /// Resolve a manifest entry to an absolute byte range.
    ///
    /// Local and remote extraction both go through this routine.
    pub fn member_location(&self, entry: &ManifestEntry) -> Result<MemberLocation> {
        let absolute_offset = self
            .start_offset
            .checked_add(self.compressed_size)
            .and_then(|heap| heap.checked_add(entry.data_offset))
            .ok_or_else(|| {
                XarError::MalformedManifest(format!("offset of '{}' overflows", entry.name))
            })?;
        if absolute_offset.checked_add(entry.data_size).is_none() {
            return Err(XarError::MalformedManifest(format!(
                "size of '{}' overflows",
                entry.name
            )));
        }
        Ok(MemberLocation {
            absolute_offset,
            length: entry.data_size,
        })
    }
}

/// Calculate the start offset and compressed size of the table of contents.
///
/// Needs at least the first 64 bytes of the archive.
pub fn parse_header_shape(prefix: &[u8]) -> Result<TocLocation> {
    if prefix.len() < ArchiveHeader::PREFIX_SIZE {
        return Err(XarError::InsufficientData {
            needed: ArchiveHeader::PREFIX_SIZE as u64,
            available: prefix.len() as u64,
        });
    }

    let header = ArchiveHeader::from_bytes(prefix)?;
    debug!(
        version = header.version,
        header_size = header.header_size,
        toc_compressed = header.toc_compressed_size,
        toc_uncompressed = header.toc_uncompressed_size,
        checksum = ?header.checksum_kind,
        "XAR archive header"
    );

    let padding = padding_size(prefix)?;
    Ok(TocLocation {
        start_offset: (ArchiveHeader::SIZE + padding) as u64,
        compressed_size: header.toc_compressed_size,
    })
}
