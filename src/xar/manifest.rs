//! Table of contents decoding.
//!
//! The TOC is a zlib stream holding an XML document. Only the parts needed
//! to locate member payloads are kept:
//!
//! ```text
//! <xar>
//!   <toc>
//!     <file id="1">
//!       <name>Scripts</name>
//!       <type>file</type>
//!       <data>
//!         <offset>10</offset>
//!         <size>20</size>
//!         <length>58</length>
//!         <encoding style="application/x-gzip"/>
//!       </data>
//!     </file>
//!   </toc>
//! </xar>
//! ```
//!
//! `file` elements directly under the root are accepted as well.

use flate2::{Decompress, FlushDecompress, Status};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::error::{Result, XarError};

/// One payload-bearing member of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    /// Offset of the payload, counted from the end of the table of contents.
    pub data_offset: u64,
    /// Number of payload bytes stored in the archive.
    pub data_size: u64,
    /// Declared length after the payload's own encoding is undone.
    pub length: Option<u64>,
    /// MIME style of the payload encoding, e.g. `application/x-gzip`.
    pub encoding: Option<String>,
}

/// Decoded table of contents, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// First entry named exactly `name`.
    ///
    /// Names are compared verbatim; when the TOC repeats a name the earliest
    /// entry in document order wins.
    pub fn lookup(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse an already inflated TOC document.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let xml = std::str::from_utf8(xml)
            .map_err(|e| malformed(format!("table of contents is not UTF-8: {e}")))?;
        let mut reader = Reader::from_str(xml);
        let mut builder = ManifestBuilder::default();

        loop {
            let event = reader.read_event().map_err(|e| {
                malformed(format!(
                    "XML error at byte {}: {e}",
                    reader.error_position()
                ))
            })?;
            match event {
                Event::Start(e) => builder.open(&e)?,
                Event::Empty(e) => {
                    builder.open(&e)?;
                    builder.close()?;
                }
                Event::End(_) => builder.close()?,
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| malformed(format!("bad text content: {e}")))?;
                    builder.text.push_str(&text);
                }
                Event::CData(c) => builder.text.push_str(&String::from_utf8_lossy(&c)),
                Event::Eof => break,
                _ => {}
            }
        }

        builder.finish()
    }
}

/// Inflate and parse the compressed table of contents.
///
/// `compressed` must be exactly the TOC bytes. Bytes left over after the end
/// of the zlib stream are rejected as `CorruptToc`, so a caller that slices
/// past the TOC boundary fails instead of silently decoding.
pub fn decode_manifest(compressed: &[u8]) -> Result<Manifest> {
    let xml = inflate(compressed)?;
    debug!(
        compressed = compressed.len(),
        uncompressed = xml.len(),
        "inflated table of contents"
    );
    let manifest = Manifest::from_xml(&xml)?;
    debug!(entries = manifest.len(), "decoded manifest");
    Ok(manifest)
}

/// Inflate a complete zlib stream, failing if it stops before its end marker
/// or is followed by anything else.
fn inflate(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(compressed.len().saturating_mul(4).max(256));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity());
        }
        let consumed = inflater.total_in();
        let produced = inflater.total_out();
        let input = &compressed[consumed as usize..];

        let status = inflater
            .decompress_vec(input, &mut out, FlushDecompress::Finish)
            .map_err(|e| XarError::CorruptToc(e.to_string()))?;
        if status == Status::StreamEnd {
            let used = inflater.total_in() as usize;
            if used != compressed.len() {
                return Err(XarError::CorruptToc(format!(
                    "{} trailing bytes after end of stream",
                    compressed.len() - used
                )));
            }
            return Ok(out);
        }

        let stalled = inflater.total_in() == consumed && inflater.total_out() == produced;
        if stalled && out.len() < out.capacity() {
            return Err(XarError::CorruptToc(format!(
                "stream truncated after {} of {} bytes",
                consumed,
                compressed.len()
            )));
        }
    }
}

fn malformed(reason: impl Into<String>) -> XarError {
    XarError::MalformedManifest(reason.into())
}

/// Fields of a `file` element collected while its subtree is being read.
#[derive(Debug, Default)]
struct PendingFile {
    /// Stack depth of the `file` element itself.
    depth: usize,
    name: Option<String>,
    kind: Option<String>,
    has_data: bool,
    offset: Option<String>,
    size: Option<String>,
    length: Option<String>,
    encoding: Option<String>,
}

impl PendingFile {
    fn finish(self) -> Result<Option<ManifestEntry>> {
        let name = self
            .name
            .ok_or_else(|| malformed("file element without a name"))?;

        if !self.has_data {
            // Directories carry no payload of their own.
            if self.kind.as_deref().map(str::trim) == Some("directory") {
                return Ok(None);
            }
            return Err(malformed(format!("'{name}' has no data element")));
        }

        let data_offset = parse_decimal(&name, "offset", self.offset.as_deref())?;
        let data_size = parse_decimal(&name, "size", self.size.as_deref())?;
        let length = match self.length.as_deref() {
            Some(text) => Some(parse_decimal(&name, "length", Some(text))?),
            None => None,
        };

        Ok(Some(ManifestEntry {
            name,
            data_offset,
            data_size,
            length,
            encoding: self.encoding,
        }))
    }
}

fn parse_decimal(name: &str, field: &str, text: Option<&str>) -> Result<u64> {
    let text = text
        .map(str::trim)
        .ok_or_else(|| malformed(format!("'{name}' has no data/{field}")))?;
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(format!(
            "'{name}' has non-numeric data/{field}: {text:?}"
        )));
    }
    text.parse()
        .map_err(|_| malformed(format!("'{name}' data/{field} out of range: {text}")))
}

#[derive(Debug, Default)]
struct ManifestBuilder {
    stack: Vec<String>,
    pending: Option<PendingFile>,
    text: String,
    entries: Vec<ManifestEntry>,
    saw_root: bool,
}

impl ManifestBuilder {
    /// `file` elements count when they sit under the root or under `root/toc`.
    fn at_manifest_level(&self) -> bool {
        match self.stack.as_slice() {
            [_root] => true,
            [_root, toc] => toc == "toc",
            _ => false,
        }
    }

    fn open(&mut self, element: &BytesStart) -> Result<()> {
        let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        self.text.clear();
        self.saw_root = true;

        if self.pending.is_none() && tag == "file" && self.at_manifest_level() {
            self.pending = Some(PendingFile {
                depth: self.stack.len(),
                ..Default::default()
            });
        } else if let Some(pending) = self.pending.as_mut() {
            let path = &self.stack[pending.depth + 1..];
            match (path, tag.as_str()) {
                ([], "data") => pending.has_data = true,
                ([data], "encoding") if data == "data" => {
                    let style = element
                        .try_get_attribute("style")
                        .map_err(|e| malformed(format!("bad encoding attribute: {e}")))?;
                    if let Some(style) = style {
                        let value = style
                            .unescape_value()
                            .map_err(|e| malformed(format!("bad encoding style: {e}")))?;
                        pending.encoding = Some(value.into_owned());
                    }
                }
                _ => {}
            }
        }

        self.stack.push(tag);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(tag) = self.stack.pop() else {
            return Ok(());
        };
        let text = std::mem::take(&mut self.text);

        let Some(pending) = self.pending.as_mut() else {
            return Ok(());
        };
        if self.stack.len() == pending.depth {
            if let Some(file) = self.pending.take()
                && let Some(entry) = file.finish()?
            {
                self.entries.push(entry);
            }
            return Ok(());
        }

        let path = &self.stack[pending.depth + 1..];
        match (path, tag.as_str()) {
            ([], "name") => pending.name = Some(text),
            ([], "type") => pending.kind = Some(text),
            ([data], "offset") if data == "data" => pending.offset = Some(text),
            ([data], "size") if data == "data" => pending.size = Some(text),
            ([data], "length") if data == "data" => pending.length = Some(text),
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<Manifest> {
        if !self.saw_root {
            return Err(malformed("document has no root element"));
        }
        if !self.stack.is_empty() {
            return Err(malformed(format!(
                "document ended inside <{}>",
                self.stack.join("/")
            )));
        }
        Ok(Manifest::new(self.entries))
    }
}
