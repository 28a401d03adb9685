//! Builds real XAR images for tests.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::Write;

/// Stand-in for the TOC checksum real archives keep at the start of the heap.
const HEAP_CHECKSUM: [u8; 20] = [0xab; 20];

pub struct XarBuilder {
    members: Vec<(String, Vec<u8>)>,
    padding: usize,
}

pub struct BuiltXar {
    pub bytes: Vec<u8>,
    pub toc_start: u64,
    pub toc_size: u64,
}

impl BuiltXar {
    pub fn toc_end(&self) -> u64 {
        self.toc_start + self.toc_size
    }
}

impl XarBuilder {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            padding: 36,
        }
    }

    pub fn padding(mut self, padding: usize) -> Self {
        assert!(matches!(padding, 0 | 4 | 36));
        self.padding = padding;
        self
    }

    pub fn member(mut self, name: &str, data: &[u8]) -> Self {
        self.members.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn build(&self) -> BuiltXar {
        let mut heap = HEAP_CHECKSUM.to_vec();
        let mut files = String::new();
        for (id, (name, data)) in self.members.iter().enumerate() {
            files.push_str(&format!(
                "<file id=\"{}\"><data><length>{}</length>\
                 <encoding style=\"application/octet-stream\"/>\
                 <offset>{}</offset><size>{}</size></data>\
                 <name>{}</name><type>file</type></file>",
                id + 1,
                data.len(),
                heap.len(),
                data.len(),
                name
            ));
            heap.extend_from_slice(data);
        }
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<xar><toc>\
             <checksum style=\"sha1\"><offset>0</offset><size>20</size></checksum>\
             {files}</toc></xar>"
        );

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(xml.as_bytes()).unwrap();
        let toc = encoder.finish().unwrap();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"xar!");
        bytes.extend_from_slice(&28u16.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&(toc.len() as u64).to_be_bytes());
        bytes.extend_from_slice(&(xml.len() as u64).to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.resize(28 + self.padding, 0);
        let toc_start = bytes.len() as u64;
        bytes.extend_from_slice(&toc);
        bytes.extend_from_slice(&heap);

        BuiltXar {
            bytes,
            toc_start,
            toc_size: toc.len() as u64,
        }
    }
}

/// A package-like archive with a handful of members.
pub fn sample() -> XarBuilder {
    XarBuilder::new()
        .member("Distribution", b"<?xml version=\"1.0\"?><installer-gui-script/>")
        .member("Scripts", b"\x1f\x8b\x08\x00compressed scripts")
        .member("Payload", &(0..=255u8).cycle().take(10_000).collect::<Vec<_>>())
        .member("Empty", b"")
}
