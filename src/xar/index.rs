use crate::error::{Result, XarError};

use super::header::{MemberLocation, TocLocation};
use super::manifest::{Manifest, ManifestEntry};

/// Everything needed to find members: where the TOC sits and what it says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XarIndex {
    pub location: TocLocation,
    pub manifest: Manifest,
}

impl XarIndex {
    pub fn new(location: TocLocation, manifest: Manifest) -> Self {
        Self { location, manifest }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        self.manifest.entries()
    }

    /// Look up `name` and resolve its absolute byte range.
    pub fn locate(&self, name: &str) -> Result<MemberLocation> {
        let entry = self
            .manifest
            .lookup(name)
            .ok_or_else(|| XarError::MemberNotFound(name.to_string()))?;
        self.location.member_location(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> XarIndex {
        XarIndex::new(
            TocLocation {
                start_offset: 64,
                compressed_size: 100,
            },
            Manifest::new(vec![ManifestEntry {
                name: "Scripts".to_string(),
                data_offset: 10,
                data_size: 20,
                length: None,
                encoding: None,
            }]),
        )
    }

    #[test]
    fn locate_resolves_absolute_range() {
        let loc = index().locate("Scripts").unwrap();
        assert_eq!(loc.absolute_offset, 174);
        assert_eq!(loc.length, 20);
    }

    #[test]
    fn locate_missing_member_is_not_found() {
        match index().locate("Payload") {
            Err(XarError::MemberNotFound(name)) => assert_eq!(name, "Payload"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
