use super::ReadAt;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Local file reader with random access support
///
/// Every read is positioned, so concurrent readers never share a cursor.
pub struct LocalFileReader {
    #[cfg_attr(not(any(unix, windows)), allow(dead_code))]
    file: std::fs::File,
    #[cfg_attr(any(unix, windows), allow(dead_code))]
    path: PathBuf,
    size: u64,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            size,
        })
    }
}

/// Seek-and-read on a handle of its own, for targets without positioned reads.
#[cfg_attr(any(unix, windows), allow(dead_code))]
fn read_at_fresh_handle(path: &Path, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    use std::io::{Read, Seek, SeekFrom};

    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    file.read(buf)
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            Ok(self.file.read_at(buf, offset)?)
        }

        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            Ok(self.file.seek_read(buf, offset)?)
        }

        #[cfg(not(any(unix, windows)))]
        {
            Ok(read_at_fresh_handle(&self.path, offset, buf)?)
        }
    }

    fn size(&self) -> u64 {
        self.size
    }
}
