//! Builder for creating and preallocating the destination file.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use super::writer::DestinationWriter;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Call `preallocate` then `build` to get a `DestinationWriter` that supports
/// concurrent `write_at` from multiple shard tasks.
pub struct DestinationBuilder {
    file: File,
    path: PathBuf,
}

impl DestinationBuilder {
    /// Create (or truncate) the destination file at `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| io::Error::new(e.kind(), format!("failed to create {}: {}", path.display(), e)))?;
        Ok(DestinationBuilder {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Size the file to `size` bytes before any shard writes. On Linux tries
    /// `posix_fallocate` for real block allocation; falls back to `set_len`.
    pub fn preallocate(&mut self, size: u64) -> io::Result<()> {
        #[cfg(target_os = "linux")]
        {
            let fd = self.file.as_raw_fd();
            let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
            if r == 0 {
                return Ok(());
            }
            tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
        }
        self.file.set_len(size)
    }

    /// Hand out the plain file for sequential (cursor-based) writing.
    pub fn into_file(self) -> File {
        self.file
    }

    pub fn build(self) -> DestinationWriter {
        DestinationWriter::from_file_and_path(self.file, self.path)
    }
}
