//! Positional writer shared by all shard tasks of one transfer.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Handle to the pre-sized destination file. Clones share one open file;
/// each `write_at` names its absolute offset and never moves a shared cursor,
/// so shards writing disjoint ranges need no coordination.
#[derive(Clone)]
pub struct DestinationWriter {
    file: Arc<File>,
    path: PathBuf,
}

impl DestinationWriter {
    pub(crate) fn from_file_and_path(file: File, path: PathBuf) -> Self {
        Self {
            file: Arc::new(file),
            path,
        }
    }

    /// Write all of `data` at `offset` (pwrite).
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.write_all_at(data, offset)
    }

    /// Write all of `data` at `offset` (overlapped write; the Windows file
    /// position is not relied on by any reader).
    #[cfg(windows)]
    pub fn write_at(&self, mut offset: u64, mut data: &[u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;
        while !data.is_empty() {
            match self.file.seek_write(data, offset) {
                Ok(0) => return Err(io::Error::new(io::ErrorKind::WriteZero, "short positional write")),
                Ok(n) => {
                    data = &data[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close. Intended to run once, after every shard task has
    /// joined; if a clone is somehow still alive the data is synced but the
    /// descriptor closes when that clone drops.
    pub fn close(self) -> io::Result<()> {
        self.file.sync_all()?;
        match Arc::try_unwrap(self.file) {
            Ok(file) => drop(file),
            Err(_) => tracing::warn!(path = %self.path.display(), "destination still shared at close"),
        }
        Ok(())
    }
}
