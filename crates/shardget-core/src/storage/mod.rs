//! Destination file lifecycle.
//!
//! Creates/truncates the destination, pre-sizes it to the content length
//! (fallocate on Linux when available, else set_len), grants concurrent
//! positional writes (pwrite) to shard tasks, and closes it once.

mod builder;
mod writer;

pub use builder::DestinationBuilder;
pub use writer::DestinationWriter;

use std::io;
use std::path::Path;

/// Create `path`, pre-size it to `size` bytes and return the shared writer.
pub fn open_presized(path: &Path, size: u64) -> io::Result<DestinationWriter> {
    let mut builder = DestinationBuilder::create(path)?;
    builder.preallocate(size)?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn create_preallocate_write_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.bin");

        let writer = open_presized(&path, 100).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 100);

        writer.write_at(0, b"hello").unwrap();
        writer.write_at(50, b"world").unwrap();
        writer.write_at(95, b"xy").unwrap();
        writer.close().unwrap();

        let buf = std::fs::read(&path).unwrap();
        assert_eq!(buf.len(), 100);
        assert_eq!(&buf[0..5], b"hello");
        assert_eq!(&buf[50..55], b"world");
        assert_eq!(&buf[95..97], b"xy");
        assert!(buf[5..50].iter().all(|&b| b == 0));
    }

    #[test]
    fn create_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.bin");
        std::fs::write(&path, vec![7u8; 4096]).unwrap();

        let writer = open_presized(&path, 10).unwrap();
        writer.close().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![0u8; 10]);
    }

    #[test]
    fn concurrent_disjoint_writes_land_at_their_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let writer = open_presized(&path, 8 * 1024).unwrap();

        thread::scope(|s| {
            for i in 0..8u8 {
                let w = writer.clone();
                s.spawn(move || {
                    let chunk = vec![i; 1024];
                    // Write back-to-front to make cursor reliance visible.
                    w.write_at(i as u64 * 1024 + 512, &chunk[512..]).unwrap();
                    w.write_at(i as u64 * 1024, &chunk[..512]).unwrap();
                });
            }
        });
        writer.close().unwrap();

        let buf = std::fs::read(&path).unwrap();
        for (i, block) in buf.chunks(1024).enumerate() {
            assert!(block.iter().all(|&b| b == i as u8), "block {} corrupted", i);
        }
    }
}
