//! The virtual filesystem capability set consumed by magic stream sessions.
//!
//! Sessions never resolve paths or mount directories themselves; they only
//! need something that can open files and perform the eight file operations
//! below.

mod memory;
mod native;

use std::io::{Read, Write};
use std::path::{Component, Path};

pub use memory::{MemoryFile, MemoryVfs};
pub use native::{NativeFile, NativeVfs};

use crate::error::{MagicStreamError, Result};

/// An open file handle.
///
/// Offsets and lengths are signed 64-bit values, matching the operation log.
pub trait VirtualFile {
    /// Read up to `buf.len()` bytes, stopping early only at end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Move to an absolute position in `0..=length`.
    fn seek(&mut self, target: i64) -> Result<()>;

    fn tell(&mut self) -> Result<i64>;

    fn length(&mut self) -> Result<i64>;

    fn eof(&mut self) -> Result<bool>;

    /// Flush pending writes. A no-op for read handles.
    fn flush(&mut self) -> Result<()>;

    fn close(self: Box<Self>) -> Result<()>;
}

/// Something that can open files by virtual path.
pub trait Vfs {
    /// Open a file for the read-side operations of [`VirtualFile`].
    fn open_read(&self, path: &str) -> Result<Box<dyn VirtualFile>>;

    /// Open (create or truncate) a file in the write directory. The writer
    /// is unbuffered; callers batch their own writes.
    fn open_write(&self, path: &str) -> Result<Box<dyn Write>>;

    /// Open a file as a plain byte stream, e.g. to replay an operation log.
    fn open_stream(&self, path: &str) -> Result<Box<dyn Read>>;
}

fn out_of_range(target: i64, length: i64) -> MagicStreamError {
    MagicStreamError::io(
        "seeking",
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("seek target {target} outside 0..={length}"),
        ),
    )
}

/// Reject virtual paths that are absolute or climb out of the mount point.
fn check_virtual_path(path: &str) -> Result<()> {
    let bad = Path::new(path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if bad || path.is_empty() {
        return Err(MagicStreamError::io(
            "resolving path",
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid virtual path {path:?}"),
            ),
        ));
    }
    Ok(())
}
