use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;

use super::{check_virtual_path, out_of_range, VirtualFile, Vfs};
use crate::error::{MagicStreamError, Result};

/// A VFS backed by one host directory, which is both the mount point and the
/// write directory.
#[derive(Debug, Clone)]
pub struct NativeVfs {
    root: PathBuf,
}

impl NativeVfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        check_virtual_path(path)?;
        Ok(self.root.join(path))
    }
}

impl Vfs for NativeVfs {
    fn open_read(&self, path: &str) -> Result<Box<dyn VirtualFile>> {
        Ok(Box::new(NativeFile::open(self.resolve(path)?)?))
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write>> {
        let file = File::create(self.resolve(path)?)
            .map_err(|e| MagicStreamError::io("creating file", e))?;
        Ok(Box::new(file))
    }

    fn open_stream(&self, path: &str) -> Result<Box<dyn Read>> {
        let file =
            File::open(self.resolve(path)?).map_err(|e| MagicStreamError::io("opening file", e))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// A read handle on a host file.
///
/// The length is taken once at open time; the position is tracked locally so
/// `tell` and `eof` never touch the OS.
#[derive(Debug)]
pub struct NativeFile {
    reader: BufReader<File>,
    pos: i64,
    len: i64,
}

impl NativeFile {
    pub fn open(path: PathBuf) -> Result<Self> {
        let file = File::open(&path).map_err(|e| MagicStreamError::io("opening file", e))?;
        let len = file
            .metadata()
            .map_err(|e| MagicStreamError::io("querying file length", e))?
            .len();
        Ok(Self {
            reader: BufReader::new(file),
            pos: 0,
            len: i64::try_from(len).unwrap_or(i64::MAX),
        })
    }
}

impl VirtualFile for NativeFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(MagicStreamError::io("reading", e)),
            }
        }
        self.pos += filled as i64;
        Ok(filled)
    }

    fn seek(&mut self, target: i64) -> Result<()> {
        if !(0..=self.len).contains(&target) {
            return Err(out_of_range(target, self.len));
        }
        self.reader
            .seek_relative(target - self.pos)
            .map_err(|e| MagicStreamError::io("seeking", e))?;
        self.pos = target;
        Ok(())
    }

    fn tell(&mut self) -> Result<i64> {
        Ok(self.pos)
    }

    fn length(&mut self) -> Result<i64> {
        Ok(self.len)
    }

    fn eof(&mut self) -> Result<bool> {
        Ok(self.pos >= self.len)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_reach_the_file_without_flush() {
        let dir = TempDir::new().unwrap();
        let vfs = NativeVfs::new(dir.path());
        let mut w = vfs.open_write("log").unwrap();
        w.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(std::fs::read(dir.path().join("log")).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn read_seek_tell_eof() {
        let dir = TempDir::new().unwrap();
        let vfs = NativeVfs::new(dir.path());
        {
            let mut w = vfs.open_write("data.bin").unwrap();
            w.write_all(&(0u8..200).collect::<Vec<_>>()).unwrap();
            w.flush().unwrap();
        }

        let mut f = vfs.open_read("data.bin").unwrap();
        assert_eq!(f.length().unwrap(), 200);
        f.seek(150).unwrap();
        let mut buf = [0u8; 100];
        assert_eq!(f.read(&mut buf).unwrap(), 50);
        assert_eq!(buf[0], 150);
        assert_eq!(f.tell().unwrap(), 200);
        assert!(f.eof().unwrap());

        f.seek(10).unwrap();
        assert_eq!(f.read(&mut buf[..4]).unwrap(), 4);
        assert_eq!(&buf[..4], &[10, 11, 12, 13]);
        assert!(!f.eof().unwrap());
        f.close().unwrap();
    }

    #[test]
    fn seek_outside_file_fails_and_keeps_position() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("small"), b"abc").unwrap();
        let vfs = NativeVfs::new(dir.path());
        let mut f = vfs.open_read("small").unwrap();
        f.seek(2).unwrap();
        assert!(f.seek(-1).is_err());
        assert!(f.seek(4).is_err());
        assert_eq!(f.tell().unwrap(), 2);
        f.seek(3).unwrap();
        assert!(f.eof().unwrap());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let vfs = NativeVfs::new(dir.path());
        let err = vfs.open_read("nope").err().unwrap();
        assert!(matches!(err, MagicStreamError::Io { .. }));
    }
}
