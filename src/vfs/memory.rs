use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::rc::Rc;

use super::{check_virtual_path, out_of_range, VirtualFile, Vfs};
use crate::error::{MagicStreamError, Result};

type Contents = Rc<RefCell<Vec<u8>>>;

/// An in-memory VFS for tests.
///
/// Clones share the same files. Writers append straight into the shared
/// contents, so data is visible to readers opened afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryVfs {
    files: Rc<RefCell<HashMap<String, Contents>>>,
}

impl MemoryVfs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.files
            .borrow_mut()
            .insert(path.to_string(), Rc::new(RefCell::new(data.into())));
    }

    /// A copy of the current contents of `path`.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).map(|c| c.borrow().clone())
    }

    fn lookup(&self, path: &str) -> Result<Contents> {
        check_virtual_path(path)?;
        self.files.borrow().get(path).cloned().ok_or_else(|| {
            MagicStreamError::io(
                "opening file",
                io::Error::new(io::ErrorKind::NotFound, format!("no such file: {path}")),
            )
        })
    }
}

impl Vfs for MemoryVfs {
    fn open_read(&self, path: &str) -> Result<Box<dyn VirtualFile>> {
        Ok(Box::new(MemoryFile {
            data: self.lookup(path)?,
            pos: 0,
        }))
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write>> {
        check_virtual_path(path)?;
        let data: Contents = Rc::default();
        self.files
            .borrow_mut()
            .insert(path.to_string(), Rc::clone(&data));
        Ok(Box::new(MemoryWriter { data }))
    }

    fn open_stream(&self, path: &str) -> Result<Box<dyn Read>> {
        Ok(Box::new(MemoryFile {
            data: self.lookup(path)?,
            pos: 0,
        }))
    }
}

struct MemoryWriter {
    data: Contents,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A handle on an in-memory file.
#[derive(Debug)]
pub struct MemoryFile {
    data: Contents,
    pos: i64,
}

impl MemoryFile {
    fn len(&self) -> i64 {
        self.data.borrow().len() as i64
    }
}

impl VirtualFile for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let data = self.data.borrow();
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        drop(data);
        self.pos += n as i64;
        Ok(n)
    }

    fn seek(&mut self, target: i64) -> Result<()> {
        let len = self.len();
        if !(0..=len).contains(&target) {
            return Err(out_of_range(target, len));
        }
        self.pos = target;
        Ok(())
    }

    fn tell(&mut self) -> Result<i64> {
        Ok(self.pos)
    }

    fn length(&mut self) -> Result<i64> {
        Ok(self.len())
    }

    fn eof(&mut self) -> Result<bool> {
        Ok(self.pos >= self.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        VirtualFile::read(self, buf).map_err(io::Error::other)
    }
}
