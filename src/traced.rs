use tracing::debug;

use crate::error::Result;
use crate::session::MagicStream;
use crate::trace::{checksum, OperationRecord};
use crate::vfs::VirtualFile;

/// A file whose operations are routed through the magic stream context it
/// was opened from.
///
/// Every operation first runs on the real file. When a session is active the
/// result is then recorded or checked; return values are never altered.
pub struct TracedFile {
    inner: Box<dyn VirtualFile>,
    stream: MagicStream,
}

impl TracedFile {
    pub(crate) fn new(inner: Box<dyn VirtualFile>, stream: MagicStream) -> Self {
        Self { inner, stream }
    }

    pub fn close(self) -> Result<()> {
        debug!(active = self.stream.is_active(), "closing traced file");
        self.inner.close()
    }
}

impl VirtualFile for TracedFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.stream.is_active() {
            return self.inner.read(buf);
        }
        let offset = self.inner.tell()?;
        let n = self.inner.read(buf)?;
        self.stream.observe(&OperationRecord::Read {
            offset,
            length: n as i64,
            checksum: checksum(&buf[..n]),
        })?;
        Ok(n)
    }

    fn seek(&mut self, target: i64) -> Result<()> {
        self.inner.seek(target)?;
        self.stream.observe(&OperationRecord::Seek { target })
    }

    fn tell(&mut self) -> Result<i64> {
        let offset = self.inner.tell()?;
        self.stream.observe(&OperationRecord::Tell { offset })?;
        Ok(offset)
    }

    fn length(&mut self) -> Result<i64> {
        let length = self.inner.length()?;
        self.stream.observe(&OperationRecord::Length { length })?;
        Ok(length)
    }

    fn eof(&mut self) -> Result<bool> {
        let at_eof = self.inner.eof()?;
        self.stream.observe(&OperationRecord::Eof { at_eof })?;
        Ok(at_eof)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        self.stream.observe(&OperationRecord::Flush)
    }

    fn close(self: Box<Self>) -> Result<()> {
        TracedFile::close(*self)
    }
}
