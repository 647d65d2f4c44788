use std::io::Write;

use crate::error::{MagicStreamError, Result};
use crate::trace::{codec, OperationRecord};

/// Pending bytes that trigger a write to the backing stream.
pub const LOG_BUFFER_CAPACITY: usize = 8 * 1024;

/// Appends operation records to a backing stream.
///
/// Records are buffered here; the backing stream sees them in batches of
/// roughly [`LOG_BUFFER_CAPACITY`] bytes and on [`Recorder::finish`], so it
/// should not add a buffer of its own. After the first write failure the
/// recorder is poisoned and every further append fails without touching the
/// stream.
pub struct Recorder {
    writer: Box<dyn Write>,
    pending: Vec<u8>,
    records: u64,
    /// Records the backing stream has accepted.
    written: u64,
    poisoned: Option<String>,
}

impl Recorder {
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            pending: Vec::with_capacity(LOG_BUFFER_CAPACITY),
            records: 0,
            written: 0,
            poisoned: None,
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    fn check_poisoned(&self) -> Result<()> {
        match &self.poisoned {
            Some(reason) => Err(MagicStreamError::SessionFailed {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn fail(&mut self, source: std::io::Error) -> MagicStreamError {
        let err = MagicStreamError::LogWrite {
            written: self.written,
            source,
        };
        self.poisoned = Some(err.to_string());
        err
    }

    fn drain(&mut self) -> Result<()> {
        if let Err(source) = self.writer.write_all(&self.pending) {
            return Err(self.fail(source));
        }
        self.pending.clear();
        self.written = self.records;
        Ok(())
    }

    pub fn append(&mut self, record: &OperationRecord) -> Result<()> {
        self.check_poisoned()?;
        self.pending.extend_from_slice(&codec::encode(record));
        self.records += 1;
        if self.pending.len() >= LOG_BUFFER_CAPACITY {
            self.drain()?;
        }
        Ok(())
    }

    /// Write out every pending record, flush and release the backing stream.
    pub fn finish(mut self) -> Result<u64> {
        self.check_poisoned()?;
        self.drain()?;
        if let Err(source) = self.writer.flush() {
            return Err(self.fail(source));
        }
        Ok(self.records)
    }
}
