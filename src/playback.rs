use std::io::{BufReader, Read};

use crate::error::{MagicStreamError, Result};
use crate::trace::{codec, OperationRecord};

/// Consumes a recorded operation log in order and checks live operations
/// against it.
///
/// Records are decoded from the backing stream on demand, never loaded up
/// front.
pub struct Playback {
    reader: BufReader<Box<dyn Read>>,
    /// Byte offset of the next record in the log.
    offset: u64,
    consumed: u64,
}

impl Playback {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self {
            reader: BufReader::new(reader),
            offset: 0,
            consumed: 0,
        }
    }

    /// Pop the next recorded operation.
    pub fn next_expected(&mut self) -> Result<OperationRecord> {
        match codec::read_record(&mut self.reader, self.offset)? {
            Some((record, used)) => {
                self.offset += used as u64;
                self.consumed += 1;
                Ok(record)
            }
            None => Err(MagicStreamError::LogExhausted {
                consumed: self.consumed,
                attempted: None,
            }),
        }
    }

    /// Check a live operation against the next recorded one.
    pub fn verify(&mut self, actual: &OperationRecord) -> Result<()> {
        let expected = self.next_expected().map_err(|e| match e {
            MagicStreamError::LogExhausted { consumed, .. } => MagicStreamError::LogExhausted {
                consumed,
                attempted: Some(*actual),
            },
            other => other,
        })?;
        if expected != *actual {
            return Err(MagicStreamError::Divergence {
                index: self.consumed - 1,
                expected,
                actual: *actual,
            });
        }
        Ok(())
    }

    /// Count the records that were never consumed, decoding the rest of the
    /// log.
    pub fn remaining(&mut self) -> Result<u64> {
        let mut remaining = 0;
        while let Some((_, used)) = codec::read_record(&mut self.reader, self.offset)? {
            self.offset += used as u64;
            remaining += 1;
        }
        Ok(remaining)
    }

    /// Finish the replay. In strict mode unconsumed records are an error;
    /// otherwise they are only logged.
    pub fn finish(mut self, strict: bool) -> Result<u64> {
        let consumed = self.consumed;
        let remaining = self.remaining()?;
        if remaining > 0 {
            if strict {
                return Err(MagicStreamError::LogNotFullyConsumed {
                    consumed,
                    remaining,
                });
            }
            tracing::warn!(consumed, remaining, "operation log not fully consumed");
        }
        Ok(consumed)
    }
}
