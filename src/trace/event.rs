use serde::{Deserialize, Serialize};

/// A single file operation observed on a traced handle, together with its
/// result.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OperationRecord {
    Read {
        /// File position before the read.
        offset: i64,
        /// Number of bytes actually read.
        length: i64,
        /// FNV-1a checksum of the bytes read.
        checksum: u64,
    },
    Seek {
        target: i64,
    },
    Tell {
        offset: i64,
    },
    Length {
        length: i64,
    },
    Eof {
        at_eof: bool,
    },
    Flush,
}

impl OperationRecord {
    /// Short lowercase name of the operation, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            OperationRecord::Read { .. } => "read",
            OperationRecord::Seek { .. } => "seek",
            OperationRecord::Tell { .. } => "tell",
            OperationRecord::Length { .. } => "length",
            OperationRecord::Eof { .. } => "eof",
            OperationRecord::Flush => "flush",
        }
    }
}

/// A whole operation log, used by the JSON export.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceFile {
    pub records: Vec<OperationRecord>,
}
