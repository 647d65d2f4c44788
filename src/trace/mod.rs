pub mod codec;
mod convert;
mod event;
mod format;
mod hash;

pub use convert::{convert, load, store};
pub use event::{OperationRecord, TraceFile};
pub use format::TraceFormat;
pub use hash::checksum;
