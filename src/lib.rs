//! magic-stream: operation recording and replay for virtual file handles
//!
//! A magic stream session either records every operation performed on traced
//! files into a compact binary log, or replays a log and checks that the same
//! operations produce the same results.

/// Command-line definitions shared by the binaries
pub mod cli;

pub mod error;

/// Benchmark harness driving a randomized file workload
pub mod harness;

mod playback;
mod recorder;
mod session;

/// Operation records, the binary log codec and trace export
pub mod trace;

mod traced;

/// Utility functions
pub mod util;

/// The virtual filesystem capability set
pub mod vfs;

pub use error::{MagicStreamError, Result};
pub use playback::Playback;
pub use recorder::Recorder;
pub use session::{MagicStream, Session, SessionMode, SessionState, SessionSummary};
pub use trace::OperationRecord;
pub use traced::TracedFile;
pub use vfs::{VirtualFile, Vfs};
