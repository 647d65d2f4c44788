use std::cell::RefCell;
use std::fmt;
use std::io::{Read, Write};
use std::mem;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::error::{MagicStreamError, Result};
use crate::playback::Playback;
use crate::recorder::Recorder;
use crate::trace::OperationRecord;
use crate::traced::TracedFile;
use crate::vfs::{VirtualFile, Vfs};

/// Lifecycle of one session: `Idle -> Recording -> Closed` or
/// `Idle -> Replaying -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Replaying,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Recording,
    Replaying,
}

impl SessionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Recording => "recording",
            SessionMode::Replaying => "replaying",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a session did, reported when it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub mode: SessionMode,
    /// Records appended (recording) or consumed (replaying).
    pub records: u64,
}

enum Mode {
    Record(Recorder),
    Replay(Playback),
    Passthrough,
}

/// One recording or replay over a single backing stream.
pub struct Session {
    mode: Mode,
    closed: bool,
    /// First fatal problem, reported again by `close`.
    fault: Option<MagicStreamError>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            mode: Mode::Passthrough,
            closed: false,
            fault: None,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.mode, self.closed) {
            (_, true) => SessionState::Closed,
            (Mode::Record(_), false) => SessionState::Recording,
            (Mode::Replay(_), false) => SessionState::Replaying,
            (Mode::Passthrough, false) => SessionState::Idle,
        }
    }

    pub fn mode(&self) -> Option<SessionMode> {
        match self.mode {
            Mode::Record(_) => Some(SessionMode::Recording),
            Mode::Replay(_) => Some(SessionMode::Replaying),
            Mode::Passthrough => None,
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.state() {
            SessionState::Idle => Ok(()),
            SessionState::Closed => Err(MagicStreamError::SessionClosed),
            SessionState::Recording => Err(MagicStreamError::SessionAlreadyActive {
                mode: SessionMode::Recording.as_str(),
            }),
            SessionState::Replaying => Err(MagicStreamError::SessionAlreadyActive {
                mode: SessionMode::Replaying.as_str(),
            }),
        }
    }

    /// Start appending records to `writer`.
    pub fn record(&mut self, writer: Box<dyn Write>) -> Result<()> {
        self.ensure_idle()?;
        self.mode = Mode::Record(Recorder::new(writer));
        Ok(())
    }

    /// Start checking operations against the log read from `reader`.
    pub fn replay(&mut self, reader: Box<dyn Read>) -> Result<()> {
        self.ensure_idle()?;
        self.mode = Mode::Replay(Playback::new(reader));
        Ok(())
    }

    /// Route one completed operation through the session.
    ///
    /// Recording never fails the caller's operation: a log write failure
    /// poisons the session and is returned by [`Session::close`] instead.
    /// Replay failures are returned immediately and end the session.
    pub fn observe(&mut self, record: &OperationRecord) -> Result<()> {
        match &mut self.mode {
            Mode::Passthrough => Ok(()),
            Mode::Record(recorder) => {
                if recorder.is_poisoned() {
                    return Ok(());
                }
                if let Err(e) = recorder.append(record) {
                    warn!(error = %e, "operation log poisoned; recording stopped");
                    self.fault.get_or_insert(e);
                }
                Ok(())
            }
            Mode::Replay(playback) => {
                if let Some(fault) = &self.fault {
                    return Err(failed(fault));
                }
                playback.verify(record).inspect_err(|e| {
                    if e.is_fatal_to_session() {
                        warn!(error = %e, op = record.name(), "replay failed");
                        self.fault = Some(MagicStreamError::SessionFailed {
                            reason: e.to_string(),
                        });
                    }
                })
            }
        }
    }

    /// Finalize the session. A closed session cannot be reused.
    pub fn close(&mut self, strict: bool) -> Result<SessionSummary> {
        if self.closed {
            return Err(MagicStreamError::SessionClosed);
        }
        let mode = mem::replace(&mut self.mode, Mode::Passthrough);
        let fault = self.fault.take();
        let summary = match mode {
            Mode::Passthrough => return Err(MagicStreamError::NoActiveSession),
            Mode::Record(recorder) => {
                self.closed = true;
                let finished = recorder.finish();
                if let Some(fault) = fault {
                    return Err(fault);
                }
                SessionSummary {
                    mode: SessionMode::Recording,
                    records: finished?,
                }
            }
            Mode::Replay(playback) => {
                self.closed = true;
                if let Some(fault) = fault {
                    return Err(fault);
                }
                SessionSummary {
                    mode: SessionMode::Replaying,
                    records: playback.finish(strict)?,
                }
            }
        };
        Ok(summary)
    }
}

/// The error returned by every operation after `fault` ended the session.
fn failed(fault: &MagicStreamError) -> MagicStreamError {
    let reason = match fault {
        MagicStreamError::SessionFailed { reason } => reason.clone(),
        other => other.to_string(),
    };
    MagicStreamError::SessionFailed { reason }
}

/// Explicit context through which traced files reach the active session.
///
/// Clones share the same slot. At most one session is active per context.
#[derive(Clone, Default)]
pub struct MagicStream {
    slot: Rc<RefCell<Option<Session>>>,
}

impl MagicStream {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&self, start: impl FnOnce(&mut Session) -> Result<()>) -> Result<()> {
        let mut slot = self.slot.borrow_mut();
        if let Some(mode) = slot.as_ref().and_then(Session::mode) {
            return Err(MagicStreamError::SessionAlreadyActive {
                mode: mode.as_str(),
            });
        }
        let mut session = Session::new();
        start(&mut session)?;
        *slot = Some(session);
        Ok(())
    }

    /// Begin a recording session that writes the operation log to `writer`.
    /// The session owns the writer and releases it on close.
    pub fn create_magic_stream<W: Write + 'static>(&self, writer: W) -> Result<()> {
        self.begin(|s| s.record(Box::new(writer)))?;
        info!("magic stream recording started");
        Ok(())
    }

    /// Begin a replay session that checks operations against the log read
    /// from `reader`.
    pub fn open_magic_stream<R: Read + 'static>(&self, reader: R) -> Result<()> {
        self.begin(|s| s.replay(Box::new(reader)))?;
        info!("magic stream replay started");
        Ok(())
    }

    /// Flush and release the active session. Unconsumed replay records are
    /// logged but tolerated.
    pub fn close_magic_stream(&self) -> Result<SessionSummary> {
        self.close_with(false)
    }

    /// Like [`MagicStream::close_magic_stream`], but a replay that left
    /// records unconsumed fails with `LogNotFullyConsumed`.
    pub fn close_magic_stream_strict(&self) -> Result<SessionSummary> {
        self.close_with(true)
    }

    fn close_with(&self, strict: bool) -> Result<SessionSummary> {
        let mut session = self
            .slot
            .borrow_mut()
            .take()
            .ok_or(MagicStreamError::NoActiveSession)?;
        let summary = session.close(strict)?;
        info!(
            mode = %summary.mode,
            records = summary.records,
            "magic stream closed"
        );
        Ok(summary)
    }

    pub fn mode(&self) -> Option<SessionMode> {
        self.slot.borrow().as_ref().and_then(Session::mode)
    }

    pub fn is_active(&self) -> bool {
        self.mode().is_some()
    }

    pub(crate) fn observe(&self, record: &OperationRecord) -> Result<()> {
        match self.slot.borrow_mut().as_mut() {
            Some(session) => session.observe(record),
            None => Ok(()),
        }
    }

    /// Open `path` on `vfs` as a traced file.
    pub fn open(&self, vfs: &dyn Vfs, path: &str) -> Result<TracedFile> {
        let file = vfs.open_read(path)?;
        debug!(path, active = self.is_active(), "opened traced file");
        Ok(self.wrap(file))
    }

    /// Trace an already open file.
    pub fn wrap(&self, file: Box<dyn VirtualFile>) -> TracedFile {
        TracedFile::new(file, self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine() {
        let mut session = Session::new();
        assert_eq!(session.state(), SessionState::Idle);
        session.record(Box::new(Vec::<u8>::new())).unwrap();
        assert_eq!(session.state(), SessionState::Recording);
        assert!(matches!(
            session.replay(Box::new(std::io::empty())),
            Err(MagicStreamError::SessionAlreadyActive { mode: "recording" })
        ));
        session.observe(&OperationRecord::Flush).unwrap();
        let summary = session.close(true).unwrap();
        assert_eq!(
            summary,
            SessionSummary {
                mode: SessionMode::Recording,
                records: 1
            }
        );
        assert_eq!(session.state(), SessionState::Closed);
    }

    struct BadRead;

    impl Read for BadRead {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("bad sector"))
        }
    }

    #[test]
    fn divergence_fails_every_later_operation_once() {
        let log = crate::trace::codec::encode(&OperationRecord::Flush);
        let mut session = Session::new();
        session.replay(Box::new(std::io::Cursor::new(log))).unwrap();
        let divergence = session
            .observe(&OperationRecord::Tell { offset: 0 })
            .unwrap_err();
        assert!(matches!(divergence, MagicStreamError::Divergence { index: 0, .. }));

        for _ in 0..2 {
            match session.observe(&OperationRecord::Flush).unwrap_err() {
                MagicStreamError::SessionFailed { reason } => {
                    assert_eq!(reason, divergence.to_string())
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        assert!(matches!(
            session.close(false),
            Err(MagicStreamError::SessionFailed { reason }) if reason == divergence.to_string()
        ));
    }

    #[test]
    fn unreadable_log_ends_the_replay() {
        let mut session = Session::new();
        session.replay(Box::new(BadRead)).unwrap();
        let err = session
            .observe(&OperationRecord::Seek { target: 5 })
            .unwrap_err();
        assert!(matches!(err, MagicStreamError::LogRead { offset: 0, .. }));
        assert!(err.is_fatal_to_session());
        assert!(matches!(
            session.observe(&OperationRecord::Tell { offset: 5 }),
            Err(MagicStreamError::SessionFailed { .. })
        ));
    }

    #[test]
    fn closed_session_cannot_be_reopened() {
        let mut session = Session::new();
        session.replay(Box::new(std::io::empty())).unwrap();
        session.close(true).unwrap();
        assert!(matches!(
            session.record(Box::new(Vec::<u8>::new())),
            Err(MagicStreamError::SessionClosed)
        ));
        assert!(matches!(
            session.close(false),
            Err(MagicStreamError::SessionClosed)
        ));
    }

    #[test]
    fn idle_session_has_nothing_to_close() {
        let mut session = Session::new();
        assert!(matches!(
            session.close(false),
            Err(MagicStreamError::NoActiveSession)
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn context_exclusivity() {
        let stream = MagicStream::new();
        assert!(matches!(
            stream.close_magic_stream(),
            Err(MagicStreamError::NoActiveSession)
        ));
        stream.create_magic_stream(Vec::<u8>::new()).unwrap();
        assert_eq!(stream.mode(), Some(SessionMode::Recording));
        assert!(matches!(
            stream.create_magic_stream(Vec::<u8>::new()),
            Err(MagicStreamError::SessionAlreadyActive { .. })
        ));
        assert!(matches!(
            stream.open_magic_stream(std::io::empty()),
            Err(MagicStreamError::SessionAlreadyActive { .. })
        ));
        stream.close_magic_stream().unwrap();
        assert!(!stream.is_active());
        stream.open_magic_stream(std::io::empty()).unwrap();
        assert_eq!(stream.mode(), Some(SessionMode::Replaying));
        stream.close_magic_stream_strict().unwrap();
    }

    #[test]
    fn separate_contexts_are_independent() {
        let a = MagicStream::new();
        let b = MagicStream::new();
        a.create_magic_stream(Vec::<u8>::new()).unwrap();
        b.create_magic_stream(Vec::<u8>::new()).unwrap();
        a.close_magic_stream().unwrap();
        b.close_magic_stream().unwrap();
    }
}
