use crate::error::{MagicStreamError, Result};
use crate::session::MagicStream;
use crate::vfs::{VirtualFile, Vfs};

use super::rng::Xorshift32;
use super::BenchConfig;

/// Counters produced by one [`Workload::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkloadStats {
    pub opens: u32,
    /// Bytes requested by reads (not necessarily delivered).
    pub bytes: u64,
    pub ops: u64,
    pub checksum: u32,
}

/// The randomized file workload: a small state machine over read, tell,
/// relative seek, nested open, flush, remaining length and eof.
///
/// The whole run is a pure function of the configuration and the data file,
/// so two runs issue the same operations in the same order.
pub struct Workload<'a> {
    vfs: &'a dyn Vfs,
    stream: &'a MagicStream,
    path: &'a str,
    config: &'a BenchConfig,
    rng: Xorshift32,
    scratch: Vec<u8>,
    stats: WorkloadStats,
}

/// Only failures of the real file operation are tolerated by the workload;
/// anything coming from the session aborts the run.
fn tolerate_io<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(MagicStreamError::Io { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

impl<'a> Workload<'a> {
    pub fn new(
        vfs: &'a dyn Vfs,
        stream: &'a MagicStream,
        path: &'a str,
        config: &'a BenchConfig,
    ) -> Self {
        Self {
            vfs,
            stream,
            path,
            config,
            rng: Xorshift32::new(config.seed),
            scratch: vec![0; config.max_read_bytes as usize],
            stats: WorkloadStats::default(),
        }
    }

    /// Reset the generator and counters, then open files until the file
    /// limit is reached.
    pub fn run(&mut self) -> Result<WorkloadStats> {
        self.rng = Xorshift32::new(self.config.seed);
        self.scratch.fill(0);
        self.stats = WorkloadStats::default();
        while self.stats.opens < self.config.max_files {
            self.visit_file()?;
        }
        Ok(self.stats)
    }

    fn rand(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn visit_file(&mut self) -> Result<()> {
        let mut file = self.stream.open(self.vfs, self.path)?;
        let start = u64::from(self.rand()) % self.config.seek_span.max(1);
        tolerate_io(file.seek(start as i64))?;
        self.stats.opens += 1;
        self.stats.ops += 1;

        let mut action: i32 = 0;
        loop {
            let next: i32 = match action {
                1 => {
                    self.stats.ops += 1;
                    file.tell()? as i32
                }
                2 => {
                    let delta = i64::from(self.rand() % 100) - 50;
                    let target = file.tell()? + delta;
                    tolerate_io(file.seek(target))?;
                    self.stats.ops += 2;
                    0
                }
                3 => {
                    self.visit_file()?;
                    0
                }
                4 => {
                    file.flush()?;
                    self.stats.ops += 1;
                    0
                }
                5 => {
                    let remaining = file.length()? - file.tell()?;
                    self.stats.ops += 2;
                    remaining as i32
                }
                6 => {
                    file.eof()?;
                    self.stats.ops += 1;
                    0
                }
                _ => {
                    let requested = self.rand() % self.config.max_read_bytes.max(1);
                    let requested = requested as usize;
                    file.read(&mut self.scratch[..requested])?;
                    self.stats.bytes += requested as u64;
                    self.stats.ops += 1;
                    // Stale bytes past a short read are summed as well.
                    self.scratch[..requested]
                        .iter()
                        .map(|&b| i32::from(b as i8))
                        .sum()
                }
            };

            self.stats.checksum = self.stats.checksum.wrapping_add(next as u32);
            let mut next = next % 7;
            if next == action {
                next = 0;
            }
            action = next;

            if action == 4 || self.stats.opens >= self.config.max_files {
                break;
            }
        }

        file.close()?;
        self.stats.ops += 1;
        Ok(())
    }
}
