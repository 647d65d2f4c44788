//! Benchmark and regression harness for magic streams.
//!
//! Generates a deterministic data file, records a magic stream over a
//! randomized workload, then times the same workload with and without replay
//! and compares checksums.

mod rng;
mod workload;

use std::io::{BufWriter, Write};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::session::MagicStream;
use crate::vfs::Vfs;

pub use rng::Xorshift32;
pub use workload::{Workload, WorkloadStats};

/// Data file the workload reads.
pub const DATA_FILE: &str = "test.dat";
/// Operation log recorded by the bench.
pub const STREAM_FILE: &str = "test.magicstream";

/// Harness knobs. The defaults give 8 MiB of data and 10240 opens per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    pub seed: u32,
    /// Number of `f64` values in the data file.
    pub data_pairs: u64,
    /// Initial seeks land in `0..seek_span`.
    pub seek_span: u64,
    pub max_files: u32,
    pub max_read_bytes: u32,
    pub iterations: u32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            seed: 0xc0ca_c01a,
            data_pairs: 1024 * 1024,
            seek_span: 1024 * 1024,
            max_files: 1024 * 10,
            max_read_bytes: 1024,
            iterations: 8,
        }
    }
}

/// Write `data_pairs` products of consecutive generator outputs as
/// native-endian `f64`s.
pub fn make_test_data(vfs: &dyn Vfs, path: &str, config: &BenchConfig) -> Result<()> {
    let mut rng = Xorshift32::new(config.seed);
    let mut out = BufWriter::new(
        vfs.open_write(path)
            .with_context(|| format!("failed to create test data file {path}"))?,
    );
    for _ in 0..config.data_pairs {
        let a = f64::from(rng.next_u32());
        let b = f64::from(rng.next_u32()) * a;
        out.write_all(&b.to_ne_bytes())
            .with_context(|| format!("failed to write test data file {path}"))?;
    }
    out.flush()
        .with_context(|| format!("failed to flush test data file {path}"))?;
    Ok(())
}

/// One timed workload run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub stats: WorkloadStats,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct BenchReport {
    pub generate_data: Duration,
    pub record: Option<Timing>,
    pub without: Vec<Timing>,
    pub with: Vec<Timing>,
}

impl BenchReport {
    pub fn total_without(&self) -> Duration {
        self.without.iter().map(|t| t.elapsed).sum()
    }

    pub fn total_with(&self) -> Duration {
        self.with.iter().map(|t| t.elapsed).sum()
    }
}

fn timed(f: impl FnOnce() -> Result<WorkloadStats>) -> Result<Timing> {
    let start = Instant::now();
    let stats = f()?;
    Ok(Timing {
        stats,
        elapsed: start.elapsed(),
    })
}

/// Record one magic stream over the workload, then alternate plain and
/// replayed runs for `config.iterations` rounds.
pub fn run_bench(vfs: &dyn Vfs, config: &BenchConfig) -> Result<BenchReport> {
    let mut report = BenchReport::default();

    let start = Instant::now();
    make_test_data(vfs, DATA_FILE, config)?;
    report.generate_data = start.elapsed();
    info!(elapsed_ms = report.generate_data.as_millis() as u64, "generated test data");

    let stream = MagicStream::new();
    let mut workload = Workload::new(vfs, &stream, DATA_FILE, config);

    let record = timed(|| {
        let log = vfs.open_write(STREAM_FILE)?;
        stream.create_magic_stream(log)?;
        let stats = workload.run()?;
        let summary = stream.close_magic_stream()?;
        info!(records = summary.records, "recorded magic stream");
        Ok(stats)
    })
    .context("failed to record magic stream")?;
    report.record = Some(record);

    for round in 0..config.iterations {
        let without = timed(|| Ok(workload.run()?))
            .with_context(|| format!("plain run {round} failed"))?;

        let with = timed(|| {
            let log = vfs.open_stream(STREAM_FILE)?;
            stream.open_magic_stream(log)?;
            let stats = workload.run()?;
            stream.close_magic_stream_strict()?;
            Ok(stats)
        })
        .with_context(|| format!("replayed run {round} failed"))?;

        info!(
            round,
            checksum = %format!("{:08x}", without.stats.checksum),
            without_ms = without.elapsed.as_millis() as u64,
            with_ms = with.elapsed.as_millis() as u64,
            ops = with.stats.ops,
            "bench round"
        );
        if without.stats != record.stats || with.stats != record.stats {
            bail!(
                "workload diverged in round {round}: recorded {:08x}, plain {:08x}, replayed {:08x}",
                record.stats.checksum,
                without.stats.checksum,
                with.stats.checksum
            );
        }
        report.without.push(without);
        report.with.push(with);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryVfs;

    #[test]
    fn test_data_layout() {
        let vfs = MemoryVfs::new();
        let config = BenchConfig {
            data_pairs: 3,
            ..BenchConfig::default()
        };
        make_test_data(&vfs, DATA_FILE, &config).unwrap();
        let bytes = vfs.contents(DATA_FILE).unwrap();
        assert_eq!(bytes.len(), 3 * 8);

        let mut rng = Xorshift32::new(config.seed);
        let a = f64::from(rng.next_u32());
        let b = f64::from(rng.next_u32());
        assert_eq!(&bytes[..8], &(a * b).to_ne_bytes());
    }

    #[test]
    fn small_bench_agrees() {
        let vfs = MemoryVfs::new();
        let config = BenchConfig {
            data_pairs: 8192,
            seek_span: 8192,
            max_files: 100,
            max_read_bytes: 512,
            iterations: 2,
            ..BenchConfig::default()
        };
        let report = run_bench(&vfs, &config).unwrap();
        assert_eq!(report.without.len(), 2);
        assert_eq!(report.with.len(), 2);
        let recorded = report.record.unwrap().stats;
        assert!(report.with.iter().all(|t| t.stats == recorded));
        assert!(vfs.contents(STREAM_FILE).is_some_and(|log| !log.is_empty()));
    }
}
