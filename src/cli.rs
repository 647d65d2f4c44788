use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::harness::BenchConfig;

/// Record, replay and inspect magic stream operation logs
#[derive(Parser, Debug)]
#[command(author, version, about, propagate_version = true)]
pub struct Cli {
    /// Log filter (e.g. `info`, `magic_stream=debug`); `RUST_LOG` wins when set
    #[arg(long = "log-level", value_name = "FILTER", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate test data, record a magic stream over a randomized workload,
    /// then time the workload with and without replay
    Bench {
        /// Directory used as mount point and write directory
        #[arg(short = 'd', long = "dir", value_name = "DIR", default_value = ".")]
        dir: PathBuf,
        /// Seed of the xorshift generator driving the workload
        #[arg(long, default_value_t = BenchConfig::default().seed)]
        seed: u32,
        /// Number of f64 values written to the test data file
        #[arg(long = "data-pairs", default_value_t = BenchConfig::default().data_pairs)]
        data_pairs: u64,
        /// Number of file opens per workload run
        #[arg(long = "max-files", default_value_t = BenchConfig::default().max_files)]
        max_files: u32,
        /// Upper bound (exclusive) on bytes requested by a single read
        #[arg(long = "max-read-bytes", default_value_t = BenchConfig::default().max_read_bytes)]
        max_read_bytes: u32,
        /// Number of plain/replayed rounds
        #[arg(short = 'n', long, default_value_t = BenchConfig::default().iterations)]
        iterations: u32,
    },
    /// Print the records of an operation log, one per line
    Dump {
        /// Trace file (extension determines format: .magicstream/.msl/.log, .json or .cbor)
        trace: PathBuf,
        /// Trace format (binary, json or cbor). If not specified, inferred from file extension
        #[arg(
            short = 'f',
            long = "format",
            value_name = "FORMAT",
            value_parser = ["binary", "json", "cbor"]
        )]
        format: Option<String>,
    },
    /// Convert a trace file between the binary log, JSON and CBOR formats
    Convert {
        /// Input trace file
        input: PathBuf,
        /// Output trace file (extension determines format)
        output: PathBuf,
        /// Input format (binary, json or cbor). If not specified, inferred from file extension
        #[arg(
            long = "input-format",
            value_name = "FORMAT",
            value_parser = ["binary", "json", "cbor"]
        )]
        input_format: Option<String>,
        /// Output format (binary, json or cbor). If not specified, inferred from file extension
        #[arg(
            long = "output-format",
            value_name = "FORMAT",
            value_parser = ["binary", "json", "cbor"]
        )]
        output_format: Option<String>,
    },
}
