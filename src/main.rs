use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use magic_stream::cli::{Cli, Command};
use magic_stream::harness::{run_bench, BenchConfig};
use magic_stream::trace::{self, OperationRecord, TraceFormat};
use magic_stream::vfs::NativeVfs;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Command::Bench {
            dir,
            seed,
            data_pairs,
            max_files,
            max_read_bytes,
            iterations,
        } => {
            let config = BenchConfig {
                seed,
                data_pairs,
                seek_span: data_pairs,
                max_files,
                max_read_bytes,
                iterations,
            };
            bench(&dir, &config)
        }
        Command::Dump { trace, format } => {
            let fmt = TraceFormat::from_path_and_option(&trace, format.as_deref())?;
            dump(&trace, fmt)
        }
        Command::Convert {
            input,
            output,
            input_format,
            output_format,
        } => {
            let in_fmt = TraceFormat::from_path_and_option(&input, input_format.as_deref())?;
            let out_fmt = TraceFormat::from_path_and_option(&output, output_format.as_deref())?;
            trace::convert(&input, &output, in_fmt, out_fmt)
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn bench(dir: &Path, config: &BenchConfig) -> Result<()> {
    let vfs = NativeVfs::new(dir);
    let report = run_bench(&vfs, config)
        .with_context(|| format!("bench failed in {}", dir.display()))?;

    println!(
        "Generating test data file..\tGeneration took {} milliseconds.",
        report.generate_data.as_millis()
    );
    if let Some(record) = report.record {
        println!(
            "Generating magic stream..\tGeneration took {} milliseconds.",
            record.elapsed.as_millis()
        );
    }
    println!();
    for (without, with) in report.without.iter().zip(&report.with) {
        println!(
            "Running test without magic stream..\t[{:08x}] Test took {:5} milliseconds. ({} file operations)",
            without.stats.checksum,
            without.elapsed.as_millis(),
            without.stats.ops
        );
        println!(
            "Running test with magic stream..\t[{:08x}] Test took {:5} milliseconds. ({} file operations)",
            with.stats.checksum,
            with.elapsed.as_millis(),
            with.stats.ops
        );
    }
    println!("total without: \t{}", report.total_without().as_millis());
    println!("total with: \t{}", report.total_with().as_millis());
    Ok(())
}

fn dump(path: &Path, format: TraceFormat) -> Result<()> {
    let records = trace::load(path, format)?;
    for (index, record) in records.iter().enumerate() {
        match record {
            OperationRecord::Read {
                offset,
                length,
                checksum,
            } => println!(
                "{index:>8} read   offset={offset} length={length} checksum={}",
                hex::encode(checksum.to_be_bytes())
            ),
            OperationRecord::Seek { target } => println!("{index:>8} seek   target={target}"),
            OperationRecord::Tell { offset } => println!("{index:>8} tell   offset={offset}"),
            OperationRecord::Length { length } => println!("{index:>8} length length={length}"),
            OperationRecord::Eof { at_eof } => println!("{index:>8} eof    at_eof={at_eof}"),
            OperationRecord::Flush => println!("{index:>8} flush"),
        }
    }
    Ok(())
}
