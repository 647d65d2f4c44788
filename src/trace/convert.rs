use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::codec;
use super::event::{OperationRecord, TraceFile};
use super::format::TraceFormat;
use crate::util::cbor::at_record_boundary_eof;

/// Load every record of a trace file in the given format.
pub fn load(input: &Path, format: TraceFormat) -> Result<Vec<OperationRecord>> {
    let input_file = File::open(input)
        .with_context(|| format!("failed to open input trace file at {}", input.display()))?;
    let mut reader = BufReader::new(input_file);

    let records = match format {
        TraceFormat::Binary => {
            let mut bytes = Vec::new();
            reader
                .read_to_end(&mut bytes)
                .with_context(|| format!("failed to read operation log at {}", input.display()))?;
            codec::decode_all(&bytes)
                .with_context(|| format!("failed to decode operation log at {}", input.display()))?
        }
        TraceFormat::Json => {
            let TraceFile { records } = serde_json::from_reader(reader).with_context(|| {
                format!("failed to parse JSON trace file at {}", input.display())
            })?;
            records
        }
        TraceFormat::Cbor => {
            let mut records = Vec::new();
            loop {
                let done = at_record_boundary_eof(&mut reader).with_context(|| {
                    format!("failed to read CBOR trace file at {}", input.display())
                })?;
                if done {
                    break;
                }
                let record = ciborium::from_reader::<OperationRecord, _>(&mut reader)
                    .map_err(|e| anyhow::Error::msg(format!("{}", e)))
                    .with_context(|| {
                        format!("failed to parse CBOR trace file at {}", input.display())
                    })?;
                records.push(record);
            }
            records
        }
    };

    Ok(records)
}

/// Write `records` to `output` in the given format.
pub fn store(output: &Path, format: TraceFormat, records: Vec<OperationRecord>) -> Result<()> {
    let output_file = File::create(output)
        .with_context(|| format!("failed to create output trace file at {}", output.display()))?;

    match format {
        TraceFormat::Json => {
            let trace = TraceFile { records };
            serde_json::to_writer_pretty(output_file, &trace).with_context(|| {
                format!("failed to write JSON trace file at {}", output.display())
            })?;
        }
        TraceFormat::Binary | TraceFormat::Cbor => {
            let mut writer = BufWriter::new(output_file);
            for record in &records {
                if format == TraceFormat::Binary {
                    codec::write_record(&mut writer, record).with_context(|| {
                        format!("failed to write operation log at {}", output.display())
                    })?;
                } else {
                    ciborium::into_writer(record, &mut writer).with_context(|| {
                        format!("failed to write CBOR trace file at {}", output.display())
                    })?;
                }
            }
            writer.flush().with_context(|| {
                format!("failed to flush trace file at {}", output.display())
            })?;
        }
    }

    Ok(())
}

pub fn convert(
    input: &Path,
    output: &Path,
    input_format: TraceFormat,
    output_format: TraceFormat,
) -> Result<()> {
    let records = load(input, input_format)?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        records = records.len(),
        "converting trace"
    );
    store(output, output_format, records)
}
