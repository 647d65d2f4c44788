use magic_stream::trace::{codec, OperationRecord, TraceFile};
use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Arbitrary operation record (newtype because both the trait and the type are foreign here)
#[derive(Debug, Clone, PartialEq, Eq)]
struct AnyRecord(OperationRecord);

impl Arbitrary for AnyRecord {
    fn arbitrary(g: &mut Gen) -> Self {
        let variant = u8::arbitrary(g) % 6;
        AnyRecord(match variant {
            0 => OperationRecord::Read {
                offset: i64::arbitrary(g),
                length: i64::arbitrary(g),
                checksum: u64::arbitrary(g),
            },
            1 => OperationRecord::Seek {
                target: i64::arbitrary(g),
            },
            2 => OperationRecord::Tell {
                offset: i64::arbitrary(g),
            },
            3 => OperationRecord::Length {
                length: i64::arbitrary(g),
            },
            4 => OperationRecord::Eof {
                at_eof: bool::arbitrary(g),
            },
            5 => OperationRecord::Flush,
            _ => unreachable!(),
        })
    }
}

/// Generate a limited-size vector to avoid overly large test cases
fn arbitrary_vec_limited<T: Arbitrary>(g: &mut Gen, max_size: usize) -> Vec<T> {
    let size = usize::arbitrary(g) % max_size.min(g.size()).max(1);
    (0..size).map(|_| T::arbitrary(g)).collect()
}

#[derive(Debug, Clone)]
struct AnyTrace(Vec<OperationRecord>);

impl Arbitrary for AnyTrace {
    fn arbitrary(g: &mut Gen) -> Self {
        let records: Vec<AnyRecord> = arbitrary_vec_limited(g, 50);
        AnyTrace(records.into_iter().map(|r| r.0).collect())
    }
}

#[quickcheck]
fn codec_roundtrip(record: AnyRecord) -> bool {
    codec::decode(&codec::encode(&record.0)).ok() == Some(record.0)
}

#[quickcheck]
fn log_roundtrip_preserves_order(trace: AnyTrace) -> bool {
    let bytes: Vec<u8> = trace.0.iter().flat_map(codec::encode).collect();
    codec::decode_all(&bytes).ok() == Some(trace.0)
}

#[quickcheck]
fn truncated_log_never_decodes_silently(trace: AnyTrace, cut: usize) -> bool {
    let bytes: Vec<u8> = trace.0.iter().flat_map(codec::encode).collect();
    if bytes.is_empty() {
        return true;
    }
    let cut = cut % bytes.len();
    match codec::decode_all(&bytes[..cut]) {
        // A cut on a record boundary yields a strict prefix.
        Ok(prefix) => trace.0.starts_with(&prefix) && prefix.len() < trace.0.len(),
        Err(_) => true,
    }
}

/// Run the convert command using the binary
fn run_convert(input: &PathBuf, output: &PathBuf) -> Result<(), String> {
    let status = std::process::Command::new(env!("CARGO_BIN_EXE_magic-stream"))
        .arg("convert")
        .arg(input)
        .arg(output)
        .status()
        .map_err(|e| format!("Failed to run convert: {}", e))?;

    if status.success() {
        Ok(())
    } else {
        Err(format!("Convert command failed with status: {}", status))
    }
}

#[quickcheck]
fn roundtrip_binary_to_json_to_cbor_to_binary(trace: AnyTrace) -> Result<bool, String> {
    let temp_dir = TempDir::new().map_err(|e| format!("Failed to create temp dir: {}", e))?;

    // Write original log in the binary format
    let log_path = temp_dir.path().join("original.magicstream");
    let bytes: Vec<u8> = trace.0.iter().flat_map(codec::encode).collect();
    fs::write(&log_path, &bytes).map_err(|e| format!("Failed to write log: {}", e))?;

    // Binary -> JSON -> CBOR -> binary
    let json_path = temp_dir.path().join("converted.json");
    run_convert(&log_path, &json_path)?;
    let cbor_path = temp_dir.path().join("converted.cbor");
    run_convert(&json_path, &cbor_path)?;
    let log2_path = temp_dir.path().join("roundtrip.msl");
    run_convert(&cbor_path, &log2_path)?;

    // The JSON stage must hold the same records
    let json_file =
        fs::File::open(&json_path).map_err(|e| format!("Failed to open JSON: {}", e))?;
    let TraceFile { records } = serde_json::from_reader(&json_file)
        .map_err(|e| format!("Failed to parse JSON: {}", e))?;

    let bytes2 = fs::read(&log2_path).map_err(|e| format!("Failed to read log: {}", e))?;

    // Compare
    Ok(records == trace.0 && bytes == bytes2)
}

#[test]
fn dump_prints_one_line_per_record() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_path = temp_dir.path().join("t.magicstream");
    let records = [
        OperationRecord::Seek { target: 100 },
        OperationRecord::Read {
            offset: 100,
            length: 50,
            checksum: 0x0123_4567_89ab_cdef,
        },
        OperationRecord::Flush,
    ];
    let bytes: Vec<u8> = records.iter().flat_map(codec::encode).collect();
    fs::write(&log_path, bytes).expect("Failed to write log");

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_magic-stream"))
        .arg("dump")
        .arg(&log_path)
        .output()
        .expect("Failed to run dump");
    assert!(
        output.status.success(),
        "dump failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "{stdout}");
    assert!(lines[0].contains("seek") && lines[0].contains("target=100"));
    assert!(lines[1].contains("checksum=0123456789abcdef"), "{}", lines[1]);
    assert!(lines[2].ends_with("flush"));
}

#[test]
fn corrupt_log_fails_convert() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_path = temp_dir.path().join("bad.magicstream");
    fs::write(&log_path, [2u8, 1, 2, 3]).expect("Failed to write log");
    let json_path = temp_dir.path().join("out.json");
    assert!(run_convert(&log_path, &json_path).is_err());
}
