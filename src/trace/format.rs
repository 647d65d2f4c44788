use anyhow::{bail, Result};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    /// The native tag + fixed-width payload log written by a recording session
    Binary,
    Json,
    Cbor,
}

impl TraceFormat {
    pub fn from_path_and_option(path: &Path, format_opt: Option<&str>) -> Result<Self> {
        if let Some(format_str) = format_opt {
            return match format_str {
                "binary" => Ok(TraceFormat::Binary),
                "json" => Ok(TraceFormat::Json),
                "cbor" => Ok(TraceFormat::Cbor),
                _ => bail!("unsupported format: {}", format_str),
            };
        }

        // Infer from file extension
        match path.extension().and_then(|s| s.to_str()) {
            Some("magicstream") | Some("msl") | Some("log") => Ok(TraceFormat::Binary),
            Some("json") => Ok(TraceFormat::Json),
            Some("cbor") => Ok(TraceFormat::Cbor),
            Some(ext) => bail!("unsupported file extension: .{}", ext),
            None => bail!("cannot determine trace format: no file extension"),
        }
    }
}
