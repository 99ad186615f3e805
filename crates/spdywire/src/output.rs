use std::io::{IsTerminal, Write};
use std::path::Path;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::exit::{io_error, CliResult};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

/// One decoded frame event, as printed by `spdywire decode`.
#[derive(Serialize)]
pub struct EventRecord {
    pub schema_id: &'static str,
    pub event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<HeaderPair>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EventRecord {
    pub fn new(event: &'static str) -> Self {
        Self {
            schema_id: "https://schemas.spdywire.dev/cli/v1/frame-event.schema.json",
            event,
            kind: None,
            stream_id: None,
            flags: None,
            length: None,
            headers: None,
            detail: None,
            payload: None,
            error: None,
        }
    }
}

pub fn print_record(record: &EventRecord, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "KIND", "STREAM", "SIZE", "DETAIL"])
                .add_row(vec![
                    record.event.to_string(),
                    record.kind.unwrap_or("-").to_string(),
                    record
                        .stream_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    record
                        .length
                        .map(|len| len.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    table_detail(record),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut line = format!("event={}", record.event);
            if let Some(kind) = record.kind {
                line.push_str(&format!(" kind={kind}"));
            }
            if let Some(stream_id) = record.stream_id {
                line.push_str(&format!(" stream={stream_id}"));
            }
            if let Some(length) = record.length {
                line.push_str(&format!(" size={length}"));
            }
            if let Some(headers) = &record.headers {
                for pair in headers {
                    line.push_str(&format!(" {}={}", pair.name, pair.value));
                }
            }
            if let Some(detail) = &record.detail {
                line.push_str(&format!(" {detail}"));
            }
            if let Some(payload) = &record.payload {
                line.push_str(&format!(" payload={payload}"));
            }
            if let Some(error) = &record.error {
                line.push_str(&format!(" error={error}"));
            }
            println!("{line}");
        }
        OutputFormat::Raw => {
            if let Some(payload) = &record.payload {
                print_raw(payload.as_bytes());
            }
        }
    }
}

fn table_detail(record: &EventRecord) -> String {
    if let Some(headers) = &record.headers {
        return headers
            .iter()
            .map(|pair| format!("{}={}", pair.name, pair.value))
            .collect::<Vec<_>>()
            .join(", ");
    }
    if let Some(detail) = &record.detail {
        return detail.clone();
    }
    if let Some(error) = &record.error {
        return error.clone();
    }
    record.payload.clone().unwrap_or_else(|| "-".to_string())
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Write encoded frame bytes to a file, or to stdout (hex when requested,
/// raw otherwise).
pub fn write_frame_bytes(data: &[u8], out: Option<&Path>, hex: bool) -> CliResult<()> {
    match out {
        Some(path) => {
            std::fs::write(path, data).map_err(|err| io_error("write failed", err))?;
        }
        None if hex => println!("{}", to_hex(data)),
        None => print_raw(data),
    }
    Ok(())
}
