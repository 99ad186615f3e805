use clap::{Args, Subcommand};
use std::path::PathBuf;

use spdywire_codec::StatusCode;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod data;
pub mod decode;
pub mod rst_stream;
pub mod settings;
pub mod syn_reply;
pub mod syn_stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a stream of wire bytes and print each frame event.
    Decode(DecodeArgs),
    /// Build a SYN_STREAM frame.
    SynStream(SynStreamArgs),
    /// Build a SYN_REPLY frame.
    SynReply(SynReplyArgs),
    /// Build a data frame.
    Data(DataArgs),
    /// Build a RST_STREAM frame.
    RstStream(RstStreamArgs),
    /// Build a SETTINGS frame.
    Settings(SettingsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::SynStream(args) => syn_stream::run(args),
        Command::SynReply(args) => syn_reply::run(args),
        Command::Data(args) => data::run(args),
        Command::RstStream(args) => rst_stream::run(args),
        Command::Settings(args) => settings::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File of wire bytes to decode ("-" for stdin).
    pub input: PathBuf,
    /// Feed the framer N bytes at a time instead of the whole buffer.
    #[arg(long, value_name = "N")]
    pub chunk: Option<usize>,
    /// Decode input produced without header/payload compression.
    #[arg(long)]
    pub no_compression: bool,
}

#[derive(Args, Debug)]
pub struct SynStreamArgs {
    /// Stream id (nonzero, 31-bit).
    #[arg(long, short = 's')]
    pub stream_id: u32,
    /// Associated stream id.
    #[arg(long, default_value = "0")]
    pub associated_to: u32,
    /// Stream priority (0 = highest, 3 = lowest).
    #[arg(long, default_value = "0")]
    pub priority: u8,
    /// Header pair, repeatable.
    #[arg(long, value_name = "NAME=VALUE", value_parser = parse_header)]
    pub header: Vec<(String, String)>,
    /// Set the FIN flag.
    #[arg(long)]
    pub fin: bool,
    /// Compress the header block.
    #[arg(long)]
    pub compress: bool,
    /// Write wire bytes to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
    /// Print wire bytes as hex instead of raw.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct SynReplyArgs {
    /// Stream id (nonzero, 31-bit).
    #[arg(long, short = 's')]
    pub stream_id: u32,
    /// Header pair, repeatable.
    #[arg(long, value_name = "NAME=VALUE", value_parser = parse_header)]
    pub header: Vec<(String, String)>,
    /// Set the FIN flag.
    #[arg(long)]
    pub fin: bool,
    /// Compress the header block.
    #[arg(long)]
    pub compress: bool,
    /// Write wire bytes to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
    /// Print wire bytes as hex instead of raw.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct DataArgs {
    /// Stream id (nonzero, 31-bit).
    #[arg(long, short = 's')]
    pub stream_id: u32,
    /// Payload string.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Set the FIN flag.
    #[arg(long)]
    pub fin: bool,
    /// Compress the payload.
    #[arg(long)]
    pub compress: bool,
    /// Write wire bytes to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
    /// Print wire bytes as hex instead of raw.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct RstStreamArgs {
    /// Stream id (nonzero, 31-bit).
    #[arg(long, short = 's')]
    pub stream_id: u32,
    /// Status code: a name like "cancel" or a number 1-7.
    #[arg(long, value_parser = parse_status)]
    pub status: StatusCode,
    /// Write wire bytes to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
    /// Print wire bytes as hex instead of raw.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Settings entry, repeatable.
    #[arg(long, value_name = "ID=VALUE", value_parser = parse_entry)]
    pub entry: Vec<(u32, u32)>,
    /// Write wire bytes to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
    /// Print wire bytes as hex instead of raw.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))?;
    if name.is_empty() || value.is_empty() {
        return Err("header name and value must be non-empty".to_string());
    }
    Ok((name.to_string(), value.to_string()))
}

fn parse_entry(raw: &str) -> Result<(u32, u32), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got {raw:?}"))?;
    let id = id
        .parse::<u32>()
        .map_err(|err| format!("bad settings id {id:?}: {err}"))?;
    if id > 0x00ff_ffff {
        return Err(format!("settings id {id} does not fit 24 bits"));
    }
    let value = value
        .parse::<u32>()
        .map_err(|err| format!("bad settings value {value:?}: {err}"))?;
    Ok((id, value))
}

fn parse_status(raw: &str) -> Result<StatusCode, String> {
    if let Ok(number) = raw.parse::<u32>() {
        return StatusCode::try_from(number)
            .map_err(|_| format!("status code {number} out of range (1-7)"));
    }
    match raw.to_ascii_lowercase().replace('-', "_").as_str() {
        "protocol_error" => Ok(StatusCode::ProtocolError),
        "invalid_stream" => Ok(StatusCode::InvalidStream),
        "refused_stream" => Ok(StatusCode::RefusedStream),
        "unsupported_version" => Ok(StatusCode::UnsupportedVersion),
        "cancel" => Ok(StatusCode::Cancel),
        "internal_error" => Ok(StatusCode::InternalError),
        "flow_control_error" => Ok(StatusCode::FlowControlError),
        _ => Err(format!("unknown status code {raw:?}")),
    }
}
