//! Wire-level constants and small protocol types.
//!
//! All multi-byte integers on the wire are big-endian. The common 8-byte
//! frame header is shared by control and data frames; the top bit of the
//! first 16-bit word discriminates the two.

use crate::error::SpdyError;

/// Protocol version spoken by this crate.
pub const SPDY_VERSION: u16 = 1;

/// Common frame header: first word (2) + type/stream-id tail (2) +
/// flags (1) + length (3) = 8 bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Top bit of the first 16-bit word: set for control frames.
pub const CONTROL_FLAG_MASK: u16 = 0x8000;

/// Stream ids are 31-bit; the top bit is reserved and always zero.
pub const STREAM_ID_MASK: u32 = 0x7fff_ffff;

/// Frame lengths are 24-bit.
pub const LENGTH_MASK: u32 = 0x00ff_ffff;

/// Control flag: no further data follows on this stream (SYN_REPLY).
pub const CONTROL_FLAG_FIN: u8 = 0x01;

/// Data flag: end of stream.
pub const DATA_FLAG_FIN: u8 = 0x01;

/// Data flag: payload bytes are compressed.
pub const DATA_FLAG_COMPRESSED: u8 = 0x02;

/// Fixed sub-header of SYN_STREAM: stream id (4) + associated stream id (4)
/// + priority word (2).
pub const SYN_STREAM_SUBHEADER_SIZE: usize = 10;

/// Fixed sub-header of SYN_REPLY: stream id (4) + unused word (2).
pub const SYN_REPLY_SUBHEADER_SIZE: usize = 6;

/// RST_STREAM payload: stream id (4) + status code (4). Exact.
pub const RST_STREAM_PAYLOAD_SIZE: usize = 8;

/// GOAWAY payload: last-accepted stream id (4). Exact.
pub const GOAWAY_PAYLOAD_SIZE: usize = 4;

/// WINDOW_UPDATE payload: stream id (4) + delta (4). Exact.
pub const WINDOW_UPDATE_PAYLOAD_SIZE: usize = 8;

/// SETTINGS payload: entry count (4), then 8 bytes per entry. Minimum.
pub const SETTINGS_MIN_PAYLOAD_SIZE: usize = 4;

/// Control frame type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ControlKind {
    SynStream = 1,
    SynReply = 2,
    RstStream = 3,
    Settings = 4,
    Noop = 5,
    Goaway = 7,
    WindowUpdate = 9,
}

impl ControlKind {
    /// Human-readable wire name.
    pub fn name(self) -> &'static str {
        match self {
            ControlKind::SynStream => "SYN_STREAM",
            ControlKind::SynReply => "SYN_REPLY",
            ControlKind::RstStream => "RST_STREAM",
            ControlKind::Settings => "SETTINGS",
            ControlKind::Noop => "NOOP",
            ControlKind::Goaway => "GOAWAY",
            ControlKind::WindowUpdate => "WINDOW_UPDATE",
        }
    }
}

impl TryFrom<u16> for ControlKind {
    type Error = SpdyError;

    fn try_from(raw: u16) -> Result<Self, SpdyError> {
        match raw {
            1 => Ok(ControlKind::SynStream),
            2 => Ok(ControlKind::SynReply),
            3 => Ok(ControlKind::RstStream),
            4 => Ok(ControlKind::Settings),
            5 => Ok(ControlKind::Noop),
            7 => Ok(ControlKind::Goaway),
            9 => Ok(ControlKind::WindowUpdate),
            _ => Err(SpdyError::InvalidControlFrame),
        }
    }
}

/// RST_STREAM status codes. Zero is invalid on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StatusCode {
    ProtocolError = 1,
    InvalidStream = 2,
    RefusedStream = 3,
    UnsupportedVersion = 4,
    Cancel = 5,
    InternalError = 6,
    FlowControlError = 7,
}

impl StatusCode {
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::ProtocolError => "PROTOCOL_ERROR",
            StatusCode::InvalidStream => "INVALID_STREAM",
            StatusCode::RefusedStream => "REFUSED_STREAM",
            StatusCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            StatusCode::Cancel => "CANCEL",
            StatusCode::InternalError => "INTERNAL_ERROR",
            StatusCode::FlowControlError => "FLOW_CONTROL_ERROR",
        }
    }
}

impl TryFrom<u32> for StatusCode {
    type Error = SpdyError;

    fn try_from(raw: u32) -> Result<Self, SpdyError> {
        match raw {
            1 => Ok(StatusCode::ProtocolError),
            2 => Ok(StatusCode::InvalidStream),
            3 => Ok(StatusCode::RefusedStream),
            4 => Ok(StatusCode::UnsupportedVersion),
            5 => Ok(StatusCode::Cancel),
            6 => Ok(StatusCode::InternalError),
            7 => Ok(StatusCode::FlowControlError),
            _ => Err(SpdyError::InvalidControlFrame),
        }
    }
}

/// Known SETTINGS entry ids (24-bit).
pub const SETTINGS_UPLOAD_BANDWIDTH: u32 = 1;
pub const SETTINGS_DOWNLOAD_BANDWIDTH: u32 = 2;
pub const SETTINGS_ROUND_TRIP_TIME: u32 = 3;
pub const SETTINGS_MAX_CONCURRENT_STREAMS: u32 = 4;
pub const SETTINGS_CURRENT_CWND: u32 = 5;

/// SETTINGS entry flag: the receiver should persist the value.
pub const SETTINGS_FLAG_PERSIST_VALUE: u8 = 0x01;
/// SETTINGS entry flag: the value was persisted from a prior session.
pub const SETTINGS_FLAG_PERSISTED: u8 = 0x02;

/// A single SETTINGS entry. On the wire this is an id/flags word (8-bit
/// flags in the top byte, 24-bit id below) followed by a 32-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub id: u32,
    pub flags: u8,
    pub value: u32,
}

impl Setting {
    pub fn new(id: u32, value: u32) -> Self {
        Self { id, flags: 0, value }
    }
}

/// Returns a human-readable name for a SETTINGS entry id.
pub fn setting_name(id: u32) -> &'static str {
    match id {
        SETTINGS_UPLOAD_BANDWIDTH => "UPLOAD_BANDWIDTH",
        SETTINGS_DOWNLOAD_BANDWIDTH => "DOWNLOAD_BANDWIDTH",
        SETTINGS_ROUND_TRIP_TIME => "ROUND_TRIP_TIME",
        SETTINGS_MAX_CONCURRENT_STREAMS => "MAX_CONCURRENT_STREAMS",
        SETTINGS_CURRENT_CWND => "CURRENT_CWND",
        _ => "UNKNOWN",
    }
}

/// An ordered set of name/value header pairs.
///
/// Wire order is preserved for iteration. Names are unique: `insert`
/// replaces the value of an existing name in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    entries: Vec<(String, String)>,
}

impl HeaderBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair, replacing the value if the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderBlock {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut block = HeaderBlock::new();
        for (name, value) in iter {
            block.insert(name, value);
        }
        block
    }
}
