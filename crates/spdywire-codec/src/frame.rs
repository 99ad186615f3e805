//! Frame model: a tagged union over the two wire frame kinds.
//!
//! Frames own their payload as [`Bytes`]; the common 8-byte header is
//! regenerated on encode. Type-specific fields of control payloads are
//! exposed through accessors that validate size before reading.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, SpdyError};
use crate::protocol::{
    ControlKind, Setting, StatusCode, CONTROL_FLAG_MASK, FRAME_HEADER_SIZE, GOAWAY_PAYLOAD_SIZE,
    LENGTH_MASK, RST_STREAM_PAYLOAD_SIZE, SETTINGS_MIN_PAYLOAD_SIZE, STREAM_ID_MASK,
    SYN_REPLY_SUBHEADER_SIZE, SYN_STREAM_SUBHEADER_SIZE, WINDOW_UPDATE_PAYLOAD_SIZE,
};

/// A complete SPDY frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpdyFrame {
    Control(ControlFrame),
    Data(DataFrame),
}

impl SpdyFrame {
    /// Encode the frame into the wire format.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            SpdyFrame::Control(frame) => frame.encode(dst),
            SpdyFrame::Data(frame) => frame.encode(dst),
        }
    }

    /// The complete wire bytes of this frame.
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        self.encode(&mut dst);
        dst.freeze()
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        match self {
            SpdyFrame::Control(frame) => FRAME_HEADER_SIZE + frame.payload.len(),
            SpdyFrame::Data(frame) => FRAME_HEADER_SIZE + frame.payload.len(),
        }
    }
}

impl From<ControlFrame> for SpdyFrame {
    fn from(frame: ControlFrame) -> Self {
        SpdyFrame::Control(frame)
    }
}

impl From<DataFrame> for SpdyFrame {
    fn from(frame: DataFrame) -> Self {
        SpdyFrame::Data(frame)
    }
}

/// A control frame: version, type, flags, and the type-specific payload
/// (everything after the common 8-byte header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    pub version: u16,
    pub kind: ControlKind,
    pub flags: u8,
    pub payload: Bytes,
}

/// A data frame: a chunk of one stream's payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub stream_id: u32,
    pub flags: u8,
    pub payload: Bytes,
}

/// SYN_STREAM fixed fields plus the (possibly compressed) header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynStream {
    pub stream_id: u32,
    pub associated_stream_id: u32,
    pub priority: u8,
    pub header_block: Bytes,
}

/// SYN_REPLY fixed fields plus the (possibly compressed) header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynReply {
    pub stream_id: u32,
    pub header_block: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RstStream {
    pub stream_id: u32,
    pub status: StatusCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Goaway {
    pub last_accepted_stream_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowUpdate {
    pub stream_id: u32,
    pub delta_window_size: u32,
}

impl ControlFrame {
    /// Encode this frame into the wire format.
    pub fn encode(&self, dst: &mut BytesMut) {
        debug_assert_eq!(self.payload.len() as u32 & !LENGTH_MASK, 0);
        dst.reserve(FRAME_HEADER_SIZE + self.payload.len());
        dst.put_u16(CONTROL_FLAG_MASK | self.version);
        dst.put_u16(self.kind as u16);
        dst.put_u32((u32::from(self.flags) << 24) | (self.payload.len() as u32 & LENGTH_MASK));
        dst.put_slice(&self.payload);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.payload.len());
        self.encode(&mut dst);
        dst.freeze()
    }

    /// Interpret the payload as SYN_STREAM fields.
    pub fn syn_stream(&self) -> Result<SynStream> {
        if self.kind != ControlKind::SynStream || self.payload.len() < SYN_STREAM_SUBHEADER_SIZE {
            return Err(SpdyError::InvalidControlFrame);
        }
        let mut buf = self.payload.clone();
        let stream_id = buf.get_u32() & STREAM_ID_MASK;
        let associated_stream_id = buf.get_u32() & STREAM_ID_MASK;
        let priority = (buf.get_u16() >> 14) as u8;
        Ok(SynStream {
            stream_id,
            associated_stream_id,
            priority,
            header_block: self.payload.slice(SYN_STREAM_SUBHEADER_SIZE..),
        })
    }

    /// Interpret the payload as SYN_REPLY fields.
    pub fn syn_reply(&self) -> Result<SynReply> {
        if self.kind != ControlKind::SynReply || self.payload.len() < SYN_REPLY_SUBHEADER_SIZE {
            return Err(SpdyError::InvalidControlFrame);
        }
        let mut buf = self.payload.clone();
        let stream_id = buf.get_u32() & STREAM_ID_MASK;
        Ok(SynReply {
            stream_id,
            header_block: self.payload.slice(SYN_REPLY_SUBHEADER_SIZE..),
        })
    }

    /// Interpret the payload as RST_STREAM fields.
    pub fn rst_stream(&self) -> Result<RstStream> {
        if self.kind != ControlKind::RstStream || self.payload.len() != RST_STREAM_PAYLOAD_SIZE {
            return Err(SpdyError::InvalidControlFrame);
        }
        let mut buf = self.payload.clone();
        let stream_id = buf.get_u32() & STREAM_ID_MASK;
        let status = StatusCode::try_from(buf.get_u32())?;
        Ok(RstStream { stream_id, status })
    }

    /// Interpret the payload as GOAWAY fields.
    pub fn goaway(&self) -> Result<Goaway> {
        if self.kind != ControlKind::Goaway || self.payload.len() != GOAWAY_PAYLOAD_SIZE {
            return Err(SpdyError::InvalidControlFrame);
        }
        let mut buf = self.payload.clone();
        Ok(Goaway {
            last_accepted_stream_id: buf.get_u32() & STREAM_ID_MASK,
        })
    }

    /// Interpret the payload as WINDOW_UPDATE fields.
    pub fn window_update(&self) -> Result<WindowUpdate> {
        if self.kind != ControlKind::WindowUpdate
            || self.payload.len() != WINDOW_UPDATE_PAYLOAD_SIZE
        {
            return Err(SpdyError::InvalidControlFrame);
        }
        let mut buf = self.payload.clone();
        let stream_id = buf.get_u32() & STREAM_ID_MASK;
        let delta_window_size = buf.get_u32() & STREAM_ID_MASK;
        if delta_window_size == 0 {
            return Err(SpdyError::InvalidControlFrame);
        }
        Ok(WindowUpdate {
            stream_id,
            delta_window_size,
        })
    }

    /// Decode the SETTINGS entry list.
    pub fn settings(&self) -> Result<Vec<Setting>> {
        if self.kind != ControlKind::Settings || self.payload.len() < SETTINGS_MIN_PAYLOAD_SIZE {
            return Err(SpdyError::InvalidControlFrame);
        }
        let mut buf = self.payload.clone();
        let count = buf.get_u32() as usize;
        if buf.remaining() != count.saturating_mul(8) {
            return Err(SpdyError::InvalidControlFrame);
        }
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let id_and_flags = buf.get_u32();
            let value = buf.get_u32();
            entries.push(Setting {
                id: id_and_flags & LENGTH_MASK,
                flags: (id_and_flags >> 24) as u8,
                value,
            });
        }
        Ok(entries)
    }
}

impl DataFrame {
    /// Encode this frame into the wire format.
    pub fn encode(&self, dst: &mut BytesMut) {
        debug_assert_eq!(self.stream_id & !STREAM_ID_MASK, 0);
        debug_assert_eq!(self.payload.len() as u32 & !LENGTH_MASK, 0);
        dst.reserve(FRAME_HEADER_SIZE + self.payload.len());
        dst.put_u32(self.stream_id & STREAM_ID_MASK);
        dst.put_u32((u32::from(self.flags) << 24) | (self.payload.len() as u32 & LENGTH_MASK));
        dst.put_slice(&self.payload);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.payload.len());
        self.encode(&mut dst);
        dst.freeze()
    }
}

/// The common 8-byte header, unvalidated.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawHeader {
    pub control: bool,
    pub version: u16,
    pub kind: u16,
    pub stream_id: u32,
    pub flags: u8,
    pub length: u32,
}

impl RawHeader {
    /// Parse the fixed header from the start of `buf`. Returns `None` if
    /// fewer than 8 bytes are available.
    pub fn parse(buf: &[u8]) -> Option<RawHeader> {
        if buf.len() < FRAME_HEADER_SIZE {
            return None;
        }
        let word = u16::from_be_bytes([buf[0], buf[1]]);
        let control = word & CONTROL_FLAG_MASK != 0;
        let stream_id =
            u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) & STREAM_ID_MASK;
        let length =
            (u32::from(buf[5]) << 16) | (u32::from(buf[6]) << 8) | u32::from(buf[7]);
        Some(RawHeader {
            control,
            version: word & !CONTROL_FLAG_MASK,
            kind: u16::from_be_bytes([buf[2], buf[3]]),
            stream_id,
            flags: buf[4],
            length,
        })
    }
}
