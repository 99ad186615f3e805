//! The incremental SPDY framer.
//!
//! [`SpdyFramer`] is a synchronous push-parser: callers feed it arbitrary
//! slices of the incoming byte stream and it invokes visitor callbacks as
//! complete frames become available. Partial state (the current frame
//! buffer and byte counters) persists across calls, so input may be split
//! at any byte boundary. No I/O, no blocking, no internal locking.
//!
//! A parse error is terminal: the framer parks in [`State::Error`] and
//! consumes nothing further until [`SpdyFramer::reset`].

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use flate2::{Compress, Decompress};
use tracing::{trace, warn};

use crate::builder::FrameBuilder;
use crate::error::{Result, SpdyError};
use crate::frame::{ControlFrame, DataFrame, RawHeader};
use crate::protocol::{
    ControlKind, HeaderBlock, Setting, StatusCode, CONTROL_FLAG_FIN, DATA_FLAG_COMPRESSED,
    DATA_FLAG_FIN, FRAME_HEADER_SIZE, GOAWAY_PAYLOAD_SIZE, RST_STREAM_PAYLOAD_SIZE,
    SETTINGS_MIN_PAYLOAD_SIZE, SPDY_VERSION, STREAM_ID_MASK, SYN_REPLY_SUBHEADER_SIZE,
    SYN_STREAM_SUBHEADER_SIZE, WINDOW_UPDATE_PAYLOAD_SIZE,
};

/// Initial capacity of the control frame buffer.
pub(crate) const CONTROL_FRAME_BUFFER_INITIAL_SIZE: usize = 32 * 1024;

/// Hard cap on the control frame buffer. A declared control payload larger
/// than this is a fatal parse error, which bounds memory exposure to
/// hostile input.
pub const CONTROL_FRAME_BUFFER_MAX_SIZE: usize = 64 * 1024;

/// Decode state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Error,
    Done,
    AutoReset,
    Reset,
    ReadingCommonHeader,
    InterpretControlFrameCommonHeader,
    ControlFramePayload,
    IgnoreRemainingPayload,
    ForwardStreamFrame,
}

impl State {
    /// Stable human-readable name, used in trace logging.
    pub fn name(self) -> &'static str {
        match self {
            State::Error => "ERROR",
            State::Done => "DONE",
            State::AutoReset => "AUTO_RESET",
            State::Reset => "RESET",
            State::ReadingCommonHeader => "READING_COMMON_HEADER",
            State::InterpretControlFrameCommonHeader => "INTERPRET_CONTROL_FRAME_COMMON_HEADER",
            State::ControlFramePayload => "CONTROL_FRAME_PAYLOAD",
            State::IgnoreRemainingPayload => "IGNORE_REMAINING_PAYLOAD",
            State::ForwardStreamFrame => "FORWARD_STREAM_FRAME",
        }
    }
}

/// Callbacks delivered by [`SpdyFramer::process_input`] as complete
/// structures become available.
pub trait FramerVisitor {
    /// The framer has entered the error state; the error is also
    /// queryable via [`SpdyFramer::error_code`] afterwards.
    fn on_error(&mut self, error: SpdyError);

    /// A complete control frame is available. SYN_STREAM/SYN_REPLY header
    /// blocks are delivered as carried on the wire; use
    /// [`SpdyFramer::parse_header_block`] to decode them.
    fn on_control(&mut self, frame: &ControlFrame);

    /// Payload bytes for a stream. An empty slice signals end-of-stream.
    fn on_stream_frame_data(&mut self, stream_id: u32, data: &[u8]);
}

/// Configuration for a framer instance.
#[derive(Debug, Clone)]
pub struct FramerConfig {
    /// Whether header blocks and compressed data payloads go through the
    /// zlib contexts. When off, compress/decompress return verbatim
    /// duplicates.
    pub enable_compression: bool,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            enable_compression: true,
        }
    }
}

/// Streaming SPDY frame decoder/encoder.
///
/// Owns the decode state machine and all compression contexts: one shared
/// compressor/decompressor pair for control-frame header blocks, plus
/// per-stream pairs created lazily and released on FIN or drop.
pub struct SpdyFramer {
    state: State,
    error_code: Option<SpdyError>,
    remaining_payload: usize,
    remaining_control_payload: usize,
    current_frame: BytesMut,
    pub(crate) enable_compression: bool,
    pub(crate) header_compressor: Option<Compress>,
    pub(crate) header_decompressor: Option<Decompress>,
    pub(crate) stream_compressors: HashMap<u32, Compress>,
    pub(crate) stream_decompressors: HashMap<u32, Decompress>,
}

impl Default for SpdyFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpdyFramer {
    pub fn new() -> Self {
        Self::with_config(FramerConfig::default())
    }

    pub fn with_config(config: FramerConfig) -> Self {
        Self {
            state: State::Reset,
            error_code: None,
            remaining_payload: 0,
            remaining_control_payload: 0,
            current_frame: BytesMut::with_capacity(CONTROL_FRAME_BUFFER_INITIAL_SIZE),
            enable_compression: config.enable_compression,
            header_compressor: None,
            header_decompressor: None,
            stream_compressors: HashMap::new(),
            stream_decompressors: HashMap::new(),
        }
    }

    /// Current decode state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The error that drove the framer into [`State::Error`], if any.
    pub fn error_code(&self) -> Option<SpdyError> {
        self.error_code
    }

    pub fn set_enable_compression(&mut self, value: bool) {
        self.enable_compression = value;
    }

    /// Discard any partially accumulated frame and clear the error state.
    /// The control buffer's allocation is retained for reuse.
    pub fn reset(&mut self) {
        self.set_state(State::Reset);
        self.error_code = None;
        self.remaining_payload = 0;
        self.remaining_control_payload = 0;
        self.current_frame.clear();
    }

    /// Feed a slice of the incoming byte stream.
    ///
    /// Consumes as many bytes as are currently parseable, invoking visitor
    /// callbacks as complete structures become available, and returns the
    /// number of bytes consumed. The return value may be less than
    /// `data.len()` when the framer enters the error state; the caller is
    /// responsible for retrying the remainder after `reset()` (or tearing
    /// the connection down).
    pub fn process_input<V: FramerVisitor>(&mut self, data: &[u8], visitor: &mut V) -> usize {
        let total = data.len();
        let mut input = data;

        while !input.is_empty() {
            let state_before = self.state;
            let len_before = input.len();

            match self.state {
                State::Error | State::Done => break,

                State::AutoReset | State::Reset => {
                    self.reset();
                    self.set_state(State::ReadingCommonHeader);
                }

                State::ReadingCommonHeader => {
                    let consumed = self.process_common_header(input, visitor);
                    input = &input[consumed..];
                }

                State::InterpretControlFrameCommonHeader => {
                    self.process_control_frame_header(visitor);
                }

                State::ControlFramePayload => {
                    let consumed = self.process_control_frame_payload(input, visitor);
                    input = &input[consumed..];
                }

                State::IgnoreRemainingPayload => {
                    // Bytes beyond a control frame's declared length are a
                    // protocol violation, not forwardable payload.
                    if self.remaining_payload > 0 {
                        self.set_error(SpdyError::InvalidControlFrame, visitor);
                    } else {
                        self.set_state(State::AutoReset);
                    }
                }

                State::ForwardStreamFrame => {
                    let consumed = self.process_data_frame_payload(input, visitor);
                    input = &input[consumed..];
                }
            }

            if input.len() == len_before && self.state == state_before {
                break;
            }
        }

        total - input.len()
    }

    fn set_state(&mut self, state: State) {
        trace!(from = self.state.name(), to = state.name(), "state change");
        self.state = state;
    }

    fn set_error<V: FramerVisitor>(&mut self, error: SpdyError, visitor: &mut V) {
        self.error_code = Some(error);
        self.set_state(State::Error);
        visitor.on_error(error);
    }

    /// Accumulate the fixed 8-byte header, then classify the frame.
    fn process_common_header<V: FramerVisitor>(&mut self, data: &[u8], visitor: &mut V) -> usize {
        if self.current_frame.len() < FRAME_HEADER_SIZE {
            let take = (FRAME_HEADER_SIZE - self.current_frame.len()).min(data.len());
            self.current_frame.extend_from_slice(&data[..take]);

            if self.current_frame.len() == FRAME_HEADER_SIZE {
                if let Some(header) = RawHeader::parse(&self.current_frame) {
                    // A zero-length data frame carries no payload to wait
                    // for; a FIN flag on it is a bare end-of-stream signal.
                    if !header.control && header.length == 0 {
                        if header.flags & DATA_FLAG_FIN != 0 {
                            visitor.on_stream_frame_data(header.stream_id, &[]);
                        }
                        self.set_state(State::AutoReset);
                    }
                }
            }
            return take;
        }

        if let Some(header) = RawHeader::parse(&self.current_frame) {
            self.remaining_payload = header.length as usize;

            if header.length > 1_000_000 {
                warn!(length = header.length, "unexpectedly large frame; stream is likely corrupt");
            }

            if header.control {
                self.set_state(State::InterpretControlFrameCommonHeader);
            } else {
                self.set_state(State::ForwardStreamFrame);
            }
        }
        0
    }

    /// Validate the control frame's version, type, and declared length,
    /// then size the buffer for its payload. Consumes no bytes.
    fn process_control_frame_header<V: FramerVisitor>(&mut self, visitor: &mut V) {
        let Some(header) = RawHeader::parse(&self.current_frame) else {
            self.set_error(SpdyError::InvalidControlFrame, visitor);
            return;
        };

        // Version before validity: an out-of-range type code on a newer
        // version would otherwise be misclassified.
        if header.version != SPDY_VERSION {
            self.set_error(
                SpdyError::UnsupportedVersion {
                    version: header.version,
                },
                visitor,
            );
            return;
        }

        let kind = match ControlKind::try_from(header.kind) {
            Ok(kind) => kind,
            Err(err) => {
                self.set_error(err, visitor);
                return;
            }
        };

        let length = header.length as usize;
        let length_ok = match kind {
            ControlKind::SynStream => length >= SYN_STREAM_SUBHEADER_SIZE,
            ControlKind::SynReply => length >= SYN_REPLY_SUBHEADER_SIZE,
            ControlKind::RstStream => length == RST_STREAM_PAYLOAD_SIZE,
            ControlKind::Goaway => length == GOAWAY_PAYLOAD_SIZE,
            ControlKind::WindowUpdate => length == WINDOW_UPDATE_PAYLOAD_SIZE,
            ControlKind::Settings => length >= SETTINGS_MIN_PAYLOAD_SIZE,
            ControlKind::Noop => {
                // Nothing to accumulate; swallow it.
                self.set_state(State::AutoReset);
                return;
            }
        };
        if !length_ok {
            self.set_error(SpdyError::InvalidControlFrame, visitor);
            return;
        }

        if length > CONTROL_FRAME_BUFFER_MAX_SIZE {
            self.set_error(
                SpdyError::ControlPayloadTooLarge {
                    size: length,
                    max: CONTROL_FRAME_BUFFER_MAX_SIZE,
                },
                visitor,
            );
            return;
        }

        self.remaining_control_payload = length;
        self.grow_control_frame_buffer(length);
        self.set_state(State::ControlFramePayload);
    }

    /// Accumulate control payload bytes; emit the frame once complete.
    fn process_control_frame_payload<V: FramerVisitor>(
        &mut self,
        data: &[u8],
        visitor: &mut V,
    ) -> usize {
        let mut consumed = 0;
        if self.remaining_control_payload > 0 {
            let take = self.remaining_control_payload.min(data.len());
            self.current_frame.extend_from_slice(&data[..take]);
            self.remaining_control_payload -= take;
            self.remaining_payload -= take;
            consumed = take;
            if self.remaining_control_payload > 0 {
                return consumed;
            }
        }

        let Some(header) = RawHeader::parse(&self.current_frame) else {
            self.set_error(SpdyError::InvalidControlFrame, visitor);
            return consumed;
        };
        let kind = match ControlKind::try_from(header.kind) {
            Ok(kind) => kind,
            Err(err) => {
                self.set_error(err, visitor);
                return consumed;
            }
        };
        let frame = ControlFrame {
            version: header.version,
            kind,
            flags: header.flags,
            payload: Bytes::copy_from_slice(&self.current_frame[FRAME_HEADER_SIZE..]),
        };
        visitor.on_control(&frame);

        // A FIN-flagged SYN_REPLY doubles as end-of-stream for its stream.
        if frame.kind == ControlKind::SynReply && frame.flags & CONTROL_FLAG_FIN != 0 {
            if let Ok(reply) = frame.syn_reply() {
                visitor.on_stream_frame_data(reply.stream_id, &[]);
            }
        }

        self.set_state(State::IgnoreRemainingPayload);
        consumed
    }

    /// Forward data frame payload bytes, decompressing when flagged.
    fn process_data_frame_payload<V: FramerVisitor>(
        &mut self,
        data: &[u8],
        visitor: &mut V,
    ) -> usize {
        let Some(header) = RawHeader::parse(&self.current_frame) else {
            self.set_error(SpdyError::InvalidControlFrame, visitor);
            return 0;
        };

        if self.remaining_payload == 0 {
            self.set_state(State::AutoReset);
            return 0;
        }

        let forward = self.remaining_payload.min(data.len());
        if forward > 0 {
            if header.flags & DATA_FLAG_COMPRESSED != 0 {
                match self.decompress_stream_chunk(header.stream_id, &data[..forward]) {
                    Ok(output) => {
                        // Only inform the visitor if there is data.
                        if !output.is_empty() {
                            visitor.on_stream_frame_data(header.stream_id, &output);
                        }
                    }
                    Err(err) => {
                        self.set_error(err, visitor);
                        return 0;
                    }
                }
            } else {
                visitor.on_stream_frame_data(header.stream_id, &data[..forward]);
            }
        }
        self.remaining_payload -= forward;

        // End of this frame with FIN set: signal end-of-stream and release
        // the stream's decompressor.
        if self.remaining_payload == 0 && header.flags & DATA_FLAG_FIN != 0 {
            visitor.on_stream_frame_data(header.stream_id, &[]);
            self.release_stream_decompressor(header.stream_id);
        }
        forward
    }

    /// Ensure the control buffer can hold the declared payload. The cap
    /// has already been enforced by the caller.
    fn grow_control_frame_buffer(&mut self, payload_size: usize) {
        debug_assert!(payload_size <= CONTROL_FRAME_BUFFER_MAX_SIZE);
        let needed = FRAME_HEADER_SIZE + payload_size;
        if needed > self.current_frame.len() {
            self.current_frame.reserve(needed - self.current_frame.len());
        }
    }

    // -- Frame construction --

    /// Construct a SYN_STREAM frame. When `compressed` is set, the header
    /// block is run through the shared header compressor.
    pub fn create_syn_stream(
        &mut self,
        stream_id: u32,
        associated_stream_id: u32,
        priority: u8,
        flags: u8,
        compressed: bool,
        headers: &HeaderBlock,
    ) -> Result<ControlFrame> {
        debug_assert!(stream_id != 0);
        debug_assert_eq!(stream_id & !STREAM_ID_MASK, 0);
        debug_assert_eq!(associated_stream_id & !STREAM_ID_MASK, 0);
        debug_assert!(priority <= 3);
        debug_assert_eq!(flags & !CONTROL_FLAG_FIN, 0);

        let mut builder = FrameBuilder::control(ControlKind::SynStream);
        builder.put_u32(stream_id);
        builder.put_u32(associated_stream_id);
        builder.put_u16(u16::from(priority) << 14);
        builder.put_header_block(headers);
        let frame = control_frame_from_wire(ControlKind::SynStream, flags, builder.finish(flags));

        if compressed {
            self.compress_control_frame(&frame)
        } else {
            Ok(frame)
        }
    }

    /// Construct a SYN_REPLY frame.
    pub fn create_syn_reply(
        &mut self,
        stream_id: u32,
        flags: u8,
        compressed: bool,
        headers: &HeaderBlock,
    ) -> Result<ControlFrame> {
        debug_assert!(stream_id != 0);
        debug_assert_eq!(stream_id & !STREAM_ID_MASK, 0);
        debug_assert_eq!(flags & !CONTROL_FLAG_FIN, 0);

        let mut builder = FrameBuilder::control(ControlKind::SynReply);
        builder.put_u32(stream_id);
        builder.put_u16(0); // unused
        builder.put_header_block(headers);
        let frame = control_frame_from_wire(ControlKind::SynReply, flags, builder.finish(flags));

        if compressed {
            self.compress_control_frame(&frame)
        } else {
            Ok(frame)
        }
    }

    /// Construct a RST_STREAM frame.
    pub fn create_rst_stream(stream_id: u32, status: StatusCode) -> ControlFrame {
        debug_assert!(stream_id != 0);
        debug_assert_eq!(stream_id & !STREAM_ID_MASK, 0);

        let mut builder = FrameBuilder::control(ControlKind::RstStream);
        builder.put_u32(stream_id);
        builder.put_u32(status as u32);
        control_frame_from_wire(ControlKind::RstStream, 0, builder.finish(0))
    }

    /// Construct a GOAWAY frame.
    pub fn create_goaway(last_accepted_stream_id: u32) -> ControlFrame {
        debug_assert_eq!(last_accepted_stream_id & !STREAM_ID_MASK, 0);

        let mut builder = FrameBuilder::control(ControlKind::Goaway);
        builder.put_u32(last_accepted_stream_id);
        control_frame_from_wire(ControlKind::Goaway, 0, builder.finish(0))
    }

    /// Construct a WINDOW_UPDATE frame.
    pub fn create_window_update(stream_id: u32, delta_window_size: u32) -> ControlFrame {
        debug_assert!(stream_id != 0);
        debug_assert_eq!(stream_id & !STREAM_ID_MASK, 0);
        debug_assert!(delta_window_size != 0);
        debug_assert_eq!(delta_window_size & !STREAM_ID_MASK, 0);

        let mut builder = FrameBuilder::control(ControlKind::WindowUpdate);
        builder.put_u32(stream_id);
        builder.put_u32(delta_window_size);
        control_frame_from_wire(ControlKind::WindowUpdate, 0, builder.finish(0))
    }

    /// Construct a SETTINGS frame.
    pub fn create_settings(entries: &[Setting]) -> ControlFrame {
        let mut builder = FrameBuilder::control(ControlKind::Settings);
        builder.put_u32(entries.len() as u32);
        for entry in entries {
            builder.put_u32((u32::from(entry.flags) << 24) | (entry.id & 0x00ff_ffff));
            builder.put_u32(entry.value);
        }
        control_frame_from_wire(ControlKind::Settings, 0, builder.finish(0))
    }

    /// Construct a NOOP frame.
    pub fn create_noop() -> ControlFrame {
        ControlFrame {
            version: SPDY_VERSION,
            kind: ControlKind::Noop,
            flags: 0,
            payload: Bytes::new(),
        }
    }

    /// Construct a data frame. `DATA_FLAG_COMPRESSED` routes the payload
    /// through the stream's compressor; `DATA_FLAG_FIN` tears that
    /// compressor down afterwards.
    pub fn create_data_frame(
        &mut self,
        stream_id: u32,
        data: &[u8],
        flags: u8,
    ) -> Result<DataFrame> {
        debug_assert!(stream_id != 0);
        debug_assert_eq!(stream_id & !STREAM_ID_MASK, 0);
        debug_assert_eq!(flags & !(DATA_FLAG_FIN | DATA_FLAG_COMPRESSED), 0);

        let frame = DataFrame {
            stream_id,
            flags,
            payload: Bytes::copy_from_slice(data),
        };
        let frame = if flags & DATA_FLAG_COMPRESSED != 0 {
            self.compress_data_frame(&frame)?
        } else {
            frame
        };

        if flags & DATA_FLAG_FIN != 0 {
            self.release_stream_compressor(stream_id);
        }
        Ok(frame)
    }
}

fn control_frame_from_wire(kind: ControlKind, flags: u8, wire: Bytes) -> ControlFrame {
    ControlFrame {
        version: SPDY_VERSION,
        kind,
        flags,
        payload: wire.slice(FRAME_HEADER_SIZE..),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::protocol::{Setting, SETTINGS_MAX_CONCURRENT_STREAMS};
    use bytes::BufMut;

    /// Records visitor callbacks, merging consecutive data chunks for the
    /// same stream so event sequences compare independently of how the
    /// input was split.
    #[derive(Debug, Default)]
    pub(crate) struct Recorder {
        pub events: Vec<Event>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Event {
        Control {
            kind: ControlKind,
            flags: u8,
            payload: Vec<u8>,
        },
        Data {
            stream_id: u32,
            data: Vec<u8>,
        },
        StreamEnd {
            stream_id: u32,
        },
        Error(SpdyError),
    }

    impl FramerVisitor for Recorder {
        fn on_error(&mut self, error: SpdyError) {
            self.events.push(Event::Error(error));
        }

        fn on_control(&mut self, frame: &ControlFrame) {
            self.events.push(Event::Control {
                kind: frame.kind,
                flags: frame.flags,
                payload: frame.payload.to_vec(),
            });
        }

        fn on_stream_frame_data(&mut self, stream_id: u32, data: &[u8]) {
            if data.is_empty() {
                self.events.push(Event::StreamEnd { stream_id });
                return;
            }
            if let Some(Event::Data {
                stream_id: last_id,
                data: buffered,
            }) = self.events.last_mut()
            {
                if *last_id == stream_id {
                    buffered.extend_from_slice(data);
                    return;
                }
            }
            self.events.push(Event::Data {
                stream_id,
                data: data.to_vec(),
            });
        }
    }

    pub(crate) fn uncompressed_framer() -> SpdyFramer {
        SpdyFramer::with_config(FramerConfig {
            enable_compression: false,
        })
    }

    #[test]
    fn syn_stream_round_trip() {
        let headers: HeaderBlock = [(":method", "GET"), (":path", "/")].into_iter().collect();
        let mut framer = uncompressed_framer();
        let frame = framer
            .create_syn_stream(1, 0, 0, 0, false, &headers)
            .unwrap();
        let wire = frame.to_bytes();

        let mut recorder = Recorder::default();
        let consumed = framer.process_input(&wire, &mut recorder);
        assert_eq!(consumed, wire.len());

        assert_eq!(recorder.events.len(), 1);
        let Event::Control { kind, flags, payload } = &recorder.events[0] else {
            panic!("expected control event");
        };
        assert_eq!(*kind, ControlKind::SynStream);
        assert_eq!(*flags, 0);
        assert_eq!(payload.as_slice(), frame.payload.as_ref());

        let decoded = ControlFrame {
            version: SPDY_VERSION,
            kind: *kind,
            flags: *flags,
            payload: Bytes::copy_from_slice(payload),
        };
        let syn = decoded.syn_stream().unwrap();
        assert_eq!(syn.stream_id, 1);
        assert_eq!(syn.associated_stream_id, 0);
        assert_eq!(syn.priority, 0);
        assert_eq!(framer.parse_header_block(&decoded).unwrap(), headers);
    }

    #[test]
    fn rst_stream_round_trip() {
        let frame = SpdyFramer::create_rst_stream(7, StatusCode::RefusedStream);
        let mut framer = uncompressed_framer();
        let mut recorder = Recorder::default();
        framer.process_input(&frame.to_bytes(), &mut recorder);

        let Event::Control { kind, payload, .. } = &recorder.events[0] else {
            panic!("expected control event");
        };
        assert_eq!(*kind, ControlKind::RstStream);
        let decoded = ControlFrame {
            version: SPDY_VERSION,
            kind: *kind,
            flags: 0,
            payload: Bytes::copy_from_slice(payload),
        };
        assert_eq!(
            decoded.rst_stream().unwrap(),
            crate::frame::RstStream {
                stream_id: 7,
                status: StatusCode::RefusedStream
            }
        );
    }

    #[test]
    fn goaway_and_window_update_round_trip() {
        let mut framer = uncompressed_framer();
        let mut recorder = Recorder::default();

        let mut wire = BytesMut::new();
        SpdyFramer::create_goaway(5).encode(&mut wire);
        SpdyFramer::create_window_update(3, 4096).encode(&mut wire);
        framer.process_input(&wire, &mut recorder);

        assert_eq!(recorder.events.len(), 2);
        assert!(matches!(
            &recorder.events[0],
            Event::Control { kind: ControlKind::Goaway, .. }
        ));
        assert!(matches!(
            &recorder.events[1],
            Event::Control { kind: ControlKind::WindowUpdate, .. }
        ));
    }

    #[test]
    fn settings_round_trip() {
        let entries = [Setting::new(SETTINGS_MAX_CONCURRENT_STREAMS, 2)];
        let frame = SpdyFramer::create_settings(&entries);

        let mut framer = uncompressed_framer();
        let mut recorder = Recorder::default();
        framer.process_input(&frame.to_bytes(), &mut recorder);

        let Event::Control { kind, payload, .. } = &recorder.events[0] else {
            panic!("expected control event");
        };
        let decoded = ControlFrame {
            version: SPDY_VERSION,
            kind: *kind,
            flags: 0,
            payload: Bytes::copy_from_slice(payload),
        };
        let parsed = decoded.settings().unwrap();
        assert_eq!(parsed, vec![Setting::new(SETTINGS_MAX_CONCURRENT_STREAMS, 2)]);
    }

    #[test]
    fn noop_is_swallowed() {
        let mut framer = uncompressed_framer();
        let mut recorder = Recorder::default();
        let wire = SpdyFramer::create_noop().to_bytes();
        // Append a second frame so the NOOP's zero-byte interpret step runs.
        let mut stream = BytesMut::from(wire.as_ref());
        SpdyFramer::create_goaway(0).encode(&mut stream);

        let consumed = framer.process_input(&stream, &mut recorder);
        assert_eq!(consumed, stream.len());
        assert_eq!(recorder.events.len(), 1);
        assert!(matches!(
            &recorder.events[0],
            Event::Control { kind: ControlKind::Goaway, .. }
        ));
    }

    #[test]
    fn data_frame_round_trip() {
        let mut framer = uncompressed_framer();
        let frame = framer.create_data_frame(2, b"hello world", 0).unwrap();

        let mut recorder = Recorder::default();
        framer.process_input(&frame.to_bytes(), &mut recorder);

        assert_eq!(
            recorder.events,
            vec![Event::Data {
                stream_id: 2,
                data: b"hello world".to_vec()
            }]
        );
    }

    #[test]
    fn fin_data_frame_emits_stream_end() {
        let mut framer = uncompressed_framer();
        let frame = framer.create_data_frame(2, b"bye", DATA_FLAG_FIN).unwrap();

        let mut recorder = Recorder::default();
        framer.process_input(&frame.to_bytes(), &mut recorder);

        assert_eq!(
            recorder.events,
            vec![
                Event::Data {
                    stream_id: 2,
                    data: b"bye".to_vec()
                },
                Event::StreamEnd { stream_id: 2 },
            ]
        );
    }

    #[test]
    fn empty_fin_data_frame_is_a_bare_stream_end() {
        let mut framer = uncompressed_framer();
        let frame = framer.create_data_frame(4, b"", DATA_FLAG_FIN).unwrap();
        let wire = frame.to_bytes();
        assert_eq!(wire.len(), FRAME_HEADER_SIZE);

        let mut recorder = Recorder::default();
        let consumed = framer.process_input(&wire, &mut recorder);

        assert_eq!(consumed, FRAME_HEADER_SIZE);
        assert_eq!(recorder.events, vec![Event::StreamEnd { stream_id: 4 }]);
        assert_eq!(framer.state(), State::AutoReset);
    }

    #[test]
    fn empty_data_frame_without_fin_emits_nothing() {
        let mut framer = uncompressed_framer();
        let frame = framer.create_data_frame(4, b"", 0).unwrap();

        let mut recorder = Recorder::default();
        framer.process_input(&frame.to_bytes(), &mut recorder);
        assert!(recorder.events.is_empty());

        // The framer recovers cleanly for the next frame.
        let next = SpdyFramer::create_goaway(1);
        framer.process_input(&next.to_bytes(), &mut recorder);
        assert_eq!(recorder.events.len(), 1);
    }

    #[test]
    fn syn_reply_with_fin_signals_stream_end() {
        let headers: HeaderBlock = [("status", "200")].into_iter().collect();
        let mut framer = uncompressed_framer();
        let frame = framer
            .create_syn_reply(9, CONTROL_FLAG_FIN, false, &headers)
            .unwrap();

        let mut recorder = Recorder::default();
        framer.process_input(&frame.to_bytes(), &mut recorder);

        assert_eq!(recorder.events.len(), 2);
        assert!(matches!(
            &recorder.events[0],
            Event::Control { kind: ControlKind::SynReply, .. }
        ));
        assert_eq!(recorder.events[1], Event::StreamEnd { stream_id: 9 });
    }

    #[test]
    fn callbacks_invariant_under_partial_delivery() {
        let headers: HeaderBlock = [(":method", "GET"), (":path", "/")].into_iter().collect();
        let mut encoder = uncompressed_framer();
        let mut stream = BytesMut::new();
        encoder
            .create_syn_stream(1, 0, 2, 0, false, &headers)
            .unwrap()
            .encode(&mut stream);
        encoder
            .create_data_frame(1, b"some stream payload", 0)
            .unwrap()
            .encode(&mut stream);
        encoder
            .create_data_frame(1, b"!", DATA_FLAG_FIN)
            .unwrap()
            .encode(&mut stream);
        SpdyFramer::create_goaway(1).encode(&mut stream);

        let mut whole = Recorder::default();
        let mut framer = uncompressed_framer();
        assert_eq!(framer.process_input(&stream, &mut whole), stream.len());
        assert!(!whole.events.is_empty());

        for chunk_size in 1..=stream.len() {
            let mut recorder = Recorder::default();
            let mut framer = uncompressed_framer();
            for chunk in stream.chunks(chunk_size) {
                let consumed = framer.process_input(chunk, &mut recorder);
                assert_eq!(consumed, chunk.len());
            }
            assert_eq!(recorder.events, whole.events, "chunk size {chunk_size}");
        }
    }

    #[test]
    fn unsupported_version_is_fatal() {
        let mut wire = BytesMut::new();
        wire.put_u16(0x8000 | 2); // version 2
        wire.put_u16(ControlKind::Goaway as u16);
        wire.put_u32(4);
        wire.put_u32(0);

        let mut framer = uncompressed_framer();
        let mut recorder = Recorder::default();
        framer.process_input(&wire, &mut recorder);

        assert_eq!(framer.state(), State::Error);
        assert_eq!(
            framer.error_code(),
            Some(SpdyError::UnsupportedVersion { version: 2 })
        );
        assert_eq!(
            recorder.events,
            vec![Event::Error(SpdyError::UnsupportedVersion { version: 2 })]
        );
    }

    #[test]
    fn unknown_control_type_is_fatal() {
        let mut wire = BytesMut::new();
        wire.put_u16(0x8000 | SPDY_VERSION);
        wire.put_u16(6); // reserved type code
        wire.put_u32(0);
        wire.put_u8(0); // trailing byte so the header gets interpreted

        let mut framer = uncompressed_framer();
        let mut recorder = Recorder::default();
        framer.process_input(&wire, &mut recorder);

        assert_eq!(framer.error_code(), Some(SpdyError::InvalidControlFrame));
    }

    #[test]
    fn undersized_control_payload_is_fatal() {
        let mut wire = BytesMut::new();
        wire.put_u16(0x8000 | SPDY_VERSION);
        wire.put_u16(ControlKind::SynStream as u16);
        wire.put_u32(4); // less than the fixed sub-header
        wire.put_u32(0);

        let mut framer = uncompressed_framer();
        let mut recorder = Recorder::default();
        framer.process_input(&wire, &mut recorder);

        assert_eq!(framer.error_code(), Some(SpdyError::InvalidControlFrame));
    }

    #[test]
    fn mis_sized_rst_stream_is_fatal() {
        let mut wire = BytesMut::new();
        wire.put_u16(0x8000 | SPDY_VERSION);
        wire.put_u16(ControlKind::RstStream as u16);
        wire.put_u32(12); // must be exactly 8
        wire.put_u32(0);

        let mut framer = uncompressed_framer();
        let mut recorder = Recorder::default();
        framer.process_input(&wire, &mut recorder);

        assert_eq!(framer.error_code(), Some(SpdyError::InvalidControlFrame));
    }

    #[test]
    fn oversized_control_payload_is_fatal_and_stops_consuming() {
        let hostile_len = (CONTROL_FRAME_BUFFER_MAX_SIZE + 1) as u32;
        let mut wire = BytesMut::new();
        wire.put_u16(0x8000 | SPDY_VERSION);
        wire.put_u16(ControlKind::SynStream as u16);
        wire.put_u32(hostile_len);
        wire.put_slice(&[0u8; 64]); // trailing bytes that must not be consumed

        let mut framer = uncompressed_framer();
        let mut recorder = Recorder::default();
        let consumed = framer.process_input(&wire, &mut recorder);

        assert_eq!(consumed, FRAME_HEADER_SIZE);
        assert_eq!(
            framer.error_code(),
            Some(SpdyError::ControlPayloadTooLarge {
                size: hostile_len as usize,
                max: CONTROL_FRAME_BUFFER_MAX_SIZE,
            })
        );
    }

    #[test]
    fn reset_recovers_after_error() {
        let mut bad = BytesMut::new();
        bad.put_u16(0x8000 | 99);
        bad.put_u16(ControlKind::Goaway as u16);
        bad.put_u32(4);
        bad.put_u32(0);

        let mut framer = uncompressed_framer();
        let mut recorder = Recorder::default();
        framer.process_input(&bad, &mut recorder);
        assert_eq!(framer.state(), State::Error);

        framer.reset();
        assert!(framer.error_code().is_none());

        let good = SpdyFramer::create_goaway(3);
        let wire = good.to_bytes();
        let mut recorder = Recorder::default();
        let consumed = framer.process_input(&wire, &mut recorder);

        assert_eq!(consumed, wire.len());
        assert_eq!(recorder.events.len(), 1);
        assert!(matches!(
            &recorder.events[0],
            Event::Control { kind: ControlKind::Goaway, .. }
        ));
    }

    #[test]
    fn error_state_consumes_no_further_bytes() {
        let mut framer = uncompressed_framer();
        let mut recorder = Recorder::default();

        let mut bad = BytesMut::new();
        bad.put_u16(0x8000 | 7);
        bad.put_u16(1);
        bad.put_u32(10);
        bad.put_slice(&[0u8; 4]);
        framer.process_input(&bad, &mut recorder);
        assert_eq!(framer.state(), State::Error);

        let more = SpdyFramer::create_goaway(1).to_bytes();
        assert_eq!(framer.process_input(&more, &mut recorder), 0);
    }

    #[test]
    fn multiple_frames_in_one_buffer() {
        let mut framer = uncompressed_framer();
        let mut stream = BytesMut::new();
        SpdyFramer::create_rst_stream(1, StatusCode::Cancel).encode(&mut stream);
        framer
            .create_data_frame(1, b"tail", DATA_FLAG_FIN)
            .unwrap()
            .encode(&mut stream);

        let mut recorder = Recorder::default();
        let consumed = framer.process_input(&stream, &mut recorder);

        assert_eq!(consumed, stream.len());
        assert_eq!(recorder.events.len(), 3);
    }
}
