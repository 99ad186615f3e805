//! SPDY frame parsing, serialization, and header compression.
//!
//! This is the core layer of spdywire: an incremental decoder/encoder for
//! the SPDY wire protocol. Raw bytes go in through [`SpdyFramer::process_input`]
//! in arbitrarily sized slices; complete control frames and stream payload
//! chunks come out through a [`FramerVisitor`]. Construction functions
//! produce wire-ready frames for every frame type, and the framer owns the
//! zlib contexts used for header-block and stream-payload compression.
//!
//! The transport moving the bytes and the session logic consuming the
//! frames live elsewhere; this crate does no I/O.

pub mod builder;
pub mod compress;
pub mod error;
pub mod frame;
pub mod framer;
pub mod protocol;

pub use builder::FrameBuilder;
pub use compress::HEADER_DICTIONARY;
pub use error::{Result, SpdyError};
pub use frame::{
    ControlFrame, DataFrame, Goaway, RstStream, SpdyFrame, SynReply, SynStream, WindowUpdate,
};
pub use framer::{
    FramerConfig, FramerVisitor, SpdyFramer, State, CONTROL_FRAME_BUFFER_MAX_SIZE,
};
pub use protocol::{
    ControlKind, HeaderBlock, Setting, StatusCode, CONTROL_FLAG_FIN, DATA_FLAG_COMPRESSED,
    DATA_FLAG_FIN, FRAME_HEADER_SIZE, SPDY_VERSION,
};
