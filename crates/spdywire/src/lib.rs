//! SPDY framing with a wire-format debugging CLI.
//!
//! spdywire packages an incremental SPDY frame decoder/encoder with
//! per-stream zlib compression, plus a small CLI for building and
//! inspecting wire bytes.
//!
//! # Crate Structure
//!
//! - [`codec`] — frame model, the `SpdyFramer` push-parser, and the
//!   header/payload compression contexts

/// Re-export codec types.
pub mod codec {
    pub use spdywire_codec::*;
}
