/// Errors that can occur while framing or unframing SPDY wire data.
///
/// Every decode-side error is terminal for the framer instance: the state
/// machine parks in `State::Error` and stays there until `reset()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpdyError {
    /// The control frame carries a protocol version we do not speak.
    #[error("unsupported protocol version {version}")]
    UnsupportedVersion { version: u16 },

    /// The control frame fails structural, type, or length validation.
    #[error("invalid control frame")]
    InvalidControlFrame,

    /// The declared control payload exceeds the hard buffer cap.
    #[error("control payload too large ({size} bytes, max {max})")]
    ControlPayloadTooLarge { size: usize, max: usize },

    /// A compression context could not be initialized.
    #[error("zlib context initialization failed")]
    ZlibInit,

    /// Payload compression failed.
    #[error("compress failure")]
    CompressFailure,

    /// Payload decompression failed.
    #[error("decompress failure")]
    DecompressFailure,
}

pub type Result<T> = std::result::Result<T, SpdyError>;
