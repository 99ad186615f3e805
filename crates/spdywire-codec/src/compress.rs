//! Header and payload compression.
//!
//! Two domains share one scheme. Control-frame header blocks go through a
//! single compressor/decompressor pair seeded with a fixed dictionary of
//! common HTTP tokens, living as long as the framer. Data-frame payloads
//! use per-stream contexts created lazily on first use and released when
//! the stream finishes.
//!
//! Every frame is deflated with a synchronous flush so its compressed
//! bytes are self-delimiting on the wire; no output is buffered across
//! frames.

use bytes::{Buf, Bytes};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress};
use tracing::debug;

use crate::error::{Result, SpdyError};
use crate::frame::{ControlFrame, DataFrame, SpdyFrame};
use crate::framer::{SpdyFramer, CONTROL_FRAME_BUFFER_MAX_SIZE};
use crate::protocol::{
    ControlKind, HeaderBlock, DATA_FLAG_COMPRESSED, SYN_REPLY_SUBHEADER_SIZE,
    SYN_STREAM_SUBHEADER_SIZE,
};

/// Seed text priming the header compressor/decompressor for small,
/// repetitive HTTP-like header blocks. Both peers must use the identical
/// byte sequence, trailing NUL included.
const DICTIONARY_TEXT: &str = concat!(
    "optionsgetheadpostputdeletetraceacceptaccept-charsetaccept-encodingaccept-",
    "languageauthorizationexpectfromhostif-modified-sinceif-matchif-none-matchi",
    "f-rangeif-unmodifiedsincemax-forwardsproxy-authorizationrangerefererteuser",
    "-agent10010120020120220320420520630030130230330430530630740040140240340440",
    "5406407408409410411412413414415416417500501502503504505accept-rangesageeta",
    "glocationproxy-authenticatepublicretry-afterservervarywarningwww-authentic",
    "ateallowcontent-basecontent-encodingcache-controlconnectiondatetrailertran",
    "sfer-encodingupgradeviawarningcontent-languagecontent-lengthcontent-locati",
    "oncontent-md5content-rangecontent-typeetagexpireslast-modifiedset-cookieMo",
    "ndayTuesdayWednesdayThursdayFridaySaturdaySundayJanFebMarAprMayJunJulAugSe",
    "pOctNovDecchunkedtext/htmlimage/pngimage/jpgimage/gifapplication/xmlapplic",
    "ation/xhtmltext/plainpublicmax-agecharset=iso-8859-1utf-8gzipdeflateHTTP/1",
    ".1statusversionurl\0",
);

/// The shared header-compression dictionary.
pub const HEADER_DICTIONARY: &[u8] = DICTIONARY_TEXT.as_bytes();

const INFLATE_RESERVE: usize = 16 * 1024;

impl SpdyFramer {
    /// Compress a frame's compressible region: the header block of
    /// SYN_STREAM/SYN_REPLY, or a data frame's entire payload. Returns a
    /// verbatim duplicate when compression is disabled.
    pub fn compress_frame(&mut self, frame: &SpdyFrame) -> Result<SpdyFrame> {
        match frame {
            SpdyFrame::Control(frame) => self.compress_control_frame(frame).map(SpdyFrame::from),
            SpdyFrame::Data(frame) => self.compress_data_frame(frame).map(SpdyFrame::from),
        }
    }

    /// Inverse of [`compress_frame`](Self::compress_frame). A data frame
    /// without the COMPRESSED flag is returned as a verbatim duplicate.
    pub fn decompress_frame(&mut self, frame: &SpdyFrame) -> Result<SpdyFrame> {
        match frame {
            SpdyFrame::Control(frame) => self.decompress_control_frame(frame).map(SpdyFrame::from),
            SpdyFrame::Data(frame) => self.decompress_data_frame(frame).map(SpdyFrame::from),
        }
    }

    /// Whether this frame participates in compression at all.
    pub fn is_compressible(&self, frame: &SpdyFrame) -> bool {
        match frame {
            SpdyFrame::Control(frame) => {
                matches!(frame.kind, ControlKind::SynStream | ControlKind::SynReply)
            }
            SpdyFrame::Data(frame) => frame.flags & DATA_FLAG_COMPRESSED != 0,
        }
    }

    /// Decode the header block of a SYN_STREAM/SYN_REPLY frame,
    /// decompressing it first as needed.
    pub fn parse_header_block(&mut self, frame: &ControlFrame) -> Result<HeaderBlock> {
        if !matches!(frame.kind, ControlKind::SynStream | ControlKind::SynReply) {
            return Err(SpdyError::InvalidControlFrame);
        }
        let decompressed = self.decompress_control_frame(frame)?;
        let block = match decompressed.kind {
            ControlKind::SynStream => decompressed.syn_stream()?.header_block,
            _ => decompressed.syn_reply()?.header_block,
        };
        parse_header_pairs(&block)
    }

    pub(crate) fn compress_control_frame(&mut self, frame: &ControlFrame) -> Result<ControlFrame> {
        if !self.enable_compression {
            return Ok(frame.clone());
        }
        let boundary = header_block_boundary(frame)?;
        let compressor = self.header_compressor()?;

        let mut payload = Vec::with_capacity(frame.payload.len() + 16);
        payload.extend_from_slice(&frame.payload[..boundary]);
        deflate_chunk(compressor, &frame.payload[boundary..], &mut payload)?;

        debug!(
            pre = frame.payload.len(),
            post = payload.len(),
            "compressed control frame"
        );
        Ok(ControlFrame {
            version: frame.version,
            kind: frame.kind,
            flags: frame.flags,
            payload: Bytes::from(payload),
        })
    }

    pub(crate) fn decompress_control_frame(
        &mut self,
        frame: &ControlFrame,
    ) -> Result<ControlFrame> {
        if !self.enable_compression {
            return Ok(frame.clone());
        }
        let boundary = header_block_boundary(frame)?;
        let decompressor = self
            .header_decompressor
            .get_or_insert_with(|| Decompress::new(true));

        let mut payload = Vec::with_capacity(frame.payload.len() + INFLATE_RESERVE);
        payload.extend_from_slice(&frame.payload[..boundary]);
        inflate_chunk(
            decompressor,
            &frame.payload[boundary..],
            &mut payload,
            CONTROL_FRAME_BUFFER_MAX_SIZE,
        )?;

        Ok(ControlFrame {
            version: frame.version,
            kind: frame.kind,
            flags: frame.flags,
            payload: Bytes::from(payload),
        })
    }

    pub(crate) fn compress_data_frame(&mut self, frame: &DataFrame) -> Result<DataFrame> {
        if !self.enable_compression {
            return Ok(frame.clone());
        }
        let compressor = self
            .stream_compressors
            .entry(frame.stream_id)
            .or_insert_with(new_stream_compressor);

        let mut payload = Vec::with_capacity(frame.payload.len() + 16);
        deflate_chunk(compressor, &frame.payload, &mut payload)?;

        debug!(
            stream_id = frame.stream_id,
            pre = frame.payload.len(),
            post = payload.len(),
            "compressed data frame"
        );
        Ok(DataFrame {
            stream_id: frame.stream_id,
            flags: frame.flags | DATA_FLAG_COMPRESSED,
            payload: Bytes::from(payload),
        })
    }

    pub(crate) fn decompress_data_frame(&mut self, frame: &DataFrame) -> Result<DataFrame> {
        if !self.enable_compression {
            return Ok(frame.clone());
        }
        // No COMPRESSED flag means there is nothing to decompress.
        if frame.flags & DATA_FLAG_COMPRESSED == 0 {
            return Ok(frame.clone());
        }
        let decompressor = self
            .stream_decompressors
            .entry(frame.stream_id)
            .or_insert_with(|| Decompress::new(true));

        let mut payload = Vec::new();
        inflate_chunk(decompressor, &frame.payload, &mut payload, usize::MAX)?;

        Ok(DataFrame {
            stream_id: frame.stream_id,
            flags: frame.flags & !DATA_FLAG_COMPRESSED,
            payload: Bytes::from(payload),
        })
    }

    /// Incrementally inflate a slice of a compressed data frame's payload.
    pub(crate) fn decompress_stream_chunk(
        &mut self,
        stream_id: u32,
        input: &[u8],
    ) -> Result<Vec<u8>> {
        let decompressor = self
            .stream_decompressors
            .entry(stream_id)
            .or_insert_with(|| Decompress::new(true));
        let mut output = Vec::new();
        inflate_chunk(decompressor, input, &mut output, usize::MAX)?;
        Ok(output)
    }

    pub(crate) fn release_stream_compressor(&mut self, stream_id: u32) {
        self.stream_compressors.remove(&stream_id);
    }

    pub(crate) fn release_stream_decompressor(&mut self, stream_id: u32) {
        self.stream_decompressors.remove(&stream_id);
    }

    /// The shared header compressor, created (and dictionary-seeded) on
    /// first use.
    fn header_compressor(&mut self) -> Result<&mut Compress> {
        if self.header_compressor.is_none() {
            let mut compressor = Compress::new(Compression::best(), true);
            compressor
                .set_dictionary(HEADER_DICTIONARY)
                .map_err(|_| SpdyError::ZlibInit)?;
            self.header_compressor = Some(compressor);
        }
        self.header_compressor.as_mut().ok_or(SpdyError::ZlibInit)
    }
}

fn new_stream_compressor() -> Compress {
    Compress::new(Compression::best(), true)
}

/// Offset of the compressible region within the frame payload.
fn header_block_boundary(frame: &ControlFrame) -> Result<usize> {
    let boundary = match frame.kind {
        ControlKind::SynStream => SYN_STREAM_SUBHEADER_SIZE,
        ControlKind::SynReply => SYN_REPLY_SUBHEADER_SIZE,
        _ => return Err(SpdyError::CompressFailure),
    };
    if frame.payload.len() < boundary {
        return Err(SpdyError::CompressFailure);
    }
    Ok(boundary)
}

/// Deflate `input` onto `out` with a synchronous flush, so the produced
/// bytes are a self-delimiting unit.
fn deflate_chunk(compressor: &mut Compress, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let mut consumed = 0usize;
    loop {
        out.reserve((input.len() - consumed).max(64));
        let before_in = compressor.total_in();
        compressor
            .compress_vec(&input[consumed..], out, FlushCompress::Sync)
            .map_err(|_| SpdyError::CompressFailure)?;
        consumed += (compressor.total_in() - before_in) as usize;

        // Spare output room after the call means the flush completed.
        if consumed == input.len() && out.len() < out.capacity() {
            return Ok(());
        }
    }
}

/// Inflate `input` onto `out`, expecting a synchronously flushed unit.
/// Supplies the shared dictionary (once) if the stream demands one; any
/// other failure, or output beyond `max_out`, is fatal.
fn inflate_chunk(
    decompressor: &mut Decompress,
    input: &[u8],
    out: &mut Vec<u8>,
    max_out: usize,
) -> Result<()> {
    let mut consumed = 0usize;
    let mut supplied_dictionary = false;
    loop {
        out.reserve(INFLATE_RESERVE);
        let before_in = decompressor.total_in();
        let before_out = out.len();
        match decompressor.decompress_vec(&input[consumed..], out, FlushDecompress::Sync) {
            Ok(_) => {
                let taken = (decompressor.total_in() - before_in) as usize;
                consumed += taken;
                if out.len() > max_out {
                    return Err(SpdyError::DecompressFailure);
                }
                if consumed == input.len() && out.len() < out.capacity() {
                    return Ok(());
                }
                if taken == 0 && out.len() == before_out {
                    return Err(SpdyError::DecompressFailure);
                }
            }
            Err(err) => {
                consumed += (decompressor.total_in() - before_in) as usize;
                if err.needs_dictionary().is_some() && !supplied_dictionary {
                    supplied_dictionary = true;
                    // zlib verifies the dictionary checksum; a mismatch
                    // fails here and the operation is not retried again.
                    decompressor
                        .set_dictionary(HEADER_DICTIONARY)
                        .map_err(|_| SpdyError::DecompressFailure)?;
                    continue;
                }
                return Err(SpdyError::DecompressFailure);
            }
        }
    }
}

/// Decode a wire header block: 16-bit pair count, then length-prefixed
/// name and value strings. Empty or duplicate names, empty values, count
/// mismatches, and trailing bytes are all rejected.
fn parse_header_pairs(data: &[u8]) -> Result<HeaderBlock> {
    let mut buf = data;
    if buf.remaining() < 2 {
        return Err(SpdyError::InvalidControlFrame);
    }
    let count = buf.get_u16() as usize;

    let mut block = HeaderBlock::new();
    for _ in 0..count {
        let name = read_string(&mut buf)?;
        let value = read_string(&mut buf)?;
        if name.is_empty() || value.is_empty() {
            return Err(SpdyError::InvalidControlFrame);
        }
        if block.get(&name).is_some() {
            return Err(SpdyError::InvalidControlFrame);
        }
        block.insert(name, value);
    }
    if buf.has_remaining() {
        return Err(SpdyError::InvalidControlFrame);
    }
    Ok(block)
}

fn read_string(buf: &mut &[u8]) -> Result<String> {
    if buf.remaining() < 2 {
        return Err(SpdyError::InvalidControlFrame);
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(SpdyError::InvalidControlFrame);
    }
    let raw = buf[..len].to_vec();
    buf.advance(len);
    String::from_utf8(raw).map_err(|_| SpdyError::InvalidControlFrame)
}
