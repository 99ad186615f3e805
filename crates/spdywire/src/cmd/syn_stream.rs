use spdywire_codec::{HeaderBlock, SpdyFramer, CONTROL_FLAG_FIN};

use crate::cmd::SynStreamArgs;
use crate::exit::{spdy_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::write_frame_bytes;

pub fn run(args: SynStreamArgs) -> CliResult<i32> {
    if args.stream_id == 0 || args.stream_id > 0x7fff_ffff {
        return Err(CliError::new(USAGE, "stream id must be nonzero and 31-bit"));
    }
    if args.associated_to > 0x7fff_ffff {
        return Err(CliError::new(USAGE, "associated stream id must be 31-bit"));
    }
    if args.priority > 3 {
        return Err(CliError::new(USAGE, "priority must be 0-3"));
    }

    let headers: HeaderBlock = args.header.iter().cloned().collect();
    let flags = if args.fin { CONTROL_FLAG_FIN } else { 0 };

    let mut framer = SpdyFramer::new();
    let frame = framer
        .create_syn_stream(
            args.stream_id,
            args.associated_to,
            args.priority,
            flags,
            args.compress,
            &headers,
        )
        .map_err(|err| spdy_error("encode failed", err))?;

    write_frame_bytes(&frame.to_bytes(), args.out.as_deref(), args.hex)?;
    Ok(SUCCESS)
}
