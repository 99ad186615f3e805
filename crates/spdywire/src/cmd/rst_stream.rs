use spdywire_codec::SpdyFramer;

use crate::cmd::RstStreamArgs;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::write_frame_bytes;

pub fn run(args: RstStreamArgs) -> CliResult<i32> {
    if args.stream_id == 0 || args.stream_id > 0x7fff_ffff {
        return Err(CliError::new(USAGE, "stream id must be nonzero and 31-bit"));
    }

    let frame = SpdyFramer::create_rst_stream(args.stream_id, args.status);
    write_frame_bytes(&frame.to_bytes(), args.out.as_deref(), args.hex)?;
    Ok(SUCCESS)
}
