use spdywire_codec::{SpdyFramer, DATA_FLAG_COMPRESSED, DATA_FLAG_FIN};

use crate::cmd::DataArgs;
use crate::exit::{io_error, spdy_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::write_frame_bytes;

pub fn run(args: DataArgs) -> CliResult<i32> {
    if args.stream_id == 0 || args.stream_id > 0x7fff_ffff {
        return Err(CliError::new(USAGE, "stream id must be nonzero and 31-bit"));
    }

    let payload = if let Some(data) = &args.data {
        data.clone().into_bytes()
    } else if let Some(path) = &args.file {
        std::fs::read(path).map_err(|err| io_error("read payload failed", err))?
    } else {
        Vec::new()
    };

    let mut flags = 0u8;
    if args.fin {
        flags |= DATA_FLAG_FIN;
    }
    if args.compress {
        flags |= DATA_FLAG_COMPRESSED;
    }

    let mut framer = SpdyFramer::new();
    let frame = framer
        .create_data_frame(args.stream_id, &payload, flags)
        .map_err(|err| spdy_error("encode failed", err))?;

    write_frame_bytes(&frame.to_bytes(), args.out.as_deref(), args.hex)?;
    Ok(SUCCESS)
}
