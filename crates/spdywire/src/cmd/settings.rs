use spdywire_codec::{Setting, SpdyFramer};

use crate::cmd::SettingsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::write_frame_bytes;

pub fn run(args: SettingsArgs) -> CliResult<i32> {
    let entries: Vec<Setting> = args
        .entry
        .iter()
        .map(|&(id, value)| Setting::new(id, value))
        .collect();

    let frame = SpdyFramer::create_settings(&entries);
    write_frame_bytes(&frame.to_bytes(), args.out.as_deref(), args.hex)?;
    Ok(SUCCESS)
}
