use std::io::Read;
use std::path::Path;

use spdywire_codec::{
    ControlFrame, ControlKind, FramerConfig, FramerVisitor, SpdyError, SpdyFramer,
};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, spdy_error, CliResult, SUCCESS};
use crate::output::{payload_preview, print_record, EventRecord, HeaderPair, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = read_input(&args.input)?;

    let mut framer = SpdyFramer::with_config(FramerConfig {
        enable_compression: !args.no_compression,
    });
    let mut collector = Collector::default();

    let chunk = args.chunk.unwrap_or(bytes.len()).max(1);
    for part in bytes.chunks(chunk) {
        let consumed = framer.process_input(part, &mut collector);
        if consumed < part.len() {
            break;
        }
    }

    for event in &collector.events {
        print_record(&render(event, &mut framer), format);
    }

    if let Some(err) = framer.error_code() {
        return Err(spdy_error("decode failed", err));
    }
    Ok(SUCCESS)
}

fn read_input(path: &Path) -> CliResult<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .map_err(|err| io_error("read stdin failed", err))?;
        Ok(bytes)
    } else {
        std::fs::read(path).map_err(|err| io_error("read input failed", err))
    }
}

#[derive(Debug)]
enum DecodedEvent {
    Control(ControlFrame),
    Data { stream_id: u32, data: Vec<u8> },
    StreamEnd { stream_id: u32 },
    Error(SpdyError),
}

#[derive(Debug, Default)]
struct Collector {
    events: Vec<DecodedEvent>,
}

impl FramerVisitor for Collector {
    fn on_error(&mut self, error: SpdyError) {
        self.events.push(DecodedEvent::Error(error));
    }

    fn on_control(&mut self, frame: &ControlFrame) {
        self.events.push(DecodedEvent::Control(frame.clone()));
    }

    fn on_stream_frame_data(&mut self, stream_id: u32, data: &[u8]) {
        if data.is_empty() {
            self.events.push(DecodedEvent::StreamEnd { stream_id });
        } else {
            self.events.push(DecodedEvent::Data {
                stream_id,
                data: data.to_vec(),
            });
        }
    }
}

fn render(event: &DecodedEvent, framer: &mut SpdyFramer) -> EventRecord {
    match event {
        DecodedEvent::Control(frame) => render_control(frame, framer),
        DecodedEvent::Data { stream_id, data } => {
            let mut record = EventRecord::new("data");
            record.stream_id = Some(*stream_id);
            record.length = Some(data.len());
            record.payload = Some(payload_preview(data));
            record
        }
        DecodedEvent::StreamEnd { stream_id } => {
            let mut record = EventRecord::new("stream_end");
            record.stream_id = Some(*stream_id);
            record
        }
        DecodedEvent::Error(error) => {
            let mut record = EventRecord::new("error");
            record.error = Some(error.to_string());
            record
        }
    }
}

fn render_control(frame: &ControlFrame, framer: &mut SpdyFramer) -> EventRecord {
    let mut record = EventRecord::new("control");
    record.kind = Some(frame.kind.name());
    record.flags = Some(frame.flags);
    record.length = Some(frame.payload.len());

    match frame.kind {
        ControlKind::SynStream => {
            if let Ok(syn) = frame.syn_stream() {
                record.stream_id = Some(syn.stream_id);
                record.detail = Some(format!(
                    "associated={} priority={}",
                    syn.associated_stream_id, syn.priority
                ));
            }
            record.headers = header_pairs(frame, framer);
        }
        ControlKind::SynReply => {
            if let Ok(reply) = frame.syn_reply() {
                record.stream_id = Some(reply.stream_id);
            }
            record.headers = header_pairs(frame, framer);
        }
        ControlKind::RstStream => {
            if let Ok(rst) = frame.rst_stream() {
                record.stream_id = Some(rst.stream_id);
                record.detail = Some(format!("status={}", rst.status.name()));
            }
        }
        ControlKind::Goaway => {
            if let Ok(goaway) = frame.goaway() {
                record.detail =
                    Some(format!("last_accepted={}", goaway.last_accepted_stream_id));
            }
        }
        ControlKind::WindowUpdate => {
            if let Ok(update) = frame.window_update() {
                record.stream_id = Some(update.stream_id);
                record.detail = Some(format!("delta={}", update.delta_window_size));
            }
        }
        ControlKind::Settings => {
            if let Ok(entries) = frame.settings() {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|entry| {
                        format!(
                            "{}={}",
                            spdywire_codec::protocol::setting_name(entry.id),
                            entry.value
                        )
                    })
                    .collect();
                record.detail = Some(rendered.join(", "));
            }
        }
        ControlKind::Noop => {}
    }
    record
}

fn header_pairs(frame: &ControlFrame, framer: &mut SpdyFramer) -> Option<Vec<HeaderPair>> {
    match framer.parse_header_block(frame) {
        Ok(block) => Some(
            block
                .iter()
                .map(|(name, value)| HeaderPair {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        ),
        Err(_) => None,
    }
}
