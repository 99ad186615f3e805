#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "spdywire-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn spdywire(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_spdywire"))
        .args(args)
        .output()
        .expect("spdywire should run")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).expect("stdout line should be json"))
        .collect()
}

#[test]
fn syn_stream_encode_decode_round_trip() {
    let dir = unique_temp_dir("syn-stream");
    let wire = dir.join("syn.bin");

    let encode = spdywire(&[
        "syn-stream",
        "--stream-id",
        "1",
        "--header",
        ":method=GET",
        "--header",
        ":path=/",
        "--out",
        wire.to_str().unwrap(),
    ]);
    assert!(encode.status.success(), "{encode:?}");

    let decode = spdywire(&[
        "decode",
        wire.to_str().unwrap(),
        "--no-compression",
        "--format",
        "json",
    ]);
    assert!(decode.status.success(), "{decode:?}");

    let events = json_lines(&decode);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event"], "control");
    assert_eq!(events[0]["kind"], "SYN_STREAM");
    assert_eq!(events[0]["stream_id"], 1);

    let headers = events[0]["headers"].as_array().expect("headers array");
    assert!(headers
        .iter()
        .any(|pair| pair["name"] == ":method" && pair["value"] == "GET"));
    assert!(headers
        .iter()
        .any(|pair| pair["name"] == ":path" && pair["value"] == "/"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn compressed_syn_stream_round_trip() {
    let dir = unique_temp_dir("syn-compressed");
    let wire = dir.join("syn.bin");

    let encode = spdywire(&[
        "syn-stream",
        "--stream-id",
        "3",
        "--compress",
        "--header",
        "host=example.test",
        "--out",
        wire.to_str().unwrap(),
    ]);
    assert!(encode.status.success(), "{encode:?}");

    let decode = spdywire(&["decode", wire.to_str().unwrap(), "--format", "json"]);
    assert!(decode.status.success(), "{decode:?}");

    let events = json_lines(&decode);
    assert_eq!(events[0]["kind"], "SYN_STREAM");
    let headers = events[0]["headers"].as_array().expect("headers array");
    assert!(headers
        .iter()
        .any(|pair| pair["name"] == "host" && pair["value"] == "example.test"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn data_frame_with_fin_round_trip() {
    let dir = unique_temp_dir("data-fin");
    let wire = dir.join("data.bin");

    let encode = spdywire(&[
        "data",
        "--stream-id",
        "2",
        "--data",
        "hello",
        "--fin",
        "--out",
        wire.to_str().unwrap(),
    ]);
    assert!(encode.status.success(), "{encode:?}");

    let decode = spdywire(&[
        "decode",
        wire.to_str().unwrap(),
        "--no-compression",
        "--format",
        "json",
    ]);
    assert!(decode.status.success(), "{decode:?}");

    let events = json_lines(&decode);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "data");
    assert_eq!(events[0]["stream_id"], 2);
    assert_eq!(events[0]["payload"], "hello");
    assert_eq!(events[1]["event"], "stream_end");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn settings_round_trip() {
    let dir = unique_temp_dir("settings");
    let wire = dir.join("settings.bin");

    let encode = spdywire(&[
        "settings",
        "--entry",
        "4=100",
        "--out",
        wire.to_str().unwrap(),
    ]);
    assert!(encode.status.success(), "{encode:?}");

    let decode = spdywire(&["decode", wire.to_str().unwrap(), "--format", "json"]);
    assert!(decode.status.success(), "{decode:?}");

    let events = json_lines(&decode);
    assert_eq!(events[0]["kind"], "SETTINGS");
    assert_eq!(events[0]["detail"], "MAX_CONCURRENT_STREAMS=100");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn chunked_decode_matches_whole_decode_for_control_frames() {
    let dir = unique_temp_dir("chunked");
    let wire = dir.join("rst.bin");

    let encode = spdywire(&[
        "rst-stream",
        "--stream-id",
        "7",
        "--status",
        "refused-stream",
        "--out",
        wire.to_str().unwrap(),
    ]);
    assert!(encode.status.success(), "{encode:?}");

    let whole = spdywire(&["decode", wire.to_str().unwrap(), "--format", "json"]);
    let chunked = spdywire(&[
        "decode",
        wire.to_str().unwrap(),
        "--chunk",
        "1",
        "--format",
        "json",
    ]);
    assert!(whole.status.success() && chunked.status.success());
    assert_eq!(json_lines(&whole), json_lines(&chunked));

    let events = json_lines(&whole);
    assert_eq!(events[0]["kind"], "RST_STREAM");
    assert_eq!(events[0]["detail"], "status=REFUSED_STREAM");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_reports_unsupported_version() {
    let dir = unique_temp_dir("bad-version");
    let wire = dir.join("bad.bin");

    // Control frame header claiming protocol version 9.
    let bytes = [0x80, 0x09, 0x00, 0x07, 0x00, 0x00, 0x00, 0x04, 0, 0, 0, 0];
    std::fs::write(&wire, bytes).expect("wire file should be writable");

    let decode = spdywire(&["decode", wire.to_str().unwrap(), "--format", "json"]);
    assert!(!decode.status.success());
    assert_eq!(decode.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&decode.stderr).contains("unsupported protocol version"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn encode_rejects_zero_stream_id() {
    let output = spdywire(&["data", "--stream-id", "0", "--data", "x"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn hex_output_is_stable() {
    let output = spdywire(&["rst-stream", "--stream-id", "1", "--status", "cancel", "--hex"]);
    assert!(output.status.success());
    let hex = String::from_utf8_lossy(&output.stdout);
    assert_eq!(hex.trim(), "80010003000000080000000100000005");
}
