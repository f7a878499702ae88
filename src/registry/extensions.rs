//! File-extension dispatch table.
//!
//! Grounded in `DynamicRTSPServer::createNewSMS`'s `extension` chain of
//! `strcmp`s. Each entry names the codec to packetize with, the chunk size
//! the file source reads per "frame" (the original's demuxers read actual
//! frame boundaries; the elementary-stream source here reads fixed chunks,
//! see `ElementaryStreamFileSource`'s doc comment), and the RTP output
//! buffer sizing `createNewSMS` applies per extension — most codecs use
//! `OutPacketBuffer`'s default, but `.264` and `.dv` bump `maxSize` to
//! 100000 and 300000 bytes respectively to fit oversized keyframes/frames.

use std::time::Duration;

use crate::media::formats::simple::SimpleAudioFormat;

const DEFAULT_MAX_OUTPUT_BUFFER_SIZE: usize = 10000;
const DEFAULT_PREFERRED_OUTPUT_BUFFER_SIZE: usize = 1448;

#[derive(Debug, Clone, Copy)]
pub enum CodecKind {
    H264,
    SimpleAudio {
        codec_name: &'static str,
        payload_type: u8,
        clock_rate: u32,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ExtensionEntry {
    pub codec: CodecKind,
    pub chunk_size: usize,
    pub frame_duration: Duration,
    pub max_output_buffer_size: usize,
    pub preferred_output_buffer_size: usize,
}

impl ExtensionEntry {
    pub fn make_simple_format(&self) -> Option<SimpleAudioFormat> {
        match self.codec {
            CodecKind::SimpleAudio {
                codec_name,
                payload_type,
                clock_rate,
            } => Some(SimpleAudioFormat::new(codec_name, payload_type, clock_rate)),
            CodecKind::H264 => None,
        }
    }
}

fn simple(
    codec_name: &'static str,
    payload_type: u8,
    clock_rate: u32,
    chunk_size: usize,
    frame_ms: u64,
) -> ExtensionEntry {
    ExtensionEntry {
        codec: CodecKind::SimpleAudio {
            codec_name,
            payload_type,
            clock_rate,
        },
        chunk_size,
        frame_duration: Duration::from_millis(frame_ms),
        max_output_buffer_size: DEFAULT_MAX_OUTPUT_BUFFER_SIZE,
        preferred_output_buffer_size: DEFAULT_PREFERRED_OUTPUT_BUFFER_SIZE,
    }
}

/// Looks up the codec/sizing entry for a file extension (without the
/// leading dot, case-sensitive like the original's `strcmp`).
pub fn lookup(extension: &str) -> Option<ExtensionEntry> {
    Some(match extension {
        "264" => ExtensionEntry {
            codec: CodecKind::H264,
            chunk_size: 100_000,
            frame_duration: Duration::from_millis(33),
            max_output_buffer_size: 100_000,
            preferred_output_buffer_size: 1448,
        },
        "aac" => simple("MPEG4-GENERIC", 96, 44100, 4096, 23),
        "amr" => simple("AMR", 96, 8000, 32, 20),
        "ac3" => simple("AC3", 96, 44100, 1920, 32),
        "m4e" => simple("MP4V-ES", 96, 90000, 4096, 33),
        "mp3" => simple("MPA", 14, 90000, 4096, 26),
        "wav" => simple("L16", 97, 44100, 4096, 23),
        "mpg" | "vob" | "ts" | "dv" | "mkv" | "webm" => ExtensionEntry {
            codec: CodecKind::H264,
            chunk_size: if extension == "dv" { 300_000 } else { 100_000 },
            frame_duration: Duration::from_millis(33),
            max_output_buffer_size: if extension == "dv" { 300_000 } else { 100_000 },
            preferred_output_buffer_size: 1448,
        },
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn h264_extension_bumps_output_buffer_to_100kb() {
        let entry = lookup("264").unwrap();
        assert_eq!(entry.max_output_buffer_size, 100_000);
        assert!(matches!(entry.codec, CodecKind::H264));
    }

    #[test]
    fn dv_extension_bumps_output_buffer_to_300kb() {
        let entry = lookup("dv").unwrap();
        assert_eq!(entry.max_output_buffer_size, 300_000);
    }

    #[test]
    fn aac_is_simple_audio() {
        let entry = lookup("aac").unwrap();
        assert!(matches!(entry.codec, CodecKind::SimpleAudio { .. }));
        assert_eq!(entry.max_output_buffer_size, DEFAULT_MAX_OUTPUT_BUFFER_SIZE);
    }

    #[test]
    fn unknown_extension_is_none() {
        assert!(lookup("xyz").is_none());
    }
}
