//! Generic one-frame-fits-in-one-packet payload format.
//!
//! Grounded in `MultiFramedRTPSink`'s default hook implementations, used
//! unchanged by the original's audio subclasses: no frame-specific header,
//! no fragmentation, marker bit set whenever a frame completes a packet.
//! Covers the elementary-stream audio codecs in spec §6's extension table
//! (AAC/AMR/AC-3/MP3/WAV) that don't need payload-specific framing.

use crate::media::format::PayloadFormat;
use crate::media::output_buffer::OutputBuffer;

#[derive(Debug, Clone)]
pub struct SimpleAudioFormat {
    codec_name: &'static str,
    payload_type: u8,
    clock_rate: u32,
}

impl SimpleAudioFormat {
    pub fn new(codec_name: &'static str, payload_type: u8, clock_rate: u32) -> Self {
        SimpleAudioFormat {
            codec_name,
            payload_type,
            clock_rate,
        }
    }
}

impl PayloadFormat for SimpleAudioFormat {
    fn codec_name(&self) -> &'static str {
        self.codec_name
    }

    fn clock_rate(&self) -> u32 {
        self.clock_rate
    }

    fn payload_type(&self) -> u8 {
        self.payload_type
    }

    fn sdp_attributes(&self) -> Vec<String> {
        vec![
            format!(
                "a=rtpmap:{} {}/{}",
                self.payload_type, self.codec_name, self.clock_rate
            ),
            "a=control:track1".to_string(),
        ]
    }

    fn handle_frame(
        &mut self,
        _buf: &mut OutputBuffer,
        _is_first_frame_in_packet: bool,
        _is_first_fragment: bool,
        _is_last_fragment: bool,
        _fragment_offset: usize,
        _frame: &[u8],
    ) -> bool {
        true
    }
}
