//! Payload-format hook invoked by the packetizer engine.
//!
//! Corresponds to `MultiFramedRTPSink`'s overridable points
//! (`doSpecialFrameHandling`, `frameSpecificHeaderSize`,
//! `specialHeaderSize`, `frameCanAppearAfterPacketStart`,
//! `allowFragmentationAfterStart`, `allowOtherFramesAfterLastFragment`).
//! A format that needs no special framing (audio codecs in the original)
//! can just take the default implementations.

use crate::media::output_buffer::OutputBuffer;

pub trait PayloadFormat {
    fn codec_name(&self) -> &'static str;
    fn clock_rate(&self) -> u32;
    fn payload_type(&self) -> u8;
    fn sdp_attributes(&self) -> Vec<String>;

    /// Whether another frame may start after the packet's first frame.
    /// H.264 in Single-NAL mode: yes for whole NALs; during FU-A
    /// fragmentation: no (a fragment must be the only thing in its packet
    /// chain until the fragmented NAL ends).
    fn frame_can_appear_after_packet_start(&self, _frame: &[u8]) -> bool {
        true
    }

    /// Whether a FU-A (or equivalent) fragmentation run may continue to
    /// add other whole frames to later packets before finishing. Default:
    /// false — matches `MultiFramedRTPSink`'s default.
    fn allow_other_frames_after_last_fragment(&self) -> bool {
        false
    }

    /// Whether this format may fragment a frame that does not start the
    /// packet. Default: false.
    fn allow_fragmentation_after_start(&self) -> bool {
        false
    }

    /// Called once per frame or fragment, immediately after its bytes are
    /// appended to the packet, to decide the marker bit — the Rust
    /// equivalent of `doSpecialFrameHandling`'s marker-setting half (the
    /// RTP timestamp half is handled by the packetizer itself, since it
    /// owns the single [`RtpHeader`](crate::media::rtp::RtpHeader)).
    ///
    /// `is_first_frame_in_packet`/`is_first_fragment`/`is_last_fragment`
    /// mirror the flags `doSpecialFrameHandling` receives in the original.
    fn handle_frame(
        &mut self,
        buf: &mut OutputBuffer,
        is_first_frame_in_packet: bool,
        is_first_fragment: bool,
        is_last_fragment: bool,
        fragment_offset: usize,
        frame: &[u8],
    ) -> bool;

    /// Splits `frame` into fragments no larger than `max_fragment_size`,
    /// each already carrying whatever format-specific header bytes it
    /// needs (e.g. H.264's 2-byte FU indicator/header). Returns `None` if
    /// this format never fragments (default): the engine then treats an
    /// oversized frame by giving it its own packet regardless of size.
    fn fragment(&self, frame: &[u8], _max_fragment_size: usize) -> Option<Vec<Vec<u8>>> {
        let _ = frame;
        None
    }
}
