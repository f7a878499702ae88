//! Packet staging buffer for the multi-framed RTP packetizer.
//!
//! `OutPacketBuffer` in the original isn't part of the filtered source pack,
//! but its shape is fully reconstructed from its call sites throughout
//! `MultiFramedRTPSink.cpp`: a buffer big enough for several packets
//! (`max_size`), a write cursor (`cur_offset`, relative to the current
//! packet's start at `packet_start`), word-at-a-time writes for header
//! fields that get filled in before the payload is known, and a single
//! pending "overflow" record used to carry a deferred frame into the next
//! packet.

/// A frame that didn't fit in the current packet and must become the first
/// frame of the next one.
#[derive(Debug, Clone)]
pub struct OverflowFrame {
    pub data: Vec<u8>,
    pub presentation_time: std::time::Duration,
    pub duration: std::time::Duration,
}

/// Staging buffer for one RTP packet at a time, reused across packets.
pub struct OutputBuffer {
    buf: Vec<u8>,
    packet_start: usize,
    cur_offset: usize,
    preferred_size: usize,
    max_size: usize,
    overflow: Option<OverflowFrame>,
}

impl OutputBuffer {
    pub fn new(preferred_size: usize, max_size: usize) -> Self {
        OutputBuffer {
            buf: vec![0u8; max_size * 2],
            packet_start: 0,
            cur_offset: 0,
            preferred_size,
            max_size,
            overflow: None,
        }
    }

    pub fn set_sizes(&mut self, preferred_size: usize, max_size: usize) {
        self.preferred_size = preferred_size;
        if max_size > self.max_size {
            self.buf.resize(max_size * 2, 0);
        }
        self.max_size = max_size;
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Bytes written into the current packet so far.
    pub fn cur_packet_size(&self) -> usize {
        self.cur_offset
    }

    pub fn is_preferred_size(&self) -> bool {
        self.cur_offset >= self.preferred_size
    }

    pub fn would_overflow(&self, num_bytes: usize) -> bool {
        self.cur_offset + num_bytes > self.max_size
    }

    /// How many of `num_bytes` would overflow the max packet size if
    /// appended right now.
    pub fn num_overflow_bytes(&self, num_bytes: usize) -> usize {
        (self.cur_offset + num_bytes).saturating_sub(self.max_size)
    }

    /// Reserves `num_bytes` at the current offset, returning the byte range
    /// (relative to the current packet's start) so the caller can fill it
    /// in via [`write_at`](Self::write_at) — used for header fields whose
    /// value isn't known until packing finishes, e.g. the RTP timestamp and
    /// any payload-format-specific special header.
    pub fn reserve(&mut self, num_bytes: usize) -> std::ops::Range<usize> {
        let start = self.cur_offset;
        self.cur_offset += num_bytes;
        let needed = self.packet_start + self.cur_offset;
        if needed > self.buf.len() {
            self.buf.resize(needed, 0);
        }
        start..start + num_bytes
    }

    pub fn extend_from_slice(&mut self, data: &[u8]) {
        let range = self.reserve(data.len());
        self.write_at(range.start, data);
    }

    pub fn write_at(&mut self, offset_in_packet: usize, data: &[u8]) {
        let start = self.packet_start + offset_in_packet;
        self.buf[start..start + data.len()].copy_from_slice(data);
    }

    pub fn current_packet(&self) -> &[u8] {
        &self.buf[self.packet_start..self.packet_start + self.cur_offset]
    }

    pub fn set_overflow(&mut self, frame: OverflowFrame) {
        self.overflow = Some(frame);
    }

    pub fn take_overflow(&mut self) -> Option<OverflowFrame> {
        self.overflow.take()
    }

    pub fn has_overflow(&self) -> bool {
        self.overflow.is_some()
    }

    /// Decides between a cheap reset (pointer arithmetic only) and a full
    /// reset (memmove back to the start of the underlying buffer), mirroring
    /// `sendPacketIfNecessary`'s `totalBytesAvailable() > totalBufferSize()/2`
    /// heuristic.
    pub fn reset_for_next_packet(&mut self) {
        let remaining_capacity = self.buf.len() - (self.packet_start + self.cur_offset);
        if remaining_capacity > self.buf.len() / 2 {
            self.packet_start += self.cur_offset;
        } else {
            self.buf.copy_within(0..0, 0); // no bytes to preserve; packet has been sent
            self.packet_start = 0;
        }
        self.cur_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn would_overflow_respects_max_size() {
        let mut b = OutputBuffer::new(100, 200);
        b.reserve(150);
        assert!(!b.would_overflow(40));
        assert!(b.would_overflow(60));
        assert_eq!(b.num_overflow_bytes(60), 10);
    }

    #[test]
    fn preferred_size_threshold() {
        let mut b = OutputBuffer::new(100, 200);
        assert!(!b.is_preferred_size());
        b.reserve(100);
        assert!(b.is_preferred_size());
    }

    #[test]
    fn cheap_reset_advances_packet_start_when_capacity_is_plentiful() {
        let mut b = OutputBuffer::new(100, 200);
        b.reserve(50);
        let start_before = b.packet_start;
        b.reset_for_next_packet();
        assert!(b.packet_start > start_before);
        assert_eq!(b.cur_offset, 0);
    }

    #[test]
    fn overflow_round_trips() {
        let mut b = OutputBuffer::new(100, 200);
        b.set_overflow(OverflowFrame {
            data: vec![1, 2, 3],
            presentation_time: std::time::Duration::ZERO,
            duration: std::time::Duration::ZERO,
        });
        assert!(b.has_overflow());
        let frame = b.take_overflow().unwrap();
        assert_eq!(frame.data, vec![1, 2, 3]);
        assert!(!b.has_overflow());
    }

    #[test]
    fn write_at_patches_header_after_reserve() {
        let mut b = OutputBuffer::new(100, 200);
        let range = b.reserve(4);
        b.write_at(range.start, &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(b.current_packet(), &[0xde, 0xad, 0xbe, 0xef]);
    }
}
