//! Media codecs and RTP packetization.
//!
//! ## RTP overview (RFC 3550)
//!
//! Each encoded video frame is split into one or more RTP packets.
//! Every RTP packet carries a 12-byte fixed header ([`rtp::RtpHeader`])
//! containing:
//!
//! - **Sequence number** (16-bit, wrapping) — for reordering and loss detection.
//! - **Timestamp** (32-bit) — media clock, typically 90 kHz for video.
//! - **SSRC** (32-bit) — randomly chosen to identify the sender.
//! - **Marker bit** — set on the last packet of an access unit (frame).
//!
//! [`packetizer::RtpPacketizer`] is the generic multi-framed packing
//! engine; [`format::PayloadFormat`] implementors in [`formats`] plug
//! codec-specific framing (H.264 FU-A fragmentation, single-frame audio
//! formats) into it. [`source::FrameSource`] and [`sources`] supply the
//! frames a subsession packetizes and sends.

pub mod format;
pub mod formats;
pub mod output_buffer;
pub mod packetizer;
pub mod rtp;
pub mod source;
pub mod sources;
