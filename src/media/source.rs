//! Frame source contract consumed by the packetizer.
//!
//! Grounded in the continuation-passing contract `MultiFramedRTPSink`
//! assumes of `fSource->getNextFrame(...)`: the source is handed a buffer
//! to fill and two callbacks, and must eventually call exactly one of them.
//! Container demultiplexers are out of scope (see spec Non-goals), so the
//! only concrete source here is file-backed and calls back synchronously;
//! the trait itself stays agnostic to that and would support an
//! asynchronous/callback-deferred source without changing the packetizer.

use std::time::Duration;

/// Delivered to [`FrameSource::request_frame`]'s `on_frame` callback.
pub struct FrameInfo {
    pub size: usize,
    pub num_truncated_bytes: usize,
    pub presentation_time: Duration,
    pub duration: Duration,
}

pub trait FrameSource {
    /// Requests the next frame into `buffer`, truncating (and reporting via
    /// `num_truncated_bytes`) if it doesn't fit — mirrors
    /// `getNextFrame`'s `maxSize` contract. Calls `on_frame` if a frame was
    /// delivered, or `on_closure` if the source is exhausted.
    fn request_frame(
        &mut self,
        buffer: &mut [u8],
        on_frame: &mut dyn FnMut(FrameInfo),
        on_closure: &mut dyn FnMut(),
    );
}
