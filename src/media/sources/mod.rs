//! Concrete [`FrameSource`](super::source::FrameSource) implementations.

pub mod file_source;
