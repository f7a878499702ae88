//! Concrete [`PayloadFormat`](super::format::PayloadFormat) implementations.

pub mod h264;
pub mod simple;
