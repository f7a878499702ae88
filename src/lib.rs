//! # rtsp — on-demand RTSP/RTP media streaming server
//!
//! A Rust library for serving media files on demand over the Real-Time
//! Streaming Protocol (RTSP), in the style of live555's
//! `DynamicRTSPServer`: a client requests a path, the file at that path
//! under the server's media root is opened, packetized, and streamed —
//! no stream needs to be pre-registered.
//!
//! ## Protocol references
//!
//! | RFC | Topic | How this crate uses it |
//! |-----|-------|----------------------|
//! | [RFC 2326](https://tools.ietf.org/html/rfc2326) | RTSP 1.0 | Request/response parsing, session lifecycle, transport negotiation |
//! | [RFC 3550](https://tools.ietf.org/html/rfc3550) | RTP | Packet header format, SSRC generation, sequence/timestamp semantics |
//! | [RFC 4566](https://tools.ietf.org/html/rfc4566) | SDP | Session description generation for DESCRIBE responses |
//! | [RFC 6184](https://tools.ietf.org/html/rfc6184) | H.264 RTP payload | NAL unit packetization, FU-A fragmentation, SDP fmtp attributes |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  Adapters (CLI)                           │
//! ├──────────────────────────────────────────┤
//! │  Server          — public API, orchestrator│
//! │  registry        — on-demand subsessions  │
//! ├──────────────────────────────────────────┤
//! │  Protocol        — RTSP parsing, SDP, etc.│
//! │  Session         — state machine, transport│
//! ├──────────────────────────────────────────┤
//! │  Transport       — TCP signaling, UDP data│
//! │  Media           — RTP, packetizers, sources│
//! │  scheduler/time  — cooperative event loop │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use rtsp::{Server, ServerConfig};
//!
//! let config = ServerConfig {
//!     media_root: "/srv/media".into(),
//!     ..Default::default()
//! };
//! let mut server = Server::with_config("0.0.0.0:8554", config).unwrap();
//! server.start().unwrap();
//! // rtsp://host:8554/clip.264 now resolves clip.264 under /srv/media.
//! ```
//!
//! ## Crate layout
//!
//! - [`server`] — High-level [`Server`] orchestrator and [`ServerConfig`].
//! - [`registry`] — on-demand subsession lookup/creation, extension dispatch,
//!   and the cross-thread bridge onto the single-threaded registry.
//! - [`mount`] — URI-to-stream-name parsing.
//! - [`protocol`] — RTSP request/response parsing, method handling, SDP generation.
//! - [`session`] — RTSP session state machine and transport negotiation.
//! - [`transport`] — TCP listener for RTSP signaling, UDP sender for RTP delivery.
//! - [`media`] — RTP header builder, packetizers, frame sources.
//! - [`scheduler`], [`time`] — cooperative single-threaded event scheduling.
//! - [`error`] — [`RtspError`] enum and [`Result`] alias.

pub mod error;
pub mod media;
pub mod mount;
pub mod protocol;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod time;
pub mod transport;

pub use error::{Result, RtspError};
pub use mount::extract_stream_name;
pub use server::{Server, ServerConfig, Viewer};
