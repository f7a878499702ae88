//! Per-stream playback state shared by every client session attached to the
//! same on-demand stream.
//!
//! Grounded in `OnDemandServerMediaSubsession.cpp`'s `StreamState` and
//! `Destinations`: one `StreamState` per underlying source, reference
//! counted across client sessions when `reuse_first_source` is set; each
//! client session gets its own `Destinations` record (where to send RTP/RTCP).

use std::net::SocketAddr;

use crate::media::source::FrameInfo;

/// Where a given client session's RTP/RTCP packets should be sent.
#[derive(Debug, Clone)]
pub struct Destinations {
    pub client_addr: SocketAddr,
    pub rtp_port: u16,
    pub rtcp_port: u16,
}

/// Shared playback state for one underlying source, independent of how many
/// client sessions are attached to it.
pub struct StreamState {
    pub ref_count: usize,
    pub destinations: std::collections::HashMap<String, Destinations>,
    pub most_recent_frame: Option<FrameInfo>,
    pub is_playing: bool,
}

impl StreamState {
    pub fn new() -> Self {
        StreamState {
            ref_count: 0,
            destinations: std::collections::HashMap::new(),
            most_recent_frame: None,
            is_playing: false,
        }
    }

    pub fn add_destination(&mut self, client_session_id: &str, dest: Destinations) {
        self.ref_count += 1;
        self.destinations.insert(client_session_id.to_string(), dest);
    }

    /// Removes a client session's destination, returning the new reference
    /// count. The caller tears the whole `StreamState` down once this hits
    /// zero, mirroring `deleteStream`'s order: destinations go first, then
    /// the source.
    pub fn remove_destination(&mut self, client_session_id: &str) -> usize {
        if self.destinations.remove(client_session_id).is_some() {
            self.ref_count = self.ref_count.saturating_sub(1);
        }
        self.ref_count
    }
}

impl Default for StreamState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dest() -> Destinations {
        Destinations {
            client_addr: "127.0.0.1:0".parse().unwrap(),
            rtp_port: 6970,
            rtcp_port: 6971,
        }
    }

    #[test]
    fn ref_count_tracks_attached_sessions() {
        let mut s = StreamState::new();
        s.add_destination("a", dest());
        s.add_destination("b", dest());
        assert_eq!(s.ref_count, 2);
        assert_eq!(s.remove_destination("a"), 1);
        assert_eq!(s.remove_destination("b"), 0);
    }

    #[test]
    fn removing_unknown_session_is_a_no_op() {
        let mut s = StreamState::new();
        s.add_destination("a", dest());
        assert_eq!(s.remove_destination("nonexistent"), 1);
    }
}
