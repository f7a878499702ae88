//! A single on-demand stream: one underlying file, shared across client
//! sessions when `reuse_first_source` is set.
//!
//! Grounded in `OnDemandServerMediaSubsession.cpp`: `getStreamParameters`
//! creates per-client `StreamState`/`Destinations` (or hands back the
//! shared one), `startStream`/`pauseStream`/`seekStream`/`setStreamScale`
//! act on it, and `deleteStream` tears destinations down before the shared
//! state itself once the last client leaves.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{Result, RtspError};
use crate::media::formats::h264::H264Packetizer;
use crate::media::formats::simple::SimpleAudioFormat;
use crate::media::packetizer::RtpPacketizer;
use crate::media::source::FrameSource;
use crate::media::sources::file_source::ElementaryStreamFileSource;
use crate::session::stream_state::{Destinations, StreamState};

use super::extensions::{CodecKind, ExtensionEntry};

/// Either of the two packetizer shapes an extension can dispatch to.
enum Packetizer {
    H264(H264Packetizer),
    Audio(RtpPacketizer<SimpleAudioFormat>),
}

impl Packetizer {
    fn new(entry: &ExtensionEntry) -> Self {
        match entry.codec {
            CodecKind::H264 => Packetizer::H264(H264Packetizer::new()),
            CodecKind::SimpleAudio { .. } => Packetizer::Audio(RtpPacketizer::new(
                entry.make_simple_format().expect("SimpleAudio entry"),
                entry.preferred_output_buffer_size,
                entry.max_output_buffer_size,
            )),
        }
    }

    fn packetize(
        &mut self,
        frame: &[u8],
        presentation_time: Duration,
        duration: Duration,
    ) -> Vec<Vec<u8>> {
        match self {
            Packetizer::H264(p) => p.packetize_access_unit(frame, presentation_time, duration),
            Packetizer::Audio(p) => p.packetize(frame, presentation_time, duration),
        }
    }

    fn sdp_attributes(&self) -> Vec<String> {
        match self {
            Packetizer::H264(p) => p.sdp_attributes(),
            Packetizer::Audio(p) => p.sdp_attributes(),
        }
    }

    fn clock_rate(&self) -> u32 {
        match self {
            Packetizer::H264(p) => p.clock_rate(),
            Packetizer::Audio(p) => p.clock_rate(),
        }
    }

    fn payload_type(&self) -> u8 {
        match self {
            Packetizer::H264(p) => p.payload_type(),
            Packetizer::Audio(p) => p.payload_type(),
        }
    }
}

/// One underlying source plus its packetizer and the `StreamState` shared
/// by every client session attached to it.
struct SharedPlayback {
    source: ElementaryStreamFileSource,
    packetizer: Packetizer,
    state: StreamState,
}

pub struct OnDemandSubsession {
    file_path: PathBuf,
    entry: ExtensionEntry,
    reuse_first_source: bool,
    shared: Option<Rc<RefCell<SharedPlayback>>>,
    per_client: std::collections::HashMap<String, Rc<RefCell<SharedPlayback>>>,
}

impl OnDemandSubsession {
    pub(super) fn new(file_path: PathBuf, entry: ExtensionEntry, reuse_first_source: bool) -> Self {
        OnDemandSubsession {
            file_path,
            entry,
            reuse_first_source,
            shared: None,
            per_client: std::collections::HashMap::new(),
        }
    }

    /// SDP media-level parameters (`a=rtpmap`/`a=fmtp`/...), built from a
    /// throwaway packetizer so they're available even before any client has
    /// connected (`getStreamParameters`'s SDP-description half).
    pub fn sdp_attributes(&self) -> Vec<String> {
        Packetizer::new(&self.entry).sdp_attributes()
    }

    pub fn clock_rate(&self) -> u32 {
        Packetizer::new(&self.entry).clock_rate()
    }

    pub fn payload_type(&self) -> u8 {
        Packetizer::new(&self.entry).payload_type()
    }

    fn open_playback(&self) -> Result<SharedPlayback> {
        let source = ElementaryStreamFileSource::open(
            &self.file_path,
            self.entry.chunk_size,
            self.entry.frame_duration,
        )?;
        Ok(SharedPlayback {
            source,
            packetizer: Packetizer::new(&self.entry),
            state: StreamState::new(),
        })
    }

    /// Attaches a client session, creating (or reusing, per
    /// `reuse_first_source`) the underlying playback unit.
    pub fn start_stream(&mut self, client_session_id: &str, dest: Destinations) -> Result<()> {
        let playback = if self.reuse_first_source {
            if self.shared.is_none() {
                self.shared = Some(Rc::new(RefCell::new(self.open_playback()?)));
            }
            self.shared.as_ref().unwrap().clone()
        } else {
            Rc::new(RefCell::new(self.open_playback()?))
        };
        playback.borrow_mut().state.add_destination(client_session_id, dest);
        self.per_client.insert(client_session_id.to_string(), playback);
        Ok(())
    }

    /// Transitions a client's playback unit between Playing and Paused
    /// (PLAY/PAUSE); rejected when the unit is shared, same as pause/seek/scale.
    pub fn set_playing(&mut self, client_session_id: &str, playing: bool) -> Result<()> {
        // Resuming a shared source is fine; only pausing one client's view
        // of a source other clients are still watching is rejected.
        if !playing && self.is_shared_for(client_session_id) {
            return Err(RtspError::SharedSourceUnsupported("pause".to_string()));
        }
        let playback = self
            .per_client
            .get(client_session_id)
            .ok_or_else(|| RtspError::SessionNotFound(client_session_id.to_string()))?;
        playback.borrow_mut().state.is_playing = playing;
        Ok(())
    }

    /// Pulls one frame for every distinct playback unit currently playing
    /// and fans the resulting RTP packets out to all of its destinations.
    /// Driven by the registry's owning thread (see `registry::bridge`) on a
    /// fixed poll interval rather than precise `next_send_time` pacing.
    pub fn tick(&mut self, udp: &crate::transport::udp::UdpTransport) {
        let mut distinct: Vec<Rc<RefCell<SharedPlayback>>> = Vec::new();
        for playback in self.per_client.values() {
            if !distinct.iter().any(|p| Rc::ptr_eq(p, playback)) {
                distinct.push(playback.clone());
            }
        }
        for playback in distinct {
            let is_playing = playback.borrow().state.is_playing;
            if !is_playing {
                continue;
            }
            let packets = match Self::read_and_packetize(&playback, self.entry.chunk_size) {
                Some(p) => p,
                None => continue,
            };
            let destinations: Vec<Destinations> =
                playback.borrow().state.destinations.values().cloned().collect();
            for packet in &packets {
                for dest in &destinations {
                    if let Err(e) = udp.send_to(packet, dest.client_addr) {
                        tracing::warn!(error = %e, "RTP delivery failed");
                    }
                }
            }
        }
    }

    fn read_and_packetize(
        playback: &Rc<RefCell<SharedPlayback>>,
        chunk_size: usize,
    ) -> Option<Vec<Vec<u8>>> {
        let mut pb = playback.borrow_mut();
        let mut scratch = vec![0u8; chunk_size.max(1)];
        let mut frame_size = None;
        let mut presentation_time = Duration::ZERO;
        let mut duration = Duration::ZERO;
        let mut closed = false;
        pb.source.request_frame(
            &mut scratch,
            &mut |info| {
                frame_size = Some(info.size);
                presentation_time = info.presentation_time;
                duration = info.duration;
            },
            &mut || closed = true,
        );
        if closed {
            pb.state.is_playing = false;
            return None;
        }
        let size = frame_size?;
        pb.state.most_recent_frame = Some(crate::media::source::FrameInfo {
            size,
            num_truncated_bytes: 0,
            presentation_time,
            duration,
        });
        Some(pb.packetizer.packetize(&scratch[..size], presentation_time, duration))
    }

    /// `true` if this client's playback unit is shared with other sessions
    /// (`reuse_first_source` and more than one attached destination).
    fn is_shared_for(&self, client_session_id: &str) -> bool {
        self.reuse_first_source
            && self
                .per_client
                .get(client_session_id)
                .map(|p| p.borrow().state.ref_count > 1)
                .unwrap_or(false)
    }

    pub fn pause_stream(&mut self, client_session_id: &str) -> Result<()> {
        self.set_playing(client_session_id, false)
    }

    pub fn seek_stream(&mut self, client_session_id: &str, _to: Duration) -> Result<()> {
        if self.is_shared_for(client_session_id) {
            return Err(RtspError::SharedSourceUnsupported("seek".to_string()));
        }
        self.per_client
            .get(client_session_id)
            .map(|_| ())
            .ok_or_else(|| RtspError::SessionNotFound(client_session_id.to_string()))
    }

    pub fn set_scale(&mut self, client_session_id: &str, _scale: f32) -> Result<()> {
        if self.is_shared_for(client_session_id) {
            return Err(RtspError::SharedSourceUnsupported("scale".to_string()));
        }
        self.per_client
            .get(client_session_id)
            .map(|_| ())
            .ok_or_else(|| RtspError::SessionNotFound(client_session_id.to_string()))
    }

    /// Reads and packetizes the next frame for a playing client, returning
    /// RTP packets ready to send to its destination. Exposed mainly for
    /// tests; production delivery goes through [`tick`](Self::tick).
    pub fn next_packets(&mut self, client_session_id: &str) -> Result<Vec<Vec<u8>>> {
        let playback = self
            .per_client
            .get(client_session_id)
            .ok_or_else(|| RtspError::SessionNotFound(client_session_id.to_string()))?
            .clone();
        if !playback.borrow().state.is_playing {
            return Err(RtspError::SessionNotPlaying(client_session_id.to_string()));
        }
        Self::read_and_packetize(&playback, self.entry.chunk_size)
            .ok_or_else(|| RtspError::SessionNotPlaying(client_session_id.to_string()))
    }

    /// Detaches a client session; once the last one leaves, the shared
    /// playback unit (source + packetizer) is dropped with it.
    pub fn delete_stream(&mut self, client_session_id: &str) {
        if let Some(playback) = self.per_client.remove(client_session_id) {
            let remaining = playback.borrow_mut().state.remove_destination(client_session_id);
            if remaining == 0 && self.shared.as_ref().map(|s| Rc::ptr_eq(s, &playback)).unwrap_or(false) {
                self.shared = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::extensions;
    use std::io::Write;

    fn dest() -> Destinations {
        Destinations {
            client_addr: "127.0.0.1:0".parse().unwrap(),
            rtp_port: 6970,
            rtcp_port: 6971,
        }
    }

    fn write_temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join("rtsp_rs_subsession_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::File::create(&path).unwrap().write_all(bytes).unwrap();
        path
    }

    #[test]
    fn reuse_first_source_shares_ref_count_across_clients() {
        let path = write_temp_file("shared.264", &[0, 0, 0, 1, 0x65, 1, 2, 3]);
        let entry = extensions::lookup("264").unwrap();
        let mut sub = OnDemandSubsession::new(path, entry, true);
        sub.start_stream("a", dest()).unwrap();
        sub.start_stream("b", dest()).unwrap();
        assert_eq!(sub.shared.as_ref().unwrap().borrow().state.ref_count, 2);
    }

    #[test]
    fn pause_rejected_when_source_is_shared() {
        let path = write_temp_file("shared2.264", &[0, 0, 0, 1, 0x65, 1, 2, 3]);
        let entry = extensions::lookup("264").unwrap();
        let mut sub = OnDemandSubsession::new(path, entry, true);
        sub.start_stream("a", dest()).unwrap();
        sub.start_stream("b", dest()).unwrap();
        assert!(sub.pause_stream("a").is_err());
    }

    #[test]
    fn pause_allowed_when_source_is_not_shared() {
        let path = write_temp_file("solo.264", &[0, 0, 0, 1, 0x65, 1, 2, 3]);
        let entry = extensions::lookup("264").unwrap();
        let mut sub = OnDemandSubsession::new(path, entry, false);
        sub.start_stream("a", dest()).unwrap();
        assert!(sub.pause_stream("a").is_ok());
    }

    #[test]
    fn delete_stream_drops_shared_state_once_refcount_hits_zero() {
        let path = write_temp_file("teardown.264", &[0, 0, 0, 1, 0x65, 1, 2, 3]);
        let entry = extensions::lookup("264").unwrap();
        let mut sub = OnDemandSubsession::new(path, entry, true);
        sub.start_stream("a", dest()).unwrap();
        sub.start_stream("b", dest()).unwrap();
        sub.delete_stream("a");
        assert!(sub.shared.is_some());
        sub.delete_stream("b");
        assert!(sub.shared.is_none());
    }

    #[test]
    fn sdp_attributes_available_before_any_client_connects() {
        let path = write_temp_file("nostream.264", &[]);
        let entry = extensions::lookup("264").unwrap();
        let sub = OnDemandSubsession::new(path, entry, true);
        let attrs = sub.sdp_attributes();
        assert!(attrs.iter().any(|a| a.starts_with("a=rtpmap:")));
    }
}
