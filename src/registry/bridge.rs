//! Cross-thread bridge onto the single-threaded, `Rc`-based [`SessionRegistry`].
//!
//! The RTSP signaling layer (`transport::tcp`) is thread-per-connection, the
//! same as the teacher's; the registry and its `StreamState`s are
//! `Rc<RefCell<_>>`-based per spec §9, so they can only ever be touched from
//! one thread. [`RegistryHandle::spawn`] starts that one thread and gives
//! every connection thread a cheap, `Clone`, `Send` handle that talks to it
//! over a request/reply channel — this plays the role `TriggerTable::fire`
//! plays for the scheduler core, except each call also needs a value back,
//! which a bare atomic fire-and-forget can't carry.
//!
//! The owning thread also paces continuous RTP delivery for playing
//! sessions, polling each subsession on a fixed tick (see
//! [`OnDemandSubsession::tick`](super::subsession::OnDemandSubsession::tick))
//! rather than integrating with the scheduler's `TimerQueue`/`EventLoop`
//! directly — a known simplification, see DESIGN.md.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use crate::error::{Result, RtspError};
use crate::session::stream_state::Destinations;
use crate::transport::udp::UdpTransport;

use super::SessionRegistry;

const TICK_INTERVAL: Duration = Duration::from_millis(20);

pub enum RegistryCommand {
    SdpInfo {
        stream_name: String,
    },
    StartStream {
        stream_name: String,
        client_session_id: String,
        dest: Destinations,
    },
    SetPlaying {
        stream_name: String,
        client_session_id: String,
        playing: bool,
    },
    DeleteStream {
        stream_name: String,
        client_session_id: String,
    },
}

pub struct SdpInfo {
    pub clock_rate: u32,
    pub payload_type: u8,
    pub attributes: Vec<String>,
}

enum RegistryReply {
    Sdp(Result<SdpInfo>),
    Unit(Result<()>),
}

/// Cheap, `Send` handle to the thread that owns the [`SessionRegistry`].
#[derive(Clone)]
pub struct RegistryHandle {
    sender: Sender<(RegistryCommand, Sender<RegistryReply>)>,
}

impl RegistryHandle {
    pub fn spawn(media_root: impl Into<std::path::PathBuf>, reuse_first_source: bool) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let udp = UdpTransport::bind()?;
        let media_root = media_root.into();
        thread::spawn(move || run_owning_thread(media_root, reuse_first_source, udp, rx));
        Ok(RegistryHandle { sender: tx })
    }

    fn call(&self, command: RegistryCommand) -> RegistryReply {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.sender.send((command, reply_tx)).is_err() {
            return RegistryReply::Unit(Err(RtspError::NotStarted));
        }
        reply_rx
            .recv()
            .unwrap_or(RegistryReply::Unit(Err(RtspError::NotStarted)))
    }

    pub fn sdp_info(&self, stream_name: &str) -> Result<SdpInfo> {
        match self.call(RegistryCommand::SdpInfo {
            stream_name: stream_name.to_string(),
        }) {
            RegistryReply::Sdp(r) => r,
            RegistryReply::Unit(Err(e)) => Err(e),
            RegistryReply::Unit(Ok(())) => unreachable!("SdpInfo always replies with Sdp"),
        }
    }

    pub fn start_stream(
        &self,
        stream_name: &str,
        client_session_id: &str,
        dest: Destinations,
    ) -> Result<()> {
        match self.call(RegistryCommand::StartStream {
            stream_name: stream_name.to_string(),
            client_session_id: client_session_id.to_string(),
            dest,
        }) {
            RegistryReply::Unit(r) => r,
            RegistryReply::Sdp(_) => unreachable!(),
        }
    }

    pub fn set_playing(&self, stream_name: &str, client_session_id: &str, playing: bool) -> Result<()> {
        match self.call(RegistryCommand::SetPlaying {
            stream_name: stream_name.to_string(),
            client_session_id: client_session_id.to_string(),
            playing,
        }) {
            RegistryReply::Unit(r) => r,
            RegistryReply::Sdp(_) => unreachable!(),
        }
    }

    pub fn delete_stream(&self, stream_name: &str, client_session_id: &str) {
        let _ = self.call(RegistryCommand::DeleteStream {
            stream_name: stream_name.to_string(),
            client_session_id: client_session_id.to_string(),
        });
    }
}

fn run_owning_thread(
    media_root: std::path::PathBuf,
    reuse_first_source: bool,
    udp: UdpTransport,
    rx: Receiver<(RegistryCommand, Sender<RegistryReply>)>,
) {
    let registry = SessionRegistry::new(media_root, reuse_first_source);
    loop {
        match rx.recv_timeout(TICK_INTERVAL) {
            Ok((command, reply_tx)) => {
                let reply = handle_command(&registry, command);
                let _ = reply_tx.send(reply);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
        }
        registry.tick(&udp);
    }
}

fn handle_command(registry: &SessionRegistry, command: RegistryCommand) -> RegistryReply {
    match command {
        RegistryCommand::SdpInfo { stream_name } => {
            RegistryReply::Sdp(registry.resolve_or_create(&stream_name).map(|sub| {
                let sub = sub.borrow();
                SdpInfo {
                    clock_rate: sub.clock_rate(),
                    payload_type: sub.payload_type(),
                    attributes: sub.sdp_attributes(),
                }
            }))
        }
        RegistryCommand::StartStream {
            stream_name,
            client_session_id,
            dest,
        } => RegistryReply::Unit(registry.resolve_or_create(&stream_name).and_then(|sub| {
            sub.borrow_mut().start_stream(&client_session_id, dest)
        })),
        RegistryCommand::SetPlaying {
            stream_name,
            client_session_id,
            playing,
        } => RegistryReply::Unit(
            registry
                .get(&stream_name)
                .ok_or_else(|| RtspError::StreamNotFound(stream_name.clone()))
                .and_then(|sub| sub.borrow_mut().set_playing(&client_session_id, playing)),
        ),
        RegistryCommand::DeleteStream {
            stream_name,
            client_session_id,
        } => {
            if let Some(sub) = registry.get(&stream_name) {
                sub.borrow_mut().delete_stream(&client_session_id);
            }
            RegistryReply::Unit(Ok(()))
        }
    }
}
