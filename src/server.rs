use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::error::{Result, RtspError};
use crate::registry::bridge::RegistryHandle;
use crate::session::SessionManager;
use crate::transport::tcp;

/// Server-level configuration used by protocol handlers.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Public host advertised in SDP `o=` and `c=` lines.
    /// When `None`, host is inferred from request URI/client address.
    pub public_host: Option<String>,
    /// Public RTSP port for future URL-based headers (e.g. RTP-Info).
    pub public_port: Option<u16>,
    /// SDP origin username field (`o=<username> ...`).
    pub sdp_username: String,
    /// SDP origin session id field (`o=... <session-id> ...`).
    pub sdp_session_id: String,
    /// SDP origin session version field (`o=... ... <session-version> ...`).
    pub sdp_session_version: String,
    /// SDP session name (`s=`).
    pub sdp_session_name: String,
    /// Directory scanned for on-demand streams; URI paths resolve against it.
    pub media_root: PathBuf,
    /// Whether concurrent clients of the same stream share one file source
    /// and packetizer (mirrors `OnDemandServerMediaSubsession::fReuseFirstSource`).
    pub reuse_first_source: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            public_host: None,
            public_port: None,
            sdp_username: "-".to_string(),
            sdp_session_id: "0".to_string(),
            sdp_session_version: "0".to_string(),
            sdp_session_name: "Stream".to_string(),
            media_root: PathBuf::from("."),
            reuse_first_source: false,
        }
    }
}

/// High-level RTSP server orchestrator.
///
/// Owns the session manager and a [`RegistryHandle`] onto the on-demand
/// subsession registry. Delegates TCP connection handling to
/// [`transport::tcp`]; RTP delivery happens on the registry's own thread.
pub struct Server {
    session_manager: SessionManager,
    registry: RegistryHandle,
    running: Arc<AtomicBool>,
    bind_addr: String,
    config: Arc<ServerConfig>,
}

impl Server {
    pub fn new(bind_addr: &str) -> Result<Self> {
        Self::with_config(bind_addr, ServerConfig::default())
    }

    /// Create a server with custom protocol/SDP/media-root configuration.
    pub fn with_config(bind_addr: &str, config: ServerConfig) -> Result<Self> {
        let registry = RegistryHandle::spawn(config.media_root.clone(), config.reuse_first_source)?;
        Ok(Self {
            session_manager: SessionManager::new(),
            registry,
            running: Arc::new(AtomicBool::new(false)),
            bind_addr: bind_addr.to_string(),
            config: Arc::new(config),
        })
    }

    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RtspError::AlreadyRunning);
        }

        let listener = TcpListener::bind(&self.bind_addr)?;
        listener.set_nonblocking(true)?;

        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let session_manager = self.session_manager.clone();
        let registry = self.registry.clone();
        let config = self.config.clone();

        tracing::info!(addr = %self.bind_addr, "RTSP server listening");

        thread::spawn(move || {
            tcp::accept_loop(listener, session_manager, registry, config, running);
        });

        Ok(())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("server stopping");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn get_viewers(&self) -> Vec<Viewer> {
        self.session_manager
            .get_playing_sessions()
            .iter()
            .filter_map(|session| {
                session.get_transport().map(|transport| Viewer {
                    session_id: session.id.clone(),
                    uri: session.uri.clone(),
                    client_addr: transport.client_addr.to_string(),
                    client_rtp_port: transport.client_rtp_port,
                })
            })
            .collect()
    }

    pub fn session_manager(&self) -> &SessionManager {
        &self.session_manager
    }

    /// Returns the server's protocol configuration.
    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }
}

/// Information about a connected viewer (client in PLAY state).
#[derive(Debug, Clone)]
pub struct Viewer {
    pub session_id: String,
    pub uri: String,
    pub client_addr: String,
    pub client_rtp_port: u16,
}
