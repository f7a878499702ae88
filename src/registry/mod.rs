//! On-demand session lifecycle: lookup-or-create subsessions dispatched by
//! file extension, each backing zero-or-more attached client sessions
//! through a shared, reference-counted [`StreamState`](crate::session::stream_state::StreamState).
//!
//! Grounded in `DynamicRTSPServer.cpp` (`lookupServerMediaSession`,
//! `createNewSMS`) and `OnDemandServerMediaSubsession.cpp`.

pub mod bridge;
pub mod extensions;
pub mod subsession;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use crate::error::{Result, RtspError};
use subsession::OnDemandSubsession;

/// Registry of on-demand subsessions, keyed by stream name (the file path
/// relative to the server's media root).
pub struct SessionRegistry {
    subsessions: RefCell<HashMap<String, Rc<RefCell<OnDemandSubsession>>>>,
    media_root: std::path::PathBuf,
    reuse_first_source: bool,
}

impl SessionRegistry {
    pub fn new(media_root: impl Into<std::path::PathBuf>, reuse_first_source: bool) -> Self {
        SessionRegistry {
            subsessions: RefCell::new(HashMap::new()),
            media_root: media_root.into(),
            reuse_first_source,
        }
    }

    /// Mirrors `DynamicRTSPServer::lookupServerMediaSession`'s four-way
    /// branch on (file exists, subsession already cached):
    ///
    /// - neither: not found.
    /// - cached but file gone: evict, not found.
    /// - file exists, not cached: create and cache it via the extension table.
    /// - both: return the cached one.
    pub fn resolve_or_create(&self, stream_name: &str) -> Result<Rc<RefCell<OnDemandSubsession>>> {
        let full_path = self.media_root.join(stream_name.trim_start_matches('/'));
        let file_exists = full_path.is_file();
        let cached = self.subsessions.borrow().get(stream_name).cloned();

        match (file_exists, cached) {
            (false, Some(_)) => {
                self.subsessions.borrow_mut().remove(stream_name);
                Err(RtspError::StreamNotFound(stream_name.to_string()))
            }
            (false, None) => Err(RtspError::StreamNotFound(stream_name.to_string())),
            (true, Some(existing)) => Ok(existing),
            (true, None) => {
                let extension = Path::new(stream_name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .ok_or_else(|| RtspError::StreamNotFound(stream_name.to_string()))?;
                let entry = extensions::lookup(extension)
                    .ok_or_else(|| RtspError::StreamNotFound(stream_name.to_string()))?;
                let subsession = Rc::new(RefCell::new(OnDemandSubsession::new(
                    full_path,
                    entry,
                    self.reuse_first_source,
                )));
                self.subsessions
                    .borrow_mut()
                    .insert(stream_name.to_string(), subsession.clone());
                tracing::info!(stream_name, extension, "subsession created");
                Ok(subsession)
            }
        }
    }

    pub fn get(&self, stream_name: &str) -> Option<Rc<RefCell<OnDemandSubsession>>> {
        self.subsessions.borrow().get(stream_name).cloned()
    }

    /// Pulls and delivers one round of frames for every subsession with a
    /// currently-playing client, called once per poll tick by the owning
    /// thread (see `registry::bridge`).
    pub fn tick(&self, udp: &crate::transport::udp::UdpTransport) {
        for sub in self.subsessions.borrow().values() {
            sub.borrow_mut().tick(udp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_media_file(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("rtsp_rs_registry_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&[0u8; 64]).unwrap();
        path
    }

    #[test]
    fn unknown_stream_not_found() {
        let dir = std::env::temp_dir().join("rtsp_rs_registry_tests_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let registry = SessionRegistry::new(dir, false);
        assert!(registry.resolve_or_create("missing.264").is_err());
    }

    #[test]
    fn existing_file_creates_and_caches_subsession() {
        make_media_file("clip_a.264");
        let dir = std::env::temp_dir().join("rtsp_rs_registry_tests");
        let registry = SessionRegistry::new(dir, false);
        let first = registry.resolve_or_create("clip_a.264").unwrap();
        let second = registry.resolve_or_create("clip_a.264").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn evicts_cached_subsession_once_file_is_removed() {
        let path = make_media_file("clip_b.264");
        let dir = std::env::temp_dir().join("rtsp_rs_registry_tests");
        let registry = SessionRegistry::new(dir, false);
        registry.resolve_or_create("clip_b.264").unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(registry.resolve_or_create("clip_b.264").is_err());
        assert!(registry.get("clip_b.264").is_none());
    }

    #[test]
    fn unsupported_extension_not_found() {
        make_media_file("clip_c.xyz");
        let dir = std::env::temp_dir().join("rtsp_rs_registry_tests");
        let registry = SessionRegistry::new(dir, false);
        assert!(registry.resolve_or_create("clip_c.xyz").is_err());
    }
}
