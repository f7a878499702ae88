//! RTSP URI to on-demand stream name resolution.
//!
//! The teacher's original `Mount`/`MountRegistry` pre-registered a fixed
//! packetizer per path; this crate's session lifecycle is on-demand
//! (spec §4.6/§6: [`crate::registry::SessionRegistry`] looks a stream up,
//! or creates it, from the file extension named in the URI itself), so
//! there's no per-path configuration left to hold — only the URI parsing
//! this module keeps.

/// Extract the stream name from an RTSP URI, stripping any trailing track
/// suffix, for use as a [`crate::registry::SessionRegistry`] lookup key.
///
/// `rtsp://host:8554/clip.264/track1` -> `clip.264`
/// `rtsp://host:8554/clip.264`        -> `clip.264`
/// `rtsp://host:8554/`                -> ``
/// `*`                                 -> ``
pub fn extract_stream_name(uri: &str) -> &str {
    let path = if let Some(after) = uri
        .strip_prefix("rtsp://")
        .or_else(|| uri.strip_prefix("rtsps://"))
    {
        match after.find('/') {
            Some(slash) => &after[slash + 1..],
            None => "",
        }
    } else {
        uri.strip_prefix('/').unwrap_or_default()
    };

    match path.find("/track") {
        Some(pos) => &path[..pos],
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_stream_name_full_uri() {
        assert_eq!(
            extract_stream_name("rtsp://localhost:8554/clip.264"),
            "clip.264"
        );
    }

    #[test]
    fn extract_stream_name_with_track() {
        assert_eq!(
            extract_stream_name("rtsp://localhost:8554/clip.264/track1"),
            "clip.264"
        );
    }

    #[test]
    fn extract_stream_name_no_path() {
        assert_eq!(extract_stream_name("rtsp://localhost:8554"), "");
    }

    #[test]
    fn extract_stream_name_star() {
        assert_eq!(extract_stream_name("*"), "");
    }

    #[test]
    fn extract_stream_name_bare_path() {
        assert_eq!(extract_stream_name("/camera1.aac"), "camera1.aac");
    }
}
