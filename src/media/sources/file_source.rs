//! Minimal file-backed [`FrameSource`].
//!
//! Not a demultiplexer: it reads the file in fixed-size chunks and calls
//! each chunk a "frame". Real containerized formats (`.mpg`, `.ts`,
//! `.mkv`, ...) would need an actual demux, which is out of scope (see
//! spec Non-goals); this exists so the on-demand session lifecycle and the
//! packetizer can be exercised end to end against a real file on disk.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::media::source::{FrameInfo, FrameSource};

pub struct ElementaryStreamFileSource {
    file: File,
    chunk_size: usize,
    frame_duration: Duration,
    presentation_time: Duration,
}

impl ElementaryStreamFileSource {
    pub fn open(path: &Path, chunk_size: usize, frame_duration: Duration) -> Result<Self> {
        Ok(ElementaryStreamFileSource {
            file: File::open(path)?,
            chunk_size,
            frame_duration,
            presentation_time: Duration::ZERO,
        })
    }
}

impl FrameSource for ElementaryStreamFileSource {
    fn request_frame(
        &mut self,
        buffer: &mut [u8],
        on_frame: &mut dyn FnMut(FrameInfo),
        on_closure: &mut dyn FnMut(),
    ) {
        let want = self.chunk_size.min(buffer.len());
        match self.file.read(&mut buffer[..want]) {
            Ok(0) => on_closure(),
            Ok(n) => {
                on_frame(FrameInfo {
                    size: n,
                    num_truncated_bytes: 0,
                    presentation_time: self.presentation_time,
                    duration: self.frame_duration,
                });
                self.presentation_time += self.frame_duration;
            }
            Err(_) => on_closure(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_chunks_until_exhausted() {
        let mut path = std::env::temp_dir();
        path.push(format!("rtsp_rs_test_{:p}.bin", &path));
        {
            let mut f = File::create(&path).unwrap();
            f.write_all(&[1u8; 10]).unwrap();
        }
        let mut source = ElementaryStreamFileSource::open(&path, 4, Duration::from_millis(40)).unwrap();
        let mut buf = [0u8; 16];
        let mut frames = Vec::new();
        let mut closed = false;
        for _ in 0..4 {
            source.request_frame(
                &mut buf,
                &mut |info| frames.push(info.size),
                &mut || closed = true,
            );
        }
        assert_eq!(frames, vec![4, 4, 2]);
        assert!(closed);
        std::fs::remove_file(&path).ok();
    }
}
