use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::frame::{Frame, Geometry};
use crate::helpers::{error::ReaderError, types::Bytes};

// How often a blocked wait wakes up to check the cancel flag
pub const POLL_INTERVAL: Duration = Duration::from_millis(16);
// Chunks the pump may queue before it blocks and the pipe backs up
const READ_AHEAD_CHUNKS: usize = 2;

enum Chunk {
    Data(Bytes),
    End,
    Failed(std::io::Error),
}

/// Cuts an unframed byte stream into frames of a fixed geometry.
///
/// The stream is drained on a dedicated thread so that waiting for a frame
/// can be bounded by a timeout and interrupted by a cancel flag. Bytes left
/// over from one frame, or buffered when a wait times out, carry into the
/// next call, so the reader never loses alignment on a live stream.
pub struct FrameReader {
    geometry: Geometry,
    chunks_rx: mpsc::Receiver<Chunk>,
    pending: Bytes,
    ended: bool,
    read_timeout: Option<Duration>,
    cancel_flag: Option<Arc<AtomicBool>>,
    _reader_thread: JoinHandle<()>,
}

impl FrameReader {
    pub fn new<R>(stream: R, geometry: Geometry) -> Result<Self, ReaderError>
    where
        R: Read + Send + 'static,
    {
        let (chunks_tx, chunks_rx) = mpsc::sync_channel(READ_AHEAD_CHUNKS);
        let read_len = geometry.frame_len();

        let reader_thread = thread::Builder::new()
            .name("frame-reader".into())
            .spawn(move || pump(stream, read_len, chunks_tx))?;

        Ok(FrameReader {
            geometry,
            chunks_rx,
            pending: Vec::with_capacity(read_len),
            ended: false,
            read_timeout: None,
            cancel_flag: None,
            _reader_thread: reader_thread,
        })
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel_flag = Some(flag);
    }

    pub fn next_frame(&mut self) -> Result<Frame, ReaderError> {
        let frame_len = self.geometry.frame_len();
        let started = Instant::now();

        while self.pending.len() < frame_len && !self.ended {
            if self.is_cancelled() {
                return Err(ReaderError::Cancelled);
            }

            let wait = match self.read_timeout {
                Some(timeout) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(ReaderError::Timeout {
                            waited,
                            buffered: self.pending.len(),
                        });
                    }
                    (timeout - waited).min(POLL_INTERVAL)
                }
                None => POLL_INTERVAL,
            };

            match self.chunks_rx.recv_timeout(wait) {
                Ok(Chunk::Data(bytes)) => self.pending.extend_from_slice(&bytes),
                Ok(Chunk::End) | Err(mpsc::RecvTimeoutError::Disconnected) => self.ended = true,
                Ok(Chunk::Failed(e)) => {
                    self.ended = true;
                    return Err(e.into());
                }
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
            }
        }

        if self.pending.len() >= frame_len {
            let rest = self.pending.split_off(frame_len);
            let data = std::mem::replace(&mut self.pending, rest);
            return Frame::from_bytes(self.geometry, data);
        }

        if self.pending.is_empty() {
            return Err(ReaderError::StreamEnd);
        }

        // The producer closed mid-frame: surface the short read once, then
        // report the end of the stream on the following call.
        let partial = std::mem::take(&mut self.pending);
        Frame::from_bytes(self.geometry, partial)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

fn pump<R: Read>(mut stream: R, read_len: usize, chunks_tx: mpsc::SyncSender<Chunk>) {
    let mut read_buffer = vec![0u8; read_len];

    loop {
        let chunk = match stream.read(&mut read_buffer) {
            Ok(0) => Chunk::End,
            Ok(bytes_read) => Chunk::Data(read_buffer[..bytes_read].to_vec()),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => Chunk::Failed(e),
        };

        let last = !matches!(chunk, Chunk::Data(_));
        if chunks_tx.send(chunk).is_err() || last {
            return;
        }
    }
}
