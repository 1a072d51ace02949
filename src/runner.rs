use std::thread;
use std::time::{Duration, Instant};

use crate::capture::reader::{FrameReader, POLL_INTERVAL};
use crate::display::DisplaySink;
use crate::helpers::{error::ReaderError, types::Res};

const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// How the stream loop treats short reads and timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive failures tolerated before giving up; 0 never gives up.
    pub max_failures: u32,
    /// Delay before the first retry, doubled for every further one.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_failures: u32, initial_backoff: Duration) -> Self {
        RetryPolicy {
            max_failures,
            initial_backoff,
        }
    }

    fn gives_up_after(&self, failures: u32) -> bool {
        self.max_failures != 0 && failures >= self.max_failures
    }

    fn backoff(&self, failures: u32) -> Duration {
        let doublings = failures.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1 << doublings)
            .min(MAX_BACKOFF.max(self.initial_backoff))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    StreamEnd,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub frames: u64,
    pub decode_errors: u64,
    pub timeouts: u64,
    pub stopped_by: StopReason,
}

/// Reads and displays frames until the producer closes its output or the
/// reader is cancelled.
pub fn run_stream(
    reader: &mut FrameReader,
    sink: &mut dyn DisplaySink,
    policy: &RetryPolicy,
) -> Res<StreamSummary> {
    let mut frames = 0;
    let mut decode_errors = 0;
    let mut timeouts = 0;
    let mut failures: u32 = 0;

    loop {
        let stopped_by = match reader.next_frame() {
            Ok(frame) => {
                sink.display(&frame)?;
                frames += 1;
                failures = 0;
                continue;
            }
            Err(ReaderError::StreamEnd) => StopReason::StreamEnd,
            Err(ReaderError::Cancelled) => StopReason::Cancelled,
            Err(e) if e.is_recoverable() => {
                if matches!(e, ReaderError::Timeout { .. }) {
                    timeouts += 1;
                } else {
                    decode_errors += 1;
                }
                failures = failures.saturating_add(1);
                log::warn!("bad read ({}): {}", failures, e);

                if policy.gives_up_after(failures) {
                    return Err(ReaderError::TooManyFailures { count: failures }.into());
                }

                if !backoff_unless_cancelled(reader, policy.backoff(failures)) {
                    continue;
                }
                StopReason::Cancelled
            }
            Err(e) => return Err(e.into()),
        };

        return Ok(StreamSummary {
            frames,
            decode_errors,
            timeouts,
            stopped_by,
        });
    }
}

/// Sleeps for `delay` in poll-sized steps. Returns true if the reader was
/// cancelled before or during the wait.
fn backoff_unless_cancelled(reader: &FrameReader, delay: Duration) -> bool {
    let deadline = Instant::now() + delay;

    loop {
        if reader.is_cancelled() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep((deadline - now).min(POLL_INTERVAL));
    }
}
