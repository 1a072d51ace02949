use super::DisplaySink;
use crate::frame::Frame;
use crate::helpers::types::Res;

/// Headless sink: reports each frame instead of drawing it.
#[derive(Default)]
pub struct LogSink {
    frames_seen: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySink for LogSink {
    fn display(&mut self, frame: &Frame) -> Res<()> {
        let stats = frame.stats();
        let center = frame
            .get(frame.height() / 2, frame.width() / 2)
            .unwrap_or_default();
        log::info!(
            "frame {}: {}x{} min={} max={} mean={:.1} center={}",
            self.frames_seen,
            frame.width(),
            frame.height(),
            stats.min,
            stats.max,
            stats.mean,
            center
        );
        self.frames_seen += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Geometry;

    #[test]
    fn counts_displayed_frames() {
        let geometry = Geometry::new(2, 2).unwrap();
        let frame = Frame::from_bytes(geometry, vec![0, 64, 128, 255]).unwrap();
        let mut sink = LogSink::new();

        sink.display(&frame).unwrap();
        sink.display(&frame).unwrap();

        assert_eq!(sink.frames_seen, 2);
    }
}
