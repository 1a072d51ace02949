use base64::{engine::general_purpose, Engine as _};
use std::io::{self, ErrorKind, Stdout, Write};
use std::mem;

use super::DisplaySink;
use crate::frame::{Frame, Geometry};
use crate::helpers::types::{Bytes, Res};
use crate::screen_guard::{ScreenGuard, RESET_CURSOR};

// Terminals reject escape payloads longer than this
const CHUNK_LEN: usize = 4096;
const IMAGE_ID: u32 = 1;

const PREFIX: &[u8] = b"\x1b_G";
const SUFFIX: &[u8] = b"\x1b\\";
const DELETE_IMAGES: &[u8] = b"\x1b_Ga=d,d=A,q=2\x1b\\";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub width_px: u16,
    pub height_px: u16,
    pub cols: u16,
    pub rows: u16,
}

impl Default for TerminalSize {
    fn default() -> Self {
        TerminalSize {
            width_px: 1280,
            height_px: 720,
            cols: 80,
            rows: 24,
        }
    }
}

impl TerminalSize {
    pub fn query() -> io::Result<Self> {
        let mut winsize: libc::winsize = unsafe { mem::zeroed() };

        let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut winsize) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        let size = TerminalSize {
            width_px: winsize.ws_xpixel,
            height_px: winsize.ws_ypixel,
            cols: winsize.ws_col,
            rows: winsize.ws_row,
        };
        if size.width_px == 0 || size.height_px == 0 || size.cols == 0 || size.rows == 0 {
            return Err(io::Error::new(
                ErrorKind::Other,
                "terminal did not report its pixel size",
            ));
        }

        Ok(size)
    }

    /// Returns pixel dimensions per cell (width, height).
    fn cell_pixel_dimensions(&self) -> (f64, f64) {
        (
            self.width_px as f64 / self.cols as f64,
            self.height_px as f64 / self.rows as f64,
        )
    }

    /// Largest (columns, rows) placement that keeps the frame's aspect ratio.
    pub fn fit(&self, geometry: Geometry) -> (u16, u16) {
        let (cell_width_px, cell_height_px) = self.cell_pixel_dimensions();
        let aspect = geometry.width() as f64 / geometry.height() as f64;

        let target_height_px = self.rows as f64 * cell_height_px;
        let target_width_px = target_height_px * aspect;
        let target_cols = (target_width_px / cell_width_px).round() as u16;

        if target_cols > self.cols {
            let constrained_width_px = self.cols as f64 * cell_width_px;
            let constrained_height_px = constrained_width_px / aspect;
            let constrained_rows = (constrained_height_px / cell_height_px).round() as u16;
            return (self.cols, constrained_rows.clamp(1, self.rows));
        }

        (target_cols.max(1), self.rows)
    }
}

/// Turns frames into kitty graphics protocol escapes, one transmit-and-place
/// per frame, always under the same image id so each frame replaces the last.
pub struct KittyEncoder {
    control_data: Bytes,
}

impl KittyEncoder {
    pub fn new(geometry: Geometry, terminal: TerminalSize) -> Self {
        let (cols, rows) = terminal.fit(geometry);

        let control_data = encode_control_data(&[
            ("a", "T".into()),
            ("f", "24".into()),
            ("s", geometry.width().to_string()),
            ("v", geometry.height().to_string()),
            ("c", cols.to_string()),
            ("r", rows.to_string()),
            ("i", IMAGE_ID.to_string()),
            ("C", "1".into()),
            ("q", "2".into()),
        ]);

        KittyEncoder { control_data }
    }

    pub fn encode_frame(&self, frame: &Frame) -> Bytes {
        let payload = general_purpose::STANDARD.encode(gray_to_rgb(frame.as_bytes()));
        let chunks: Vec<&[u8]> = payload.as_bytes().chunks(CHUNK_LEN).collect();

        let mut buffer = Vec::with_capacity(payload.len() + self.control_data.len() + chunks.len() * 16);
        for (i, chunk) in chunks.iter().enumerate() {
            let more = if i + 1 < chunks.len() { 1 } else { 0 };

            buffer.extend_from_slice(PREFIX);
            if i == 0 {
                buffer.extend_from_slice(&self.control_data);
                buffer.push(b',');
            }
            buffer.extend_from_slice(format!("m={}", more).as_bytes());
            buffer.push(b';');
            buffer.extend_from_slice(chunk);
            buffer.extend_from_slice(SUFFIX);
        }

        buffer
    }
}

fn encode_control_data(control_data: &[(&str, String)]) -> Bytes {
    control_data
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",")
        .into_bytes()
}

fn gray_to_rgb(gray: &[u8]) -> Bytes {
    gray.iter().flat_map(|&g| [g, g, g]).collect()
}

pub struct KittySink<W: Write> {
    out: W,
    encoder: KittyEncoder,
    _screen: Option<ScreenGuard<Stdout>>,
}

impl<W: Write> KittySink<W> {
    pub fn new(out: W, geometry: Geometry, terminal: TerminalSize) -> Self {
        KittySink {
            out,
            encoder: KittyEncoder::new(geometry, terminal),
            _screen: None,
        }
    }
}

impl KittySink<Stdout> {
    /// Draws on an alternate screen of the controlling terminal.
    pub fn terminal(geometry: Geometry) -> Res<Self> {
        let terminal = TerminalSize::query().unwrap_or_else(|e| {
            log::warn!("could not read terminal size ({}), assuming defaults", e);
            TerminalSize::default()
        });
        log::debug!("terminal size {:?}", terminal);

        let screen = ScreenGuard::new(io::stdout())?;

        let mut sink = Self::new(io::stdout(), geometry, terminal);
        sink._screen = Some(screen);
        Ok(sink)
    }
}

impl<W: Write> DisplaySink for KittySink<W> {
    fn display(&mut self, frame: &Frame) -> Res<()> {
        let encoded = self.encoder.encode_frame(frame);

        self.out.write_all(RESET_CURSOR)?;
        self.out.write_all(&encoded)?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> Drop for KittySink<W> {
    fn drop(&mut self) {
        let _ = self.out.write_all(DELETE_IMAGES);
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_escapes(encoded: &[u8]) -> Vec<(String, Bytes)> {
        let text = String::from_utf8(encoded.to_vec()).unwrap();
        text.split("\x1b\\")
            .filter(|part| !part.is_empty())
            .map(|part| {
                let body = part.strip_prefix("\x1b_G").unwrap();
                let (control, payload) = body.split_once(';').unwrap();
                (control.to_string(), payload.as_bytes().to_vec())
            })
            .collect()
    }

    #[test]
    fn fits_frame_to_terminal_height() {
        let terminal = TerminalSize::default();
        let geometry = Geometry::new(1024, 1280).unwrap();

        assert_eq!(terminal.fit(geometry), (56, 24));
    }

    #[test]
    fn wide_frame_is_constrained_by_columns() {
        let terminal = TerminalSize::default();
        let geometry = Geometry::new(100, 1000).unwrap();

        assert_eq!(terminal.fit(geometry), (80, 4));
    }

    #[test]
    fn control_data_is_comma_separated() {
        let encoded = encode_control_data(&[("f", "24".into()), ("s", "640".into())]);
        assert_eq!(String::from_utf8(encoded).unwrap(), "f=24,s=640");
    }

    #[test]
    fn large_frame_is_sent_in_chunks() {
        let geometry = Geometry::new(64, 64).unwrap();
        let samples: Bytes = (0..4096).map(|i| (i % 256) as u8).collect();
        let frame = Frame::from_bytes(geometry, samples.clone()).unwrap();
        let encoder = KittyEncoder::new(geometry, TerminalSize::default());

        let escapes = split_escapes(&encoder.encode_frame(&frame));

        assert_eq!(escapes.len(), 4);
        let first = &escapes[0].0;
        for key in ["a=T", "f=24", "s=64", "v=64", "i=1", "q=2"] {
            assert!(first.contains(key), "missing {key} in {first}");
        }
        assert!(first.ends_with("m=1"));
        assert_eq!(escapes[1].0, "m=1");
        assert_eq!(escapes[2].0, "m=1");
        assert_eq!(escapes[3].0, "m=0");

        let mut payload = Vec::new();
        for (_, chunk) in &escapes {
            assert!(chunk.len() <= CHUNK_LEN);
            payload.extend_from_slice(chunk);
        }
        let rgb = general_purpose::STANDARD.decode(payload).unwrap();
        assert_eq!(rgb, gray_to_rgb(&samples));
    }

    #[test]
    fn small_frame_is_a_single_escape() {
        let geometry = Geometry::new(2, 2).unwrap();
        let frame = Frame::from_bytes(geometry, vec![10, 20, 30, 40]).unwrap();
        let encoder = KittyEncoder::new(geometry, TerminalSize::default());

        let escapes = split_escapes(&encoder.encode_frame(&frame));

        assert_eq!(escapes.len(), 1);
        assert!(escapes[0].0.ends_with("m=0"));
    }

    #[test]
    fn sink_homes_the_cursor_and_cleans_up() {
        let geometry = Geometry::new(2, 2).unwrap();
        let frame = Frame::from_bytes(geometry, vec![0; 4]).unwrap();
        let mut out = Vec::new();

        {
            let mut sink = KittySink::new(&mut out, geometry, TerminalSize::default());
            sink.display(&frame).unwrap();
        }

        assert!(out.starts_with(RESET_CURSOR));
        assert!(out.ends_with(DELETE_IMAGES));
    }
}
