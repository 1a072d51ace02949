use crate::helpers::{error::ReaderError, types::Bytes};

/// Frame dimensions agreed out of band with the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    height: usize,
    width: usize,
}

impl Geometry {
    pub fn new(height: usize, width: usize) -> Result<Self, ReaderError> {
        let valid = height > 0 && width > 0 && height.checked_mul(width).is_some();
        if !valid {
            return Err(ReaderError::InvalidGeometry { height, width });
        }

        Ok(Geometry { height, width })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Bytes in one frame, one per sample.
    pub fn frame_len(&self) -> usize {
        self.height * self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub min: u8,
    pub max: u8,
    pub mean: f64,
}

/// One 8-bit grayscale raster, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    geometry: Geometry,
    data: Bytes,
}

impl Frame {
    /// Reshapes a flat buffer into a frame. Any length other than
    /// `geometry.frame_len()` is rejected.
    pub fn from_bytes(geometry: Geometry, data: Bytes) -> Result<Self, ReaderError> {
        if data.len() != geometry.frame_len() {
            return Err(ReaderError::Decode {
                expected: geometry.frame_len(),
                actual: data.len(),
            });
        }

        Ok(Frame { geometry, data })
    }

    pub fn height(&self) -> usize {
        self.geometry.height
    }

    pub fn width(&self) -> usize {
        self.geometry.width
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row >= self.geometry.height || col >= self.geometry.width {
            return None;
        }
        Some(self.data[row * self.geometry.width + col])
    }

    pub fn row(&self, row: usize) -> Option<&[u8]> {
        if row >= self.geometry.height {
            return None;
        }
        let start = row * self.geometry.width;
        Some(&self.data[start..start + self.geometry.width])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        (0..self.geometry.height).filter_map(move |r| self.row(r))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn stats(&self) -> FrameStats {
        let mut min = u8::MAX;
        let mut max = u8::MIN;
        let mut sum: u64 = 0;

        for &sample in self.rows().flatten() {
            min = min.min(sample);
            max = max.max(sample);
            sum += sample as u64;
        }

        FrameStats {
            min,
            max,
            mean: sum as f64 / self.data.len() as f64,
        }
    }
}
