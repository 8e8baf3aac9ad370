//! # Raster Height Sources
//!
//! Everything that produces height samples for a tile.
//!
//! ## Components
//! - `HeightSource`: The read capability the tiler depends on
//! - `HeightBuffer`: An owned `width × height` block of samples, row 0 north
//! - `RasterDataset`: A georeferenced in-memory elevation model that can be
//!   loaded from a grayscale PNG or generated from Perlin noise
//! - `RasterHeightCache`: Bounded LRU of buffers shared by all tile builds
//!
//! ## Ownership
//! A freshly read `HeightBuffer` is owned by the tile build that read it. When
//! it is pushed into the cache, ownership moves to the cache, and later
//! lookups hand out shared `Arc<HeightBuffer>` handles.

pub mod cache;
pub mod dataset;

pub use cache::{HeightHandle, RasterHeightCache};
pub use dataset::RasterDataset;

use crate::tiling::{GeographicBounds, TileCoordinate};
use thiserror::Error;

/// Errors raised while reading height samples.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("raster I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("raster could not be decoded: {0}")]
    Image(#[from] image::ImageError),
    #[error("raster of {width}x{height} cannot hold {samples} samples")]
    Dimensions {
        width: u32,
        height: u32,
        samples: usize,
    },
    #[error("raster source unavailable: {0}")]
    Unavailable(String),
}

/// Row-major block of height samples. Row 0 is the northern edge.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightBuffer {
    width: u32,
    height: u32,
    heights: Vec<f32>,
}

impl HeightBuffer {
    /// Wraps `heights`, checking that it holds exactly `width × height` samples.
    pub fn new(width: u32, height: u32, heights: Vec<f32>) -> Result<Self, RasterError> {
        if heights.len() != width as usize * height as usize {
            return Err(RasterError::Dimensions {
                width,
                height,
                samples: heights.len(),
            });
        }
        Ok(Self {
            width,
            height,
            heights,
        })
    }

    /// Builds a buffer by evaluating `sample(column, row)` for every position.
    pub fn from_fn(width: u32, height: u32, mut sample: impl FnMut(u32, u32) -> f32) -> Self {
        let mut heights = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            for column in 0..width {
                heights.push(sample(column, row));
            }
        }
        Self {
            width,
            height,
            heights,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn get(&self, column: u32, row: u32) -> Option<f32> {
        if column >= self.width || row >= self.height {
            return None;
        }
        self.heights
            .get(row as usize * self.width as usize + column as usize)
            .copied()
    }
}

/// Reads height samples for a tile.
///
/// Implementations sample `width × height` evenly spaced positions covering
/// `bounds`, the first column on `min_x` and the last on `max_x`, the first
/// row on `max_y` and the last on `min_y`. `coordinate` identifies the tile
/// being read and is used for error reporting and by sources that are
/// organised per tile.
pub trait HeightSource: Send + Sync {
    fn read_heights(
        &self,
        coordinate: &TileCoordinate,
        bounds: &GeographicBounds,
        width: u32,
        height: u32,
    ) -> Result<HeightBuffer, RasterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_rejects_wrong_sample_count() {
        let err = HeightBuffer::new(3, 3, vec![0.0; 8]).unwrap_err();
        assert!(matches!(
            err,
            RasterError::Dimensions {
                width: 3,
                height: 3,
                samples: 8
            }
        ));
    }

    #[test]
    fn from_fn_is_row_major() {
        let buffer = HeightBuffer::from_fn(3, 2, |x, y| (y * 10 + x) as f32);
        assert_eq!(buffer.heights(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(buffer.get(2, 1), Some(12.0));
        assert_eq!(buffer.get(3, 0), None);
    }
}
