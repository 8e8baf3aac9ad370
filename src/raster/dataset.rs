//! # Raster Dataset
//!
//! A georeferenced digital elevation model held in memory.
//!
//! Samples are pixel-is-area: pixel `(i, j)` covers
//! `[min_x + i·px, min_x + (i+1)·px] × [max_y − (j+1)·py, max_y − j·py]`
//! and its value applies at the pixel centre. Reads interpolate bilinearly
//! between pixel centres and clamp at the raster edge. Positions outside the
//! dataset bounds, and nodata pixels, read as sea level (`0.0`).

use super::{HeightBuffer, HeightSource, RasterError};
use crate::tiling::{GeographicBounds, GridTransform, TileCoordinate};
use log::info;
use noise::{NoiseFn, Perlin};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct RasterDataset {
    bounds: GeographicBounds,
    width: u32,
    height: u32,
    samples: Vec<f32>,
    nodata: Option<f32>,
}

impl RasterDataset {
    /// Creates a dataset from row-major samples, row 0 north.
    pub fn from_samples(
        bounds: GeographicBounds,
        width: u32,
        height: u32,
        samples: Vec<f32>,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 || samples.len() != width as usize * height as usize {
            return Err(RasterError::Dimensions {
                width,
                height,
                samples: samples.len(),
            });
        }
        Ok(Self {
            bounds,
            width,
            height,
            samples,
            nodata: None,
        })
    }

    /// Loads a grayscale PNG heightmap.
    ///
    /// 8-bit images are widened to 16 bits (`v · 257`) before scaling, so
    /// `scale` and `offset` always apply to the 16-bit value:
    /// `height = value · scale + offset`.
    ///
    /// # Arguments
    /// * `path` - Path of the PNG file
    /// * `bounds` - Geographic extent covered by the image
    /// * `scale` - Metres per 16-bit grey level
    /// * `offset` - Height of grey level 0
    pub fn from_png(
        path: impl AsRef<Path>,
        bounds: GeographicBounds,
        scale: f32,
        offset: f32,
    ) -> Result<Self, RasterError> {
        let path = path.as_ref();
        let image = image::open(path)?.into_luma16();
        let (width, height) = image.dimensions();
        let samples = image
            .pixels()
            .map(|pixel| pixel.0[0] as f32 * scale + offset)
            .collect();
        info!(
            "Loaded {}x{} heightmap from {}",
            width,
            height,
            path.display()
        );
        Self::from_samples(bounds, width, height, samples)
    }

    /// Generates a synthetic terrain from Perlin noise.
    ///
    /// The noise is evaluated in geographic coordinates, so the same seed and
    /// frequency produce the same terrain regardless of raster resolution.
    ///
    /// # Arguments
    /// * `bounds` - Geographic extent of the dataset
    /// * `width`, `height` - Raster size in pixels
    /// * `seed` - Perlin permutation seed
    /// * `amplitude` - Peak height in metres
    /// * `frequency` - Noise cycles per geographic unit
    pub fn perlin(
        bounds: GeographicBounds,
        width: u32,
        height: u32,
        seed: u32,
        amplitude: f64,
        frequency: f64,
    ) -> Result<Self, RasterError> {
        let perlin = Perlin::new(seed);
        let pixel_x = bounds.width() / width.max(1) as f64;
        let pixel_y = bounds.height() / height.max(1) as f64;
        let mut samples = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            let y = bounds.max_y - (row as f64 + 0.5) * pixel_y;
            for column in 0..width {
                let x = bounds.min_x + (column as f64 + 0.5) * pixel_x;
                let value = perlin.get([x * frequency, y * frequency, 0.0]);
                samples.push((value * amplitude) as f32);
            }
        }
        Self::from_samples(bounds, width, height, samples)
    }

    /// Marks `nodata` as the value of missing pixels.
    pub fn with_nodata(mut self, nodata: f32) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn bounds(&self) -> &GeographicBounds {
        &self.bounds
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Height at a geographic position, interpolated bilinearly.
    pub fn sample(&self, x: f64, y: f64) -> f32 {
        if !self.bounds.contains_point(x, y) {
            return 0.0;
        }
        let pixel_x = self.bounds.width() / self.width as f64;
        let pixel_y = self.bounds.height() / self.height as f64;
        let fx = ((x - self.bounds.min_x) / pixel_x - 0.5).clamp(0.0, (self.width - 1) as f64);
        let fy = ((self.bounds.max_y - y) / pixel_y - 0.5).clamp(0.0, (self.height - 1) as f64);

        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = fx - x0 as f64;
        let ty = fy - y0 as f64;

        let top = self.pixel(x0, y0) * (1.0 - tx) + self.pixel(x1, y0) * tx;
        let bottom = self.pixel(x0, y1) * (1.0 - tx) + self.pixel(x1, y1) * tx;
        (top * (1.0 - ty) + bottom * ty) as f32
    }

    fn pixel(&self, column: u32, row: u32) -> f64 {
        let value = self.samples[row as usize * self.width as usize + column as usize];
        match self.nodata {
            Some(nodata) if value == nodata => 0.0,
            _ if value.is_nan() => 0.0,
            _ => value as f64,
        }
    }
}

impl HeightSource for RasterDataset {
    fn read_heights(
        &self,
        _coordinate: &TileCoordinate,
        bounds: &GeographicBounds,
        width: u32,
        height: u32,
    ) -> Result<HeightBuffer, RasterError> {
        let transform = GridTransform::new(*bounds, width, height);
        Ok(HeightBuffer::from_fn(width, height, |column, row| {
            let (x, y) = transform.to_geographic(column, row);
            self.sample(x, y)
        }))
    }
}
