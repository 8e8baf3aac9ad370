//! # Configuration
//!
//! JSON configuration for the tiler and the build pipeline. Every field has a
//! default, so a config file only needs the values it changes:
//!
//! ```json
//! {
//!     "profile": "geodetic",
//!     "min_zoom": 6,
//!     "workers": 8,
//!     "report_path": "build-report.json",
//!     "dataset": {
//!         "kind": "png",
//!         "path": "alps.png",
//!         "bounds": { "min_x": 6.0, "min_y": 45.0, "max_x": 11.0, "max_y": 48.0 },
//!         "scale": 0.1,
//!         "offset": -500.0
//!     },
//!     "tiler": { "tile_size": 65, "max_zoom": 12, "mesh_quality_factor": 0.5 }
//! }
//! ```

use crate::heightfield;
use crate::tiling::{GeographicBounds, Profile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings of a `MeshTiler`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshTilerConfig {
    /// Samples along a tile edge, `2^k + 1`.
    pub tile_size: u32,
    /// Multiplier on the default terrain quality; smaller is finer.
    pub mesh_quality_factor: f64,
    /// Tiles above this zoom are made consistent with their neighbours.
    pub neighbor_propagation_zoom: u8,
    /// Keep every sample of tiles at or below `neighbor_propagation_zoom`.
    pub smooth_small_zooms: bool,
    /// Deepest zoom level; tiles at this level get no child flags.
    pub max_zoom: u8,
    /// Number of tile height buffers kept in the shared cache.
    pub cache_capacity: usize,
}

impl Default for MeshTilerConfig {
    fn default() -> Self {
        Self {
            tile_size: 65,
            mesh_quality_factor: 1.0,
            neighbor_propagation_zoom: 6,
            smooth_small_zooms: true,
            max_zoom: 12,
            cache_capacity: 64,
        }
    }
}

impl MeshTilerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        heightfield::validate_size(self.tile_size as usize)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if !(self.mesh_quality_factor.is_finite() && self.mesh_quality_factor > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "mesh_quality_factor must be positive, got {}",
                self.mesh_quality_factor
            )));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the elevation data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetConfig {
    /// Grayscale PNG heightmap; `height = value · scale + offset`.
    Png {
        path: PathBuf,
        bounds: GeographicBounds,
        #[serde(default = "default_png_scale")]
        scale: f32,
        #[serde(default)]
        offset: f32,
        #[serde(default)]
        nodata: Option<f32>,
    },
    /// Synthetic Perlin-noise terrain.
    Perlin {
        bounds: GeographicBounds,
        width: u32,
        height: u32,
        #[serde(default)]
        seed: u32,
        amplitude: f64,
        frequency: f64,
    },
}

fn default_png_scale() -> f32 {
    1.0
}

impl DatasetConfig {
    pub fn bounds(&self) -> &GeographicBounds {
        match self {
            DatasetConfig::Png { bounds, .. } => bounds,
            DatasetConfig::Perlin { bounds, .. } => bounds,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig::Perlin {
            bounds: GeographicBounds::new(6.0, 45.0, 11.0, 48.0),
            width: 1024,
            height: 512,
            seed: 0,
            amplitude: 2500.0,
            frequency: 1.5,
        }
    }
}

/// Settings of a full tile pyramid build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub profile: Profile,
    pub dataset: DatasetConfig,
    /// Zoom level of the first tiles built; deeper tiles follow from child flags.
    pub min_zoom: u8,
    /// Worker threads; 0 uses the available parallelism.
    pub workers: usize,
    /// Where to write the JSON build report, if anywhere.
    pub report_path: Option<PathBuf>,
    pub tiler: MeshTilerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Geodetic,
            dataset: DatasetConfig::default(),
            min_zoom: 5,
            workers: 0,
            report_path: None,
            tiler: MeshTilerConfig {
                max_zoom: 9,
                ..MeshTilerConfig::default()
            },
        }
    }
}

impl PipelineConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tiler.validate()?;
        if self.min_zoom > self.tiler.max_zoom {
            return Err(ConfigError::Invalid(format!(
                "min_zoom {} is deeper than max_zoom {}",
                self.min_zoom, self.tiler.max_zoom
            )));
        }
        let bounds = self.dataset.bounds();
        if !(bounds.width() > 0.0 && bounds.height() > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "dataset bounds {:?} are empty",
                bounds
            )));
        }
        Ok(())
    }

    /// Worker count with 0 resolved to the available parallelism.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}
