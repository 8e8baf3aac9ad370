//! # Tile Build Pipeline
//!
//! Builds a tile pyramid over a dataset on the worker pool.
//!
//! The pipeline seeds every tile of the starting zoom level that overlaps the
//! dataset, in row-major order. Each finished tile below the maximum zoom
//! schedules the children it flagged, so the pyramid grows top-down and only
//! where there is data. Failed tiles are recorded and do not stop the build;
//! their subtrees are not built.

use crate::config::{ConfigError, DatasetConfig, PipelineConfig};
use crate::error::MeshTilerError;
use crate::mesh::MeshTile;
use crate::raster::{HeightSource, RasterDataset, RasterError, RasterHeightCache};
use crate::task_management::task::{Task, TaskResult};
use crate::task_management::TaskManager;
use crate::tiler::MeshTiler;
use crate::tiling::{Grid, TileCoordinate};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use web_time::Instant;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot load dataset: {0}")]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Tiler(#[from] MeshTilerError),
    #[error("pipeline I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot serialise build report: {0}")]
    Report(#[from] serde_json::Error),
}

/// A tile that could not be built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileFailure {
    pub coordinate: TileCoordinate,
    pub error: String,
}

/// Summary of a pyramid build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub tiles_built: usize,
    /// Tiles whose mesh has no triangles.
    pub empty_tiles: usize,
    pub total_vertices: usize,
    pub total_triangles: usize,
    pub tiles_per_zoom: BTreeMap<u8, usize>,
    pub failed_tiles: Vec<TileFailure>,
    /// Tasks lost to a crashed worker.
    pub lost_tasks: usize,
    pub elapsed_seconds: f64,
}

impl BuildReport {
    pub fn record_tile(&mut self, tile: &MeshTile) {
        self.tiles_built += 1;
        if tile.mesh.is_empty() {
            self.empty_tiles += 1;
        }
        self.total_vertices += tile.mesh.vertex_count();
        self.total_triangles += tile.mesh.triangle_count();
        *self.tiles_per_zoom.entry(tile.coordinate.zoom).or_default() += 1;
    }

    pub fn record_failure(&mut self, coordinate: TileCoordinate, error: String) {
        self.failed_tiles.push(TileFailure { coordinate, error });
    }

    pub fn record_lost_tasks(&mut self, count: usize) {
        self.lost_tasks += count;
    }

    pub fn is_success(&self) -> bool {
        self.failed_tiles.is_empty() && self.lost_tasks == 0
    }

    /// Writes the report as pretty-printed JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Builds one tile on a worker.
pub struct TileBuildTask {
    tiler: Arc<MeshTiler>,
    source: Arc<dyn HeightSource>,
    coordinate: TileCoordinate,
}

impl TileBuildTask {
    pub fn new(
        tiler: Arc<MeshTiler>,
        source: Arc<dyn HeightSource>,
        coordinate: TileCoordinate,
    ) -> Self {
        Self {
            tiler,
            source,
            coordinate,
        }
    }
}

impl Task for TileBuildTask {
    fn process(&self) -> Box<dyn TaskResult + Send> {
        let started = Instant::now();
        let outcome = self.tiler.create_mesh(self.source.as_ref(), &self.coordinate);
        Box::new(TileBuildResult {
            tiler: self.tiler.clone(),
            source: self.source.clone(),
            coordinate: self.coordinate,
            outcome,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }
}

pub struct TileBuildResult {
    tiler: Arc<MeshTiler>,
    source: Arc<dyn HeightSource>,
    coordinate: TileCoordinate,
    outcome: Result<MeshTile, MeshTilerError>,
    elapsed_ms: f64,
}

impl TaskResult for TileBuildResult {
    fn handle_result(self: Box<Self>, report: &mut BuildReport) -> Vec<Box<dyn Task + Send>> {
        let tile = match self.outcome {
            Ok(tile) => tile,
            Err(err) => {
                warn!("Tile {} failed: {}", self.coordinate, err);
                report.record_failure(self.coordinate, err.to_string());
                return Vec::new();
            }
        };
        log::debug!(
            "Tile {} done in {:.1} ms ({} triangles)",
            self.coordinate,
            self.elapsed_ms,
            tile.mesh.triangle_count()
        );
        report.record_tile(&tile);

        if tile.coordinate.zoom >= self.tiler.max_zoom() {
            return Vec::new();
        }
        tile.children
            .child_coordinates(&tile.coordinate)
            .into_iter()
            .map(|child| {
                Box::new(TileBuildTask::new(
                    self.tiler.clone(),
                    self.source.clone(),
                    child,
                )) as Box<dyn Task + Send>
            })
            .collect()
    }
}

/// Drives a pyramid build.
pub struct TilePipeline {
    tiler: Arc<MeshTiler>,
    source: Arc<dyn HeightSource>,
    workers: usize,
}

impl TilePipeline {
    pub fn new(tiler: Arc<MeshTiler>, source: Arc<dyn HeightSource>, workers: usize) -> Self {
        Self {
            tiler,
            source,
            workers,
        }
    }

    pub fn tiler(&self) -> &MeshTiler {
        &self.tiler
    }

    /// Tiles of `zoom` overlapping the dataset, in row-major order.
    pub fn seed_tiles(&self, zoom: u8) -> Vec<TileCoordinate> {
        let grid = self.tiler.grid();
        let dataset = self.tiler.dataset_bounds();
        let Some((low, high)) = grid.tile_range(dataset, zoom) else {
            return Vec::new();
        };
        (low.y..=high.y)
            .flat_map(|y| (low.x..=high.x).map(move |x| TileCoordinate::new(zoom, x, y)))
            .filter(|coordinate| dataset.overlaps(&grid.tile_bounds(coordinate)))
            .collect()
    }

    /// Builds every tile from `min_zoom` down to the tiler's maximum zoom.
    pub fn build(&self, min_zoom: u8) -> Result<BuildReport, PipelineError> {
        let started = Instant::now();
        let mut report = BuildReport::default();
        let mut manager = TaskManager::new(self.workers)?;

        let seeds = self.seed_tiles(min_zoom);
        info!(
            "Building {} seed tile(s) at zoom {} down to zoom {}",
            seeds.len(),
            min_zoom,
            self.tiler.max_zoom()
        );
        for coordinate in seeds {
            manager.publish_task(Box::new(TileBuildTask::new(
                self.tiler.clone(),
                self.source.clone(),
                coordinate,
            )));
        }
        manager.run_until_idle(&mut report);
        manager.shutdown();

        report.elapsed_seconds = started.elapsed().as_secs_f64();
        info!(
            "Built {} tile(s), {} failed, {} triangles in {:.2}s",
            report.tiles_built,
            report.failed_tiles.len(),
            report.total_triangles,
            report.elapsed_seconds
        );
        Ok(report)
    }
}

/// Loads the dataset described by `config`.
pub fn load_dataset(config: &DatasetConfig) -> Result<RasterDataset, RasterError> {
    match config {
        DatasetConfig::Png {
            path,
            bounds,
            scale,
            offset,
            nodata,
        } => {
            let dataset = RasterDataset::from_png(path, *bounds, *scale, *offset)?;
            Ok(match nodata {
                Some(nodata) => dataset.with_nodata(*nodata),
                None => dataset,
            })
        }
        DatasetConfig::Perlin {
            bounds,
            width,
            height,
            seed,
            amplitude,
            frequency,
        } => RasterDataset::perlin(*bounds, *width, *height, *seed, *amplitude, *frequency),
    }
}

/// Runs a full build as described by `config` and writes the report if a
/// report path is configured.
pub fn run_pipeline(config: &PipelineConfig) -> Result<BuildReport, PipelineError> {
    config.validate()?;
    let dataset = load_dataset(&config.dataset)?;
    let grid = Grid::for_profile(config.profile, config.tiler.tile_size);
    let capacity = NonZeroUsize::new(config.tiler.cache_capacity).ok_or_else(|| {
        ConfigError::Invalid("cache_capacity must be at least 1".to_string())
    })?;
    let tiler = MeshTiler::new(
        grid,
        *dataset.bounds(),
        config.tiler.clone(),
        RasterHeightCache::new(capacity),
    )?;

    let pipeline = TilePipeline::new(Arc::new(tiler), Arc::new(dataset), config.worker_count());
    let report = pipeline.build(config.min_zoom)?;
    if let Some(path) = &config.report_path {
        report.write_json(path)?;
        info!("Wrote build report to {}", path.display());
    }
    Ok(report)
}
