//! # Mesh Tiler
//!
//! Builds the simplified terrain mesh of a single tile.
//!
//! ## Tile Build Steps
//! 1. Fetch the tile's height samples, from the shared cache when present
//! 2. Derive the geometric error budget for the tile's zoom
//! 3. Select the samples to keep (every sample at small zooms when
//!    `smooth_small_zooms` is on)
//! 4. Above the neighbour-propagation zoom, align the tile's edges with its
//!    four neighbours (see `border`)
//! 5. Triangulate and assemble the indexed mesh
//! 6. Flag the child tiles that overlap the dataset
//! 7. Hand a freshly read buffer over to the cache
//!
//! A tile is either built completely or not at all: any failure is returned
//! as a `MeshTilerError` and nothing is produced.
//!
//! ## Concurrency
//! `MeshTiler` is `Sync`; any number of tiles can be built concurrently from
//! a shared reference. The height cache is the only state shared between
//! builds.

pub mod border;
pub mod children;
pub mod error_model;

use crate::config::MeshTilerConfig;
use crate::error::MeshTilerError;
use crate::heightfield::{self, Heightfield};
use crate::mesh::{MeshAssembler, MeshTile};
use crate::raster::{HeightBuffer, HeightHandle, HeightSource, RasterError, RasterHeightCache};
use crate::tiling::grid::WGS84_SEMI_MAJOR_AXIS;
use crate::tiling::{BorderDirection, GeographicBounds, Grid, TileCoordinate};
use border::BorderResolver;
use error_model::{error_for_zoom, estimate_level_zero_error, HEIGHTMAP_TERRAIN_QUALITY};
use log::debug;

pub struct MeshTiler {
    grid: Grid,
    dataset_bounds: GeographicBounds,
    config: MeshTilerConfig,
    cache: RasterHeightCache,
}

impl MeshTiler {
    /// Creates a tiler for a dataset covering `dataset_bounds`.
    ///
    /// # Arguments
    /// * `grid` - Tiling scheme; its tile size must be `2^k + 1`
    /// * `dataset_bounds` - Extent of the elevation data
    /// * `config` - Tiler settings; `tile_size` is taken from `grid`
    /// * `cache` - Height cache shared with other tilers or builds
    ///
    /// # Returns
    /// `InvalidGeometry` when the grid's tile size or the error model is unusable
    pub fn new(
        grid: Grid,
        dataset_bounds: GeographicBounds,
        config: MeshTilerConfig,
        cache: RasterHeightCache,
    ) -> Result<Self, MeshTilerError> {
        heightfield::validate_size(grid.tile_size() as usize)?;
        let tiler = Self {
            grid,
            dataset_bounds,
            config,
            cache,
        };
        tiler.level_zero_error()?;
        Ok(tiler)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn dataset_bounds(&self) -> &GeographicBounds {
        &self.dataset_bounds
    }

    pub fn config(&self) -> &MeshTilerConfig {
        &self.config
    }

    pub fn cache(&self) -> &RasterHeightCache {
        &self.cache
    }

    pub fn max_zoom(&self) -> u8 {
        self.config.max_zoom
    }

    /// Geometric error budget of a level-0 tile, in metres.
    pub fn level_zero_error(&self) -> Result<f64, MeshTilerError> {
        estimate_level_zero_error(
            WGS84_SEMI_MAJOR_AXIS,
            HEIGHTMAP_TERRAIN_QUALITY * self.config.mesh_quality_factor,
            self.grid.tile_size(),
            self.grid.tiles_at_level_zero(),
        )
    }

    /// Geometric error budget at `zoom`, in metres.
    pub fn geometric_error(&self, zoom: u8) -> Result<f64, MeshTilerError> {
        Ok(error_for_zoom(self.level_zero_error()?, zoom))
    }

    /// Builds the mesh tile at `coordinate`, reading all heights from `source`.
    pub fn create_mesh(
        &self,
        source: &dyn HeightSource,
        coordinate: &TileCoordinate,
    ) -> Result<MeshTile, MeshTilerError> {
        self.create_mesh_with_reader(source, coordinate, source)
    }

    /// Builds the mesh tile at `coordinate`, reading the tile's own heights
    /// through `reader` and the neighbours' through `source`.
    pub fn create_mesh_with_reader(
        &self,
        source: &dyn HeightSource,
        coordinate: &TileCoordinate,
        reader: &dyn HeightSource,
    ) -> Result<MeshTile, MeshTilerError> {
        let heights = match self.cache.get(coordinate) {
            Some(buffer) => HeightHandle::Cached(buffer),
            None => HeightHandle::Fresh(self.read_heights(reader, coordinate, coordinate, None)?),
        };

        let tile = self.build_tile(source, coordinate, &heights)?;

        if let HeightHandle::Fresh(buffer) = heights {
            self.cache.push(*coordinate, buffer);
        }
        debug!(
            "Built tile {}: {} vertices, {} triangles",
            coordinate,
            tile.mesh.vertex_count(),
            tile.mesh.triangle_count()
        );
        Ok(tile)
    }

    fn build_tile(
        &self,
        source: &dyn HeightSource,
        coordinate: &TileCoordinate,
        heights: &HeightBuffer,
    ) -> Result<MeshTile, MeshTilerError> {
        let max_error = self.geometric_error(coordinate.zoom)?;
        let propagate = coordinate.zoom > self.config.neighbor_propagation_zoom;

        let mut heightfield = Heightfield::from_buffer(heights)?;
        heightfield.apply_error_threshold(
            max_error,
            !propagate && self.config.smooth_small_zooms,
        );
        if propagate {
            BorderResolver::new(self, source).resolve(&mut heightfield, coordinate, max_error)?;
        }

        let tile_bounds = self.grid.tile_bounds(coordinate);
        let tile_size = self.grid.tile_size();
        let mut assembler = MeshAssembler::new(tile_bounds, tile_size, tile_size);
        heightfield.generate_mesh(&mut assembler);
        heightfield.clear();

        let mut tile = MeshTile::new(*coordinate);
        tile.mesh = assembler.into_mesh();
        if coordinate.zoom != self.config.max_zoom {
            tile.children = children::child_flags(&tile_bounds, &self.dataset_bounds);
        }
        Ok(tile)
    }

    /// Reads the samples of `target` on behalf of the build of `coordinate`.
    /// `border` names the neighbour being read, `None` for the tile itself.
    pub(crate) fn read_heights(
        &self,
        reader: &dyn HeightSource,
        coordinate: &TileCoordinate,
        target: &TileCoordinate,
        border: Option<BorderDirection>,
    ) -> Result<HeightBuffer, MeshTilerError> {
        let tile_size = self.grid.tile_size();
        let bounds = self.grid.tile_bounds(target);
        let read_error = |source| MeshTilerError::RasterRead {
            coordinate: *coordinate,
            border,
            source,
        };
        let buffer = reader
            .read_heights(target, &bounds, tile_size, tile_size)
            .map_err(read_error)?;
        if buffer.width() != tile_size || buffer.height() != tile_size {
            return Err(read_error(RasterError::Dimensions {
                width: tile_size,
                height: tile_size,
                samples: buffer.heights().len(),
            }));
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Heights from a closure of geographic position, with a read log.
    struct FnSource<F> {
        height: F,
        reads: Mutex<Vec<TileCoordinate>>,
        fail_on: Option<TileCoordinate>,
    }

    impl<F: Fn(f64, f64) -> f32 + Send + Sync> FnSource<F> {
        fn new(height: F) -> Self {
            Self {
                height,
                reads: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn reads(&self) -> Vec<TileCoordinate> {
            self.reads.lock().unwrap().clone()
        }
    }

    impl<F: Fn(f64, f64) -> f32 + Send + Sync> HeightSource for FnSource<F> {
        fn read_heights(
            &self,
            coordinate: &TileCoordinate,
            bounds: &GeographicBounds,
            width: u32,
            height: u32,
        ) -> Result<HeightBuffer, RasterError> {
            self.reads.lock().unwrap().push(*coordinate);
            if self.fail_on == Some(*coordinate) {
                return Err(RasterError::Unavailable(format!("tile {}", coordinate)));
            }
            let transform = crate::tiling::GridTransform::new(*bounds, width, height);
            Ok(HeightBuffer::from_fn(width, height, |x, y| {
                let (gx, gy) = transform.to_geographic(x, y);
                (self.height)(gx, gy)
            }))
        }
    }

    struct CountingSource {
        reads: AtomicUsize,
    }

    impl HeightSource for CountingSource {
        fn read_heights(
            &self,
            _coordinate: &TileCoordinate,
            _bounds: &GeographicBounds,
            width: u32,
            height: u32,
        ) -> Result<HeightBuffer, RasterError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(HeightBuffer::from_fn(width, height, |_, _| 0.0))
        }
    }

    fn cache() -> RasterHeightCache {
        RasterHeightCache::new(NonZeroUsize::new(16).unwrap())
    }

    fn tiler(tile_size: u32, dataset: GeographicBounds, config: MeshTilerConfig) -> MeshTiler {
        MeshTiler::new(Grid::global_geodetic(tile_size), dataset, config, cache()).unwrap()
    }

    fn whole_world() -> GeographicBounds {
        GeographicBounds::new(-180.0, -90.0, 180.0, 90.0)
    }

    #[test]
    fn flat_three_by_three_tile_at_zoom_zero() {
        let config = MeshTilerConfig {
            tile_size: 3,
            smooth_small_zooms: false,
            ..MeshTilerConfig::default()
        };
        let tiler = tiler(3, whole_world(), config);
        let source = FnSource::new(|_, _| 0.0);
        let tile = tiler
            .create_mesh(&source, &TileCoordinate::new(0, 0, 0))
            .unwrap();
        assert_eq!(tile.mesh.vertex_count(), 4);
        assert_eq!(tile.mesh.triangle_count(), 2);
        assert!(tile.children.sw && tile.children.nw && tile.children.ne && tile.children.se);
    }

    #[test]
    fn small_zooms_keep_every_sample_by_default() {
        let tiler = tiler(5, whole_world(), MeshTilerConfig::default());
        let source = FnSource::new(|_, _| 0.0);
        let tile = tiler
            .create_mesh(&source, &TileCoordinate::new(2, 1, 1))
            .unwrap();
        assert_eq!(tile.mesh.vertex_count(), 25);
        assert_eq!(tile.mesh.triangle_count(), 32);
    }

    #[test]
    fn tile_outside_the_dataset_has_no_children() {
        let dataset = GeographicBounds::new(10.0, 10.0, 20.0, 20.0);
        let tiler = tiler(9, dataset, MeshTilerConfig::default());
        let source = FnSource::new(|_, _| 0.0);
        let tile = tiler
            .create_mesh(&source, &TileCoordinate::new(1, 0, 0))
            .unwrap();
        assert!(!tile.children.any());
    }

    #[test]
    fn tiles_at_max_zoom_have_no_children() {
        let config = MeshTilerConfig {
            max_zoom: 3,
            ..MeshTilerConfig::default()
        };
        let tiler = tiler(9, whole_world(), config);
        let source = FnSource::new(|_, _| 0.0);
        let tile = tiler
            .create_mesh(&source, &TileCoordinate::new(3, 5, 2))
            .unwrap();
        assert!(!tile.children.any());
    }

    #[test]
    fn primary_read_failure_produces_no_tile() {
        let tiler = tiler(9, whole_world(), MeshTilerConfig::default());
        let target = TileCoordinate::new(8, 100, 100);
        let mut source = FnSource::new(|_, _| 0.0);
        source.fail_on = Some(target);
        match tiler.create_mesh(&source, &target) {
            Err(MeshTilerError::RasterRead {
                coordinate, border, ..
            }) => {
                assert_eq!(coordinate, target);
                assert_eq!(border, None);
            }
            other => panic!("expected a read error, got {:?}", other),
        }
        assert!(tiler.cache().is_empty());
    }

    #[test]
    fn neighbor_read_failure_names_the_border() {
        let tiler = tiler(9, whole_world(), MeshTilerConfig::default());
        let target = TileCoordinate::new(8, 100, 100);
        let mut source = FnSource::new(|_, _| 0.0);
        source.fail_on = Some(TileCoordinate::new(8, 101, 100));
        match tiler.create_mesh(&source, &target) {
            Err(MeshTilerError::RasterRead { border, .. }) => {
                assert_eq!(border, Some(BorderDirection::East));
            }
            other => panic!("expected a read error, got {:?}", other),
        }
        assert!(!tiler.cache().contains(&target));
    }

    #[test]
    fn only_y_axis_neighbours_are_cached() {
        let tiler = tiler(9, whole_world(), MeshTilerConfig::default());
        let target = TileCoordinate::new(8, 100, 100);
        let source = FnSource::new(|x: f64, y: f64| ((x * 7.0).sin() * (y * 3.0).cos() * 400.0) as f32);
        tiler.create_mesh(&source, &target).unwrap();

        let reads = source.reads();
        assert_eq!(reads.len(), 5);
        assert_eq!(reads[0], target);
        let cache = tiler.cache();
        assert!(cache.contains(&target));
        assert!(cache.contains(&TileCoordinate::new(8, 100, 101)));
        assert!(cache.contains(&TileCoordinate::new(8, 100, 99)));
        assert!(!cache.contains(&TileCoordinate::new(8, 99, 100)));
        assert!(!cache.contains(&TileCoordinate::new(8, 101, 100)));
    }

    #[test]
    fn cached_buffers_are_not_read_again() {
        let tiler = tiler(9, whole_world(), MeshTilerConfig::default());
        let source = CountingSource {
            reads: AtomicUsize::new(0),
        };
        let target = TileCoordinate::new(7, 10, 10);
        tiler.create_mesh(&source, &target).unwrap();
        assert_eq!(source.reads.load(Ordering::SeqCst), 5);
        // Own tile and both Y-axis neighbours now come from the cache.
        tiler.create_mesh(&source, &target).unwrap();
        assert_eq!(source.reads.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn neighbours_outside_the_dataset_are_skipped() {
        // The dataset covers exactly one zoom-8 tile.
        let grid = Grid::global_geodetic(9);
        let target = TileCoordinate::new(8, 100, 100);
        let dataset = grid.tile_bounds(&target);
        let tiler = tiler(9, dataset, MeshTilerConfig::default());
        let source = FnSource::new(|_, _| 1.0);
        tiler.create_mesh(&source, &target).unwrap();
        assert_eq!(source.reads(), vec![target]);
    }

    #[test]
    fn explicit_reader_supplies_the_primary_tile() {
        let tiler = tiler(9, whole_world(), MeshTilerConfig::default());
        let target = TileCoordinate::new(8, 100, 100);
        let neighbours = FnSource::new(|_, _| 0.0);
        let primary = FnSource::new(|_, _| 5.0);
        let tile = tiler
            .create_mesh_with_reader(&neighbours, &target, &primary)
            .unwrap();
        assert_eq!(primary.reads(), vec![target]);
        assert_eq!(neighbours.reads().len(), 4);
        assert!(tile.mesh.vertices.iter().all(|v| v.height == 5.0));
    }

    #[test]
    fn invalid_tile_size_is_rejected() {
        let result = MeshTiler::new(
            Grid::global_geodetic(64),
            whole_world(),
            MeshTilerConfig::default(),
            cache(),
        );
        assert!(matches!(result, Err(MeshTilerError::InvalidGeometry(_))));
    }
}
