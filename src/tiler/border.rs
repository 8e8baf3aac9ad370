//! # Border Consistency
//!
//! Adjacent tiles are simplified independently, so each would keep a
//! different set of samples along the edge they share, leaving cracks in the
//! terrain. Before a tile is triangulated, each of its four neighbours is
//! simplified with the same error budget, and the samples the neighbour keeps
//! on the shared edge are kept by the tile too. Both tiles end up with the
//! union of the two selections on that edge.
//!
//! ## Reads and Caching
//! Tiles are built row by row, so the north and south neighbours are the ones
//! whose buffers are needed again soon. Those are looked up in, and pushed
//! to, the shared height cache. West and east neighbours are read directly
//! and dropped after use.

use super::MeshTiler;
use crate::error::MeshTilerError;
use crate::heightfield::Heightfield;
use crate::raster::{HeightHandle, HeightSource};
use crate::tiling::{BorderDirection, TileCoordinate};
use log::debug;

pub struct BorderResolver<'t> {
    tiler: &'t MeshTiler,
    source: &'t dyn HeightSource,
}

impl<'t> BorderResolver<'t> {
    pub fn new(tiler: &'t MeshTiler, source: &'t dyn HeightSource) -> Self {
        Self { tiler, source }
    }

    /// Merges the edge activation of every neighbour of `coordinate` that
    /// overlaps the dataset into `heightfield`.
    ///
    /// # Returns
    /// The number of neighbours merged, or the first read failure
    pub fn resolve(
        &self,
        heightfield: &mut Heightfield<'_>,
        coordinate: &TileCoordinate,
        max_error: f64,
    ) -> Result<usize, MeshTilerError> {
        let grid = self.tiler.grid();
        let mut merged = 0;
        for border in BorderDirection::ALL {
            let Some(neighbor) = grid.neighbor_coordinate(coordinate, border.index()) else {
                continue;
            };
            if !self
                .tiler
                .dataset_bounds()
                .overlaps(&grid.tile_bounds(&neighbor))
            {
                continue;
            }
            self.merge_neighbor(heightfield, coordinate, &neighbor, border, max_error)?;
            merged += 1;
        }
        Ok(merged)
    }

    fn merge_neighbor(
        &self,
        heightfield: &mut Heightfield<'_>,
        coordinate: &TileCoordinate,
        neighbor: &TileCoordinate,
        border: BorderDirection,
        max_error: f64,
    ) -> Result<(), MeshTilerError> {
        let cacheable = border.is_y_axis();
        let cached = if cacheable {
            self.tiler.cache().get(neighbor)
        } else {
            None
        };
        let heights = match cached {
            Some(buffer) => HeightHandle::Cached(buffer),
            None => HeightHandle::Fresh(self.tiler.read_heights(
                self.source,
                coordinate,
                neighbor,
                Some(border),
            )?),
        };
        debug!(
            "Tile {}: merging {} neighbour {}{}",
            coordinate,
            border,
            neighbor,
            if heights.is_cached() { " (cached)" } else { "" }
        );

        {
            let mut neighbor_field = Heightfield::from_buffer(&heights)?;
            neighbor_field.apply_error_threshold(max_error, false);
            heightfield.propagate_border_activation(&neighbor_field, border)?;
        }

        if let (HeightHandle::Fresh(buffer), true) = (heights, cacheable) {
            self.tiler.cache().push(*neighbor, buffer);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshTilerConfig;
    use crate::raster::{HeightBuffer, RasterError, RasterHeightCache};
    use crate::tiling::{GeographicBounds, Grid};
    use std::num::NonZeroUsize;

    /// Flat everywhere except a ridge along one column of the tile east of
    /// the origin tile, which forces samples on the shared edge.
    struct RidgeSource;

    impl HeightSource for RidgeSource {
        fn read_heights(
            &self,
            coordinate: &TileCoordinate,
            _bounds: &GeographicBounds,
            width: u32,
            height: u32,
        ) -> Result<HeightBuffer, RasterError> {
            let ridge = coordinate.x == 11;
            Ok(HeightBuffer::from_fn(width, height, |x, y| {
                if ridge && x == 0 {
                    (y % 3) as f32 * 1.0e5
                } else {
                    0.0
                }
            }))
        }
    }

    #[test]
    fn neighbour_edge_samples_are_merged() {
        let tiler = MeshTiler::new(
            Grid::global_geodetic(9),
            GeographicBounds::new(-180.0, -90.0, 180.0, 90.0),
            MeshTilerConfig::default(),
            RasterHeightCache::new(NonZeroUsize::new(8).unwrap()),
        )
        .unwrap();
        let coordinate = TileCoordinate::new(7, 10, 10);
        let flat = HeightBuffer::from_fn(9, 9, |_, _| 0.0);
        let mut field = Heightfield::from_buffer(&flat).unwrap();
        let max_error = tiler.geometric_error(7).unwrap();
        field.apply_error_threshold(max_error, false);
        assert_eq!(field.active_count(), 4);

        let merged = BorderResolver::new(&tiler, &RidgeSource)
            .resolve(&mut field, &coordinate, max_error)
            .unwrap();
        assert_eq!(merged, 4);
        assert!(field.active_count() > 4);
        for y in 0..9 {
            for x in 0..8 {
                let corner = (x == 0) && (y == 0 || y == 8);
                assert_eq!(field.is_active(x, y), corner, "({}, {})", x, y);
            }
        }
    }
}
