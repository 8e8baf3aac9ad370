#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Terrain Mesher
//!
//! Turns gridded elevation data into level-of-detail triangle meshes for
//! streaming 3D terrain.
//!
//! The world is cut into a quadtree of tiles. For every tile the heights are
//! simplified down to the geometric error its zoom level allows, the tile's
//! edges are made consistent with its neighbours so adjacent meshes join
//! without cracks, and the result is assembled into an indexed triangle mesh
//! with de-duplicated vertices in geographic coordinates.
//!
//! ## Key Modules
//!
//! * `tiler` - `MeshTiler`, the per-tile build: error budget, border
//!   consistency, mesh assembly and child flags
//! * `heightfield` - Sample selection and triangulation of a single tile
//! * `mesh` - Mesh types and the strip-to-indexed-mesh assembler
//! * `raster` - Height sources, the in-memory dataset and the shared LRU cache
//! * `tiling` - Tile coordinates, bounds and the geodetic/mercator grids
//! * `pipeline` / `task_management` - Multi-threaded pyramid builds
//! * `config` - JSON configuration
//!
//! ## Usage
//!
//! ```no_run
//! use std::num::NonZeroUsize;
//! use terrain_mesher::config::MeshTilerConfig;
//! use terrain_mesher::raster::{RasterDataset, RasterHeightCache};
//! use terrain_mesher::tiler::MeshTiler;
//! use terrain_mesher::tiling::{GeographicBounds, Grid, TileCoordinate};
//!
//! let bounds = GeographicBounds::new(6.0, 45.0, 11.0, 48.0);
//! let dataset = RasterDataset::perlin(bounds, 1024, 512, 0, 2500.0, 1.5)?;
//! let cache = RasterHeightCache::new(NonZeroUsize::new(64).unwrap());
//! let tiler = MeshTiler::new(Grid::global_geodetic(65), bounds, MeshTilerConfig::default(), cache)?;
//! let tile = tiler.create_mesh(&dataset, &TileCoordinate::new(8, 265, 193))?;
//! println!("{} triangles", tile.mesh.triangle_count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod heightfield;
pub mod mesh;
pub mod pipeline;
pub mod raster;
pub mod task_management;
pub mod tiler;
pub mod tiling;

pub use error::MeshTilerError;
pub use tiler::MeshTiler;

use config::PipelineConfig;
use log::{error, info};

/// Command line entry point.
///
/// Initialises logging from `RUST_LOG`, loads the pipeline configuration from
/// the JSON file named by the first argument (or uses the defaults when none
/// is given) and builds the tile pyramid. Exits the process with status 1 if
/// the build cannot run or any tile fails.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading pipeline config from {}", path);
            PipelineConfig::load(&path)
        }
        None => {
            info!("No config given, building the default synthetic dataset");
            Ok(PipelineConfig::default())
        }
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
    };

    match pipeline::run_pipeline(&config) {
        Ok(report) if report.is_success() => {
            info!(
                "Done: {} tiles, {} vertices, {} triangles",
                report.tiles_built, report.total_vertices, report.total_triangles
            );
        }
        Ok(report) => {
            error!(
                "{} tile(s) failed, {} task(s) lost",
                report.failed_tiles.len(),
                report.lost_tasks
            );
            std::process::exit(1);
        }
        Err(err) => {
            error!("Build failed: {}", err);
            std::process::exit(1);
        }
    }
}
