//! # Geometric Error Model
//!
//! Derives the maximum geometric error, in metres, that a tile at a given
//! zoom level may deviate from the full-resolution heightfield.
//!
//! The level-0 estimate spreads the equatorial circumference over the
//! samples that span the globe at level 0, scaled by a quality factor. Each
//! zoom level halves the budget.

use crate::error::MeshTilerError;

/// Default quality factor for heightmap terrain; the configured mesh
/// quality factor multiplies it.
pub const HEIGHTMAP_TERRAIN_QUALITY: f64 = 0.25;

/// Estimated geometric error of a level-0 tile.
///
/// # Arguments
/// * `major_axis_radius` - Semi-major axis of the ellipsoid, metres
/// * `terrain_quality` - Quality factor; smaller values give finer meshes
/// * `tile_width` - Samples along a tile edge
/// * `tiles_at_level_zero` - Tiles spanning the grid width at level 0
///
/// # Returns
/// `2π · radius · quality / (tile_width · tiles_at_level_zero)`, or
/// `InvalidGeometry` when any input would make it non-positive or undefined
pub fn estimate_level_zero_error(
    major_axis_radius: f64,
    terrain_quality: f64,
    tile_width: u32,
    tiles_at_level_zero: u32,
) -> Result<f64, MeshTilerError> {
    if tile_width == 0 || tiles_at_level_zero == 0 {
        return Err(MeshTilerError::InvalidGeometry(format!(
            "tile width {} and level-0 tile count {} must both be non-zero",
            tile_width, tiles_at_level_zero
        )));
    }
    if !(major_axis_radius.is_finite() && major_axis_radius > 0.0) {
        return Err(MeshTilerError::InvalidGeometry(format!(
            "ellipsoid radius {} must be positive",
            major_axis_radius
        )));
    }
    if !(terrain_quality.is_finite() && terrain_quality > 0.0) {
        return Err(MeshTilerError::InvalidGeometry(format!(
            "terrain quality {} must be positive",
            terrain_quality
        )));
    }
    Ok(major_axis_radius * 2.0 * std::f64::consts::PI * terrain_quality
        / (tile_width as f64 * tiles_at_level_zero as f64))
}

/// Error budget at `zoom`: the level-0 error halved once per level.
pub fn error_for_zoom(level_zero_error: f64, zoom: u8) -> f64 {
    level_zero_error / 2f64.powi(zoom as i32)
}
