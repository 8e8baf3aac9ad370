use crate::heightfield::HeightfieldError;
use crate::raster::RasterError;
use crate::tiling::{BorderDirection, TileCoordinate};
use thiserror::Error;

/// Errors raised while building a tile. A failed build produces no tile.
#[derive(Debug, Error)]
pub enum MeshTilerError {
    /// Reading the tile's own samples, or those of a neighbour, failed.
    #[error("failed to read heights for tile {coordinate}{}: {source}", border_suffix(.border))]
    RasterRead {
        coordinate: TileCoordinate,
        border: Option<BorderDirection>,
        #[source]
        source: RasterError,
    },
    /// The tile geometry or error model is unusable.
    #[error("invalid geometry configuration: {0}")]
    InvalidGeometry(String),
}

impl From<HeightfieldError> for MeshTilerError {
    fn from(err: HeightfieldError) -> Self {
        MeshTilerError::InvalidGeometry(err.to_string())
    }
}

fn border_suffix(border: &Option<BorderDirection>) -> String {
    match border {
        Some(border) => format!(" ({} neighbour)", border),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_errors_name_the_border() {
        let err = MeshTilerError::RasterRead {
            coordinate: TileCoordinate::new(9, 4, 2),
            border: Some(BorderDirection::North),
            source: RasterError::Unavailable("disk offline".into()),
        };
        assert_eq!(
            err.to_string(),
            "failed to read heights for tile 9/4/2 (north neighbour): raster source unavailable: disk offline"
        );
    }

    #[test]
    fn heightfield_errors_become_invalid_geometry() {
        let err: MeshTilerError = HeightfieldError::InvalidSize(64).into();
        assert!(matches!(err, MeshTilerError::InvalidGeometry(_)));
    }
}
