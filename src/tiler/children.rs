//! Child tile flags: a child is worth building only where it overlaps the
//! dataset.

use crate::mesh::ChildFlags;
use crate::tiling::GeographicBounds;

/// Flags of the four children of a tile with `tile_bounds`.
///
/// A tile that does not overlap the dataset has no children. Otherwise each
/// quadrant is flagged when it overlaps the dataset; touching edges do not
/// count.
pub fn child_flags(tile_bounds: &GeographicBounds, dataset_bounds: &GeographicBounds) -> ChildFlags {
    if !dataset_bounds.overlaps(tile_bounds) {
        return ChildFlags::default();
    }
    ChildFlags {
        sw: dataset_bounds.overlaps(&tile_bounds.sw()),
        nw: dataset_bounds.overlaps(&tile_bounds.nw()),
        ne: dataset_bounds.overlaps(&tile_bounds.ne()),
        se: dataset_bounds.overlaps(&tile_bounds.se()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_covering_the_tile_flags_everything() {
        let tile = GeographicBounds::new(0.0, 0.0, 10.0, 10.0);
        let dataset = GeographicBounds::new(-5.0, -5.0, 15.0, 15.0);
        let flags = child_flags(&tile, &dataset);
        assert!(flags.sw && flags.nw && flags.ne && flags.se);
    }

    #[test]
    fn dataset_in_one_quadrant_flags_one_child() {
        let tile = GeographicBounds::new(0.0, 0.0, 10.0, 10.0);
        let dataset = GeographicBounds::new(6.0, 6.0, 9.0, 9.0);
        assert_eq!(
            child_flags(&tile, &dataset),
            ChildFlags {
                ne: true,
                ..ChildFlags::default()
            }
        );
    }

    #[test]
    fn touching_the_midline_does_not_flag_the_neighbour_quadrant() {
        let tile = GeographicBounds::new(0.0, 0.0, 10.0, 10.0);
        let dataset = GeographicBounds::new(0.0, 0.0, 5.0, 10.0);
        let flags = child_flags(&tile, &dataset);
        assert!(flags.sw && flags.nw);
        assert!(!flags.ne && !flags.se);
    }

    #[test]
    fn disjoint_dataset_clears_all_flags() {
        let tile = GeographicBounds::new(0.0, 0.0, 10.0, 10.0);
        let dataset = GeographicBounds::new(10.0, 0.0, 20.0, 10.0);
        assert!(!child_flags(&tile, &dataset).any());
    }
}
