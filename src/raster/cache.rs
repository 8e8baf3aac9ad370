//! # Raster Height Cache
//!
//! Bounded, least-recently-used store of tile height buffers, shared by every
//! tile build.
//!
//! Building a tile above the neighbour-propagation zoom reads up to four
//! neighbouring tiles besides its own. Tiles are usually built row by row, so
//! the buffers of the neighbours to the north and south are the ones most
//! likely to be needed again soon, either as a primary tile or as a neighbour
//! of the next row. Those are the buffers the tiler pushes here.
//!
//! ## Ownership
//! `push` takes the buffer by value. `get` returns an `Arc` handle, so a
//! buffer evicted while a build is still reading it stays alive until that
//! build drops its handle.

use super::HeightBuffer;
use crate::core::MtResource;
use crate::tiling::TileCoordinate;
use log::debug;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::ops::Deref;
use std::sync::Arc;

/// Thread-safe LRU of tile height buffers. Cloning yields another handle to
/// the same cache.
#[derive(Clone)]
pub struct RasterHeightCache {
    entries: MtResource<LruCache<TileCoordinate, Arc<HeightBuffer>>>,
}

impl RasterHeightCache {
    /// # Arguments
    /// * `capacity` - Maximum number of buffers kept before the least
    ///   recently used one is evicted
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: MtResource::new(LruCache::new(capacity)),
        }
    }

    /// Looks up the buffer of `coordinate`, marking it most recently used.
    pub fn get(&self, coordinate: &TileCoordinate) -> Option<Arc<HeightBuffer>> {
        self.entries.with_mut(|lru| lru.get(coordinate).cloned())
    }

    /// Stores `buffer` as the buffer of `coordinate`, replacing any previous
    /// entry.
    ///
    /// # Returns
    /// The coordinate of the entry evicted to make room, if any
    pub fn push(&self, coordinate: TileCoordinate, buffer: HeightBuffer) -> Option<TileCoordinate> {
        let displaced = self
            .entries
            .with_mut(|lru| lru.push(coordinate, Arc::new(buffer)));
        match displaced {
            Some((evicted, _)) if evicted != coordinate => {
                debug!("Height cache evicted {} for {}", evicted, coordinate);
                Some(evicted)
            }
            _ => None,
        }
    }

    /// Checks for an entry without affecting its recency.
    pub fn contains(&self, coordinate: &TileCoordinate) -> bool {
        self.entries.get().contains(coordinate)
    }

    pub fn len(&self) -> usize {
        self.entries.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.get().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.get().cap().get()
    }

    pub fn clear(&self) {
        self.entries.get_mut().clear();
    }
}

/// Height samples in use by a tile build: either shared with the cache or
/// freshly read and still owned by the build.
pub enum HeightHandle {
    Cached(Arc<HeightBuffer>),
    Fresh(HeightBuffer),
}

impl HeightHandle {
    pub fn is_cached(&self) -> bool {
        matches!(self, HeightHandle::Cached(_))
    }
}

impl Deref for HeightHandle {
    type Target = HeightBuffer;

    fn deref(&self) -> &HeightBuffer {
        match self {
            HeightHandle::Cached(buffer) => buffer,
            HeightHandle::Fresh(buffer) => buffer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(value: f32) -> HeightBuffer {
        HeightBuffer::from_fn(3, 3, |_, _| value)
    }

    fn cache(capacity: usize) -> RasterHeightCache {
        RasterHeightCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn get_returns_pushed_buffer() {
        let cache = cache(4);
        let tile = TileCoordinate::new(7, 1, 2);
        assert!(cache.get(&tile).is_none());
        assert_eq!(cache.push(tile, buffer(5.0)), None);
        assert_eq!(cache.get(&tile).unwrap().get(1, 1), Some(5.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = cache(2);
        let a = TileCoordinate::new(7, 0, 0);
        let b = TileCoordinate::new(7, 1, 0);
        let c = TileCoordinate::new(7, 2, 0);
        cache.push(a, buffer(1.0));
        cache.push(b, buffer(2.0));
        // Touch `a` so that `b` becomes the eviction candidate.
        assert!(cache.get(&a).is_some());
        assert_eq!(cache.push(c, buffer(3.0)), Some(b));
        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
    }

    #[test]
    fn replacing_an_entry_is_not_an_eviction() {
        let cache = cache(1);
        let a = TileCoordinate::new(3, 4, 5);
        cache.push(a, buffer(1.0));
        assert_eq!(cache.push(a, buffer(2.0)), None);
        assert_eq!(cache.get(&a).unwrap().get(0, 0), Some(2.0));
    }

    #[test]
    fn evicted_handles_stay_readable() {
        let cache = cache(1);
        let a = TileCoordinate::new(3, 0, 0);
        cache.push(a, buffer(9.0));
        let handle = cache.get(&a).unwrap();
        cache.push(TileCoordinate::new(3, 1, 0), buffer(0.0));
        assert!(!cache.contains(&a));
        assert_eq!(handle.get(2, 2), Some(9.0));
    }

    #[test]
    fn clones_share_entries() {
        let cache = cache(8);
        let other = cache.clone();
        other.push(TileCoordinate::new(1, 1, 1), buffer(0.5));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(other.is_empty());
        assert_eq!(other.capacity(), 8);
    }
}
