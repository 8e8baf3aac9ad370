use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted container for state shared between tile
/// workers.
///
/// `MtResource` wraps an `Arc<RwLock<T>>`. Cloning the resource clones the
/// handle, not the value, so every clone observes the same state. The tiler
/// uses it for the raster height cache, which every worker consults while
/// building neighbouring tiles.
///
/// A lock poisoned by a panicking worker is recovered instead of propagated:
/// the values kept in an `MtResource` are only ever replaced whole, so the
/// contents are still consistent after a panic.
///
/// # Type Parameters
/// - `T`: The type of the contained resource, must be `Send + Sync`
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
/// use lru::LruCache;
/// use terrain_mesher::core::MtResource;
///
/// let cache: MtResource<LruCache<u32, f32>> =
///     MtResource::new(LruCache::new(NonZeroUsize::new(2).unwrap()));
/// let worker_handle = cache.clone();
///
/// std::thread::spawn(move || {
///     worker_handle.get_mut().push(7, 1.5);
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(cache.with_mut(|lru| lru.get(&7).copied()), Some(1.5));
/// ```
pub struct MtResource<T: Send + Sync> {
    resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    ///
    /// # Arguments
    /// * `resource` - The value to be shared
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read guard over the contained value.
    ///
    /// Concurrent readers do not block each other.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns an exclusive write guard over the contained value.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the value and returns its result.
    ///
    /// The lock is released before this method returns, which keeps the
    /// critical section visibly scoped at the call site.
    ///
    /// # Arguments
    /// * `f` - Closure receiving a mutable reference to the contained value
    ///
    /// # Returns
    /// Whatever `f` returns
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.get_mut();
        f(&mut guard)
    }

    /// Number of live handles sharing this resource.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.resource)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn clones_share_the_same_value() {
        let counter = MtResource::new(0usize);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        *counter.get_mut() += 1;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*counter.get(), 400);
        assert_eq!(counter.handle_count(), 1);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let value = MtResource::new(vec![1, 2, 3]);
        let poisoner = value.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.get_mut();
            panic!("worker died while holding the lock");
        })
        .join();

        assert_eq!(value.with_mut(|v| v.len()), 3);
    }
}
