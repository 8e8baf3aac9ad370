//! # Core Shared-State Primitives
//!
//! Building blocks for state that is shared across the worker threads of the
//! tile pipeline.
//!
//! - `MtResource<T>`: An `Arc<RwLock<T>>` handle with poison recovery, used
//!   for the raster height cache that every tile build consults.

pub mod mt_resource;

pub use mt_resource::MtResource;
