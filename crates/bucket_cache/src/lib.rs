//! bucket_cache - Sparse multi-resolution voxel bucket cache
//!
//! Caches the 32³ voxel buckets of very large volumetric datasets that are
//! currently needed for viewing and annotation, evicts them under a soft
//! budget, and relabels connected regions across bucket boundaries.
//!
//! # Overview
//!
//! - **DataCube**: per-layer cache. Creates, looks up and evicts buckets,
//!   coordinates loads through a [`PullQueue`] and commits mutations to a
//!   [`PushQueue`].
//! - **Buckets**: 32³ payloads with a load state machine and merge-on-load
//!   of mutations issued while the fetch was in flight.
//! - **Flood fill**: worklist-based region growing across buckets.
//!
//! # Example
//!
//! ```ignore
//! use bucket_cache::{CubeCollaborators, CubeConfig, DataCube, FloodFillRequest, LayerDescriptor};
//!
//! let store = MemoryBucketStore::new();
//! let collaborators = CubeCollaborators::new(Arc::new(store.clone()), Arc::new(store));
//! let mut cube = DataCube::new(layer, CubeConfig::default(), collaborators);
//!
//! let mut bbox = VoxelBox::new(IVec3::ZERO, IVec3::splat(256));
//! let result = cube
//!     .flood_fill(FloodFillRequest::new(seed, 7, 0), &mut bbox, &mut NoProgress)
//!     .await?;
//! println!("labeled {} voxels", result.labeled_voxel_count);
//! ```

pub mod constants;
pub mod error;
pub mod types;

pub use constants::{BUCKET_VOXEL_COUNT, BUCKET_WIDTH};
pub use error::{CubeError, Result};
pub use types::{BucketAddress, BucketData, DimensionMap, ElementClass, SliceMask, VoxelBox};

pub mod bounding_box;
pub use bounding_box::BoundingBox;

pub mod config;
pub use config::{CubeConfig, LayerDescriptor, ResolutionInfo};

// Bucket state machine and handles
pub mod bucket;
pub use bucket::{Bucket, BucketId, BucketState, DataBucket, DataBucketRef};

// Contracts of pull/push queues, mapping and progress
pub mod collaborators;
pub use collaborators::{
  ActiveMapping, DetachedQueue, Mapping, MappingProvider, MappingStatus, NoProgress,
  ProgressCallback, PullQueue, PushQueue, StaticMappings,
};

pub mod neighbor_queue;

pub mod data_cube;
pub use data_cube::{
  CubeCollaborators, CubeStats, DataCube, FloodFillRequest, FloodFillResult, LabelMasksByBucketAndW,
};

// In-memory backend
pub mod store;
pub use store::MemoryBucketStore;

#[cfg(test)]
pub(crate) mod test_utils;
