//! Bucket layout constants for 32³ voxel buckets.
//!
//! Every bucket at every resolution holds the same number of voxels. Widths
//! are powers of two so that bucket-grid projection is a shift and a mask.
//!
//! # Memory Layout
//!
//! ```text
//! Bucket memory layout (row-major, X innermost):
//!
//! Address:  0    1    2   ...  31   32   33  ...  1023  1024 ...
//! Content: [0,0,0][1,0,0]...[31,0,0][0,1,0]...[31,31,0][0,0,1]...
//!          └─────── X ───────┘└─────── X ───────┘
//! ```
//!
//! # Indexing
//!
//! ```text
//! index = z << 10 | y << 5 | x
//!       = x + y * 32 + z * 1024
//! ```

use glam::IVec3;

/// log2 of the bucket width.
pub const BUCKET_SIZE_P: u32 = 5;

/// Voxels per bucket axis (32).
pub const BUCKET_WIDTH: i32 = 1 << BUCKET_SIZE_P;

/// Voxels per bucket slice (32² = 1024).
pub const BUCKET_WIDTH_SQ: usize = (BUCKET_WIDTH * BUCKET_WIDTH) as usize;

/// Voxels per bucket (32³ = 32768).
pub const BUCKET_VOXEL_COUNT: usize = BUCKET_WIDTH_SQ * BUCKET_WIDTH as usize;

/// Mask for extracting a single axis from a voxel index (0x1F = 31).
pub const INDEX_MASK: usize = 0x1F;

/// Default number of buckets a cube keeps before it starts evicting.
pub const DEFAULT_BUCKET_COUNT_SOFT_LIMIT: usize = 5000;

/// Ring growths between two allocation warnings.
pub const ALLOCATION_WARNING_INTERVAL: usize = 100;

/// Labeled voxels between two flood-fill progress reports.
pub const FLOODFILL_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Suggested labeled-voxel budget when flood-fill bounding-box growth is on.
pub const FLOODFILL_VOXEL_THRESHOLD: u64 = 5 * 1_000_000;

/// Convert a bucket-local voxel offset to its linear index.
///
/// Layout: X is minor (stride 1), Y is middle (stride 32), Z is major
/// (stride 1024).
#[inline(always)]
pub fn get_voxel_index_by_voxel_offset(offset: IVec3) -> usize {
  debug_assert!(
    offset.cmpge(IVec3::ZERO).all() && offset.cmplt(IVec3::splat(BUCKET_WIDTH)).all(),
    "voxel offset {offset} lies outside the bucket"
  );
  (offset.x + offset.y * BUCKET_WIDTH + offset.z * BUCKET_WIDTH * BUCKET_WIDTH) as usize
}

/// Convert a linear voxel index back to its bucket-local offset.
#[inline(always)]
pub fn voxel_index_to_offset(index: usize) -> IVec3 {
  IVec3::new(
    (index & INDEX_MASK) as i32,
    ((index >> BUCKET_SIZE_P) & INDEX_MASK) as i32,
    (index >> (2 * BUCKET_SIZE_P)) as i32,
  )
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
