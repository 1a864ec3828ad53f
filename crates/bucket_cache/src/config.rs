//! Layer description, resolution list, and cube tuning knobs.

use glam::IVec3;

use crate::constants::{
  ALLOCATION_WARNING_INTERVAL, BUCKET_WIDTH, DEFAULT_BUCKET_COUNT_SOFT_LIMIT,
  FLOODFILL_PROGRESS_INTERVAL,
};
use crate::error::{CubeError, Result};
use crate::types::{ElementClass, VoxelBox};

// =============================================================================
// ResolutionInfo - ordered mags
// =============================================================================

/// Ordered list of mags; zoom step `i` is the index into it.
///
/// Mags may differ per axis but every component must be a positive power of
/// two, so bucket-grid projection stays a pure shift.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionInfo {
  resolutions: Vec<IVec3>,
}

impl ResolutionInfo {
  pub fn new(resolutions: Vec<IVec3>) -> Result<Self> {
    if resolutions.is_empty() {
      return Err(CubeError::NoResolutions);
    }
    for (index, mag) in resolutions.iter().enumerate() {
      let valid = mag.to_array().iter().all(|&c| c > 0 && (c as u32).is_power_of_two());
      if !valid {
        return Err(CubeError::InvalidResolution { index, mag: *mag });
      }
    }
    Ok(Self { resolutions })
  }

  /// `count` isotropic mags: 1, 2, 4, ...
  pub fn isotropic(count: usize) -> Self {
    Self {
      resolutions: (0..count.max(1)).map(|i| IVec3::splat(1 << i)).collect(),
    }
  }

  #[inline]
  pub fn has_index(&self, zoom_step: usize) -> bool {
    zoom_step < self.resolutions.len()
  }

  #[inline]
  pub fn get_resolution_by_index(&self, zoom_step: usize) -> Option<IVec3> {
    self.resolutions.get(zoom_step).copied()
  }

  pub fn get_resolution_by_index_or_err(&self, zoom_step: usize) -> Result<IVec3> {
    self
      .get_resolution_by_index(zoom_step)
      .ok_or(CubeError::UnknownZoomStep {
        zoom_step,
        available: self.resolutions.len(),
      })
  }

  /// Per-axis log2 of the mag at `zoom_step`.
  #[inline]
  pub fn get_log2_resolution(&self, zoom_step: usize) -> Option<IVec3> {
    self.get_resolution_by_index(zoom_step).map(|mag| {
      IVec3::new(
        mag.x.trailing_zeros() as i32,
        mag.y.trailing_zeros() as i32,
        mag.z.trailing_zeros() as i32,
      )
    })
  }

  pub fn resolutions_with_indices(&self) -> impl Iterator<Item = (usize, IVec3)> + '_ {
    self.resolutions.iter().copied().enumerate()
  }

  pub fn len(&self) -> usize {
    self.resolutions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.resolutions.is_empty()
  }
}

// =============================================================================
// LayerDescriptor - what the cube caches
// =============================================================================

/// Static description of the layer a cube caches.
#[derive(Clone, Debug)]
pub struct LayerDescriptor {
  pub name: String,
  /// Dataset extent in zoom step 0 voxels (exclusive).
  pub upper_boundary: IVec3,
  pub resolutions: ResolutionInfo,
  pub element_class: ElementClass,
  pub is_segmentation: bool,
  /// Annotation-specific restriction, intersected with the dataset extent.
  pub restriction: Option<VoxelBox>,
}

impl LayerDescriptor {
  pub fn new(
    name: impl Into<String>,
    upper_boundary: IVec3,
    resolutions: ResolutionInfo,
    element_class: ElementClass,
  ) -> Self {
    Self {
      name: name.into(),
      upper_boundary,
      resolutions,
      element_class,
      is_segmentation: false,
      restriction: None,
    }
  }

  pub fn segmentation(mut self) -> Self {
    self.is_segmentation = true;
    self
  }

  pub fn with_restriction(mut self, restriction: VoxelBox) -> Self {
    self.restriction = Some(restriction);
    self
  }

  /// Bucket-grid extent at zoom step 0, rounded up.
  pub fn base_bucket_boundary(&self) -> IVec3 {
    (self.upper_boundary + IVec3::splat(BUCKET_WIDTH - 1)).div_euclid(IVec3::splat(BUCKET_WIDTH))
  }
}

// =============================================================================
// CubeConfig - eviction and flood-fill tuning
// =============================================================================

/// Tuning knobs for eviction pressure and flood fill.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CubeConfig {
  /// Live buckets kept before eviction kicks in.
  /// Advisory: the ring grows when nothing is collectible.
  pub bucket_count_soft_limit: usize,

  /// Ring growths between two allocation warnings.
  pub allocation_warning_interval: usize,

  /// Labeled-voxel budget under which flood fill may grow its bounding box.
  /// `None` never grows the box: leaving it marks the result as exceeded.
  pub floodfill_voxel_threshold: Option<u64>,

  /// Labeled voxels between two progress reports.
  pub progress_interval: u64,

  /// Treat missing data as renderable black instead of falling back to a
  /// coarser zoom step.
  pub render_missing_data_black: bool,
}

impl Default for CubeConfig {
  fn default() -> Self {
    Self {
      bucket_count_soft_limit: DEFAULT_BUCKET_COUNT_SOFT_LIMIT,
      allocation_warning_interval: ALLOCATION_WARNING_INTERVAL,
      floodfill_voxel_threshold: None,
      progress_interval: FLOODFILL_PROGRESS_INTERVAL,
      render_missing_data_black: true,
    }
  }
}

impl CubeConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_bucket_count_soft_limit(mut self, limit: usize) -> Self {
    self.bucket_count_soft_limit = limit.max(1);
    self
  }

  pub fn with_allocation_warning_interval(mut self, interval: usize) -> Self {
    self.allocation_warning_interval = interval.max(1);
    self
  }

  pub fn with_floodfill_voxel_threshold(mut self, threshold: Option<u64>) -> Self {
    self.floodfill_voxel_threshold = threshold;
    self
  }

  pub fn with_progress_interval(mut self, interval: u64) -> Self {
    self.progress_interval = interval.max(1);
    self
  }

  pub fn with_render_missing_data_black(mut self, black: bool) -> Self {
    self.render_missing_data_black = black;
    self
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
