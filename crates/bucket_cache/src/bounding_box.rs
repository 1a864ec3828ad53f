//! Active bounding box of a cube.
//!
//! Gates cache population: buckets outside the box at their zoom step are
//! never allocated. The box is kept in zoom step 0 voxels and projected onto
//! each zoom step's bucket grid with shifts, never floating point.

use std::sync::Arc;

use glam::IVec3;

use crate::config::ResolutionInfo;
use crate::constants::{get_voxel_index_by_voxel_offset, BUCKET_SIZE_P, BUCKET_WIDTH};
use crate::types::{BucketAddress, BucketData, VoxelBox};

/// Dataset extent, optionally narrowed by an annotation restriction.
///
/// `min` is inclusive, `max` is exclusive, both in zoom step 0 voxels.
#[derive(Clone, Debug)]
pub struct BoundingBox {
  min: IVec3,
  max: IVec3,
  resolutions: Arc<ResolutionInfo>,
}

impl BoundingBox {
  /// Intersect `restriction` with `[0, upper_boundary)`.
  pub fn new(
    restriction: Option<VoxelBox>,
    upper_boundary: IVec3,
    resolutions: Arc<ResolutionInfo>,
  ) -> Self {
    let mut min = IVec3::ZERO;
    let mut max = upper_boundary;
    if let Some(restriction) = restriction {
      min = min.max(restriction.min);
      max = max.min(restriction.max);
    }
    // A restriction disjoint from the dataset collapses to an empty box.
    max = max.max(min);
    Self {
      min,
      max,
      resolutions,
    }
  }

  pub fn min(&self) -> IVec3 {
    self.min
  }

  pub fn max(&self) -> IVec3 {
    self.max
  }

  pub fn as_voxel_box(&self) -> VoxelBox {
    VoxelBox::new(self.min, self.max)
  }

  /// Bucket-grid box at `zoom_step`: `min` floored, `max` ceiled.
  ///
  /// Returns `None` for unknown zoom steps.
  pub fn get_box_for_zoom_step(&self, zoom_step: usize) -> Option<VoxelBox> {
    let log2_mag = self.resolutions.get_log2_resolution(zoom_step)?;
    let mut min = IVec3::ZERO;
    let mut max = IVec3::ZERO;
    for i in 0..3 {
      let shift = BUCKET_SIZE_P as i32 + log2_mag[i];
      min[i] = self.min[i] >> shift;

      // ceil(max / 2^shift)
      let remainder = self.max[i] & ((1 << shift) - 1);
      max[i] = (self.max[i] >> shift) + i32::from(remainder != 0);
    }
    Some(VoxelBox::new(min, max))
  }

  /// `min <= coord < max` on every axis at the address's zoom step.
  pub fn contains_bucket(&self, address: BucketAddress) -> bool {
    self
      .get_box_for_zoom_step(address.zoom_step)
      .is_some_and(|grid| grid.contains(address.position))
  }

  /// Strict interior containment: the bucket cannot straddle the boundary.
  pub fn contains_full_bucket(&self, address: BucketAddress) -> bool {
    let Some(grid) = self.get_box_for_zoom_step(address.zoom_step) else {
      return false;
    };
    let p = address.position;
    grid.min.cmplt(p).all() && p.cmplt(grid.max - IVec3::ONE).all()
  }

  /// Zero every voxel of a straddling bucket whose global position lies
  /// outside the box.
  pub fn remove_outside_area(&self, address: BucketAddress, data: &mut BucketData) {
    if self.contains_full_bucket(address) {
      return;
    }
    let Some(mag) = self.resolutions.get_resolution_by_index(address.zoom_step) else {
      return;
    };

    let base_voxel = address.position * mag * BUCKET_WIDTH;
    let bounds = self.as_voxel_box();
    for dz in 0..BUCKET_WIDTH {
      for dy in 0..BUCKET_WIDTH {
        for dx in 0..BUCKET_WIDTH {
          let offset = IVec3::new(dx, dy, dz);
          if bounds.contains(base_voxel + offset * mag) {
            continue;
          }
          data.set(get_voxel_index_by_voxel_offset(offset), 0);
        }
      }
    }
  }

  /// Clip a region (e.g. a flood-fill target box) to this box.
  pub fn intersected_with(&self, other: &VoxelBox) -> VoxelBox {
    self.as_voxel_box().intersected_with(other)
  }
}

#[cfg(test)]
#[path = "bounding_box_test.rs"]
mod bounding_box_test;
