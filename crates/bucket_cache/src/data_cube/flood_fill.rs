//! Cross-bucket flood fill.
//!
//! An outer LIFO worklist of `(bucket, local offset)` pairs drives a
//! per-bucket connected-component scan. Neighbours falling outside the
//! scanned bucket are pushed back onto the worklist, without deduplication:
//! a bucket may be entered from several seams and every entry has to be
//! scanned to cover regions that only connect through a neighbour.
//!
//! The fill suspends only while a bucket loads. The scan inside a bucket
//! is synchronous.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use glam::IVec3;
use tracing::{debug, info};
use web_time::Instant;

use super::DataCube;
use crate::bucket::{Bucket, DataBucketRef};
use crate::collaborators::{ProgressCallback, PushQueue};
use crate::constants::{get_voxel_index_by_voxel_offset, BUCKET_WIDTH};
use crate::error::Result;
use crate::neighbor_queue::VoxelNeighborQueue;
use crate::types::{BucketAddress, DimensionMap, SliceMask, VoxelBox};

/// Labeled voxels per bucket, keyed by the mag-independent depth coordinate.
pub type LabelMasksByBucketAndW = HashMap<BucketAddress, HashMap<i32, SliceMask>>;

#[derive(Clone, Copy, Debug)]
pub struct FloodFillRequest {
  /// Global seed voxel (zoom step 0 coordinates).
  pub seed: IVec3,
  pub cell_id: u64,
  pub dimensions: DimensionMap,
  pub zoom_step: usize,
  /// 6-connected instead of 4-connected within the viewing plane.
  pub use_3d: bool,
}

impl FloodFillRequest {
  pub fn new(seed: IVec3, cell_id: u64, zoom_step: usize) -> Self {
    Self {
      seed,
      cell_id,
      dimensions: DimensionMap::XY,
      zoom_step,
      use_3d: false,
    }
  }

  pub fn with_dimensions(mut self, dimensions: DimensionMap) -> Self {
    self.dimensions = dimensions;
    self
  }

  pub fn with_3d(mut self, use_3d: bool) -> Self {
    self.use_3d = use_3d;
    self
  }
}

#[derive(Clone, Debug, Default)]
pub struct FloodFillResult {
  pub buckets_with_labeled_voxels_map: LabelMasksByBucketAndW,
  pub was_bounding_box_exceeded: bool,
  /// Tight box around all relabeled voxels; `None` if nothing was labeled.
  pub covered_bounding_box: Option<VoxelBox>,
  pub labeled_voxel_count: u64,
}

impl FloodFillResult {
  pub fn is_empty(&self) -> bool {
    self.labeled_voxel_count == 0
  }
}

/// Scan state shared across buckets.
struct FillState {
  masks: LabelMasksByBucketAndW,
  covered: Option<VoxelBox>,
  labeled_voxel_count: u64,
}

/// Pins and open mutations of a running fill, released on drop.
///
/// Dropping the fill future at an await point still unpins the worklist and
/// commits every bucket relabeled so far.
struct FillGuard {
  worklist: Vec<(DataBucketRef, IVec3)>,
  mutated: Vec<DataBucketRef>,
  push_queue: Arc<dyn PushQueue>,
}

impl FillGuard {
  fn new(push_queue: Arc<dyn PushQueue>) -> Self {
    Self {
      worklist: Vec::new(),
      mutated: Vec::new(),
      push_queue,
    }
  }

  fn push(&mut self, bucket: DataBucketRef, offset: IVec3) {
    bucket.borrow_mut().pin();
    self.worklist.push((bucket, offset));
  }

  fn pop(&mut self) -> Option<(DataBucketRef, IVec3)> {
    let (bucket, offset) = self.worklist.pop()?;
    bucket.borrow_mut().unpin();
    Some((bucket, offset))
  }
}

impl Drop for FillGuard {
  fn drop(&mut self) {
    for (bucket, _) in self.worklist.drain(..) {
      bucket.borrow_mut().unpin();
    }

    let mut touched = false;
    for bucket in self.mutated.drain(..) {
      let (address, snapshot) = {
        let mut guard = bucket.borrow_mut();
        (guard.address(), guard.end_data_mutation())
      };
      if let Some(snapshot) = snapshot {
        self.push_queue.insert(address, snapshot);
        touched = true;
      }
    }
    if touched {
      self.push_queue.push();
    }
  }
}

impl DataCube {
  /// Relabel the connected region of the seed's id to `request.cell_id`.
  ///
  /// `floodfill_bounding_box` may grow by whole buckets while the voxel
  /// threshold allows it. Touched buckets are committed to the push queue.
  #[tracing::instrument(skip_all, fields(layer = %self.layer_name, seed = ?request.seed))]
  pub async fn flood_fill(
    &mut self,
    request: FloodFillRequest,
    floodfill_bounding_box: &mut VoxelBox,
    progress: &mut dyn ProgressCallback,
  ) -> Result<FloodFillResult> {
    let started = Instant::now();
    let FloodFillRequest {
      seed,
      dimensions,
      zoom_step,
      use_3d,
      ..
    } = request;
    let mag = self.resolutions.get_resolution_by_index_or_err(zoom_step)?;

    let seed_address = self.position_to_zoomed_address(seed, zoom_step)?;
    let Bucket::Data(seed_bucket) = self.get_or_create_bucket(seed_address) else {
      return Ok(FloodFillResult::default());
    };
    self.ensure_loaded(&seed_bucket).await;

    let seed_offset = self.get_voxel_offset(seed, zoom_step)?;
    let source_cell_id = seed_bucket
      .borrow()
      .get_data()
      .map_or(0, |data| data.get(get_voxel_index_by_voxel_offset(seed_offset)));
    let cell_id = self.element_class.cast(request.cell_id);
    if source_cell_id == cell_id {
      return Ok(FloodFillResult::default());
    }

    let threshold = self.config.floodfill_voxel_threshold;
    let progress_interval = self.config.progress_interval.max(1);
    let mut next_progress = progress_interval;
    let mut was_bounding_box_exceeded = false;
    let mut state = FillState {
      masks: HashMap::new(),
      covered: None,
      labeled_voxel_count: 0,
    };

    let mut fill = FillGuard::new(Arc::clone(&self.push_queue));
    fill.push(seed_bucket, seed_offset);

    while let Some((bucket, initial_offset)) = fill.pop() {
      if bucket.borrow().is_destroyed() {
        continue;
      }

      let bucket_box = bucket.borrow().bounding_box();
      let mut should_ignore_bucket = false;
      while !bucket_box.overlaps_or_touches(floodfill_bounding_box) {
        match threshold {
          Some(limit) if state.labeled_voxel_count <= limit => {
            grow_towards_bucket(floodfill_bounding_box, seed);
          }
          _ => {
            was_bounding_box_exceeded = true;
            should_ignore_bucket = true;
            break;
          }
        }
      }
      if should_ignore_bucket {
        continue;
      }

      self.ensure_loaded(&bucket).await;

      let (address, outside) = {
        let mut guard = bucket.borrow_mut();
        let initial_index = get_voxel_index_by_voxel_offset(initial_offset);
        let matches_source = guard
          .get_data()
          .map_or(0, |data| data.get(initial_index))
          == source_cell_id;
        if !matches_source {
          continue;
        }

        let address = guard.address();
        if !state.masks.contains_key(&address) {
          fill.mutated.push(Rc::clone(&bucket));
        }
        guard.start_data_mutation();
        let top_left_in_mag = guard.top_left_in_mag();
        let global_position = guard.global_position();
        let data = guard.get_or_create_data();
        let masks = state.masks.entry(address).or_default();
        let mut mark = |uvw: IVec3| {
          let w = dimensions.w();
          let w_global = (top_left_in_mag[w] + uvw.z) * mag[w];
          masks.entry(w_global).or_default().mark(uvw.x, uvw.y);
        };

        data.set(initial_index, cell_id);
        let initial_uvw = dimensions.to_uvw(initial_offset);
        mark(initial_uvw);
        state.labeled_voxel_count += 1;
        let mut covered = state.covered;
        let mut include = |xyz: IVec3| {
          let global = global_position + xyz * mag;
          let mut voxel_box = covered.unwrap_or(VoxelBox::around_voxel(global));
          voxel_box.include(global);
          covered = Some(voxel_box);
        };
        include(initial_offset);

        let mut outside = Vec::new();
        let mut labeled_here = 0u64;
        let mut queue = VoxelNeighborQueue::new(initial_uvw, use_3d);
        while let Some(neighbors) = queue.get_voxel_and_get_neighbors() {
          for neighbor_uvw in neighbors {
            let neighbor_xyz = dimensions.to_xyz(neighbor_uvw);
            if let Some(resolved) = address.resolve_voxel_offset(neighbor_xyz) {
              outside.push(resolved);
              continue;
            }
            let index = get_voxel_index_by_voxel_offset(neighbor_xyz);
            if data.get(index) == source_cell_id {
              data.set(index, cell_id);
              mark(neighbor_uvw);
              queue.push_voxel(neighbor_uvw);
              labeled_here += 1;
              include(neighbor_xyz);
            }
          }
        }
        state.labeled_voxel_count += labeled_here;
        state.covered = covered;
        (address, outside)
      };

      for (neighbor_address, local_offset) in outside {
        if let Bucket::Data(neighbor) = self.get_or_create_bucket(neighbor_address) {
          fill.push(neighbor, local_offset);
        }
      }

      while state.labeled_voxel_count >= next_progress {
        let millions = next_progress as f64 / 1_000_000.0;
        info!(labeled = next_progress, ?address, "flood fill in progress");
        progress
          .report(false, format!("Labeled {millions} MVx. Continuing..."))
          .await;
        next_progress += progress_interval;
      }
    }

    // Commits the relabeled buckets.
    drop(fill);

    debug!(
      labeled = state.labeled_voxel_count,
      buckets = state.masks.len(),
      was_bounding_box_exceeded,
      elapsed_ms = started.elapsed().as_millis() as u64,
      "flood fill finished"
    );

    Ok(FloodFillResult {
      buckets_with_labeled_voxels_map: state.masks,
      was_bounding_box_exceeded,
      covered_bounding_box: state.covered,
      labeled_voxel_count: state.labeled_voxel_count,
    })
  }
}

/// Move the bounding box face closest to the seed outwards by one bucket.
fn grow_towards_bucket(floodfill_bounding_box: &mut VoxelBox, seed: IVec3) {
  let seed_to_min = seed - floodfill_bounding_box.min;
  let seed_to_max = floodfill_bounding_box.max - seed;
  let smallest_to_min = seed_to_min.min_element();
  let smallest_to_max = seed_to_max.min_element();
  if smallest_to_min < smallest_to_max {
    let axis = first_axis_with(seed_to_min, smallest_to_min);
    floodfill_bounding_box.min[axis] -= BUCKET_WIDTH;
  } else {
    let axis = first_axis_with(seed_to_max, smallest_to_max);
    floodfill_bounding_box.max[axis] += BUCKET_WIDTH;
  }
}

fn first_axis_with(diff: IVec3, value: i32) -> usize {
  diff
    .to_array()
    .iter()
    .position(|&d| d == value)
    .unwrap_or(0)
}

#[cfg(test)]
#[path = "flood_fill_test.rs"]
mod flood_fill_test;
