//! DataCube - sparse multi-resolution bucket cache of one layer.
//!
//! The cube keeps one [`CubeEntry`] per zoom step and a flat eviction ring
//! shared by all of them. Addresses outside the active bounding box resolve
//! to the Null bucket and never allocate.
//!
//! # Eviction
//!
//! ```text
//!            cursor
//!              │
//!   ┌────┬────┬▼───┬────┬────┬────┐
//!   │ b0 │ b1 │ b2 │ b3 │ .. │ bn │   ring of bucket handles
//!   └────┴────┴────┴────┴────┴────┘
//! ```
//!
//! Below the soft limit new buckets are appended. At the limit the cursor
//! scans forward (at most one full pass) for a collectible bucket, evicts it
//! and reuses its slot. If every bucket is dirty, loading or pinned the ring
//! grows by one slot instead; the soft limit is advisory.
//!
//! # Concurrency
//!
//! Single cooperative owner. Loads run concurrently in the pull queue;
//! their completions are applied either by [`DataCube::process_pull_completions`]
//! or by an awaiting operation such as flood fill.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future;
use glam::IVec3;
use tracing::{debug, error, warn};

use crate::bounding_box::BoundingBox;
use crate::bucket::{Bucket, BucketOperation, BucketState, DataBucket, DataBucketRef, LabelOutcome};
use crate::collaborators::{
  ActiveMapping, DetachedQueue, Mapping, MappingProvider, MappingStatus, PullQueue, PushQueue,
  StaticMappings,
};
use crate::config::{CubeConfig, LayerDescriptor, ResolutionInfo};
use crate::constants::{get_voxel_index_by_voxel_offset, BUCKET_WIDTH};
use crate::error::Result;
use crate::types::{BucketAddress, BucketData, ElementClass, VoxelBox};

mod cube_entry;
mod flood_fill;
mod stats;
mod temporal;

pub use cube_entry::CubeEntry;
pub use flood_fill::{FloodFillRequest, FloodFillResult, LabelMasksByBucketAndW};
pub use stats::CubeStats;
pub use temporal::TemporalBucketManager;

// =============================================================================
// Collaborators
// =============================================================================

/// Shared handles to the services a cube talks to.
///
/// Build these first, then hand them to [`DataCube::new`].
#[derive(Clone)]
pub struct CubeCollaborators {
  pub pull_queue: Arc<dyn PullQueue>,
  pub push_queue: Arc<dyn PushQueue>,
  pub mappings: Arc<dyn MappingProvider>,
}

impl CubeCollaborators {
  pub fn new(pull_queue: Arc<dyn PullQueue>, push_queue: Arc<dyn PushQueue>) -> Self {
    Self {
      pull_queue,
      push_queue,
      mappings: Arc::new(StaticMappings::new()),
    }
  }

  /// No backend: pulls resolve as missing, pushes are dropped.
  pub fn detached() -> Self {
    Self::new(Arc::new(DetachedQueue), Arc::new(DetachedQueue))
  }

  pub fn with_mappings(mut self, mappings: Arc<dyn MappingProvider>) -> Self {
    self.mappings = mappings;
    self
  }
}

// =============================================================================
// DataCube
// =============================================================================

pub struct DataCube {
  layer_name: String,
  upper_boundary: IVec3,
  resolutions: Arc<ResolutionInfo>,
  element_class: ElementClass,
  is_segmentation: bool,
  restriction: Option<VoxelBox>,
  config: CubeConfig,

  cubes: Vec<CubeEntry>,
  buckets: Vec<DataBucketRef>,
  bucket_iterator: usize,
  bounding_box: BoundingBox,

  pull_queue: Arc<dyn PullQueue>,
  push_queue: Arc<dyn PushQueue>,
  mappings: Arc<dyn MappingProvider>,
  temporal_bucket_manager: TemporalBucketManager,

  stats: CubeStats,
  access_clock: Cell<u64>,
}

impl DataCube {
  pub fn new(layer: LayerDescriptor, config: CubeConfig, collaborators: CubeCollaborators) -> Self {
    let base_boundary = layer.base_bucket_boundary();
    let LayerDescriptor {
      name,
      upper_boundary,
      resolutions,
      element_class,
      is_segmentation,
      restriction,
    } = layer;
    let resolutions = Arc::new(resolutions);

    let cubes = resolutions
      .resolutions_with_indices()
      .map(|(_, mag)| {
        let zoomed = (base_boundary + mag - IVec3::ONE).div_euclid(mag);
        CubeEntry::new(zoomed + IVec3::ONE)
      })
      .collect();

    let bounding_box = BoundingBox::new(restriction, upper_boundary, Arc::clone(&resolutions));

    Self {
      layer_name: name,
      upper_boundary,
      resolutions,
      element_class,
      is_segmentation,
      restriction,
      config,
      cubes,
      buckets: Vec::new(),
      bucket_iterator: 0,
      bounding_box,
      pull_queue: collaborators.pull_queue,
      push_queue: collaborators.push_queue,
      mappings: collaborators.mappings,
      temporal_bucket_manager: TemporalBucketManager::new(),
      stats: CubeStats::default(),
      access_clock: Cell::new(0),
    }
  }

  // ---------------------------------------------------------------------------
  // Accessors
  // ---------------------------------------------------------------------------

  pub fn layer_name(&self) -> &str {
    &self.layer_name
  }

  pub fn upper_boundary(&self) -> IVec3 {
    self.upper_boundary
  }

  pub fn resolutions(&self) -> &ResolutionInfo {
    &self.resolutions
  }

  pub fn element_class(&self) -> ElementClass {
    self.element_class
  }

  pub fn is_segmentation(&self) -> bool {
    self.is_segmentation
  }

  pub fn config(&self) -> &CubeConfig {
    &self.config
  }

  pub fn bounding_box(&self) -> &BoundingBox {
    &self.bounding_box
  }

  pub fn stats(&self) -> CubeStats {
    self.stats
  }

  pub fn cube_entry(&self, zoom_step: usize) -> Option<&CubeEntry> {
    self.cubes.get(zoom_step)
  }

  /// Slots in the eviction ring.
  pub fn bucket_count(&self) -> usize {
    self.buckets.len()
  }

  /// Buckets reachable through the per-resolution maps.
  pub fn live_bucket_count(&self) -> usize {
    self.cubes.iter().map(CubeEntry::len).sum()
  }

  /// Buckets whose mutations wait for their load to settle.
  pub fn pending_merge_count(&self) -> usize {
    self.temporal_bucket_manager.count()
  }

  pub fn get_null_bucket(&self) -> Bucket {
    Bucket::Null
  }

  /// Replace the annotation restriction. Existing buckets are kept.
  pub fn set_bounding_box_restriction(&mut self, restriction: Option<VoxelBox>) {
    self.restriction = restriction;
    self.bounding_box = BoundingBox::new(
      restriction,
      self.upper_boundary,
      Arc::clone(&self.resolutions),
    );
  }

  /// Clip a region to the layer's active bounding box.
  pub fn clip_to_layer_bounds(&self, region: &VoxelBox) -> VoxelBox {
    self.bounding_box.intersected_with(region)
  }

  fn tick(&self) -> u64 {
    let tick = self.access_clock.get() + 1;
    self.access_clock.set(tick);
    tick
  }

  // ---------------------------------------------------------------------------
  // Lookup and creation
  // ---------------------------------------------------------------------------

  pub fn is_within_bounds(&self, address: BucketAddress) -> bool {
    self.cubes.get(address.zoom_step).is_some() && self.bounding_box.contains_bucket(address)
  }

  pub fn get_bucket_index(&self, address: BucketAddress) -> Option<usize> {
    self.cubes.get(address.zoom_step)?.bucket_index(address.position)
  }

  /// Existing bucket or a new one. Only addresses outside the bounding box
  /// yield the Null bucket.
  pub fn get_or_create_bucket(&mut self, address: BucketAddress) -> Bucket {
    if !self.is_within_bounds(address) {
      return Bucket::Null;
    }
    match self.get_bucket(address, true) {
      Bucket::Null => Bucket::Data(self.create_bucket(address)),
      bucket => bucket,
    }
  }

  /// Existing bucket or the Null bucket. Never allocates.
  pub fn get_bucket(&self, address: BucketAddress, skip_bounds_check: bool) -> Bucket {
    if !skip_bounds_check && !self.is_within_bounds(address) {
      return Bucket::Null;
    }
    let Some(bucket) = self
      .get_bucket_index(address)
      .and_then(|index| self.cubes[address.zoom_step].get(index))
    else {
      return Bucket::Null;
    };
    if let Ok(mut bucket) = bucket.try_borrow_mut() {
      bucket.touch(self.tick());
    }
    Bucket::Data(Rc::clone(bucket))
  }

  fn create_bucket(&mut self, address: BucketAddress) -> DataBucketRef {
    let mag = self
      .resolutions
      .get_resolution_by_index(address.zoom_step)
      .unwrap_or(IVec3::ONE);
    let bucket = Rc::new(RefCell::new(DataBucket::new(address, mag, self.element_class)));
    bucket.borrow_mut().touch(self.tick());
    self.add_bucket_to_garbage_collection(Rc::clone(&bucket));

    if let Some(index) = self.get_bucket_index(address) {
      self.cubes[address.zoom_step].insert(index, Rc::clone(&bucket));
    }
    bucket
  }

  // ---------------------------------------------------------------------------
  // Eviction
  // ---------------------------------------------------------------------------

  /// Enroll a new bucket in the eviction ring, evicting a collectible bucket
  /// if the soft limit is reached.
  pub fn add_bucket_to_garbage_collection(&mut self, bucket: DataBucketRef) {
    let soft_limit = self.config.bucket_count_soft_limit;
    if self.buckets.len() >= soft_limit {
      let len = self.buckets.len();
      let mut found_collectible = false;
      for _ in 0..len {
        self.bucket_iterator = (self.bucket_iterator + 1) % len;
        if self.buckets[self.bucket_iterator].borrow().should_collect() {
          found_collectible = true;
          break;
        }
      }

      if found_collectible {
        let victim = Rc::clone(&self.buckets[self.bucket_iterator]);
        self.collect_bucket(&victim);
        self.stats.evictions += 1;
      } else {
        self.stats.ring_growths += 1;
        if len % self.config.allocation_warning_interval.max(1) == 0 {
          self.stats.allocation_warnings += 1;
          warn!(
            layer = %self.layer_name,
            element_class = ?self.element_class,
            is_segmentation = self.is_segmentation,
            "More than {} buckets needed to be allocated.",
            len
          );
        }
        if len > 2 * soft_limit && !self.stats.hard_limit_exceeded {
          self.stats.hard_limit_exceeded = true;
          error!(
            layer = %self.layer_name,
            bucket_count = len,
            "an unusually large amount of image data had to be allocated; save your work and reload"
          );
        }
        // Append: the cursor may point one past the end.
        self.bucket_iterator = len;
      }
    }

    if self.bucket_iterator == self.buckets.len() {
      self.buckets.push(bucket);
    } else {
      self.buckets[self.bucket_iterator] = bucket;
    }
    self.bucket_iterator = (self.bucket_iterator + 1) % (self.buckets.len() + 1);
  }

  /// Destroy a bucket and drop its map entry.
  fn collect_bucket(&mut self, bucket: &DataBucketRef) {
    let address = bucket.borrow().address();
    bucket.borrow_mut().destroy();
    if let Some(index) = self.get_bucket_index(address) {
      let cube = &mut self.cubes[address.zoom_step];
      if cube.get(index).is_some_and(|entry| Rc::ptr_eq(entry, bucket)) {
        cube.remove(index);
      }
    }
    debug!(?address, "collected bucket");
  }

  /// Full teardown: abort loads and destroy every live bucket.
  #[tracing::instrument(skip_all, fields(layer = %self.layer_name))]
  pub fn collect_all_buckets(&mut self) {
    self.pull_queue.clear();
    self.pull_queue.abort_requests();

    let buckets = std::mem::take(&mut self.buckets);
    for bucket in &buckets {
      self.collect_bucket(bucket);
    }
    self.stats.teardown_collections += buckets.len();
    self.bucket_iterator = 0;
    self.temporal_bucket_manager.clear();
    debug!(count = buckets.len(), "collected all buckets");
  }

  // ---------------------------------------------------------------------------
  // Mapping
  // ---------------------------------------------------------------------------

  fn active_mapping(&self) -> Option<ActiveMapping> {
    if !self.is_segmentation {
      return None;
    }
    self.mappings.active_mapping(&self.layer_name)
  }

  pub fn is_mapping_enabled(&self) -> bool {
    self
      .active_mapping()
      .is_some_and(|active| active.status == MappingStatus::Enabled)
  }

  pub fn get_mapping(&self) -> Option<Arc<Mapping>> {
    self.active_mapping().and_then(|active| active.mapping)
  }

  pub fn should_hide_unmapped_ids(&self) -> bool {
    self
      .active_mapping()
      .is_some_and(|active| active.status == MappingStatus::Enabled && active.hide_unmapped_ids)
  }

  pub fn map_id(&self, id: u64) -> u64 {
    let Some(active) = self.active_mapping() else {
      return id;
    };
    if active.status != MappingStatus::Enabled {
      return id;
    }
    match active.mapping.as_deref().and_then(|mapping| mapping.get(&id)) {
      Some(&mapped) => mapped,
      None if active.hide_unmapped_ids => 0,
      None => id,
    }
  }

  // ---------------------------------------------------------------------------
  // Voxel reads
  // ---------------------------------------------------------------------------

  /// Raw (or remapped) value at `voxel`; 0 if the bucket holds no data.
  pub fn get_data_value(&self, voxel: IVec3, mapping: Option<&Mapping>, zoom_step: usize) -> u64 {
    let (Ok(address), Ok(index)) = (
      self.position_to_zoomed_address(voxel, zoom_step),
      self.get_voxel_index(voxel, zoom_step),
    ) else {
      return 0;
    };
    let bucket = self.get_bucket(address, false);
    let Some(bucket) = bucket.as_data() else {
      return 0;
    };
    let bucket = bucket.borrow();
    let Some(value) = bucket.get_data().map(|data| data.get(index)) else {
      return 0;
    };
    mapping
      .and_then(|mapping| mapping.get(&value).copied())
      .unwrap_or(value)
  }

  /// Value at `voxel` through the active mapping, if enabled.
  pub fn get_mapped_data_value(&self, voxel: IVec3, zoom_step: usize) -> u64 {
    let mapping = if self.is_mapping_enabled() {
      self.get_mapping()
    } else {
      None
    };
    self.get_data_value(voxel, mapping.as_deref(), zoom_step)
  }

  // ---------------------------------------------------------------------------
  // Address arithmetic
  // ---------------------------------------------------------------------------

  /// Bucket containing the global voxel `position` at `zoom_step`.
  pub fn position_to_zoomed_address(&self, position: IVec3, zoom_step: usize) -> Result<BucketAddress> {
    let mag = self.resolutions.get_resolution_by_index_or_err(zoom_step)?;
    Ok(BucketAddress::from_position(
      position.div_euclid(mag * BUCKET_WIDTH),
      zoom_step,
    ))
  }

  pub fn position_to_base_address(&self, position: IVec3) -> BucketAddress {
    BucketAddress::from_position(position.div_euclid(IVec3::splat(BUCKET_WIDTH)), 0)
  }

  /// Offset of a global voxel inside its bucket: `floor(voxel / mag) mod 32`.
  pub fn get_voxel_offset(&self, voxel: IVec3, zoom_step: usize) -> Result<IVec3> {
    let mag = self.resolutions.get_resolution_by_index_or_err(zoom_step)?;
    Ok(voxel.div_euclid(mag).rem_euclid(IVec3::splat(BUCKET_WIDTH)))
  }

  pub fn get_voxel_index(&self, voxel: IVec3, zoom_step: usize) -> Result<usize> {
    Ok(get_voxel_index_by_voxel_offset(self.get_voxel_offset(voxel, zoom_step)?))
  }

  /// `x + y * 32 + z * 32²`.
  #[inline]
  pub fn get_voxel_index_by_voxel_offset(&self, offset: IVec3) -> usize {
    get_voxel_index_by_voxel_offset(offset)
  }

  // ---------------------------------------------------------------------------
  // Loading
  // ---------------------------------------------------------------------------

  /// Create the buckets at `addresses` and pull those not yet requested.
  ///
  /// Returns the number of pulls issued.
  pub fn request_buckets(&mut self, addresses: &[BucketAddress]) -> usize {
    let mut to_pull: Vec<DataBucketRef> = Vec::new();
    for &address in addresses {
      let Bucket::Data(bucket) = self.get_or_create_bucket(address) else {
        continue;
      };
      let unrequested = bucket.borrow().state() == BucketState::Unrequested;
      if unrequested && !to_pull.iter().any(|queued| Rc::ptr_eq(queued, &bucket)) {
        to_pull.push(bucket);
      }
    }
    self.issue_pulls(&to_pull);
    to_pull.len()
  }

  fn issue_pulls(&mut self, buckets: &[DataBucketRef]) {
    if buckets.is_empty() {
      return;
    }
    let addresses: Vec<BucketAddress> = buckets.iter().map(|b| b.borrow().address()).collect();
    let mut loads = self.pull_queue.pull(&addresses).into_iter();
    for bucket in buckets {
      match loads.next() {
        Some(load) => bucket.borrow_mut().mark_requested(load),
        None => {
          warn!(address = ?bucket.borrow().address(), "pull queue returned no completion");
          self.apply_loaded(bucket, None);
        }
      }
    }
  }

  /// Suspend until the bucket's load settled. Issues the pull if needed.
  ///
  /// The load is polled through the bucket. Dropping the returned future
  /// leaves it on the bucket for `process_pull_completions`.
  pub(crate) async fn ensure_loaded(&mut self, bucket: &DataBucketRef) {
    let needs_pull = {
      let mut guard = bucket.borrow_mut();
      if guard.is_settled() || guard.is_destroyed() {
        return;
      }
      guard.pending_load_mut().is_none()
    };
    if needs_pull {
      let address = bucket.borrow().address();
      match self.pull_queue.pull(&[address]).pop() {
        Some(load) => bucket.borrow_mut().mark_requested(load),
        None => {
          warn!(?address, "pull queue returned no completion");
          self.apply_loaded(bucket, None);
          return;
        }
      }
    }

    let settled = future::poll_fn(|cx| {
      let mut guard = bucket.borrow_mut();
      if guard.is_settled() || guard.is_destroyed() {
        return Poll::Ready(None);
      }
      match guard.pending_load_mut() {
        Some(load) => load.as_mut().poll(cx).map(Some),
        None => Poll::Ready(Some(None)),
      }
    })
    .await;
    if let Some(data) = settled {
      self.apply_loaded(bucket, data);
    }
  }

  /// Settle a load: clip to the bounding box, merge queued mutations, and
  /// commit buckets that were mutated while loading.
  fn apply_loaded(&mut self, bucket: &DataBucketRef, mut data: Option<BucketData>) {
    let address = {
      let guard = bucket.borrow();
      if guard.is_destroyed() {
        return;
      }
      guard.address()
    };
    let element_class = self.element_class;
    if let Some(payload) = data
      .as_mut()
      .filter(|payload| payload.validate(element_class).is_ok())
    {
      self.bounding_box.remove_outside_area(address, payload);
    }
    bucket.borrow_mut().receive_data(data);

    if self.temporal_bucket_manager.bucket_loaded(address) {
      self.commit_bucket(bucket);
      self.trigger_push_queue();
    }
  }

  /// Poll every requested bucket once and apply finished loads.
  ///
  /// Returns the number of loads applied.
  pub fn process_pull_completions(&mut self) -> usize {
    let waker = futures::task::noop_waker();
    let mut cx = Context::from_waker(&waker);

    let mut finished = Vec::new();
    for bucket in &self.buckets {
      let mut guard = bucket.borrow_mut();
      if let Some(load) = guard.pending_load_mut() {
        if let Poll::Ready(data) = load.as_mut().poll(&mut cx) {
          finished.push((Rc::clone(bucket), data));
        }
      }
    }

    let count = finished.len();
    for (bucket, data) in finished {
      self.apply_loaded(&bucket, data);
    }
    count
  }

  /// Bucket at `address` once its load settled.
  pub async fn get_loaded_bucket(&mut self, address: BucketAddress) -> Bucket {
    let bucket = self.get_or_create_bucket(address);
    if let Bucket::Data(data_bucket) = &bucket {
      self.ensure_loaded(data_bucket).await;
    }
    bucket
  }

  /// Inject a payload, e.g. after undo. Ignored for Null addresses.
  pub fn set_bucket_data(&mut self, address: BucketAddress, data: BucketData) -> Result<()> {
    data.validate(self.element_class)?;
    if let Bucket::Data(bucket) = self.get_or_create_bucket(address) {
      self.apply_loaded(&bucket, Some(data));
    }
    Ok(())
  }

  // ---------------------------------------------------------------------------
  // Mutation
  // ---------------------------------------------------------------------------

  /// Hand a bucket's snapshot to the push queue.
  fn commit_bucket(&self, bucket: &DataBucketRef) {
    let (address, snapshot) = {
      let mut guard = bucket.borrow_mut();
      (guard.address(), guard.end_data_mutation())
    };
    if let Some(snapshot) = snapshot {
      self.push_queue.insert(address, snapshot);
    }
  }

  /// Apply an operation, deferring the commit until the load settles.
  fn label_bucket(&mut self, bucket: &DataBucketRef, operation: BucketOperation) {
    let (outcome, address, unrequested) = {
      let mut guard = bucket.borrow_mut();
      let outcome = guard.label(operation);
      (outcome, guard.address(), guard.state() == BucketState::Unrequested)
    };
    match outcome {
      LabelOutcome::Applied => self.commit_bucket(bucket),
      LabelOutcome::Queued => {
        self.temporal_bucket_manager.add_bucket(address);
        if unrequested {
          self.issue_pulls(std::slice::from_ref(bucket));
        }
      }
    }
  }

  pub fn trigger_push_queue(&self) {
    self.push_queue.push();
  }

  /// The push queue saved the bucket at `address`; it may be evicted again.
  pub fn mark_bucket_as_pushed(&mut self, address: BucketAddress) -> bool {
    match self.get_bucket(address, true) {
      Bucket::Data(bucket) => {
        bucket.borrow_mut().mark_as_pushed();
        true
      }
      Bucket::Null => false,
    }
  }

  /// Single-voxel write across every resolution.
  ///
  /// Kept for API compatibility; bulk edits go through flood fill or
  /// labeled voxel maps. With `active_cell_id`, only voxels currently
  /// holding that (mapped) id are overwritten.
  pub fn label_voxel_in_all_resolutions(
    &mut self,
    voxel: IVec3,
    label: u64,
    active_cell_id: Option<u64>,
  ) -> Result<()> {
    for zoom_step in 0..self.resolutions.len() {
      self.label_voxel_in_resolution(voxel, label, zoom_step, active_cell_id)?;
    }
    self.trigger_push_queue();
    Ok(())
  }

  fn label_voxel_in_resolution(
    &mut self,
    voxel: IVec3,
    label: u64,
    zoom_step: usize,
    active_cell_id: Option<u64>,
  ) -> Result<()> {
    let in_dataset = voxel.cmpge(IVec3::ZERO).all() && voxel.cmplt(self.upper_boundary).all();
    if !in_dataset {
      return Ok(());
    }
    let address = self.position_to_zoomed_address(voxel, zoom_step)?;
    let Bucket::Data(bucket) = self.get_or_create_bucket(address) else {
      return Ok(());
    };
    let voxel_index = self.get_voxel_index(voxel, zoom_step)?;
    let should_update = active_cell_id
      .map_or(true, |cell_id| self.get_mapped_data_value(voxel, zoom_step) == cell_id);
    if should_update {
      let label = self.element_class.cast(label);
      self.label_bucket(&bucket, Box::new(move |data: &mut BucketData| data.set(voxel_index, label)));
    }
    Ok(())
  }

  // ---------------------------------------------------------------------------
  // Renderability
  // ---------------------------------------------------------------------------

  /// False means a coarser zoom step should be examined for rendering.
  pub fn is_zoom_step_currently_renderable_for_voxel(&self, voxel: IVec3, zoom_step: usize) -> bool {
    let Ok(address) = self.position_to_zoomed_address(voxel, zoom_step) else {
      return false;
    };
    match self.get_bucket(address, false) {
      // Outside the box every zoom step is as good as this one.
      Bucket::Null => self.config.render_missing_data_black,
      Bucket::Data(bucket) => {
        let bucket = bucket.borrow();
        bucket.has_data() || bucket.is_loaded()
      }
    }
  }

  pub fn get_next_currently_usable_zoom_step_for_position(&self, position: IVec3, zoom_step: usize) -> usize {
    let coarsest = self.resolutions.len().saturating_sub(1);
    let mut usable = zoom_step;
    while usable < coarsest && !self.is_zoom_step_currently_renderable_for_voxel(position, usable) {
      usable += 1;
    }
    usable
  }

  /// Like [`Self::is_zoom_step_currently_renderable_for_voxel`], after the
  /// bucket's load settled.
  pub async fn is_zoom_step_ultimately_renderable_for_voxel(&mut self, voxel: IVec3, zoom_step: usize) -> bool {
    if let Ok(address) = self.position_to_zoomed_address(voxel, zoom_step) {
      self.get_loaded_bucket(address).await;
    }
    self.is_zoom_step_currently_renderable_for_voxel(voxel, zoom_step)
  }

  pub async fn get_next_ultimately_usable_zoom_step_for_position(
    &mut self,
    position: IVec3,
    zoom_step: usize,
  ) -> usize {
    let coarsest = self.resolutions.len().saturating_sub(1);
    let mut usable = zoom_step;
    while usable < coarsest && !self.is_zoom_step_ultimately_renderable_for_voxel(position, usable).await {
      usable += 1;
    }
    usable
  }
}
