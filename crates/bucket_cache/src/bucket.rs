//! Buckets: the atomic unit of load, cache, and mutation.
//!
//! A bucket is a 32³ voxel cube at one address. It starts `Unrequested`,
//! becomes `Requested` once a pull is issued and settles as `Loaded` or
//! `Missing`. Mutations issued before the load settles are applied to a local
//! zero-filled payload and queued; when the fetched payload arrives the queue
//! is replayed on top of it (merge-on-load).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::IVec3;

use crate::collaborators::PendingLoad;
use crate::constants::BUCKET_WIDTH;
use crate::types::{BucketAddress, BucketData, ElementClass, VoxelBox};

// =============================================================================
// BucketId - unique identifier
// =============================================================================

static BUCKET_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of one bucket instance. A bucket re-created at the same address
/// after eviction gets a new id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BucketId(u64);

impl BucketId {
  fn next() -> Self {
    Self(BUCKET_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  pub fn raw(&self) -> u64 {
    self.0
  }
}

// =============================================================================
// State
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketState {
  /// Sentinel state of the Null bucket.
  Null,
  Unrequested,
  Requested,
  Loaded,
  Missing,
}

/// Mutation replayed onto fetched data once a load settles.
pub type BucketOperation = Box<dyn Fn(&mut BucketData)>;

/// Whether [`DataBucket::label`] could apply an operation right away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelOutcome {
  Applied,
  /// Applied locally and queued for replay on load.
  Queued,
}

// =============================================================================
// DataBucket
// =============================================================================

pub struct DataBucket {
  id: BucketId,
  address: BucketAddress,
  mag: IVec3,
  element_class: ElementClass,
  state: BucketState,
  data: Option<BucketData>,
  pending_load: Option<PendingLoad>,
  pending_operations: Vec<BucketOperation>,
  dirty: bool,
  in_mutation: bool,
  pin_count: u32,
  last_touched: u64,
  destroyed: bool,
}

impl DataBucket {
  pub fn new(address: BucketAddress, mag: IVec3, element_class: ElementClass) -> Self {
    Self {
      id: BucketId::next(),
      address,
      mag,
      element_class,
      state: BucketState::Unrequested,
      data: None,
      pending_load: None,
      pending_operations: Vec::new(),
      dirty: false,
      in_mutation: false,
      pin_count: 0,
      last_touched: 0,
      destroyed: false,
    }
  }

  pub fn id(&self) -> BucketId {
    self.id
  }

  pub fn address(&self) -> BucketAddress {
    self.address
  }

  pub fn zoom_step(&self) -> usize {
    self.address.zoom_step
  }

  pub fn mag(&self) -> IVec3 {
    self.mag
  }

  pub fn element_class(&self) -> ElementClass {
    self.element_class
  }

  pub fn state(&self) -> BucketState {
    self.state
  }

  pub fn is_loaded(&self) -> bool {
    self.state == BucketState::Loaded
  }

  pub fn is_missing(&self) -> bool {
    self.state == BucketState::Missing
  }

  pub fn is_requested(&self) -> bool {
    self.state == BucketState::Requested
  }

  /// Loaded or missing: nothing more will arrive from the pull queue.
  pub fn is_settled(&self) -> bool {
    matches!(self.state, BucketState::Loaded | BucketState::Missing)
  }

  pub fn has_data(&self) -> bool {
    self.data.is_some()
  }

  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  pub fn is_pinned(&self) -> bool {
    self.pin_count > 0
  }

  pub fn is_destroyed(&self) -> bool {
    self.destroyed
  }

  pub fn has_pending_operations(&self) -> bool {
    !self.pending_operations.is_empty()
  }

  pub fn last_touched(&self) -> u64 {
    self.last_touched
  }

  pub fn touch(&mut self, tick: u64) {
    self.last_touched = tick;
  }

  pub fn pin(&mut self) {
    self.pin_count += 1;
  }

  pub fn unpin(&mut self) {
    self.pin_count = self.pin_count.saturating_sub(1);
  }

  /// Eviction candidate: not dirty, not loading, not pinned.
  pub fn should_collect(&self) -> bool {
    !self.dirty && !self.in_mutation && self.state != BucketState::Requested && self.pin_count == 0
  }

  // ---------------------------------------------------------------------------
  // Geometry
  // ---------------------------------------------------------------------------

  /// Top-left voxel in this bucket's own mag.
  pub fn top_left_in_mag(&self) -> IVec3 {
    self.address.position * BUCKET_WIDTH
  }

  /// Top-left voxel in zoom step 0 coordinates.
  pub fn global_position(&self) -> IVec3 {
    self.top_left_in_mag() * self.mag
  }

  /// Covered region in zoom step 0 coordinates.
  pub fn bounding_box(&self) -> VoxelBox {
    let min = self.global_position();
    VoxelBox::new(min, min + self.mag * BUCKET_WIDTH)
  }

  /// See [`BucketAddress::resolve_voxel_offset`].
  pub fn is_3d_voxel_inside_bucket(&self, offset: IVec3) -> Option<(BucketAddress, IVec3)> {
    self.address.resolve_voxel_offset(offset)
  }

  // ---------------------------------------------------------------------------
  // Data
  // ---------------------------------------------------------------------------

  pub fn get_data(&self) -> Option<&BucketData> {
    self.data.as_ref()
  }

  /// Payload, zero-filled on first access.
  pub fn get_or_create_data(&mut self) -> &mut BucketData {
    let element_class = self.element_class;
    self.data.get_or_insert_with(|| BucketData::zeroed(element_class))
  }

  pub(crate) fn mark_requested(&mut self, load: PendingLoad) {
    self.state = BucketState::Requested;
    self.pending_load = Some(load);
  }

  /// The load stays owned by the bucket until it settles, so any poller
  /// (an awaiting fill or `process_pull_completions`) can finish it.
  pub(crate) fn pending_load_mut(&mut self) -> Option<&mut PendingLoad> {
    self.pending_load.as_mut()
  }

  /// Settle the load. Queued operations are replayed on the fetched payload.
  ///
  /// Returns true if queued operations were replayed.
  pub fn receive_data(&mut self, fetched: Option<BucketData>) -> bool {
    self.pending_load = None;
    let fetched = match fetched {
      Some(data) if data.validate(self.element_class).is_err() => {
        tracing::warn!(
          address = ?self.address,
          expected = ?self.element_class,
          actual = ?data.element_class(),
          "discarding fetched bucket payload with unexpected layout"
        );
        None
      }
      other => other,
    };

    let replayed = !self.pending_operations.is_empty();
    match fetched {
      Some(mut data) => {
        for operation in &self.pending_operations {
          operation(&mut data);
        }
        self.data = Some(data);
        self.state = BucketState::Loaded;
      }
      // Local data (with the queued operations already applied) stays.
      None => self.state = BucketState::Missing,
    }
    self.pending_operations.clear();
    replayed
  }

  /// Apply `operation`, queueing it for replay if the load has not settled.
  pub fn label(&mut self, operation: BucketOperation) -> LabelOutcome {
    operation(self.get_or_create_data());
    self.dirty = true;
    if self.is_settled() {
      LabelOutcome::Applied
    } else {
      self.pending_operations.push(operation);
      LabelOutcome::Queued
    }
  }

  /// Open a mutation; the bucket stays uncollectible until pushed.
  pub fn start_data_mutation(&mut self) {
    self.dirty = true;
    self.in_mutation = true;
  }

  /// Close the mutation and return the snapshot to hand to the push queue.
  pub fn end_data_mutation(&mut self) -> Option<BucketData> {
    self.in_mutation = false;
    self.data.clone()
  }

  /// The push queue saved this bucket.
  pub fn mark_as_pushed(&mut self) {
    if !self.in_mutation && self.pending_operations.is_empty() {
      self.dirty = false;
    }
  }

  /// Release payload and in-flight load. The bucket must not be used again.
  pub fn destroy(&mut self) {
    self.data = None;
    self.pending_load = None;
    self.pending_operations.clear();
    self.destroyed = true;
  }
}

impl fmt::Debug for DataBucket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DataBucket")
      .field("id", &self.id)
      .field("address", &self.address)
      .field("state", &self.state)
      .field("dirty", &self.dirty)
      .field("pinned", &self.pin_count)
      .field("destroyed", &self.destroyed)
      .finish()
  }
}

// =============================================================================
// Bucket - handle or Null sentinel
// =============================================================================

/// Shared handle to a live bucket. The cube's per-resolution map owns the
/// canonical entry; the eviction ring and running flood fills hold clones.
pub type DataBucketRef = Rc<RefCell<DataBucket>>;

/// A live bucket, or the Null sentinel for addresses without valid data.
#[derive(Clone, Debug, Default)]
pub enum Bucket {
  #[default]
  Null,
  Data(DataBucketRef),
}

impl Bucket {
  pub fn is_null(&self) -> bool {
    matches!(self, Bucket::Null)
  }

  pub fn as_data(&self) -> Option<&DataBucketRef> {
    match self {
      Bucket::Null => None,
      Bucket::Data(bucket) => Some(bucket),
    }
  }

  pub fn into_data(self) -> Option<DataBucketRef> {
    match self {
      Bucket::Null => None,
      Bucket::Data(bucket) => Some(bucket),
    }
  }

  pub fn state(&self) -> BucketState {
    self
      .as_data()
      .map_or(BucketState::Null, |bucket| bucket.borrow().state())
  }

  pub fn has_data(&self) -> bool {
    self.as_data().is_some_and(|bucket| bucket.borrow().has_data())
  }

  /// True if both handles refer to the same instance (Null equals Null).
  pub fn same_instance(&self, other: &Bucket) -> bool {
    match (self, other) {
      (Bucket::Null, Bucket::Null) => true,
      (Bucket::Data(a), Bucket::Data(b)) => Rc::ptr_eq(a, b),
      _ => false,
    }
  }
}

#[cfg(test)]
#[path = "bucket_test.rs"]
mod bucket_test;
