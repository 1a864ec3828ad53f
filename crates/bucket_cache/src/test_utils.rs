//! Test utilities: scriptable collaborators and cube fixtures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use futures::FutureExt;
use glam::IVec3;

use crate::collaborators::{PendingLoad, PullQueue, PushQueue};
use crate::config::{CubeConfig, LayerDescriptor, ResolutionInfo};
use crate::data_cube::{CubeCollaborators, DataCube};
use crate::types::{BucketAddress, BucketData, ElementClass};

// =============================================================================
// Collaborators
// =============================================================================

/// Pull queue whose loads settle only when the test resolves them.
#[derive(Default)]
pub struct ManualPullQueue {
  pending: Mutex<Vec<(BucketAddress, oneshot::Sender<Option<BucketData>>)>>,
  requested: Mutex<Vec<BucketAddress>>,
  clear_calls: AtomicUsize,
  abort_calls: AtomicUsize,
}

impl ManualPullQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Settle the oldest pending load of `address`. Returns false if none.
  pub fn resolve(&self, address: BucketAddress, data: Option<BucketData>) -> bool {
    let mut pending = self.pending.lock().unwrap();
    let Some(position) = pending.iter().position(|(a, _)| *a == address) else {
      return false;
    };
    let (_, tx) = pending.remove(position);
    tx.send(data).is_ok()
  }

  /// Settle every pending load as missing.
  pub fn resolve_all_missing(&self) {
    for (_, tx) in self.pending.lock().unwrap().drain(..) {
      let _ = tx.send(None);
    }
  }

  pub fn pending_count(&self) -> usize {
    self.pending.lock().unwrap().len()
  }

  /// Every address ever pulled, in order.
  pub fn requested(&self) -> Vec<BucketAddress> {
    self.requested.lock().unwrap().clone()
  }

  pub fn clear_calls(&self) -> usize {
    self.clear_calls.load(Ordering::Relaxed)
  }

  pub fn abort_calls(&self) -> usize {
    self.abort_calls.load(Ordering::Relaxed)
  }
}

impl PullQueue for ManualPullQueue {
  fn pull(&self, addresses: &[BucketAddress]) -> Vec<PendingLoad> {
    let mut pending = self.pending.lock().unwrap();
    self.requested.lock().unwrap().extend_from_slice(addresses);
    addresses
      .iter()
      .map(|&address| {
        let (tx, rx) = oneshot::channel();
        pending.push((address, tx));
        rx.map(|received| received.ok().flatten()).boxed()
      })
      .collect()
  }

  fn clear(&self) {
    self.clear_calls.fetch_add(1, Ordering::Relaxed);
  }

  fn abort_requests(&self) {
    self.abort_calls.fetch_add(1, Ordering::Relaxed);
    self.pending.lock().unwrap().clear();
  }
}

/// Push queue that records every snapshot and flush.
#[derive(Default)]
pub struct RecordingPushQueue {
  inserted: Mutex<Vec<(BucketAddress, BucketData)>>,
  push_calls: AtomicUsize,
}

impl RecordingPushQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn inserted_addresses(&self) -> Vec<BucketAddress> {
    self.inserted.lock().unwrap().iter().map(|(a, _)| *a).collect()
  }

  /// Most recent snapshot of `address`.
  pub fn last_snapshot(&self, address: BucketAddress) -> Option<BucketData> {
    self
      .inserted
      .lock()
      .unwrap()
      .iter()
      .rev()
      .find(|(a, _)| *a == address)
      .map(|(_, data)| data.clone())
  }

  pub fn push_calls(&self) -> usize {
    self.push_calls.load(Ordering::Relaxed)
  }
}

impl PushQueue for RecordingPushQueue {
  fn insert(&self, address: BucketAddress, snapshot: BucketData) {
    self.inserted.lock().unwrap().push((address, snapshot));
  }

  fn push(&self) {
    self.push_calls.fetch_add(1, Ordering::Relaxed);
  }
}

// =============================================================================
// Fixtures
// =============================================================================

/// 128³ voxel layer with mags 1, 2, 4.
pub fn test_layer(element_class: ElementClass) -> LayerDescriptor {
  LayerDescriptor::new(
    "segmentation",
    IVec3::splat(128),
    ResolutionInfo::isotropic(3),
    element_class,
  )
  .segmentation()
}

pub struct CubeFixture {
  pub cube: DataCube,
  pub pull: Arc<ManualPullQueue>,
  pub push: Arc<RecordingPushQueue>,
}

pub fn fixture_cube(layer: LayerDescriptor, config: CubeConfig) -> CubeFixture {
  let pull = Arc::new(ManualPullQueue::new());
  let push = Arc::new(RecordingPushQueue::new());
  let collaborators = CubeCollaborators::new(pull.clone(), push.clone());
  CubeFixture {
    cube: DataCube::new(layer, config, collaborators),
    pull,
    push,
  }
}

/// Uint32 segmentation cube with default config.
pub fn default_fixture() -> CubeFixture {
  fixture_cube(test_layer(ElementClass::Uint32), CubeConfig::default())
}

/// Load a bucket filled with `value`.
pub fn load_filled(cube: &mut DataCube, address: BucketAddress, value: u64) {
  let data = BucketData::filled(cube.element_class(), value);
  cube.set_bucket_data(address, data).unwrap();
}
