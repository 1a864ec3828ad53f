//! Contracts of the services the cube talks to.
//!
//! The cube never fetches or saves bucket payloads itself. Queues are built
//! first and handed to `DataCube::new` as shared handles; load completion
//! flows back through the futures returned by [`PullQueue::pull`], so no
//! queue needs a reference to the cube.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::{BoxFuture, FutureExt, LocalBoxFuture};

use crate::types::{BucketAddress, BucketData};

/// Completion of one bucket fetch. `None` means the bucket does not exist
/// (or the fetch failed); the bucket becomes `Missing`.
pub type PendingLoad = BoxFuture<'static, Option<BucketData>>;

/// Asynchronous fetcher of bucket payloads.
pub trait PullQueue {
  /// Start fetching `addresses`. Returns one completion per address, in order.
  fn pull(&self, addresses: &[BucketAddress]) -> Vec<PendingLoad>;

  /// Drop queued requests that have not started yet.
  fn clear(&self);

  /// Cancel in-flight requests. Their completions resolve to `None`.
  fn abort_requests(&self);
}

/// Asynchronous saver of mutated buckets.
pub trait PushQueue {
  /// Enqueue a committed bucket snapshot for saving.
  fn insert(&self, address: BucketAddress, snapshot: BucketData);

  /// Flush everything enqueued so far.
  fn push(&self);
}

// =============================================================================
// Mapping provider
// =============================================================================

/// Segment id remapping table.
pub type Mapping = HashMap<u64, u64>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MappingStatus {
  #[default]
  Disabled,
  Enabled,
}

/// Mapping state of one layer.
#[derive(Clone, Debug, Default)]
pub struct ActiveMapping {
  pub status: MappingStatus,
  pub mapping: Option<Arc<Mapping>>,
  /// Map ids without a table entry to 0 while the mapping is enabled.
  pub hide_unmapped_ids: bool,
}

impl ActiveMapping {
  pub fn enabled(mapping: Mapping) -> Self {
    Self {
      status: MappingStatus::Enabled,
      mapping: Some(Arc::new(mapping)),
      hide_unmapped_ids: false,
    }
  }

  pub fn hiding_unmapped_ids(mut self) -> Self {
    self.hide_unmapped_ids = true;
    self
  }
}

/// Read-only accessor for the mapping state, keyed by layer name.
pub trait MappingProvider {
  fn active_mapping(&self, layer_name: &str) -> Option<ActiveMapping>;
}

/// In-memory mapping provider.
#[derive(Debug, Default)]
pub struct StaticMappings {
  layers: RwLock<HashMap<String, ActiveMapping>>,
}

impl StaticMappings {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&self, layer_name: impl Into<String>, mapping: ActiveMapping) {
    self.layers.write().unwrap_or_else(PoisonError::into_inner).insert(layer_name.into(), mapping);
  }

  pub fn remove(&self, layer_name: &str) {
    self.layers.write().unwrap_or_else(PoisonError::into_inner).remove(layer_name);
  }
}

impl MappingProvider for StaticMappings {
  fn active_mapping(&self, layer_name: &str) -> Option<ActiveMapping> {
    self.layers.read().unwrap_or_else(PoisonError::into_inner).get(layer_name).cloned()
  }
}

// =============================================================================
// Progress callback
// =============================================================================

/// Observer of long-running operations. The returned future resolves once the
/// report has been acknowledged.
pub trait ProgressCallback {
  fn report(&mut self, is_done: bool, message: String) -> LocalBoxFuture<'_, ()>;
}

/// Acknowledges every report immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressCallback for NoProgress {
  fn report(&mut self, _is_done: bool, _message: String) -> LocalBoxFuture<'_, ()> {
    futures::future::ready(()).boxed_local()
  }
}

impl<F, Fut> ProgressCallback for F
where
  F: FnMut(bool, String) -> Fut,
  Fut: Future<Output = ()> + 'static,
{
  fn report(&mut self, is_done: bool, message: String) -> LocalBoxFuture<'_, ()> {
    self(is_done, message).boxed_local()
  }
}

// =============================================================================
// DetachedQueue - no backend
// =============================================================================

/// Queue pair for cubes without a backend: every pull resolves as missing and
/// pushes are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetachedQueue;

impl PullQueue for DetachedQueue {
  fn pull(&self, addresses: &[BucketAddress]) -> Vec<PendingLoad> {
    addresses
      .iter()
      .map(|_| futures::future::ready(None).boxed())
      .collect()
  }

  fn clear(&self) {}

  fn abort_requests(&self) {}
}

impl PushQueue for DetachedQueue {
  fn insert(&self, _address: BucketAddress, _snapshot: BucketData) {}

  fn push(&self) {}
}

#[cfg(test)]
#[path = "collaborators_test.rs"]
mod collaborators_test;
