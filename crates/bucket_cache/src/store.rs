//! In-memory bucket backend.
//!
//! Serves pulls from a shared map on rayon's thread pool and buffers pushes
//! in a channel until flushed. Stands in for a remote datastore in tests,
//! benches and offline tools.
//!
//! ```ignore
//! let store = MemoryBucketStore::new();
//! store.insert_bucket(address, BucketData::filled(ElementClass::Uint32, 5));
//! let collaborators = CubeCollaborators::new(Arc::new(store.clone()), Arc::new(store.clone()));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crossbeam_channel::{self as channel, Receiver, Sender};
use futures::channel::oneshot;
use futures::FutureExt;

use crate::collaborators::{PendingLoad, PullQueue, PushQueue};
use crate::types::{BucketAddress, BucketData};

struct StoreInner {
  buckets: RwLock<HashMap<BucketAddress, BucketData>>,
  outbox_tx: Sender<(BucketAddress, BucketData)>,
  outbox_rx: Receiver<(BucketAddress, BucketData)>,
  flushed: Mutex<Vec<BucketAddress>>,
  /// Bumped on abort; loads started under an older generation resolve to `None`.
  generation: AtomicU64,
  pulls_served: AtomicU64,
}

/// Shared in-memory pull and push queue. Clones share state.
#[derive(Clone)]
pub struct MemoryBucketStore {
  inner: Arc<StoreInner>,
}

impl Default for MemoryBucketStore {
  fn default() -> Self {
    Self::new()
  }
}

impl MemoryBucketStore {
  pub fn new() -> Self {
    let (outbox_tx, outbox_rx) = channel::unbounded();
    Self {
      inner: Arc::new(StoreInner {
        buckets: RwLock::new(HashMap::new()),
        outbox_tx,
        outbox_rx,
        flushed: Mutex::new(Vec::new()),
        generation: AtomicU64::new(0),
        pulls_served: AtomicU64::new(0),
      }),
    }
  }

  /// Seed the backend with a stored bucket.
  pub fn insert_bucket(&self, address: BucketAddress, data: BucketData) {
    self.inner.buckets.write().unwrap_or_else(PoisonError::into_inner).insert(address, data);
  }

  pub fn get_bucket(&self, address: BucketAddress) -> Option<BucketData> {
    self.inner.buckets.read().unwrap_or_else(PoisonError::into_inner).get(&address).cloned()
  }

  pub fn len(&self) -> usize {
    self.inner.buckets.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Snapshots inserted but not yet flushed.
  pub fn pending_push_count(&self) -> usize {
    self.inner.outbox_rx.len()
  }

  /// Addresses flushed since the last call, in flush order.
  pub fn take_flushed(&self) -> Vec<BucketAddress> {
    std::mem::take(&mut *self.inner.flushed.lock().unwrap_or_else(PoisonError::into_inner))
  }

  /// Pulls answered with stored data.
  pub fn pulls_served(&self) -> u64 {
    self.inner.pulls_served.load(Ordering::Relaxed)
  }
}

impl PullQueue for MemoryBucketStore {
  fn pull(&self, addresses: &[BucketAddress]) -> Vec<PendingLoad> {
    let generation = self.inner.generation.load(Ordering::Acquire);
    addresses
      .iter()
      .map(|&address| {
        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        rayon::spawn(move || {
          if inner.generation.load(Ordering::Acquire) != generation {
            // Dropping the sender resolves the load as missing.
            return;
          }
          let data = inner.buckets.read().unwrap_or_else(PoisonError::into_inner).get(&address).cloned();
          if data.is_some() {
            inner.pulls_served.fetch_add(1, Ordering::Relaxed);
          }
          let _ = tx.send(data);
        });
        rx.map(|received| received.ok().flatten()).boxed()
      })
      .collect()
  }

  fn clear(&self) {
    self.inner.generation.fetch_add(1, Ordering::AcqRel);
  }

  fn abort_requests(&self) {
    self.inner.generation.fetch_add(1, Ordering::AcqRel);
  }
}

impl PushQueue for MemoryBucketStore {
  fn insert(&self, address: BucketAddress, snapshot: BucketData) {
    // The receiver lives in `inner`, so the channel never disconnects.
    let _ = self.inner.outbox_tx.send((address, snapshot));
  }

  fn push(&self) {
    let mut flushed = Vec::new();
    {
      let mut buckets = self.inner.buckets.write().unwrap_or_else(PoisonError::into_inner);
      for (address, snapshot) in self.inner.outbox_rx.try_iter() {
        buckets.insert(address, snapshot);
        flushed.push(address);
      }
    }
    if !flushed.is_empty() {
      tracing::debug!(count = flushed.len(), "flushed bucket snapshots");
      self.inner.flushed.lock().unwrap_or_else(PoisonError::into_inner).extend(flushed);
    }
  }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
