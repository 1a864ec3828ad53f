//! Coordination of mutations issued before a bucket's load settled.

use std::collections::HashSet;

use crate::types::BucketAddress;

/// Buckets mutated while their payload was still in flight.
///
/// Their queued operations are replayed when the load settles; only then is
/// the merged bucket committed to the push queue.
#[derive(Debug, Default)]
pub struct TemporalBucketManager {
  loading: HashSet<BucketAddress>,
}

impl TemporalBucketManager {
  pub fn new() -> Self {
    Self::default()
  }

  /// Track a bucket with queued mutations. Returns false if already tracked.
  pub fn add_bucket(&mut self, address: BucketAddress) -> bool {
    self.loading.insert(address)
  }

  /// The bucket's load settled. Returns true if it had been tracked.
  pub fn bucket_loaded(&mut self, address: BucketAddress) -> bool {
    self.loading.remove(&address)
  }

  pub fn contains(&self, address: BucketAddress) -> bool {
    self.loading.contains(&address)
  }

  pub fn count(&self) -> usize {
    self.loading.len()
  }

  pub fn clear(&mut self) {
    self.loading.clear();
  }
}
