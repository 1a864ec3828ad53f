//! Eviction counters of a cube.

/// Counters describing eviction pressure since the cube was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CubeStats {
  /// Buckets evicted to make room for new ones.
  pub evictions: usize,
  /// Allocations past the soft limit that grew the ring instead.
  pub ring_growths: usize,
  /// Throttled allocation warnings emitted.
  pub allocation_warnings: usize,
  /// The one-time warning past twice the soft limit fired.
  pub hard_limit_exceeded: bool,
  /// Buckets destroyed by full teardown.
  pub teardown_collections: usize,
}

impl CubeStats {
  /// Buckets destroyed for any reason.
  #[inline]
  pub fn total_collections(&self) -> usize {
    self.evictions + self.teardown_collections
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_stats_totals() {
    let stats = CubeStats {
      evictions: 10,
      teardown_collections: 5,
      ..Default::default()
    };
    assert_eq!(stats.total_collections(), 15);
    assert!(!stats.hard_limit_exceeded);
  }
}
