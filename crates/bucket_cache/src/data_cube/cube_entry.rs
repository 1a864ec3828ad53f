//! Per-resolution sparse bucket map.

use std::collections::HashMap;

use glam::IVec3;

use crate::bucket::DataBucketRef;

/// Buckets of one zoom step, keyed by linear bucket index.
#[derive(Debug)]
pub struct CubeEntry {
  data: HashMap<usize, DataBucketRef>,
  boundary: IVec3,
}

impl CubeEntry {
  /// `boundary` is the bucket-grid extent of this zoom step.
  pub fn new(boundary: IVec3) -> Self {
    Self {
      data: HashMap::new(),
      boundary,
    }
  }

  pub fn boundary(&self) -> IVec3 {
    self.boundary
  }

  /// `x * By * Bz + y * Bz + z`, or `None` outside the grid.
  #[inline]
  pub fn bucket_index(&self, position: IVec3) -> Option<usize> {
    if position.cmplt(IVec3::ZERO).any() || position.cmpge(self.boundary).any() {
      return None;
    }
    let [x, y, z] = position.to_array().map(|c| c as usize);
    let [_, by, bz] = self.boundary.to_array().map(|c| c as usize);
    Some(x * by * bz + y * bz + z)
  }

  pub fn get(&self, index: usize) -> Option<&DataBucketRef> {
    self.data.get(&index)
  }

  pub fn insert(&mut self, index: usize, bucket: DataBucketRef) {
    self.data.insert(index, bucket);
  }

  pub fn remove(&mut self, index: usize) -> Option<DataBucketRef> {
    self.data.remove(&index)
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn clear(&mut self) {
    self.data.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_bucket_index_is_row_major_over_boundary() {
    let entry = CubeEntry::new(IVec3::new(4, 5, 6));
    assert_eq!(entry.bucket_index(IVec3::ZERO), Some(0));
    assert_eq!(entry.bucket_index(IVec3::new(0, 0, 1)), Some(1));
    assert_eq!(entry.bucket_index(IVec3::new(0, 1, 0)), Some(6));
    assert_eq!(entry.bucket_index(IVec3::new(1, 0, 0)), Some(30));
    assert_eq!(entry.bucket_index(IVec3::new(3, 4, 5)), Some(119));
  }

  #[test]
  fn test_bucket_index_outside_grid() {
    let entry = CubeEntry::new(IVec3::new(4, 5, 6));
    assert_eq!(entry.bucket_index(IVec3::new(-1, 0, 0)), None);
    assert_eq!(entry.bucket_index(IVec3::new(4, 0, 0)), None);
  }
}
