//! Frontier of the per-bucket connected-component scan.
//!
//! Works in bucket-local uvw coordinates: u and v span the viewing plane, w
//! is the depth axis. Neighbours may fall outside the bucket (offset -1 or
//! 32); the caller resolves those.

use glam::IVec3;
use smallvec::SmallVec;

const PLANAR_NEIGHBORS: [IVec3; 4] = [
  IVec3::new(-1, 0, 0),
  IVec3::new(1, 0, 0),
  IVec3::new(0, -1, 0),
  IVec3::new(0, 1, 0),
];

const VOLUMETRIC_NEIGHBORS: [IVec3; 6] = [
  IVec3::new(-1, 0, 0),
  IVec3::new(1, 0, 0),
  IVec3::new(0, -1, 0),
  IVec3::new(0, 1, 0),
  IVec3::new(0, 0, -1),
  IVec3::new(0, 0, 1),
];

pub type Neighbors = SmallVec<[IVec3; 6]>;

/// Stack of voxels whose neighbours are still to be visited.
#[derive(Debug)]
pub struct VoxelNeighborQueue {
  stack: Vec<IVec3>,
  offsets: &'static [IVec3],
}

impl VoxelNeighborQueue {
  /// 4-connected within the uv plane.
  pub fn planar(initial: IVec3) -> Self {
    Self {
      stack: vec![initial],
      offsets: &PLANAR_NEIGHBORS,
    }
  }

  /// 6-connected in uvw.
  pub fn volumetric(initial: IVec3) -> Self {
    Self {
      stack: vec![initial],
      offsets: &VOLUMETRIC_NEIGHBORS,
    }
  }

  pub fn new(initial: IVec3, use_3d: bool) -> Self {
    if use_3d {
      Self::volumetric(initial)
    } else {
      Self::planar(initial)
    }
  }

  pub fn is_empty(&self) -> bool {
    self.stack.is_empty()
  }

  pub fn push_voxel(&mut self, voxel: IVec3) {
    self.stack.push(voxel);
  }

  /// Pop the next voxel and return its neighbours.
  pub fn get_voxel_and_get_neighbors(&mut self) -> Option<Neighbors> {
    let voxel = self.stack.pop()?;
    Some(self.offsets.iter().map(|&offset| voxel + offset).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_planar_neighbors_stay_in_slice() {
    let mut queue = VoxelNeighborQueue::planar(IVec3::new(5, 5, 3));
    let neighbors = queue.get_voxel_and_get_neighbors().unwrap();
    assert_eq!(neighbors.len(), 4);
    assert!(neighbors.iter().all(|n| n.z == 3));
    assert!(neighbors.contains(&IVec3::new(4, 5, 3)));
    assert!(neighbors.contains(&IVec3::new(5, 6, 3)));
    assert!(queue.is_empty());
  }

  #[test]
  fn test_volumetric_neighbors_include_depth() {
    let mut queue = VoxelNeighborQueue::new(IVec3::ZERO, true);
    let neighbors = queue.get_voxel_and_get_neighbors().unwrap();
    assert_eq!(neighbors.len(), 6);
    assert!(neighbors.contains(&IVec3::new(0, 0, -1)));
    assert!(neighbors.contains(&IVec3::new(0, 0, 1)));
  }

  #[test]
  fn test_queue_is_lifo() {
    let mut queue = VoxelNeighborQueue::planar(IVec3::ZERO);
    queue.get_voxel_and_get_neighbors();
    queue.push_voxel(IVec3::new(1, 0, 0));
    queue.push_voxel(IVec3::new(2, 0, 0));
    let neighbors = queue.get_voxel_and_get_neighbors().unwrap();
    assert!(neighbors.contains(&IVec3::new(3, 0, 0)));
    assert!(!queue.is_empty());
    queue.get_voxel_and_get_neighbors();
    assert!(queue.get_voxel_and_get_neighbors().is_none());
  }
}
