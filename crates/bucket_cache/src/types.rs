//! Core data types shared by the cube, its buckets, and flood fill.

use glam::IVec3;

use crate::constants::{BUCKET_VOXEL_COUNT, BUCKET_WIDTH, BUCKET_WIDTH_SQ};
use crate::error::{CubeError, Result};

// =============================================================================
// ElementClass - voxel element width
// =============================================================================

/// Element width of a layer's voxel values. Fixed per layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementClass {
  Uint8,
  Uint16,
  Uint32,
  Uint64,
}

impl ElementClass {
  pub const fn bytes_per_element(self) -> usize {
    match self {
      ElementClass::Uint8 => 1,
      ElementClass::Uint16 => 2,
      ElementClass::Uint32 => 4,
      ElementClass::Uint64 => 8,
    }
  }

  /// Largest value representable by this element class.
  pub const fn max_value(self) -> u64 {
    match self {
      ElementClass::Uint8 => u8::MAX as u64,
      ElementClass::Uint16 => u16::MAX as u64,
      ElementClass::Uint32 => u32::MAX as u64,
      ElementClass::Uint64 => u64::MAX,
    }
  }

  /// Truncate a value the same way storing it in the bucket would.
  #[inline]
  pub const fn cast(self, value: u64) -> u64 {
    value & self.max_value()
  }
}

// =============================================================================
// BucketData - typed voxel payload
// =============================================================================

/// Voxel payload of one bucket, typed by the layer's element class.
///
/// Values cross the API as `u64` and are truncated on store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BucketData {
  Uint8(Box<[u8]>),
  Uint16(Box<[u16]>),
  Uint32(Box<[u32]>),
  Uint64(Box<[u64]>),
}

impl BucketData {
  /// Zero-filled payload with one element per bucket voxel.
  pub fn zeroed(element_class: ElementClass) -> Self {
    match element_class {
      ElementClass::Uint8 => BucketData::Uint8(vec![0; BUCKET_VOXEL_COUNT].into_boxed_slice()),
      ElementClass::Uint16 => BucketData::Uint16(vec![0; BUCKET_VOXEL_COUNT].into_boxed_slice()),
      ElementClass::Uint32 => BucketData::Uint32(vec![0; BUCKET_VOXEL_COUNT].into_boxed_slice()),
      ElementClass::Uint64 => BucketData::Uint64(vec![0; BUCKET_VOXEL_COUNT].into_boxed_slice()),
    }
  }

  /// Payload with every voxel set to `value`.
  pub fn filled(element_class: ElementClass, value: u64) -> Self {
    let mut data = Self::zeroed(element_class);
    data.fill(value);
    data
  }

  pub fn element_class(&self) -> ElementClass {
    match self {
      BucketData::Uint8(_) => ElementClass::Uint8,
      BucketData::Uint16(_) => ElementClass::Uint16,
      BucketData::Uint32(_) => ElementClass::Uint32,
      BucketData::Uint64(_) => ElementClass::Uint64,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      BucketData::Uint8(values) => values.len(),
      BucketData::Uint16(values) => values.len(),
      BucketData::Uint32(values) => values.len(),
      BucketData::Uint64(values) => values.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Check that this payload can back a bucket of the given layer.
  pub fn validate(&self, expected: ElementClass) -> Result<()> {
    if self.element_class() != expected {
      return Err(CubeError::ElementClassMismatch {
        expected,
        actual: self.element_class(),
      });
    }
    if self.len() != BUCKET_VOXEL_COUNT {
      return Err(CubeError::InvalidBucketLength {
        expected: BUCKET_VOXEL_COUNT,
        actual: self.len(),
      });
    }
    Ok(())
  }

  #[inline]
  pub fn get(&self, index: usize) -> u64 {
    match self {
      BucketData::Uint8(values) => values[index] as u64,
      BucketData::Uint16(values) => values[index] as u64,
      BucketData::Uint32(values) => values[index] as u64,
      BucketData::Uint64(values) => values[index],
    }
  }

  #[inline]
  pub fn set(&mut self, index: usize, value: u64) {
    match self {
      BucketData::Uint8(values) => values[index] = value as u8,
      BucketData::Uint16(values) => values[index] = value as u16,
      BucketData::Uint32(values) => values[index] = value as u32,
      BucketData::Uint64(values) => values[index] = value,
    }
  }

  pub fn fill(&mut self, value: u64) {
    match self {
      BucketData::Uint8(values) => values.fill(value as u8),
      BucketData::Uint16(values) => values.fill(value as u16),
      BucketData::Uint32(values) => values.fill(value as u32),
      BucketData::Uint64(values) => values.fill(value),
    }
  }

  /// Number of voxels holding `value`.
  pub fn count_value(&self, value: u64) -> usize {
    (0..self.len()).filter(|&i| self.get(i) == value).count()
  }
}

// =============================================================================
// BucketAddress - bucket-grid position at one resolution
// =============================================================================

/// Bucket address: bucket-grid position plus zoom step.
///
/// Grid position = global voxel position / (mag * BUCKET_WIDTH).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BucketAddress {
  pub position: IVec3,
  pub zoom_step: usize,
}

impl BucketAddress {
  pub const fn new(x: i32, y: i32, z: i32, zoom_step: usize) -> Self {
    Self {
      position: IVec3::new(x, y, z),
      zoom_step,
    }
  }

  pub const fn from_position(position: IVec3, zoom_step: usize) -> Self {
    Self {
      position,
      zoom_step,
    }
  }

  /// Address shifted by whole buckets at the same zoom step.
  #[inline]
  pub fn offset(self, delta: IVec3) -> Self {
    Self::from_position(self.position + delta, self.zoom_step)
  }

  /// Resolve a voxel offset relative to this bucket.
  ///
  /// Returns `None` when the offset lies inside the bucket, otherwise the
  /// address of the bucket that owns it and the offset local to that bucket.
  #[inline]
  pub fn resolve_voxel_offset(self, offset: IVec3) -> Option<(BucketAddress, IVec3)> {
    let width = IVec3::splat(BUCKET_WIDTH);
    if offset.cmpge(IVec3::ZERO).all() && offset.cmplt(width).all() {
      return None;
    }
    Some((
      self.offset(offset.div_euclid(width)),
      offset.rem_euclid(width),
    ))
  }
}

// =============================================================================
// VoxelBox - plain axis-aligned voxel region
// =============================================================================

/// Axis-aligned voxel region in global (zoom step 0) coordinates.
///
/// `min` is inclusive, `max` is exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoxelBox {
  pub min: IVec3,
  pub max: IVec3,
}

impl VoxelBox {
  pub const fn new(min: IVec3, max: IVec3) -> Self {
    Self { min, max }
  }

  /// Box covering exactly one voxel.
  pub fn around_voxel(voxel: IVec3) -> Self {
    Self {
      min: voxel,
      max: voxel + IVec3::ONE,
    }
  }

  pub fn size(&self) -> IVec3 {
    self.max - self.min
  }

  pub fn volume(&self) -> u64 {
    let size = self.size().max(IVec3::ZERO);
    size.x as u64 * size.y as u64 * size.z as u64
  }

  pub fn is_empty(&self) -> bool {
    self.min.cmpge(self.max).any()
  }

  #[inline]
  pub fn contains(&self, voxel: IVec3) -> bool {
    self.min.cmple(voxel).all() && voxel.cmplt(self.max).all()
  }

  /// True if the boxes share interior or boundary points.
  #[inline]
  pub fn overlaps_or_touches(&self, other: &VoxelBox) -> bool {
    self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
  }

  /// Axis-wise max of mins and min of maxes.
  pub fn intersected_with(&self, other: &VoxelBox) -> VoxelBox {
    VoxelBox {
      min: self.min.max(other.min),
      max: self.max.min(other.max),
    }
  }

  /// Expand to include a voxel (max stays exclusive).
  #[inline]
  pub fn include(&mut self, voxel: IVec3) {
    self.min = self.min.min(voxel);
    self.max = self.max.max(voxel + IVec3::ONE);
  }
}

// =============================================================================
// DimensionMap - viewing plane axis assignment
// =============================================================================

/// Maps the in-plane axes (u, v) and the depth axis (w) of a 2-D viewing
/// plane to XYZ axis indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DimensionMap([usize; 3]);

impl DimensionMap {
  pub const XY: Self = Self([0, 1, 2]);
  pub const YZ: Self = Self([2, 1, 0]);
  pub const XZ: Self = Self([0, 2, 1]);

  /// Build from axis indices; `None` unless they are a permutation of 0..3.
  pub fn new(u: usize, v: usize, w: usize) -> Option<Self> {
    let mut seen = [false; 3];
    for axis in [u, v, w] {
      if axis > 2 || seen[axis] {
        return None;
      }
      seen[axis] = true;
    }
    Some(Self([u, v, w]))
  }

  pub fn u(self) -> usize {
    self.0[0]
  }

  pub fn v(self) -> usize {
    self.0[1]
  }

  /// Depth axis.
  pub fn w(self) -> usize {
    self.0[2]
  }

  #[inline]
  pub fn to_uvw(self, xyz: IVec3) -> IVec3 {
    IVec3::new(xyz[self.0[0]], xyz[self.0[1]], xyz[self.0[2]])
  }

  #[inline]
  pub fn to_xyz(self, uvw: IVec3) -> IVec3 {
    let mut xyz = IVec3::ZERO;
    xyz[self.0[0]] = uvw.x;
    xyz[self.0[1]] = uvw.y;
    xyz[self.0[2]] = uvw.z;
    xyz
  }
}

// =============================================================================
// SliceMask - labeled voxels of one bucket slice
// =============================================================================

/// Per-slice mask of labeled voxels inside one bucket, indexed `u * 32 + v`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceMask(Box<[u8]>);

impl SliceMask {
  pub fn new() -> Self {
    Self(vec![0; BUCKET_WIDTH_SQ].into_boxed_slice())
  }

  #[inline]
  pub fn mark(&mut self, u: i32, v: i32) {
    self.0[(u * BUCKET_WIDTH + v) as usize] = 1;
  }

  #[inline]
  pub fn is_marked(&self, u: i32, v: i32) -> bool {
    self.0[(u * BUCKET_WIDTH + v) as usize] != 0
  }

  pub fn marked_count(&self) -> usize {
    self.0.iter().filter(|&&m| m != 0).count()
  }

  pub fn as_slice(&self) -> &[u8] {
    &self.0
  }
}

impl Default for SliceMask {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
