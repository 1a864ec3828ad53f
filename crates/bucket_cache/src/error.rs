//! Error type for cube operations.

use glam::IVec3;
use thiserror::Error;

use crate::types::ElementClass;

/// Failures surfaced by the cube.
///
/// Out-of-range addressing is deliberately absent: it yields the Null bucket.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CubeError {
  #[error("zoom step {zoom_step} does not exist for the current resolutions ({available} available)")]
  UnknownZoomStep { zoom_step: usize, available: usize },

  #[error("resolution {index} has invalid mag {mag}; every component must be a positive power of two")]
  InvalidResolution { index: usize, mag: IVec3 },

  #[error("a layer needs at least one resolution")]
  NoResolutions,

  #[error("bucket data has element class {actual:?}, layer expects {expected:?}")]
  ElementClassMismatch {
    expected: ElementClass,
    actual: ElementClass,
  },

  #[error("bucket data holds {actual} voxels, expected {expected}")]
  InvalidBucketLength { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, CubeError>;
