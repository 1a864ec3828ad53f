use super::*;
use crate::types::ElementClass;

fn isotropic(count: usize) -> Arc<ResolutionInfo> {
  Arc::new(ResolutionInfo::isotropic(count))
}

#[test]
fn test_no_restriction_uses_dataset_extent() {
  let bbox = BoundingBox::new(None, IVec3::new(100, 64, 33), isotropic(1));
  assert_eq!(bbox.min(), IVec3::ZERO);
  assert_eq!(bbox.max(), IVec3::new(100, 64, 33));
}

#[test]
fn test_restriction_is_clipped_to_dataset() {
  let restriction = VoxelBox::new(IVec3::new(-10, 5, 20), IVec3::new(50, 500, 30));
  let bbox = BoundingBox::new(Some(restriction), IVec3::new(100, 64, 33), isotropic(1));
  assert_eq!(bbox.min(), IVec3::new(0, 5, 20));
  assert_eq!(bbox.max(), IVec3::new(50, 64, 30));
}

#[test]
fn test_disjoint_restriction_keeps_min_le_max() {
  let restriction = VoxelBox::new(IVec3::splat(500), IVec3::splat(600));
  let bbox = BoundingBox::new(Some(restriction), IVec3::splat(100), isotropic(1));
  assert!(bbox.min().cmple(bbox.max()).all());
  assert!(bbox.as_voxel_box().is_empty());
}

#[test]
fn test_box_for_zoom_step_fixtures() {
  // (restriction, upper, zoom step) -> expected bucket-grid box
  let fixtures = [
    (
      None,
      IVec3::new(100, 64, 33),
      0,
      VoxelBox::new(IVec3::ZERO, IVec3::new(4, 2, 2)),
    ),
    (
      Some(VoxelBox::new(IVec3::new(40, 70, 5), IVec3::new(200, 130, 64))),
      IVec3::splat(1000),
      1,
      VoxelBox::new(IVec3::new(0, 1, 0), IVec3::new(4, 3, 1)),
    ),
    (
      None,
      IVec3::new(1000, 1000, 1000),
      2,
      VoxelBox::new(IVec3::ZERO, IVec3::splat(8)),
    ),
    (
      Some(VoxelBox::new(IVec3::new(128, 129, 255), IVec3::new(129, 257, 256))),
      IVec3::splat(1000),
      2,
      VoxelBox::new(IVec3::new(1, 1, 1), IVec3::new(2, 3, 2)),
    ),
  ];

  for (restriction, upper, zoom_step, expected) in fixtures {
    let bbox = BoundingBox::new(restriction, upper, isotropic(3));
    assert_eq!(
      bbox.get_box_for_zoom_step(zoom_step),
      Some(expected),
      "restriction {:?}, upper {}, zoom step {}",
      restriction,
      upper,
      zoom_step
    );
  }
}

#[test]
fn test_box_for_zoom_step_anisotropic_mag() {
  let resolutions = ResolutionInfo::new(vec![IVec3::ONE, IVec3::new(2, 2, 1)]).unwrap();
  let bbox = BoundingBox::new(None, IVec3::new(100, 100, 100), Arc::new(resolutions));
  // x/y shift by 6, z by 5
  assert_eq!(
    bbox.get_box_for_zoom_step(1),
    Some(VoxelBox::new(IVec3::ZERO, IVec3::new(2, 2, 4)))
  );
}

#[test]
fn test_box_for_unknown_zoom_step() {
  let bbox = BoundingBox::new(None, IVec3::splat(100), isotropic(2));
  assert_eq!(bbox.get_box_for_zoom_step(2), None);
  assert!(!bbox.contains_bucket(BucketAddress::new(0, 0, 0, 2)));
}

#[test]
fn test_contains_bucket_is_exact() {
  let bbox = BoundingBox::new(None, IVec3::new(100, 64, 33), isotropic(1));
  assert!(bbox.contains_bucket(BucketAddress::new(0, 0, 0, 0)));
  assert!(bbox.contains_bucket(BucketAddress::new(3, 1, 1, 0)));
  assert!(!bbox.contains_bucket(BucketAddress::new(4, 0, 0, 0)));
  assert!(!bbox.contains_bucket(BucketAddress::new(0, 2, 0, 0)));
  assert!(!bbox.contains_bucket(BucketAddress::new(-1, 0, 0, 0)));
}

#[test]
fn test_contains_full_bucket_is_strict_interior() {
  let bbox = BoundingBox::new(None, IVec3::splat(256), isotropic(1));
  assert!(bbox.contains_full_bucket(BucketAddress::new(3, 3, 3, 0)));
  assert!(bbox.contains_full_bucket(BucketAddress::new(1, 6, 1, 0)));
  assert!(!bbox.contains_full_bucket(BucketAddress::new(0, 3, 3, 0)));
  assert!(!bbox.contains_full_bucket(BucketAddress::new(3, 7, 3, 0)));
}

#[test]
fn test_remove_outside_area_zeroes_straddling_part() {
  let bbox = BoundingBox::new(None, IVec3::new(40, 32, 32), isotropic(2));

  let mut data = BucketData::filled(ElementClass::Uint16, 9);
  bbox.remove_outside_area(BucketAddress::new(1, 0, 0, 0), &mut data);
  // global x 32..40 survive
  assert_eq!(data.count_value(9), 8 * 32 * 32);
  assert_eq!(data.get(get_voxel_index_by_voxel_offset(IVec3::new(7, 31, 31))), 9);
  assert_eq!(data.get(get_voxel_index_by_voxel_offset(IVec3::new(8, 0, 0))), 0);

  let mut inside = BucketData::filled(ElementClass::Uint16, 9);
  bbox.remove_outside_area(BucketAddress::new(0, 0, 0, 0), &mut inside);
  assert_eq!(inside.count_value(9), 32 * 32 * 32);
}

#[test]
fn test_remove_outside_area_respects_mag() {
  let bbox = BoundingBox::new(None, IVec3::new(40, 32, 32), isotropic(2));
  let mut data = BucketData::filled(ElementClass::Uint8, 1);
  bbox.remove_outside_area(BucketAddress::new(0, 0, 0, 1), &mut data);
  // mag 2: dx < 20, dy < 16, dz < 16
  assert_eq!(data.count_value(1), 20 * 16 * 16);
}

#[test]
fn test_remove_outside_area_skips_full_buckets() {
  let bbox = BoundingBox::new(None, IVec3::splat(256), isotropic(1));
  let mut data = BucketData::filled(ElementClass::Uint32, 4);
  bbox.remove_outside_area(BucketAddress::new(2, 2, 2, 0), &mut data);
  assert_eq!(data.count_value(4), 32 * 32 * 32);
}

#[test]
fn test_intersected_with() {
  let bbox = BoundingBox::new(None, IVec3::new(100, 64, 33), isotropic(1));
  let target = VoxelBox::new(IVec3::new(-5, 10, 10), IVec3::new(50, 80, 20));
  assert_eq!(
    bbox.intersected_with(&target),
    VoxelBox::new(IVec3::new(0, 10, 10), IVec3::new(50, 64, 20))
  );
}
