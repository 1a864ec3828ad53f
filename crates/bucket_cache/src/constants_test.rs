use super::*;

#[test]
fn test_bucket_width_is_power_of_two() {
  assert!((BUCKET_WIDTH as u32).is_power_of_two());
  assert_eq!(BUCKET_WIDTH, 32);
  assert_eq!(BUCKET_WIDTH_SQ, 1024);
  assert_eq!(BUCKET_VOXEL_COUNT, 32768);
}

#[test]
fn test_voxel_index_matches_row_major_formula() {
  let w = BUCKET_WIDTH as usize;
  for z in 0..BUCKET_WIDTH {
    for y in 0..BUCKET_WIDTH {
      for x in 0..BUCKET_WIDTH {
        let idx = get_voxel_index_by_voxel_offset(IVec3::new(x, y, z));
        assert_eq!(
          idx,
          x as usize + y as usize * w + z as usize * w * w,
          "Index mismatch for ({}, {}, {})",
          x,
          y,
          z
        );
      }
    }
  }
}

#[test]
fn test_index_to_offset_inverts_index() {
  for idx in [0, 1, 31, 32, 1023, 1024, 20_000, BUCKET_VOXEL_COUNT - 1] {
    let offset = voxel_index_to_offset(idx);
    assert_eq!(get_voxel_index_by_voxel_offset(offset), idx);
  }
}

#[test]
fn test_corner_indices() {
  assert_eq!(get_voxel_index_by_voxel_offset(IVec3::ZERO), 0);
  assert_eq!(
    get_voxel_index_by_voxel_offset(IVec3::splat(BUCKET_WIDTH - 1)),
    BUCKET_VOXEL_COUNT - 1
  );
}
