use super::*;

#[test]
fn test_isotropic_resolutions() {
  let info = ResolutionInfo::isotropic(4);
  assert_eq!(info.len(), 4);
  assert_eq!(info.get_resolution_by_index(0), Some(IVec3::ONE));
  assert_eq!(info.get_resolution_by_index(3), Some(IVec3::splat(8)));
  assert_eq!(info.get_log2_resolution(3), Some(IVec3::splat(3)));
  assert!(!info.has_index(4));
}

#[test]
fn test_anisotropic_resolutions_accepted() {
  let info = ResolutionInfo::new(vec![IVec3::ONE, IVec3::new(2, 2, 1), IVec3::new(4, 4, 2)])
    .unwrap();
  assert_eq!(info.get_log2_resolution(2), Some(IVec3::new(2, 2, 1)));
  let zoom_steps: Vec<usize> = info.resolutions_with_indices().map(|(i, _)| i).collect();
  assert_eq!(zoom_steps, vec![0, 1, 2]);
}

#[test]
fn test_invalid_resolutions_rejected() {
  assert_eq!(ResolutionInfo::new(vec![]), Err(CubeError::NoResolutions));
  assert_eq!(
    ResolutionInfo::new(vec![IVec3::ONE, IVec3::new(3, 3, 3)]),
    Err(CubeError::InvalidResolution {
      index: 1,
      mag: IVec3::new(3, 3, 3)
    })
  );
  assert!(ResolutionInfo::new(vec![IVec3::new(0, 1, 1)]).is_err());
}

#[test]
fn test_unknown_zoom_step_error() {
  let info = ResolutionInfo::isotropic(2);
  assert_eq!(
    info.get_resolution_by_index_or_err(5),
    Err(CubeError::UnknownZoomStep {
      zoom_step: 5,
      available: 2
    })
  );
}

#[test]
fn test_base_bucket_boundary_rounds_up() {
  let layer = LayerDescriptor::new(
    "color",
    IVec3::new(64, 65, 1),
    ResolutionInfo::isotropic(1),
    ElementClass::Uint8,
  );
  assert_eq!(layer.base_bucket_boundary(), IVec3::new(2, 3, 1));
}

#[test]
fn test_default_config() {
  let config = CubeConfig::default();
  assert_eq!(config.bucket_count_soft_limit, 5000);
  assert_eq!(config.allocation_warning_interval, 100);
  assert_eq!(config.progress_interval, 1_000_000);
  assert_eq!(config.floodfill_voxel_threshold, None);
  assert!(config.render_missing_data_black);
}

#[test]
fn test_config_builders() {
  let config = CubeConfig::new()
    .with_bucket_count_soft_limit(0)
    .with_floodfill_voxel_threshold(Some(10))
    .with_render_missing_data_black(false);
  assert_eq!(config.bucket_count_soft_limit, 1);
  assert_eq!(config.floodfill_voxel_threshold, Some(10));
  assert!(!config.render_missing_data_black);
}
