use std::collections::HashMap;
use std::sync::Arc;

use futures::executor::block_on;

use super::*;

#[test]
fn test_static_mappings_survive_poisoned_lock() {
  let mappings = Arc::new(StaticMappings::new());
  mappings.set("segmentation", ActiveMapping::enabled(HashMap::from([(1, 2)])));

  let writer = Arc::clone(&mappings);
  let joined = std::thread::spawn(move || {
    let _guard = writer.layers.write().unwrap();
    panic!("writer panicked while holding the lock");
  })
  .join();
  assert!(joined.is_err());
  assert!(mappings.layers.is_poisoned());

  let active = mappings.active_mapping("segmentation").unwrap();
  assert_eq!(active.status, MappingStatus::Enabled);
  assert_eq!(active.mapping.as_deref().and_then(|m| m.get(&1)), Some(&2));

  mappings.remove("segmentation");
  assert!(mappings.active_mapping("segmentation").is_none());
}

#[test]
fn test_detached_queue_resolves_missing() {
  let addresses = [BucketAddress::new(0, 0, 0, 0), BucketAddress::new(1, 0, 0, 0)];
  let loads = DetachedQueue.pull(&addresses);
  assert_eq!(loads.len(), 2);
  for load in loads {
    assert!(block_on(load).is_none());
  }
}
