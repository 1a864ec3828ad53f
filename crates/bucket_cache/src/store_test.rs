use futures::executor::block_on;

use super::*;
use crate::types::ElementClass;

#[test]
fn test_pull_returns_stored_bucket() {
  let store = MemoryBucketStore::new();
  let address = BucketAddress::new(1, 0, 0, 0);
  store.insert_bucket(address, BucketData::filled(ElementClass::Uint8, 9));

  let mut loads = store.pull(&[address]);
  assert_eq!(loads.len(), 1);
  let data = block_on(loads.remove(0)).expect("stored bucket");
  assert_eq!(data.get(0), 9);
  assert_eq!(store.pulls_served(), 1);
}

#[test]
fn test_pull_of_unknown_bucket_resolves_missing() {
  let store = MemoryBucketStore::new();
  let loads = store.pull(&[BucketAddress::new(0, 0, 0, 0), BucketAddress::new(0, 0, 0, 1)]);
  assert_eq!(loads.len(), 2);
  for load in loads {
    assert!(block_on(load).is_none());
  }
  assert_eq!(store.pulls_served(), 0);
}

#[test]
fn test_pull_after_abort_still_serves() {
  let store = MemoryBucketStore::new();
  let address = BucketAddress::new(0, 0, 0, 0);
  store.insert_bucket(address, BucketData::filled(ElementClass::Uint16, 3));
  store.abort_requests();
  store.clear();

  let load = store.pull(&[address]).remove(0);
  assert_eq!(block_on(load).map(|data| data.get(5)), Some(3));
}

#[test]
fn test_inserted_snapshots_are_saved_on_push() {
  let store = MemoryBucketStore::new();
  let a = BucketAddress::new(0, 0, 0, 0);
  let b = BucketAddress::new(1, 0, 0, 0);

  store.insert(a, BucketData::filled(ElementClass::Uint32, 1));
  store.insert(b, BucketData::filled(ElementClass::Uint32, 2));
  assert_eq!(store.pending_push_count(), 2);
  assert!(store.get_bucket(a).is_none(), "not saved before push");

  store.push();
  assert_eq!(store.pending_push_count(), 0);
  assert_eq!(store.get_bucket(b).map(|data| data.get(0)), Some(2));
  assert_eq!(store.take_flushed(), vec![a, b]);
  assert!(store.take_flushed().is_empty());
  assert_eq!(store.len(), 2);
}

#[test]
fn test_later_snapshot_wins() {
  let store = MemoryBucketStore::new();
  let address = BucketAddress::new(0, 0, 0, 0);
  store.insert(address, BucketData::filled(ElementClass::Uint8, 1));
  store.insert(address, BucketData::filled(ElementClass::Uint8, 2));
  store.push();
  assert_eq!(store.get_bucket(address).map(|data| data.get(0)), Some(2));
}
