use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::TypeKey;

/// Contents cached for a single type.
///
/// The `detached` flag is set, under the bucket's write lock, when the bucket is dropped
/// from its [`TypeBuckets`] set. A caller that fetched the `Arc` before the detach and
/// locks it afterwards sees the flag and retries against the live set.
pub(crate) struct Bucket<V> {
    pub(crate) entries: RwLock<HashMap<String, V>>,
    detached: AtomicBool,
}

impl<V> Bucket<V> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            detached: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Marks the bucket detached and takes its contents.
    ///
    /// `entries` must be this bucket's own write guard.
    pub(crate) fn seal(&self, entries: &mut HashMap<String, V>) -> HashMap<String, V> {
        self.detached.store(true, Ordering::Release);
        std::mem::take(entries)
    }
}

/// Two-tier locked map from type to bucket.
///
/// The outer `RwLock` guards the set of known types (bucket creation and removal); each
/// bucket carries its own lock for its contents, so writers on unrelated types never
/// contend.
pub(crate) struct TypeBuckets<V> {
    buckets: RwLock<HashMap<TypeKey, Arc<Bucket<V>>>>,
}

impl<V> TypeBuckets<V> {
    pub(crate) fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Live bucket for `key`, without creating one.
    pub(crate) fn get(&self, key: TypeKey) -> Option<Arc<Bucket<V>>> {
        self.buckets.read().get(&key).cloned()
    }

    /// Live bucket for `key`, created on first use.
    ///
    /// Double-checked: the common path only takes the shared lock.
    pub(crate) fn get_or_create(&self, key: TypeKey) -> Arc<Bucket<V>> {
        if let Some(bucket) = self.get(key) {
            return bucket;
        }

        let mut buckets = self.buckets.write();
        buckets
            .entry(key)
            .or_insert_with(|| Arc::new(Bucket::new()))
            .clone()
    }

    /// Removes the bucket for `key` and returns whatever it held.
    pub(crate) fn detach(&self, key: TypeKey) -> Option<HashMap<String, V>> {
        let bucket = self.unlink(key)?;
        let mut entries = bucket.entries.write();
        Some(bucket.seal(&mut entries))
    }

    /// Drops the bucket for `key` from the live set without touching its contents.
    ///
    /// Until the bucket is sealed, holders of the old `Arc` still see it as live.
    pub(crate) fn unlink(&self, key: TypeKey) -> Option<Arc<Bucket<V>>> {
        self.buckets.write().remove(&key)
    }

    pub(crate) fn keys(&self) -> Vec<TypeKey> {
        self.buckets.read().keys().copied().collect()
    }

    /// Sum of entries across all live buckets.
    pub(crate) fn len(&self) -> usize {
        self.buckets
            .read()
            .values()
            .map(|bucket| bucket.entries.read().len())
            .sum()
    }

    /// Drops every bucket.
    pub(crate) fn clear(&self) {
        let drained: Vec<_> = self.buckets.write().drain().collect();
        for (_, bucket) in drained {
            let mut entries = bucket.entries.write();
            bucket.seal(&mut entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: TypeKey = TypeKey::new("Order");

    #[test]
    fn test_get_does_not_create() {
        let buckets: TypeBuckets<i32> = TypeBuckets::new();
        assert!(buckets.get(ORDER).is_none());
        assert!(buckets.keys().is_empty());
    }

    #[test]
    fn test_get_or_create_returns_same_bucket() {
        let buckets: TypeBuckets<i32> = TypeBuckets::new();
        let a = buckets.get_or_create(ORDER);
        let b = buckets.get_or_create(ORDER);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_detach_marks_bucket_and_returns_contents() {
        let buckets: TypeBuckets<i32> = TypeBuckets::new();
        let bucket = buckets.get_or_create(ORDER);
        bucket.entries.write().insert("1".to_string(), 10);

        let drained = buckets.detach(ORDER).unwrap();
        assert_eq!(drained.get("1"), Some(&10));
        assert!(bucket.is_detached());
        assert!(bucket.entries.read().is_empty());
        assert!(buckets.get(ORDER).is_none());
        assert!(buckets.detach(ORDER).is_none());
    }

    #[test]
    fn test_unlink_keeps_contents_until_sealed() {
        let buckets: TypeBuckets<i32> = TypeBuckets::new();
        let bucket = buckets.get_or_create(ORDER);
        bucket.entries.write().insert("1".to_string(), 1);

        let unlinked = buckets.unlink(ORDER).unwrap();
        assert!(buckets.get(ORDER).is_none());
        assert!(!unlinked.is_detached());
        assert_eq!(unlinked.entries.read().len(), 1);

        let mut entries = unlinked.entries.write();
        let taken = unlinked.seal(&mut entries);
        assert_eq!(taken.len(), 1);
        assert!(entries.is_empty());
        assert!(unlinked.is_detached());
    }

    #[test]
    fn test_len_and_clear() {
        let buckets: TypeBuckets<i32> = TypeBuckets::new();
        let bucket = buckets.get_or_create(ORDER);
        bucket.entries.write().insert("1".to_string(), 1);
        bucket.entries.write().insert("2".to_string(), 2);
        assert_eq!(buckets.len(), 2);

        buckets.clear();
        assert_eq!(buckets.len(), 0);
        assert!(bucket.is_detached());
    }
}
