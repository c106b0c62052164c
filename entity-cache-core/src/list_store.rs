use std::sync::Arc;

use crate::bucket::TypeBuckets;
use crate::{EntityHandle, TypeKey, TypeRegistry};

/// A scalar query result (counts, sums, projected columns).
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
}

/// A cached query result.
///
/// Both variants share their backing slice, so cloning a `CachedList` out of the cache
/// is cheap.
///
/// # Examples
///
/// ```
/// use entity_cache_core::{CachedList, Scalar};
///
/// let counts = CachedList::scalars(vec![Scalar::Integer(3)]);
/// assert_eq!(counts.len(), 1);
/// assert!(counts.as_entities().is_none());
/// ```
#[derive(Clone)]
pub enum CachedList {
    Entities(Arc<[EntityHandle]>),
    Scalars(Arc<[Scalar]>),
}

impl CachedList {
    pub fn entities(items: Vec<EntityHandle>) -> Self {
        CachedList::Entities(items.into())
    }

    pub fn scalars(items: Vec<Scalar>) -> Self {
        CachedList::Scalars(items.into())
    }

    pub fn len(&self) -> usize {
        match self {
            CachedList::Entities(items) => items.len(),
            CachedList::Scalars(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_entities(&self) -> Option<&[EntityHandle]> {
        match self {
            CachedList::Entities(items) => Some(items.as_ref()),
            CachedList::Scalars(_) => None,
        }
    }

    pub fn as_scalars(&self) -> Option<&[Scalar]> {
        match self {
            CachedList::Scalars(items) => Some(items.as_ref()),
            CachedList::Entities(_) => None,
        }
    }
}

impl From<Vec<EntityHandle>> for CachedList {
    fn from(items: Vec<EntityHandle>) -> Self {
        CachedList::entities(items)
    }
}

impl From<Vec<Scalar>> for CachedList {
    fn from(items: Vec<Scalar>) -> Self {
        CachedList::scalars(items)
    }
}

impl std::fmt::Debug for CachedList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CachedList::Entities(items) => f
                .debug_list()
                .entries(items.iter().map(|e| (e.type_key(), e.id())))
                .finish(),
            CachedList::Scalars(items) => f.debug_list().entries(items.iter()).finish(),
        }
    }
}

/// Per-type map from query key to cached result.
///
/// A list cached under a base type may contain instances of any derived type, so
/// expiring a type clears its own lists and the lists of every ancestor.
pub struct ListStore {
    buckets: TypeBuckets<CachedList>,
}

impl ListStore {
    pub fn new() -> Self {
        Self {
            buckets: TypeBuckets::new(),
        }
    }

    pub fn get(&self, entity_type: TypeKey, key: &str) -> Option<CachedList> {
        let bucket = self.buckets.get(entity_type)?;
        let lists = bucket.entries.read();
        lists.get(key).cloned()
    }

    /// Stores or overwrites the list for (type, key).
    pub fn put(&self, entity_type: TypeKey, key: &str, list: CachedList) {
        let bucket = self.buckets.get_or_create(entity_type);
        bucket.entries.write().insert(key.to_string(), list);
    }

    /// Clears the lists of `entity_type` and all of its ancestors.
    ///
    /// Returns the number of lists dropped.
    pub fn expire(&self, entity_type: TypeKey, registry: &TypeRegistry) -> usize {
        let mut expired = 0;
        for ancestor in registry.ancestors(entity_type) {
            if let Some(bucket) = self.buckets.get(ancestor) {
                let mut lists = bucket.entries.write();
                expired += lists.len();
                lists.clear();
            }
        }
        expired
    }

    /// Number of cached lists across all types.
    pub fn count(&self) -> usize {
        self.buckets.len()
    }

    pub fn clear(&self) {
        self.buckets.clear();
    }
}

impl Default for ListStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeOptions;

    const ORDER: TypeKey = TypeKey::new("Order");
    const RUSH_ORDER: TypeKey = TypeKey::new("RushOrder");
    const INVOICE: TypeKey = TypeKey::new("Invoice");

    fn registry() -> TypeRegistry {
        TypeRegistry::builder()
            .register(ORDER, TypeOptions::new())
            .register(RUSH_ORDER, TypeOptions::new().parent(ORDER))
            .register(INVOICE, TypeOptions::new())
            .build()
            .unwrap()
    }

    fn count_list(n: i64) -> CachedList {
        CachedList::scalars(vec![Scalar::Integer(n)])
    }

    #[test]
    fn test_put_get_overwrite() {
        let store = ListStore::new();
        assert!(store.get(ORDER, "k").is_none());

        store.put(ORDER, "k", count_list(1));
        store.put(ORDER, "k", count_list(2));
        let list = store.get(ORDER, "k").unwrap();
        assert_eq!(list.as_scalars(), Some(&[Scalar::Integer(2)][..]));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_expire_clears_type_and_ancestors() {
        let store = ListStore::new();
        let registry = registry();
        store.put(ORDER, "all", count_list(1));
        store.put(RUSH_ORDER, "all", count_list(2));
        store.put(INVOICE, "all", count_list(3));

        let expired = store.expire(RUSH_ORDER, &registry);
        assert_eq!(expired, 2);
        assert!(store.get(ORDER, "all").is_none());
        assert!(store.get(RUSH_ORDER, "all").is_none());
        assert!(store.get(INVOICE, "all").is_some());
    }

    #[test]
    fn test_expire_base_keeps_derived_lists() {
        let store = ListStore::new();
        let registry = registry();
        store.put(ORDER, "all", count_list(1));
        store.put(RUSH_ORDER, "all", count_list(2));

        store.expire(ORDER, &registry);
        assert!(store.get(ORDER, "all").is_none());
        assert!(store.get(RUSH_ORDER, "all").is_some());
    }

    #[test]
    fn test_empty_entity_list() {
        let list = CachedList::entities(Vec::new());
        assert!(list.is_empty());
        assert_eq!(list.as_entities().map(|e| e.len()), Some(0));
        assert_eq!(format!("{:?}", list), "[]");
    }
}
