use std::collections::HashMap;
use tracing::trace;

use crate::bucket::TypeBuckets;
use crate::{EntityHandle, TypeKey, TypeRegistry};

/// Per-type identity map of cached entities.
///
/// Holds at most one live instance per (type, id). Lookups here are exact-type only;
/// walking subtypes for polymorphic lookups is done by [`EntityCache`](crate::EntityCache).
///
/// # Thread Safety
///
/// Buckets are created under the store-level lock with a double check, and every
/// mutation of one type's entries happens under that bucket's own write lock. A reader
/// sees the old instance, the new one, or a miss while a replaced instance's hook runs;
/// never a partially replaced entry.
pub struct EntityStore {
    buckets: TypeBuckets<EntityHandle>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            buckets: TypeBuckets::new(),
        }
    }

    /// Exact-type lookup.
    ///
    /// If the bucket is detached between fetching and locking it (a concurrent
    /// `remove_type`), the lookup is retried once against the live set.
    pub fn get(&self, entity_type: TypeKey, id: &str) -> Option<EntityHandle> {
        for _ in 0..2 {
            let bucket = self.buckets.get(entity_type)?;
            let entries = bucket.entries.read();
            if bucket.is_detached() {
                trace!(entity_type = %entity_type, id, "bucket detached during lookup, retrying");
                continue;
            }
            return entries.get(id).cloned();
        }
        None
    }

    /// Stores `entity` under its own type and id, returning the instance it replaced.
    ///
    /// The replaced instance is taken out and has its cached references invalidated
    /// before the new one is stored. The hook runs with no lock held, so it may call
    /// back into the store; lookups of that id miss until the new instance lands.
    pub fn add(&self, entity: EntityHandle) -> Option<EntityHandle> {
        let entity_type = entity.type_key();
        let id = entity.id();

        let replaced = self
            .update(entity_type, |entries| entries.remove(&id))
            .flatten();
        if let Some(old) = &replaced {
            old.invalidate_cached_references();
        }

        // A concurrent writer may have stored the id while the hook ran; last writer wins
        let displaced = self
            .update(entity_type, |entries| entries.insert(id, entity))
            .flatten();
        if let Some(other) = &displaced {
            other.invalidate_cached_references();
        }
        replaced.or(displaced)
    }

    /// Runs `op` on the live bucket of `entity_type` under its write lock, creating the
    /// bucket on first use.
    ///
    /// If the bucket is detached between fetching and locking it, `op` is retried once
    /// against the live set. `None` if both attempts lost that race.
    fn update<R>(
        &self,
        entity_type: TypeKey,
        op: impl FnOnce(&mut HashMap<String, EntityHandle>) -> R,
    ) -> Option<R> {
        let mut op = Some(op);
        for _ in 0..2 {
            let bucket = self.buckets.get_or_create(entity_type);
            let mut entries = bucket.entries.write();
            if bucket.is_detached() {
                trace!(entity_type = %entity_type, "bucket detached during update, retrying");
                continue;
            }
            return op.take().map(|op| op(&mut *entries));
        }
        None
    }

    /// Removes the entry for (type, id) if present.
    pub fn remove(&self, entity_type: TypeKey, id: &str) -> Option<EntityHandle> {
        let bucket = self.buckets.get(entity_type)?;
        let removed = bucket.entries.write().remove(id);
        removed
    }

    /// Drops every entity of `entity_type` and of all its registered subtypes.
    ///
    /// Subtypes are removed before the type itself. With `invalidate_references`, every
    /// dropped instance has its cached references invalidated. Returns the number of
    /// entities dropped.
    pub fn remove_type(
        &self,
        entity_type: TypeKey,
        invalidate_references: bool,
        registry: &TypeRegistry,
    ) -> usize {
        let mut removed = 0;
        for child in registry.children(entity_type) {
            removed += self.remove_type(*child, invalidate_references, registry);
        }

        if let Some(entries) = self.buckets.detach(entity_type) {
            removed += entries.len();
            if invalidate_references {
                for entity in entries.values() {
                    entity.invalidate_cached_references();
                }
            }
        }
        removed
    }

    /// Types that currently have a bucket.
    pub fn types(&self) -> Vec<TypeKey> {
        self.buckets.keys()
    }

    /// Number of cached entities across all types.
    pub fn count(&self) -> usize {
        self.buckets.len()
    }

    pub fn clear(&self) {
        self.buckets.clear();
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
