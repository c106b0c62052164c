use parking_lot::ReentrantMutex;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::entity::downcast_entity;
#[cfg(feature = "stats")]
use crate::CacheStats;
use crate::{
    CacheConfig, CachedList, Entity, EntityHandle, EntityStore, EntityType, ListStore,
    RowVersion, RowVersionTracker, TypeKey, TypeRegistry,
};

/// One cache instance: entities, query lists and row versions.
///
/// Every operation here acts on this instance only. Callers normally go through
/// [`Cache`](crate::Cache), which also mirrors writes into the other live scope; an
/// `EntityCache` used directly behaves like a single isolated cache.
///
/// # Eligibility
///
/// A type is cacheable when its registry override says so, or, without an override,
/// when caching is enabled in the [`CacheConfig`]. For a non-cacheable type every read
/// is a miss and every write is a no-op.
///
/// # Thread Safety
///
/// Entity and list buckets use two-tier locking (type set, then per-type bucket), row
/// versions are lock-free. `remove_type` and `clear_all` additionally hold the instance's
/// structural lock so a full clear never interleaves with a type removal. That lock is
/// reentrant: entity hooks that call back into the same instance do not deadlock.
///
/// # Examples
///
/// ```
/// use entity_cache_core::{CacheConfig, Entity, EntityCache, EntityType, TypeKey, TypeRegistry};
/// use std::sync::Arc;
///
/// struct Customer {
///     id: u32,
/// }
///
/// impl Entity for Customer {
///     fn type_key(&self) -> TypeKey {
///         Self::TYPE_KEY
///     }
///     fn id(&self) -> String {
///         self.id.to_string()
///     }
/// }
///
/// impl EntityType for Customer {
///     const TYPE_KEY: TypeKey = TypeKey::new("Customer");
/// }
///
/// let cache = EntityCache::new(Arc::new(TypeRegistry::default()), &CacheConfig::default());
/// cache.add(Arc::new(Customer { id: 1 }));
///
/// let found = cache.get_typed::<Customer>("1").unwrap();
/// assert_eq!(found.id, 1);
/// assert_eq!(cache.count_cached_entities(), 1);
/// ```
pub struct EntityCache {
    registry: Arc<TypeRegistry>,
    enabled_by_default: bool,
    concurrency_aware: bool,
    entities: EntityStore,
    lists: ListStore,
    row_versions: RowVersionTracker,
    sync_lock: ReentrantMutex<()>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl EntityCache {
    /// Creates an empty instance.
    ///
    /// The registry is shared between instances; `config` supplies the caching default
    /// for types without an override and the concurrency-aware switch. The scope
    /// strategy in `config` is not used here, see [`ScopeResolver`](crate::ScopeResolver).
    pub fn new(registry: Arc<TypeRegistry>, config: &CacheConfig) -> Self {
        Self {
            registry,
            enabled_by_default: config.enabled,
            concurrency_aware: config.concurrency_aware,
            entities: EntityStore::new(),
            lists: ListStore::new(),
            row_versions: RowVersionTracker::new(),
            sync_lock: ReentrantMutex::new(()),
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        }
    }

    /// The type registry this instance consults.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Whether entities and lists of `entity_type` may be cached.
    pub fn can_cache(&self, entity_type: TypeKey) -> bool {
        self.registry
            .cacheable_override(entity_type)
            .unwrap_or(self.enabled_by_default)
    }

    /// Looks up (type, id), falling back to registered subtypes.
    ///
    /// An exact match wins; otherwise each subtype is probed recursively and the first
    /// hit is returned, so a derived instance can be found through a base-type query.
    pub fn get(&self, entity_type: TypeKey, id: &str) -> Option<EntityHandle> {
        if !self.can_cache(entity_type) {
            return None;
        }

        let found = self.find(entity_type, id);
        self.record_entity_lookup(found.is_some());
        found
    }

    fn find(&self, entity_type: TypeKey, id: &str) -> Option<EntityHandle> {
        if let Some(entity) = self.entities.get(entity_type, id) {
            return Some(entity);
        }
        self.registry
            .children(entity_type)
            .iter()
            .filter(|child| self.can_cache(**child))
            .find_map(|child| self.find(*child, id))
    }

    /// Typed lookup by `T::TYPE_KEY`.
    ///
    /// When the handle found (possibly through a subtype probe) is not a `T`, the
    /// mismatch is logged and counted as a suppressed fault and the lookup is a miss,
    /// in the statistics as well.
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_cache_core::{CacheConfig, Entity, EntityCache, EntityType, TypeKey, TypeRegistry};
    /// use std::sync::Arc;
    ///
    /// struct Invoice(u32);
    ///
    /// impl Entity for Invoice {
    ///     fn type_key(&self) -> TypeKey {
    ///         Self::TYPE_KEY
    ///     }
    ///     fn id(&self) -> String {
    ///         self.0.to_string()
    ///     }
    /// }
    ///
    /// impl EntityType for Invoice {
    ///     const TYPE_KEY: TypeKey = TypeKey::new("Invoice");
    /// }
    ///
    /// let cache = EntityCache::new(Arc::new(TypeRegistry::default()), &CacheConfig::default());
    /// cache.add(Arc::new(Invoice(3)));
    ///
    /// assert_eq!(cache.get_typed::<Invoice>("3").unwrap().0, 3);
    /// assert!(cache.get_typed::<Invoice>("4").is_none());
    /// ```
    pub fn get_typed<T: EntityType>(&self, id: &str) -> Option<Arc<T>> {
        if !self.can_cache(T::TYPE_KEY) {
            return None;
        }

        let typed = self.find(T::TYPE_KEY, id).and_then(|handle| {
            let found_type = handle.type_key();
            let typed = downcast_entity::<T>(handle);
            if typed.is_none() {
                warn!(
                    entity_type = %T::TYPE_KEY,
                    found_type = %found_type,
                    id,
                    "cached entity is not of the requested type, treating as miss"
                );
                #[cfg(feature = "stats")]
                self.stats.record_suppressed_fault();
            }
            typed
        });
        self.record_entity_lookup(typed.is_some());
        typed
    }

    /// Untyped lookup across every cached type whose ids are globally unique.
    ///
    /// Types are scanned in name order; the first hit wins.
    pub fn get_any(&self, id: &str) -> Option<EntityHandle> {
        let mut types: Vec<TypeKey> = self
            .entities
            .types()
            .into_iter()
            .filter(|t| self.has_global_ids(*t) && self.can_cache(*t))
            .collect();
        types.sort();

        let found = types
            .into_iter()
            .find_map(|entity_type| self.entities.get(entity_type, id));
        self.record_entity_lookup(found.is_some());
        found
    }

    fn has_global_ids(&self, entity_type: TypeKey) -> bool {
        self.registry
            .ancestors(entity_type)
            .any(|t| self.registry.has_globally_unique_ids(t))
    }

    /// Caches `entity`, replacing any instance with the same type and id, and expires
    /// the lists of its type.
    pub fn add(&self, entity: EntityHandle) {
        let entity_type = entity.type_key();
        if !self.can_cache(entity_type) {
            return;
        }

        trace!(entity_type = %entity_type, id = %entity.id(), "caching entity");
        self.entities.add(entity);
        self.expire_lists(entity_type);
    }

    /// Evicts `entity` and everything that depends on its type.
    ///
    /// The entity's cached references are always invalidated. Unless the entity is an
    /// application event, every registered dependent type is removed wholesale (with
    /// reference invalidation). Then, if the type is cacheable, the entry is dropped and
    /// the type's lists expire, whether or not the entry was present.
    pub fn remove(&self, entity: &dyn Entity) {
        entity.invalidate_cached_references();
        self.evict(entity);
    }

    /// `remove` without the reference invalidation, for replaying a removal on a
    /// second instance.
    pub(crate) fn evict(&self, entity: &dyn Entity) {
        let entity_type = entity.type_key();
        if !entity.is_application_event() {
            for dependent in self.registry.dependents_of(entity_type) {
                self.remove_type(dependent, true);
            }
        }

        if !self.can_cache(entity_type) {
            return;
        }

        let id = entity.id();
        let removed = self.entities.remove(entity_type, &id);
        trace!(
            entity_type = %entity_type,
            id = %id,
            present = removed.is_some(),
            "evicted entity"
        );
        self.expire_lists(entity_type);
    }

    /// Drops every cached entity of `entity_type` and its subtypes, and expires their
    /// lists.
    pub fn remove_type(&self, entity_type: TypeKey, invalidate_references: bool) {
        if !self.can_cache(entity_type) {
            return;
        }

        let _guard = self.sync_lock.lock();
        let removed = self
            .entities
            .remove_type(entity_type, invalidate_references, &self.registry);

        self.expire_lists(entity_type);
        for descendant in self.registry.descendants(entity_type) {
            self.expire_lists(descendant);
        }
        trace!(entity_type = %entity_type, removed, "evicted type");
    }

    /// Looks up the list cached for (type, query key).
    ///
    /// Lists are exact-type: a list stored under a base type is not found through a
    /// subtype and vice versa. Non-cacheable types always miss.
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_cache_core::{
    ///     build_query_key, CacheConfig, CachedList, Criterion, EntityCache, Scalar, TypeKey,
    ///     TypeRegistry,
    /// };
    /// use std::sync::Arc;
    ///
    /// const ORDER: TypeKey = TypeKey::new("Order");
    ///
    /// let cache = EntityCache::new(Arc::new(TypeRegistry::default()), &CacheConfig::default());
    /// let key = build_query_key::<Criterion>(ORDER, &[], Some(10));
    ///
    /// assert!(cache.get_list(ORDER, &key).is_none());
    /// cache.add_list(ORDER, &key, CachedList::scalars(vec![Scalar::Integer(12)]));
    /// assert_eq!(cache.get_list(ORDER, &key).unwrap().len(), 1);
    /// ```
    pub fn get_list(&self, entity_type: TypeKey, key: &str) -> Option<CachedList> {
        if !self.can_cache(entity_type) {
            return None;
        }

        let found = self.lists.get(entity_type, key);
        #[cfg(feature = "stats")]
        {
            if found.is_some() {
                self.stats.record_list_hit();
            } else {
                self.stats.record_list_miss();
            }
        }
        found
    }

    /// Stores `list` for (type, query key), overwriting any previous list.
    ///
    /// No-op for non-cacheable types. The list stays until a write to the type, one of
    /// its subtypes, or an explicit `expire_lists` clears it.
    pub fn add_list(&self, entity_type: TypeKey, key: &str, list: CachedList) {
        if !self.can_cache(entity_type) {
            return;
        }
        self.lists.put(entity_type, key, list);
    }

    /// Clears every list of `entity_type` and of each of its ancestors.
    pub fn expire_lists(&self, entity_type: TypeKey) {
        if !self.can_cache(entity_type) {
            return;
        }

        let expired = self.lists.expire(entity_type, &self.registry);
        if expired > 0 {
            trace!(entity_type = %entity_type, expired, "expired cached lists");
        }
    }

    /// `true` iff `entity` was touched after `since`. Always `false` for
    /// non-cacheable types.
    pub fn is_updated_since(&self, entity: &dyn Entity, since: RowVersion) -> bool {
        let entity_type = entity.type_key();
        if !self.can_cache(entity_type) {
            return false;
        }
        self.row_versions
            .is_updated_since(entity_type, &entity.id(), since)
    }

    /// Records a write of `entity` at the next logical tick.
    pub fn touch_row_version(&self, entity: &dyn Entity) {
        let entity_type = entity.type_key();
        if !self.can_cache(entity_type) {
            return;
        }
        self.row_versions.touch(entity_type, &entity.id());
    }

    /// Tick to take before loading from the source of truth, if concurrency-aware
    /// caching is on.
    pub fn query_timestamp(&self) -> Option<RowVersion> {
        if self.concurrency_aware {
            Some(RowVersion::now())
        } else {
            None
        }
    }

    /// Empties this instance: row versions, entities and lists.
    pub fn clear_all(&self) {
        let _guard = self.sync_lock.lock();
        self.row_versions.clear();
        self.entities.clear();
        self.lists.clear();
        trace!("cleared cache instance");
    }

    /// Number of entities held by this instance, across all types.
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_cache_core::{CacheConfig, Entity, EntityCache, TypeKey, TypeRegistry};
    /// use std::sync::Arc;
    ///
    /// struct Tag(&'static str);
    ///
    /// impl Entity for Tag {
    ///     fn type_key(&self) -> TypeKey {
    ///         TypeKey::new("Tag")
    ///     }
    ///     fn id(&self) -> String {
    ///         self.0.to_string()
    ///     }
    /// }
    ///
    /// let cache = EntityCache::new(Arc::new(TypeRegistry::default()), &CacheConfig::default());
    /// cache.add(Arc::new(Tag("rust")));
    /// cache.add(Arc::new(Tag("rust")));
    /// cache.add(Arc::new(Tag("cache")));
    /// assert_eq!(cache.count_cached_entities(), 2);
    /// ```
    pub fn count_cached_entities(&self) -> usize {
        self.entities.count()
    }

    /// Number of query lists held by this instance, across all types.
    pub fn count_cached_lists(&self) -> usize {
        self.lists.count()
    }

    /// Access statistics of this instance.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    #[inline]
    fn record_entity_lookup(&self, _hit: bool) {
        #[cfg(feature = "stats")]
        {
            if _hit {
                self.stats.record_entity_hit();
            } else {
                self.stats.record_entity_miss();
            }
        }
    }
}

impl std::fmt::Debug for EntityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCache")
            .field("enabled_by_default", &self.enabled_by_default)
            .field("entities", &self.entities.count())
            .field("lists", &self.lists.count())
            .finish()
    }
}
