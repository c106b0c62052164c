use std::fmt::Display;
use std::sync::Arc;
use tracing::trace;

#[cfg(feature = "stats")]
use crate::CacheStats;
use crate::{
    build_query_key, CacheScope, CachedList, Entity, EntityCache, EntityHandle, EntityType,
    RowVersion, TypeKey,
};

/// A cache instance seen through the scope that produced it.
///
/// Reads go to the addressed instance only. Writes that must keep scopes consistent
/// (`add`, `remove`, `remove_type`, `expire_lists`, `touch_row_version`) are applied to
/// the addressed instance first and then replayed on every other live instance of the
/// scope: the request-bound one and the shared one. A removal through the shared
/// instance therefore also evicts from the request cache, and the other way round.
///
/// `add_list` and `clear_all` stay local to the addressed instance.
///
/// # Examples
///
/// ```
/// use entity_cache_core::{
///     CacheConfig, CacheScope, CacheStrategy, Entity, RequestContext, ScopeResolver, TypeKey,
///     TypeRegistry,
/// };
/// use std::sync::Arc;
///
/// struct Invoice(u32);
///
/// impl Entity for Invoice {
///     fn type_key(&self) -> TypeKey {
///         TypeKey::new("Invoice")
///     }
///     fn id(&self) -> String {
///         self.0.to_string()
///     }
/// }
///
/// let config = CacheConfig {
///     strategy: CacheStrategy::PerContext,
///     ..CacheConfig::default()
/// };
/// let resolver = Arc::new(ScopeResolver::new(config, TypeRegistry::default()));
/// let scope = CacheScope::new(resolver, Some(Arc::new(RequestContext::new())));
///
/// let invoice = Arc::new(Invoice(5));
/// scope.current().add(invoice.clone());
/// scope.global().add(invoice.clone());
///
/// // Removing through the request cache evicts from the shared one as well
/// scope.current().remove(&*invoice);
/// assert!(scope.global().get(TypeKey::new("Invoice"), "5").is_none());
/// ```
#[derive(Clone)]
pub struct Cache {
    instance: Arc<EntityCache>,
    scope: CacheScope,
}

impl Cache {
    pub(crate) fn new(instance: Arc<EntityCache>, scope: CacheScope) -> Self {
        Self { instance, scope }
    }

    /// The instance this handle addresses.
    pub fn instance(&self) -> &Arc<EntityCache> {
        &self.instance
    }

    /// The scope whose instances receive propagated writes.
    pub fn scope(&self) -> &CacheScope {
        &self.scope
    }

    /// See [`EntityCache::can_cache`].
    pub fn can_cache(&self, entity_type: TypeKey) -> bool {
        self.instance.can_cache(entity_type)
    }

    /// Looks up (type, id) in the addressed instance, probing registered subtypes.
    ///
    /// Never consults the other instances of the scope: a request cache that missed is
    /// expected to be filled by the caller from the source of truth.
    pub fn get(&self, entity_type: TypeKey, id: &str) -> Option<EntityHandle> {
        self.instance.get(entity_type, id)
    }

    /// Typed lookup in the addressed instance. See [`EntityCache::get_typed`].
    pub fn get_typed<T: EntityType>(&self, id: &str) -> Option<Arc<T>> {
        self.instance.get_typed::<T>(id)
    }

    /// Untyped lookup in the addressed instance. See [`EntityCache::get_any`].
    pub fn get_any(&self, id: &str) -> Option<EntityHandle> {
        self.instance.get_any(id)
    }

    /// Caches `entity` here and expires its type's lists on every other live instance.
    pub fn add(&self, entity: EntityHandle) {
        let entity_type = entity.type_key();
        self.instance.add(entity);
        for target in self.replicas() {
            target.expire_lists(entity_type);
        }
    }

    /// Evicts `entity` (and its dependent types) from every live instance.
    ///
    /// The entity's own references are invalidated once, not once per instance.
    pub fn remove(&self, entity: &dyn Entity) {
        entity.invalidate_cached_references();
        for target in self.targets() {
            target.evict(entity);
        }
    }

    /// Drops `entity_type` and its subtypes from every live instance.
    ///
    /// With `invalidate_references`, each dropped entity has its cached references
    /// invalidated.
    pub fn remove_type(&self, entity_type: TypeKey, invalidate_references: bool) {
        for target in self.targets() {
            target.remove_type(entity_type, invalidate_references);
        }
    }

    /// Looks up a cached query list in the addressed instance.
    pub fn get_list(&self, entity_type: TypeKey, key: &str) -> Option<CachedList> {
        self.instance.get_list(entity_type, key)
    }

    /// Stores a query list in the addressed instance only.
    ///
    /// A list loaded for one request says nothing about what the shared instance holds,
    /// so it is never copied across.
    pub fn add_list(&self, entity_type: TypeKey, key: &str, list: CachedList) {
        self.instance.add_list(entity_type, key, list);
    }

    /// Clears the lists of `entity_type` and its ancestors in every live instance.
    pub fn expire_lists(&self, entity_type: TypeKey) {
        for target in self.targets() {
            target.expire_lists(entity_type);
        }
    }

    /// See [`build_query_key`].
    pub fn build_query_key<C: Display>(
        &self,
        entity_type: TypeKey,
        criteria: &[C],
        limit: Option<usize>,
    ) -> String {
        build_query_key(entity_type, criteria, limit)
    }

    /// Whether `entity` was touched after `since`, according to the addressed instance.
    pub fn is_updated_since(&self, entity: &dyn Entity, since: RowVersion) -> bool {
        self.instance.is_updated_since(entity, since)
    }

    /// Records a write of `entity` in every live instance.
    pub fn touch_row_version(&self, entity: &dyn Entity) {
        for target in self.targets() {
            target.touch_row_version(entity);
        }
    }

    /// Tick to take before loading from the source of truth. `None` when
    /// concurrency-aware caching is off.
    pub fn query_timestamp(&self) -> Option<RowVersion> {
        self.instance.query_timestamp()
    }

    /// Empties the addressed instance only.
    pub fn clear_all(&self) {
        self.instance.clear_all();
    }

    /// Number of entities in the addressed instance.
    pub fn count_cached_entities(&self) -> usize {
        self.instance.count_cached_entities()
    }

    /// Number of query lists in the addressed instance.
    pub fn count_cached_lists(&self) -> usize {
        self.instance.count_cached_lists()
    }

    /// Statistics of the addressed instance.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.instance.stats()
    }

    fn targets(&self) -> Vec<Arc<EntityCache>> {
        let targets = self.scope.write_targets(&self.instance);
        if targets.len() > 1 {
            trace!(targets = targets.len(), "propagating write across scopes");
        }
        targets
    }

    /// Write targets other than the addressed instance.
    fn replicas(&self) -> impl Iterator<Item = Arc<EntityCache>> {
        self.targets().into_iter().skip(1)
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("instance", &self.instance)
            .field("strategy", &self.scope.resolver().strategy())
            .finish()
    }
}
