//! # Entity Cache
//!
//! An in-process cache of domain entities and query results for ORM-style data-access
//! layers.
//!
//! ## Features
//!
//! - **Identity map**: one cached instance per (type, id), replaced on every `add`
//! - **Hierarchy-aware**: looking up a base type finds derived instances; removing a base
//!   type removes its subtypes
//! - **List cache**: query results keyed by a deterministic query key, expired on writes
//! - **Dependent types**: removing an entity can evict whole types that depend on it
//! - **Scopes**: one shared cache, or one cache per request with writes mirrored to the
//!   shared one
//!
//! ## Quick Start
//!
//! Describe the domain types once, build a resolver, and work through a [`CacheScope`]:
//!
//! ```rust
//! use entity_cache::{
//!     CacheConfig, CacheScope, Entity, EntityType, ScopeResolver, TypeKey, TypeOptions,
//!     TypeRegistry,
//! };
//! use std::sync::Arc;
//!
//! struct Order {
//!     id: u64,
//! }
//!
//! impl Entity for Order {
//!     fn type_key(&self) -> TypeKey {
//!         Self::TYPE_KEY
//!     }
//!     fn id(&self) -> String {
//!         self.id.to_string()
//!     }
//! }
//!
//! impl EntityType for Order {
//!     const TYPE_KEY: TypeKey = TypeKey::qualified("Order", "shop::Order");
//! }
//!
//! let registry = TypeRegistry::builder()
//!     .register(Order::TYPE_KEY, TypeOptions::new())
//!     .build()
//!     .unwrap();
//! let resolver = Arc::new(ScopeResolver::new(CacheConfig::default(), registry));
//! let cache = CacheScope::detached(resolver).current();
//!
//! cache.add(Arc::new(Order { id: 42 }));
//! assert_eq!(cache.get_typed::<Order>("42").unwrap().id, 42);
//! ```
//!
//! ## Query Lists
//!
//! Lists are cached under a key built from the type, the filter criteria and an optional
//! limit. Any write to the type expires them:
//!
//! ```rust
//! use entity_cache::{
//!     CacheConfig, CacheScope, CachedList, Criterion, FilterOperator, Scalar, ScopeResolver,
//!     TypeKey, TypeRegistry,
//! };
//! use std::sync::Arc;
//!
//! const ORDER: TypeKey = TypeKey::new("Order");
//!
//! let resolver = Arc::new(ScopeResolver::new(CacheConfig::default(), TypeRegistry::default()));
//! let cache = CacheScope::detached(resolver).global();
//!
//! let open = Criterion::new("Status", FilterOperator::Equals, "Open");
//! let key = cache.build_query_key(ORDER, &[open], None);
//!
//! cache.add_list(ORDER, &key, CachedList::scalars(vec![Scalar::Integer(7)]));
//! assert!(cache.get_list(ORDER, &key).is_some());
//!
//! cache.expire_lists(ORDER);
//! assert!(cache.get_list(ORDER, &key).is_none());
//! ```
//!
//! ## Per-Request Caches
//!
//! With the `PerContext` strategy each [`RequestContext`] gets its own instance, created
//! on first use and dropped with the context:
//!
//! ```rust
//! use entity_cache::{request_scope, CacheConfig, CacheStrategy, ScopeResolver, TypeRegistry};
//! use std::sync::Arc;
//!
//! let config = CacheConfig {
//!     strategy: CacheStrategy::PerContext,
//!     ..CacheConfig::default()
//! };
//! let resolver = Arc::new(ScopeResolver::new(config, TypeRegistry::default()));
//!
//! let first = request_scope(&resolver);
//! let second = request_scope(&resolver);
//! assert!(!Arc::ptr_eq(first.current().instance(), second.current().instance()));
//! ```

use std::sync::Arc;

pub use entity_cache_core::*;

/// Build a shared resolver from environment variables
///
/// Reads `DATABASE_CACHE_ENABLED`, `DATABASE_CACHE_STRATEGY` and
/// `DATABASE_CONCURRENCY_AWARE_CACHE`; unset variables keep their defaults.
///
/// # Arguments
///
/// * `registry` - The domain type registry
///
/// # Errors
///
/// Returns [`CacheError`] when a variable holds an unrecognized value
///
/// # Examples
///
/// ```rust
/// use entity_cache::{resolver_from_env, TypeRegistry};
///
/// let resolver = resolver_from_env(TypeRegistry::default()).unwrap();
/// assert_eq!(resolver.global().count_cached_entities(), 0);
/// ```
pub fn resolver_from_env(registry: TypeRegistry) -> Result<Arc<ScopeResolver>> {
    ScopeResolver::from_env(registry).map(Arc::new)
}

/// Open a scope for a new request
///
/// The returned scope owns a fresh [`RequestContext`]. Under the `Global` strategy the
/// context is ignored and the scope resolves to the shared instance.
///
/// # Arguments
///
/// * `resolver` - The resolver built at startup
///
/// # Examples
///
/// ```rust
/// use entity_cache::{request_scope, CacheConfig, ScopeResolver, TypeRegistry};
/// use std::sync::Arc;
///
/// let resolver = Arc::new(ScopeResolver::new(CacheConfig::default(), TypeRegistry::default()));
/// let scope = request_scope(&resolver);
/// assert!(Arc::ptr_eq(scope.current().instance(), resolver.global()));
/// ```
pub fn request_scope(resolver: &Arc<ScopeResolver>) -> CacheScope {
    CacheScope::new(resolver.clone(), Some(Arc::new(RequestContext::new())))
}
