//! # Cache Scopes
//!
//! Decides which [`EntityCache`] instance is "current".
//!
//! - [`CacheStrategy::Global`]: one shared instance for the whole process.
//! - [`CacheStrategy::PerContext`]: one instance per [`RequestContext`], created the first
//!   time the context asks for it and dropped with the context. Without a context, every
//!   call gets a fresh empty instance, so unrelated callers never share state by accident.
//!
//! The strategy is fixed when the [`ScopeResolver`] is built. Nothing is discovered
//! through ambient state: request-handling code owns its `RequestContext` and passes it
//! explicitly inside a [`CacheScope`].
//!
//! # Examples
//!
//! ```
//! use entity_cache_core::{
//!     CacheConfig, CacheScope, CacheStrategy, RequestContext, ScopeResolver, TypeRegistry,
//! };
//! use std::sync::Arc;
//!
//! let config = CacheConfig {
//!     strategy: CacheStrategy::PerContext,
//!     ..CacheConfig::default()
//! };
//! let resolver = Arc::new(ScopeResolver::new(config, TypeRegistry::default()));
//!
//! let request = Arc::new(RequestContext::new());
//! let scope = CacheScope::new(resolver.clone(), Some(request.clone()));
//!
//! // Same context, same instance
//! assert!(Arc::ptr_eq(scope.current().instance(), scope.current().instance()));
//! // And not the shared one
//! assert!(!Arc::ptr_eq(scope.current().instance(), resolver.global()));
//! ```

use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::{Cache, CacheConfig, CacheStrategy, EntityCache, TypeRegistry};

/// Per-request storage for a request-scoped cache instance.
///
/// Created and owned by whatever handles the request; the instance inside lives exactly
/// as long as the context.
#[derive(Debug, Default)]
pub struct RequestContext {
    cache: OnceCell<Arc<EntityCache>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instance bound to this context, if one was created yet.
    pub fn cache(&self) -> Option<&Arc<EntityCache>> {
        self.cache.get()
    }
}

/// Resolves the current cache instance according to the configured strategy.
pub struct ScopeResolver {
    strategy: CacheStrategy,
    config: CacheConfig,
    registry: Arc<TypeRegistry>,
    global: Arc<EntityCache>,
}

impl ScopeResolver {
    pub fn new(config: CacheConfig, registry: TypeRegistry) -> Self {
        let registry = Arc::new(registry);
        let global = Arc::new(EntityCache::new(registry.clone(), &config));
        debug!(strategy = %config.strategy, enabled = config.enabled, "cache scope resolver ready");

        Self {
            strategy: config.strategy,
            config,
            registry,
            global,
        }
    }

    /// Builds a resolver from `DATABASE_CACHE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Fails on an unrecognized strategy or an unparsable flag.
    pub fn from_env(registry: TypeRegistry) -> Result<Self> {
        Ok(Self::new(CacheConfig::from_env()?, registry))
    }

    pub fn strategy(&self) -> CacheStrategy {
        self.strategy
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The process-wide instance.
    pub fn global(&self) -> &Arc<EntityCache> {
        &self.global
    }

    /// A new, empty instance sharing this resolver's registry and settings.
    pub fn new_instance(&self) -> Arc<EntityCache> {
        Arc::new(EntityCache::new(self.registry.clone(), &self.config))
    }

    /// The instance callers in `context` should use.
    pub fn current(&self, context: Option<&RequestContext>) -> Arc<EntityCache> {
        match self.strategy {
            CacheStrategy::Global => self.global.clone(),
            CacheStrategy::PerContext => match context {
                Some(context) => self.bound(context),
                None => self.new_instance(),
            },
        }
    }

    /// The request-bound instance, created on first access.
    fn bound(&self, context: &RequestContext) -> Arc<EntityCache> {
        context
            .cache
            .get_or_init(|| {
                debug!("creating request-scoped cache");
                self.new_instance()
            })
            .clone()
    }

    /// The request-bound instance under `PerContext`, if the request already created one.
    ///
    /// Never creates it: an instance nobody has used holds nothing to evict.
    pub(crate) fn context_instance(
        &self,
        context: Option<&RequestContext>,
    ) -> Option<Arc<EntityCache>> {
        match (self.strategy, context) {
            (CacheStrategy::PerContext, Some(context)) => context.cache().cloned(),
            _ => None,
        }
    }
}

/// The explicit scope a caller works in: a resolver plus, optionally, the request
/// context it is serving.
#[derive(Clone)]
pub struct CacheScope {
    resolver: Arc<ScopeResolver>,
    context: Option<Arc<RequestContext>>,
}

impl CacheScope {
    pub fn new(resolver: Arc<ScopeResolver>, context: Option<Arc<RequestContext>>) -> Self {
        Self { resolver, context }
    }

    /// Scope with no active request.
    pub fn detached(resolver: Arc<ScopeResolver>) -> Self {
        Self::new(resolver, None)
    }

    pub fn resolver(&self) -> &Arc<ScopeResolver> {
        &self.resolver
    }

    pub fn context(&self) -> Option<&Arc<RequestContext>> {
        self.context.as_ref()
    }

    /// Handle on the current instance.
    pub fn current(&self) -> Cache {
        let instance = self.resolver.current(self.context.as_deref());
        Cache::new(instance, self.clone())
    }

    /// Handle on the shared instance. Its writes still reach the request instance.
    pub fn global(&self) -> Cache {
        Cache::new(self.resolver.global().clone(), self.clone())
    }

    /// Every instance a write addressed at `addressed` must reach, `addressed` first,
    /// each at most once.
    pub(crate) fn write_targets(&self, addressed: &Arc<EntityCache>) -> Vec<Arc<EntityCache>> {
        let mut targets = vec![addressed.clone()];
        let candidates = [
            self.resolver.context_instance(self.context.as_deref()),
            Some(self.resolver.global().clone()),
        ];

        for candidate in candidates.into_iter().flatten() {
            if !targets.iter().any(|t| Arc::ptr_eq(t, &candidate)) {
                targets.push(candidate);
            }
        }
        targets
    }
}
