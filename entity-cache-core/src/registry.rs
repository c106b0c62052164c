//! # Type Registry
//!
//! Static description of the domain types the cache knows about.
//!
//! The registry answers every structural question the cache needs without any runtime
//! introspection:
//!
//! - **Hierarchy**: each type's direct parent and direct children. Removing a type
//!   removes its children first, and list expiry walks up through the ancestors.
//! - **Eligibility**: an optional per-type override of the global "caching enabled"
//!   default (always-cacheable or never-cacheable types).
//! - **Dependents**: types that must be evicted whenever an entity of another type is
//!   removed (for example cached aggregates that embed a parent record).
//! - **Global identity**: types whose ids are unique across all such types and can be
//!   found by the untyped [`EntityCache::get_any`](crate::EntityCache::get_any) scan.
//!
//! The registry is built once at startup and is immutable afterwards, so lookups need no
//! locking.
//!
//! # Examples
//!
//! ```rust
//! use entity_cache_core::{TypeKey, TypeOptions, TypeRegistry};
//!
//! const ORDER: TypeKey = TypeKey::new("Order");
//! const RUSH_ORDER: TypeKey = TypeKey::new("RushOrder");
//! const ORDER_SUMMARY: TypeKey = TypeKey::new("OrderSummary");
//!
//! let registry = TypeRegistry::builder()
//!     .register(ORDER, TypeOptions::new())
//!     .register(RUSH_ORDER, TypeOptions::new().parent(ORDER))
//!     .register(ORDER_SUMMARY, TypeOptions::new().depends_on(ORDER))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(registry.children(ORDER), &[RUSH_ORDER]);
//! assert_eq!(registry.ancestors(RUSH_ORDER).collect::<Vec<_>>(), vec![RUSH_ORDER, ORDER]);
//! assert_eq!(registry.dependents_of(RUSH_ORDER), vec![ORDER_SUMMARY]);
//! ```

use std::collections::HashMap;

use crate::error::{CacheError, Result};
use crate::TypeKey;

/// Per-type registration options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeOptions {
    parent: Option<TypeKey>,
    cacheable: Option<bool>,
    depends_on: Vec<TypeKey>,
    globally_unique_ids: bool,
}

impl TypeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the direct base type.
    pub fn parent(mut self, parent: TypeKey) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Overrides the global caching default for this type.
    pub fn cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = Some(cacheable);
        self
    }

    /// Evict every cached entity of this type whenever an entity of `target` is removed.
    pub fn depends_on(mut self, target: TypeKey) -> Self {
        if !self.depends_on.contains(&target) {
            self.depends_on.push(target);
        }
        self
    }

    /// Marks ids of this type as unique across all globally identified types.
    pub fn globally_unique_ids(mut self) -> Self {
        self.globally_unique_ids = true;
        self
    }
}

#[derive(Debug, Clone)]
struct TypeInfo {
    options: TypeOptions,
    children: Vec<TypeKey>,
}

/// Immutable registry of domain types.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<TypeKey, TypeInfo>,
    /// Registration order, for deterministic iteration
    order: Vec<TypeKey>,
    /// Map from a type to the types declared dependent on it
    dependents: HashMap<TypeKey, Vec<TypeKey>>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    pub fn is_registered(&self, key: TypeKey) -> bool {
        self.types.contains_key(&key)
    }

    /// All registered types in registration order.
    pub fn types(&self) -> &[TypeKey] {
        &self.order
    }

    pub fn parent(&self, key: TypeKey) -> Option<TypeKey> {
        self.types.get(&key).and_then(|info| info.options.parent)
    }

    /// Direct children of `key`, in registration order.
    pub fn children(&self, key: TypeKey) -> &[TypeKey] {
        self.types
            .get(&key)
            .map(|info| info.children.as_slice())
            .unwrap_or(&[])
    }

    /// Every registered subtype of `key`, parents before their children.
    pub fn descendants(&self, key: TypeKey) -> Vec<TypeKey> {
        let mut result = Vec::new();
        let mut pending: Vec<TypeKey> = self.children(key).iter().rev().copied().collect();
        while let Some(next) = pending.pop() {
            result.push(next);
            pending.extend(self.children(next).iter().rev());
        }
        result
    }

    /// `key` itself followed by each ancestor up to its root type.
    pub fn ancestors(&self, key: TypeKey) -> Ancestors<'_> {
        Ancestors {
            registry: self,
            next: Some(key),
        }
    }

    /// Types that must be evicted when an entity of `key` is removed.
    ///
    /// Includes dependents declared against any ancestor of `key`, since a derived
    /// instance is also an instance of its base types.
    pub fn dependents_of(&self, key: TypeKey) -> Vec<TypeKey> {
        let mut result = Vec::new();
        for ancestor in self.ancestors(key) {
            if let Some(deps) = self.dependents.get(&ancestor) {
                for dep in deps {
                    if !result.contains(dep) {
                        result.push(*dep);
                    }
                }
            }
        }
        result
    }

    /// Per-type eligibility override, if one was declared.
    pub fn cacheable_override(&self, key: TypeKey) -> Option<bool> {
        self.types.get(&key).and_then(|info| info.options.cacheable)
    }

    pub fn has_globally_unique_ids(&self, key: TypeKey) -> bool {
        self.types
            .get(&key)
            .map(|info| info.options.globally_unique_ids)
            .unwrap_or(false)
    }
}

/// Iterator returned by [`TypeRegistry::ancestors`].
pub struct Ancestors<'a> {
    registry: &'a TypeRegistry,
    next: Option<TypeKey>,
}

impl Iterator for Ancestors<'_> {
    type Item = TypeKey;

    fn next(&mut self) -> Option<TypeKey> {
        let current = self.next?;
        self.next = self.registry.parent(current);
        Some(current)
    }
}

/// Builder for [`TypeRegistry`].
///
/// Registering the same key twice keeps the last options.
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    entries: Vec<(TypeKey, TypeOptions)>,
}

impl TypeRegistryBuilder {
    pub fn register(mut self, key: TypeKey, options: TypeOptions) -> Self {
        self.entries.retain(|(existing, _)| *existing != key);
        self.entries.push((key, options));
        self
    }

    /// Validates the declarations and builds the registry.
    ///
    /// # Errors
    ///
    /// * [`CacheError::UnknownParent`] if a parent was never registered
    /// * [`CacheError::UnknownDependency`] if a dependency target was never registered
    /// * [`CacheError::Cycle`] if the parent chain loops
    pub fn build(self) -> Result<TypeRegistry> {
        let mut registry = TypeRegistry::default();

        for (key, options) in &self.entries {
            registry.order.push(*key);
            registry.types.insert(
                *key,
                TypeInfo {
                    options: options.clone(),
                    children: Vec::new(),
                },
            );
        }

        for (key, options) in &self.entries {
            if let Some(parent) = options.parent {
                match registry.types.get_mut(&parent) {
                    Some(info) => info.children.push(*key),
                    None => {
                        return Err(CacheError::UnknownParent {
                            child: *key,
                            parent,
                        })
                    }
                }
            }

            for target in &options.depends_on {
                if !registry.types.contains_key(target) {
                    return Err(CacheError::UnknownDependency {
                        dependent: *key,
                        target: *target,
                    });
                }
                registry.dependents.entry(*target).or_default().push(*key);
            }
        }

        let limit = registry.order.len();
        for key in &registry.order {
            if registry.ancestors(*key).nth(limit).is_some() {
                return Err(CacheError::Cycle(*key));
            }
        }

        Ok(registry)
    }
}
