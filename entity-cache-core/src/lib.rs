//! # Entity Cache Core
//!
//! Core types and storage for the entity-cache library: an in-process cache of domain
//! entities and query results for an ORM-style data-access layer.
//!
//! The cache never talks to a data source. It stores what the data layer hands it,
//! answers lookups, and invalidates on the writes the data layer reports.
//!
//! ## Features
//!
//! - **Identity Map**: at most one cached instance per (type, id)
//! - **Type Hierarchies**: base-type lookups find derived instances; removing a base type
//!   removes its subtypes
//! - **Query Lists**: cached result sequences keyed by a deterministic query key, expired
//!   whenever their type or a subtype changes
//! - **Dependent Types**: declared cross-type eviction rules
//! - **Row Versions**: logical-clock staleness checks for concurrency-aware loading
//! - **Scopes**: one process-wide instance or one instance per request context
//! - **Statistics**: hit/miss counters behind the `stats` feature
//!
//! ## Module Organization
//!
//! - [`entity`] - Entity traits, type keys and handles
//! - [`registry`] - Static type registry: hierarchy, eligibility, dependents
//! - [`row_version`] - Logical clock and per-entity write tracking
//! - [`entity_store`] - Per-type identity maps
//! - [`list_store`] - Per-type query-result lists
//! - [`query_key`] - List-cache key derivation
//! - [`config`] - Startup configuration
//! - [`cache`] - A single cache instance
//! - [`scope`] - Scope resolution and request contexts
//! - [`facade`] - The scoped [`Cache`] handle
//!
mod bucket;

pub mod cache;
pub mod config;
pub mod entity;
pub mod entity_store;
pub mod error;
pub mod facade;
pub mod list_store;
pub mod query_key;
pub mod registry;
pub mod row_version;
pub mod scope;

#[cfg(feature = "stats")]
mod stats;

pub use cache::EntityCache;
pub use config::{CacheConfig, CacheStrategy};
pub use entity::{downcast_entity, AsAny, Entity, EntityHandle, EntityType, TypeKey};
pub use entity_store::EntityStore;
pub use error::{CacheError, Result};
pub use facade::Cache;
pub use list_store::{CachedList, ListStore, Scalar};
pub use query_key::{build_query_key, Criterion, FilterOperator};
pub use registry::{Ancestors, TypeOptions, TypeRegistry, TypeRegistryBuilder};
pub use row_version::{RowVersion, RowVersionTracker};
pub use scope::{CacheScope, RequestContext, ScopeResolver};

#[cfg(feature = "stats")]
pub use stats::CacheStats;
