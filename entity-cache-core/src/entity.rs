use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Identifier of a domain type.
///
/// A `TypeKey` is a cheap, `Copy` handle made of a short name (used for equality,
/// hashing and logging) and an optional fully qualified display name. The qualified
/// name is what ends up in list-cache query keys, so two types that share a short name
/// in different modules can still be told apart.
///
/// Hierarchy information (parent, children, dependents) is not stored on the key itself;
/// it lives in the [`TypeRegistry`](crate::TypeRegistry) built at startup.
///
/// # Examples
///
/// ```
/// use entity_cache_core::TypeKey;
///
/// const ORDER: TypeKey = TypeKey::new("Order");
/// const INVOICE: TypeKey = TypeKey::qualified("Invoice", "shop::billing::Invoice");
///
/// assert_eq!(ORDER.name(), "Order");
/// assert_eq!(ORDER.qualified_name(), "Order");
/// assert_eq!(INVOICE.qualified_name(), "shop::billing::Invoice");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey {
    name: &'static str,
    qualified: Option<&'static str>,
}

impl TypeKey {
    /// Creates a key whose qualified name is the short name itself.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            qualified: None,
        }
    }

    /// Creates a key with an explicit qualified display name.
    pub const fn qualified(name: &'static str, qualified: &'static str) -> Self {
        Self {
            name,
            qualified: Some(qualified),
        }
    }

    /// Short type name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Fully qualified name, falling back to the short name.
    pub fn qualified_name(&self) -> &'static str {
        self.qualified.unwrap_or(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Upcast helper so handles can be downcast back to their concrete type.
///
/// Implemented for every `Send + Sync + 'static` type; there is no need to implement it
/// by hand.
pub trait AsAny: Any + Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A domain object the cache can hold.
///
/// The only structural requirement is a stable identity string. The two hooks have
/// no-op defaults:
///
/// * [`invalidate_cached_references`](Entity::invalidate_cached_references) is called
///   when an instance is replaced or evicted, so the entity can drop any reverse
///   navigation it memoized.
/// * [`is_application_event`](Entity::is_application_event) marks audit/event records.
///   Removing one never cascades to dependent types.
///
/// # Examples
///
/// ```
/// use entity_cache_core::{Entity, EntityType, TypeKey};
///
/// struct Customer {
///     id: u64,
/// }
///
/// impl Entity for Customer {
///     fn type_key(&self) -> TypeKey {
///         Self::TYPE_KEY
///     }
///
///     fn id(&self) -> String {
///         self.id.to_string()
///     }
/// }
///
/// impl EntityType for Customer {
///     const TYPE_KEY: TypeKey = TypeKey::new("Customer");
/// }
///
/// let c = Customer { id: 7 };
/// assert_eq!(c.id(), "7");
/// assert_eq!(c.type_key(), Customer::TYPE_KEY);
/// ```
pub trait Entity: AsAny {
    /// Exact runtime type of this instance.
    fn type_key(&self) -> TypeKey;

    /// Identity string, unique within the entity's type.
    fn id(&self) -> String;

    fn invalidate_cached_references(&self) {}

    fn is_application_event(&self) -> bool {
        false
    }
}

/// Static type information for typed lookups such as
/// [`EntityCache::get_typed`](crate::EntityCache::get_typed).
pub trait EntityType: Entity + Sized {
    const TYPE_KEY: TypeKey;
}

/// Shared handle to a cached entity.
pub type EntityHandle = Arc<dyn Entity>;

/// Downcasts a handle to a concrete entity type.
///
/// Returns `None` when the handle holds a different concrete type.
pub fn downcast_entity<T: EntityType>(handle: EntityHandle) -> Option<Arc<T>> {
    handle.into_any().downcast::<T>().ok()
}
