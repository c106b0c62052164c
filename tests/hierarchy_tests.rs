use entity_cache::{
    CacheConfig, CacheScope, CachedList, Criterion, Entity, EntityHandle, EntityType,
    FilterOperator, Scalar, ScopeResolver, TypeKey, TypeOptions, TypeRegistry,
};
use std::sync::Arc;

struct Order {
    id: u64,
    total: u32,
}

impl Entity for Order {
    fn type_key(&self) -> TypeKey {
        Self::TYPE_KEY
    }

    fn id(&self) -> String {
        self.id.to_string()
    }
}

impl EntityType for Order {
    const TYPE_KEY: TypeKey = TypeKey::qualified("Order", "shop::Order");
}

struct RushOrder {
    id: u64,
    courier: &'static str,
}

impl Entity for RushOrder {
    fn type_key(&self) -> TypeKey {
        Self::TYPE_KEY
    }

    fn id(&self) -> String {
        self.id.to_string()
    }
}

impl EntityType for RushOrder {
    const TYPE_KEY: TypeKey = TypeKey::qualified("RushOrder", "shop::RushOrder");
}

const LEDGER: TypeKey = TypeKey::new("Ledger");

fn registry(enabled_types: bool) -> TypeRegistry {
    TypeRegistry::builder()
        .register(Order::TYPE_KEY, TypeOptions::new())
        .register(
            RushOrder::TYPE_KEY,
            TypeOptions::new().parent(Order::TYPE_KEY),
        )
        .register(LEDGER, TypeOptions::new().cacheable(enabled_types))
        .build()
        .unwrap()
}

fn cache() -> entity_cache::Cache {
    let resolver = Arc::new(ScopeResolver::new(CacheConfig::default(), registry(false)));
    CacheScope::detached(resolver).global()
}

#[test]
fn test_order_rush_order_scenario() {
    let cache = cache();

    cache.add(Arc::new(RushOrder {
        id: 42,
        courier: "bike",
    }));

    // Base-type lookup finds the derived instance
    let found = cache.get(Order::TYPE_KEY, "42").unwrap();
    assert_eq!(found.type_key(), RushOrder::TYPE_KEY);
    let rush = cache.get_typed::<RushOrder>("42").unwrap();
    assert_eq!(rush.courier, "bike");

    // Removing the base type removes the subtype bucket too
    cache.remove_type(Order::TYPE_KEY, false);
    assert!(cache.get(RushOrder::TYPE_KEY, "42").is_none());
    assert!(cache.get(Order::TYPE_KEY, "42").is_none());
    assert_eq!(cache.count_cached_entities(), 0);
}

#[test]
fn test_identity_uniqueness() {
    let cache = cache();

    let first: EntityHandle = Arc::new(Order { id: 1, total: 10 });
    let second: EntityHandle = Arc::new(Order { id: 1, total: 20 });
    cache.add(first.clone());
    cache.add(second.clone());

    let found = cache.get(Order::TYPE_KEY, "1").unwrap();
    assert!(Arc::ptr_eq(&found, &second));
    assert!(!Arc::ptr_eq(&found, &first));
    assert_eq!(cache.get_typed::<Order>("1").unwrap().total, 20);
    assert_eq!(cache.count_cached_entities(), 1);
}

#[test]
fn test_list_invalidation() {
    let cache = cache();
    let key = cache.build_query_key::<Criterion>(Order::TYPE_KEY, &[], Some(10));

    cache.add_list(
        Order::TYPE_KEY,
        &key,
        CachedList::scalars(vec![Scalar::Integer(3)]),
    );
    assert!(cache.get_list(Order::TYPE_KEY, &key).is_some());

    cache.add(Arc::new(Order { id: 5, total: 1 }));
    assert!(cache.get_list(Order::TYPE_KEY, &key).is_none());
}

#[test]
fn test_ancestor_list_invalidation() {
    let cache = cache();
    let orders: Vec<EntityHandle> = vec![Arc::new(Order { id: 1, total: 1 })];
    cache.add_list(Order::TYPE_KEY, "all", CachedList::entities(orders));

    cache.add(Arc::new(RushOrder {
        id: 2,
        courier: "van",
    }));
    assert!(cache.get_list(Order::TYPE_KEY, "all").is_none());
}

#[test]
fn test_query_key_determinism() {
    let cache = cache();
    let c1 = Criterion::new("Status", FilterOperator::Equals, "Open");
    let c2 = Criterion::new("Total", FilterOperator::GreaterThan, "100");

    let forward = cache.build_query_key(Order::TYPE_KEY, &[c1.clone(), c2.clone()], Some(10));
    let again = cache.build_query_key(Order::TYPE_KEY, &[c1.clone(), c2.clone()], Some(10));
    let reversed = cache.build_query_key(Order::TYPE_KEY, &[c2, c1], Some(10));

    assert_eq!(forward, again);
    assert_ne!(forward, reversed);
    assert!(forward.starts_with("shop::Order:"));
}

#[test]
fn test_disabled_type_is_noop() {
    struct Entry(u32);

    impl Entity for Entry {
        fn type_key(&self) -> TypeKey {
            LEDGER
        }

        fn id(&self) -> String {
            self.0.to_string()
        }
    }

    let cache = cache();
    let before = cache.count_cached_entities();

    cache.add(Arc::new(Entry(1)));
    assert!(cache.get(LEDGER, "1").is_none());
    assert_eq!(cache.count_cached_entities(), before);
}

#[test]
fn test_globally_disabled_cache_still_honours_overrides() {
    let config = CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    };
    let resolver = Arc::new(ScopeResolver::new(config, registry(true)));
    let cache = CacheScope::detached(resolver).global();

    cache.add(Arc::new(Order { id: 1, total: 1 }));
    assert!(cache.get(Order::TYPE_KEY, "1").is_none());
    assert!(cache.can_cache(LEDGER));
}
