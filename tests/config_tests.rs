use entity_cache::{resolver_from_env, CacheError, CacheStrategy, TypeRegistry};
use serial_test::serial;

const STRATEGY: &str = "DATABASE_CACHE_STRATEGY";
const ENABLED: &str = "DATABASE_CACHE_ENABLED";

fn clear_env() {
    std::env::remove_var(STRATEGY);
    std::env::remove_var(ENABLED);
    std::env::remove_var("DATABASE_CONCURRENCY_AWARE_CACHE");
}

#[test]
#[serial]
fn test_resolver_from_env_defaults() {
    clear_env();
    let resolver = resolver_from_env(TypeRegistry::default()).unwrap();
    assert_eq!(resolver.strategy(), CacheStrategy::Global);
    assert!(resolver.config().enabled);
}

#[test]
#[serial]
fn test_resolver_from_env_per_request() {
    clear_env();
    std::env::set_var(STRATEGY, "PerHttpRequest");
    let resolver = resolver_from_env(TypeRegistry::default());
    clear_env();

    assert_eq!(resolver.unwrap().strategy(), CacheStrategy::PerContext);
}

#[test]
#[serial]
fn test_resolver_from_env_rejects_unknown_strategy() {
    clear_env();
    std::env::set_var(STRATEGY, "Distributed");
    let result = resolver_from_env(TypeRegistry::default());
    clear_env();

    assert!(matches!(
        result,
        Err(CacheError::InvalidStrategy(ref value)) if value == "Distributed"
    ));
}

#[test]
#[serial]
fn test_resolver_from_env_disabled() {
    clear_env();
    std::env::set_var(ENABLED, "false");
    let resolver = resolver_from_env(TypeRegistry::default());
    clear_env();

    assert!(!resolver.unwrap().config().enabled);
}
