//! # Container Tests
//!
//! Tests for the container façade and its collaborators:
//! - Identity caching and case-insensitive ids
//! - Derived short aliases for path-qualified ids
//! - Definition sources (autowiring and annotations)
//! - Deferred lookups against the container as a named-entry registry
//! - Builder assembly options

use armature::{
    ArmatureError, Container, ContainerBuilder, EntryRegistry, Lazy, ParamSpec, Resolver,
    TypeMetadataCache, TypeRegistry, TypeSpec, Value,
};
use std::sync::Arc;

// ============================================================================
// TEST HELPERS
// ============================================================================

fn registry_with(specs: Vec<TypeSpec>) -> Arc<TypeRegistry> {
    let registry = Arc::new(TypeRegistry::new());
    for spec in specs {
        registry.register(spec);
    }
    registry
}

fn autowired_container(specs: Vec<TypeSpec>) -> Container {
    ContainerBuilder::with_registry(registry_with(specs)).build()
}

// ============================================================================
// IDENTITY AND ALIAS TESTS
// ============================================================================

#[test]
fn entries_are_cached_by_identity() {
    let container = autowired_container(vec![TypeSpec::new("demo::Clock")]);

    let first = container.get("demo::Clock").unwrap();
    let second = container.get("demo::Clock").unwrap();
    assert!(Arc::ptr_eq(
        first.as_object().unwrap(),
        second.as_object().unwrap()
    ));
}

#[test]
fn short_alias_reaches_the_same_cached_entry() {
    let container = autowired_container(vec![TypeSpec::new("demo::util::Clock")]);

    let qualified = container.get("demo::util::Clock").unwrap();
    let short = container.get("clock").unwrap();
    assert!(Arc::ptr_eq(
        qualified.as_object().unwrap(),
        short.as_object().unwrap()
    ));
}

#[test]
fn ids_are_case_insensitive() {
    let container = Container::new(None, None);
    container.set("Database", Value::from("pg://localhost"));
    assert_eq!(container.get("database").unwrap(), Value::from("pg://localhost"));
    assert_eq!(container.get("DATABASE").unwrap(), Value::from("pg://localhost"));
}

#[test]
fn unknown_entry_is_entry_not_found() {
    let container = Container::new(None, None);
    let err = container.get("ghost").unwrap_err();
    match err {
        ArmatureError::EntryNotFound { name } => assert_eq!(name, "ghost"),
        other => panic!("expected EntryNotFound, got {other:?}"),
    }
}

// ============================================================================
// DEFINITION SOURCE TESTS
// ============================================================================

#[test]
fn autowired_container_constructs_dependencies_recursively() {
    let container = autowired_container(vec![
        TypeSpec::new("demo::Helper"),
        TypeSpec::new("demo::Widget").param_typed("helper", "demo::Helper"),
    ]);

    let widget = container.get("demo::Widget").unwrap();
    let widget = widget.as_object().unwrap();
    let helper = widget.get("helper").expect("helper field");
    assert_eq!(helper.as_object().unwrap().type_name(), "demo::Helper");
}

#[test]
fn annotated_container_honors_doc_hints() {
    let registry = registry_with(vec![
        TypeSpec::new("demo::Helper"),
        TypeSpec::new("demo::Widget")
            .param_spec(ParamSpec::new("size").doc("@var value(12)"))
            .param_spec(ParamSpec::new("helper").doc("@var demo::Helper")),
    ]);
    let container = ContainerBuilder::with_registry(registry).build_dev();

    let widget = container.get("demo::Widget").unwrap();
    let widget = widget.as_object().unwrap();
    assert_eq!(widget.get("size"), Some(Value::from(12i64)));
    let helper = widget.get("helper").expect("helper field");
    assert_eq!(helper.as_object().unwrap().type_name(), "demo::Helper");
}

#[test]
fn builder_definitions_reach_the_container() {
    let container = ContainerBuilder::new()
        .add_definition("region", "eu-west")
        .build();
    assert_eq!(container.get("region").unwrap(), Value::from("eu-west"));
    assert!(container.has("region"));
}

// ============================================================================
// DEFERRED LOOKUP TESTS
// ============================================================================

#[test]
fn deferred_lookup_resolves_against_the_container() {
    let container: Arc<dyn EntryRegistry> = Arc::new({
        let container = Container::new(None, None);
        container.set("database", Value::from("pg://localhost"));
        container
    });
    let resolver = Resolver::new(Arc::new(TypeMetadataCache::new(Arc::new(
        TypeRegistry::new(),
    ))));

    let lazy = Lazy::lookup(container, "database");
    assert!(!lazy.is_forced());
    assert_eq!(lazy.force(&resolver).unwrap(), Value::from("pg://localhost"));
    assert!(lazy.is_forced());
}

#[test]
fn deferred_lookup_miss_carries_the_container_error() {
    let container: Arc<dyn EntryRegistry> = Arc::new(Container::new(None, None));
    let resolver = Resolver::new(Arc::new(TypeMetadataCache::new(Arc::new(
        TypeRegistry::new(),
    ))));

    let lazy = Lazy::lookup(container, "ghost");
    let err = lazy.force(&resolver).unwrap_err();
    assert!(matches!(err, ArmatureError::EntryNotFound { .. }));
}

#[test]
fn deferred_lookup_as_constructor_argument() {
    let shared = Arc::new(Container::new(None, None));
    shared.set("database", Value::from("pg://localhost"));

    let registry = registry_with(vec![TypeSpec::new("demo::Repo").param("conn")]);
    let resolver = Arc::new(Resolver::new(Arc::new(TypeMetadataCache::new(registry))));
    resolver.define(
        "conn",
        Value::Lazy(Lazy::lookup(shared as Arc<dyn EntryRegistry>, "database")),
    );

    let repo = resolver.resolve_default("demo::Repo").unwrap();
    assert_eq!(
        repo.as_object().unwrap().get("conn"),
        Some(Value::from("pg://localhost"))
    );
}

// ============================================================================
// FACTORY AND DELEGATE TESTS
// ============================================================================

#[test]
fn closure_factories_are_cached_after_first_run() {
    let container = Container::new(None, None);
    container.set_factory("stamp", |_| Ok(Value::from("v1")));

    assert_eq!(container.get("stamp").unwrap(), Value::from("v1"));
    container.set_factory("stamp", |_| Ok(Value::from("v2")));
    // Re-registering drops the cache; the new factory runs.
    assert_eq!(container.get("stamp").unwrap(), Value::from("v2"));
}

#[test]
fn delegate_supplies_factory_dependencies() {
    let delegate = Arc::new(Container::new(None, None));
    delegate.set("region", Value::from("eu-west"));

    let container = ContainerBuilder::new()
        .use_autowiring(false)
        .set_delegate(delegate as Arc<dyn EntryRegistry>)
        .build();
    container.set_factory("bucket", |registry| registry.get("region"));

    assert_eq!(container.get("bucket").unwrap(), Value::from("eu-west"));
}
