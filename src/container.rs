//! Container façade
//!
//! A named-entry registry over the engine: an identity-caching service
//! map, closure factories, and an optional definition source consulted
//! on miss. Entry ids are case-insensitive; a path-qualified id also
//! registers its short alias on first use, so `demo::util::Clock` and
//! `clock` land on the same cached entry.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::alias::{Alias, AliasIndex};
use crate::error::ArmatureError;
use crate::source::DefinitionSource;
use crate::value::Value;

/// Named-entry registry: the boundary deferred lookups resolve against.
pub trait EntryRegistry: Send + Sync {
    fn get(&self, name: &str) -> Result<Value, ArmatureError>;
    fn has(&self, name: &str) -> bool;
}

/// A closure service definition. Runs against the container's delegate
/// registry when one is configured, otherwise the container itself.
pub type ServiceFactory = Arc<dyn Fn(&dyn EntryRegistry) -> Result<Value, ArmatureError> + Send + Sync>;

pub struct Container {
    services: DashMap<String, Value>,
    factories: DashMap<String, ServiceFactory>,
    aliases: AliasIndex,
    source: Option<Arc<dyn DefinitionSource>>,
    delegate: Option<Arc<dyn EntryRegistry>>,
}

impl Container {
    pub fn new(
        source: Option<Arc<dyn DefinitionSource>>,
        delegate: Option<Arc<dyn EntryRegistry>>,
    ) -> Self {
        Self {
            services: DashMap::new(),
            factories: DashMap::new(),
            aliases: AliasIndex::new(),
            source,
            delegate,
        }
    }

    /// Register a value under an id.
    pub fn set(&self, id: &str, value: Value) {
        let key = self.canonical_key(id, true);
        debug!(entry = %key, "registering service");
        self.services.insert(key, value);
    }

    /// Register a closure definition. Any cached value for the id is
    /// dropped so the factory runs on the next `get`.
    pub fn set_factory<F>(&self, id: &str, factory: F)
    where
        F: Fn(&dyn EntryRegistry) -> Result<Value, ArmatureError> + Send + Sync + 'static,
    {
        let key = self.canonical_key(id, true);
        debug!(entry = %key, "registering factory");
        self.services.remove(&key);
        self.factories.insert(key, Arc::new(factory));
    }

    pub fn aliases(&self) -> &AliasIndex {
        &self.aliases
    }

    /// Lowercase the id and chase its alias. When `register` is set, a
    /// first-seen path-qualified id also gains its derived short alias.
    fn canonical_key(&self, id: &str, register: bool) -> String {
        let key = id.to_lowercase();
        if let Some(target) = self.aliases.target_of(&key) {
            return target.to_lowercase();
        }
        if register && id.contains("::") {
            self.aliases.insert(Alias::new(id));
        }
        key
    }

    fn entry(&self, id: &str) -> Result<Value, ArmatureError> {
        let key = self.canonical_key(id, true);

        if let Some(service) = self.services.get(&key) {
            return Ok(service.clone());
        }

        // Clone the factory out of the map before running it: a factory
        // may `get` other entries on this same container.
        let factory = self.factories.get(&key).map(|entry| entry.value().clone());
        if let Some(factory) = factory {
            let registry: &dyn EntryRegistry = match &self.delegate {
                Some(delegate) => delegate.as_ref(),
                None => self,
            };
            let value = factory(registry)?;
            self.services.insert(key, value.clone());
            return Ok(value);
        }

        if let Some(source) = &self.source {
            if let Some(value) = source.get(id)? {
                self.services.insert(key, value.clone());
                return Ok(value);
            }
        }

        warn!(entry = %id, "entry not found");
        Err(ArmatureError::EntryNotFound {
            name: id.to_string(),
        })
    }
}

impl EntryRegistry for Container {
    fn get(&self, name: &str) -> Result<Value, ArmatureError> {
        self.entry(name)
    }

    fn has(&self, name: &str) -> bool {
        let key = self.canonical_key(name, false);
        self.services.contains_key(&key)
            || self.factories.contains_key(&key)
            || self
                .source
                .as_ref()
                .is_some_and(|source| source.has(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TypeMetadataCache;
    use crate::registry::{TypeRegistry, TypeSpec};
    use crate::resolver::Resolver;
    use crate::source::Autowiring;

    fn autowired(specs: Vec<TypeSpec>) -> Container {
        let registry = Arc::new(TypeRegistry::new());
        for spec in specs {
            registry.register(spec);
        }
        let resolver = Arc::new(Resolver::auto_resolving(Arc::new(TypeMetadataCache::new(
            registry,
        ))));
        Container::new(Some(Arc::new(Autowiring::new(resolver))), None)
    }

    #[test]
    fn set_then_get_is_case_insensitive() {
        let container = Container::new(None, None);
        container.set("Config", Value::from("prod"));
        assert_eq!(container.get("config").unwrap(), Value::from("prod"));
        assert!(container.has("CONFIG"));
        assert!(!container.has("missing"));
    }

    #[test]
    fn missing_entry_is_an_error() {
        let container = Container::new(None, None);
        let err = container.get("ghost").unwrap_err();
        assert!(matches!(err, ArmatureError::EntryNotFound { .. }));
    }

    #[test]
    fn qualified_ids_gain_a_short_alias() {
        let container = autowired(vec![TypeSpec::new("demo::util::Clock")]);

        let long = container.get("demo::util::Clock").unwrap();
        let short = container.get("clock").unwrap();
        let long = long.as_object().unwrap();
        let short = short.as_object().unwrap();
        assert!(Arc::ptr_eq(long, short));
    }

    #[test]
    fn factories_run_once_and_cache() {
        let container = Container::new(None, None);
        container.set("base", Value::from(40i64));
        container.set_factory("answer", |registry| {
            let base = registry
                .get("base")?
                .as_json()
                .and_then(serde_json::Value::as_i64)
                .unwrap_or(0);
            Ok(Value::from(base + 2))
        });

        assert_eq!(container.get("answer").unwrap(), Value::from(42i64));
        // The cached value survives even if the input changes.
        container.set("base", Value::from(0i64));
        assert_eq!(container.get("answer").unwrap(), Value::from(42i64));
    }

    #[test]
    fn set_factory_drops_the_cached_value() {
        let container = Container::new(None, None);
        container.set("greeting", Value::from("hello"));
        container.set_factory("greeting", |_| Ok(Value::from("bonjour")));
        assert_eq!(container.get("greeting").unwrap(), Value::from("bonjour"));
    }

    #[test]
    fn factories_resolve_against_the_delegate() {
        let delegate = Arc::new(Container::new(None, None));
        delegate.set("region", Value::from("eu-west"));

        let container = Container::new(None, Some(delegate.clone() as Arc<dyn EntryRegistry>));
        container.set("region", Value::from("local-only"));
        container.set_factory("bucket", |registry| registry.get("region"));

        assert_eq!(container.get("bucket").unwrap(), Value::from("eu-west"));
    }

    #[test]
    fn has_matches_get_reachability_for_autowired_entries() {
        let container = autowired(vec![TypeSpec::new("demo::Clock")]);
        assert!(container.has("demo::Clock"));
        assert!(container.get("demo::Clock").is_ok());
        assert!(!container.has("demo::Ghost"));
        assert!(container.get("demo::Ghost").is_err());
    }

    #[test]
    fn source_backs_the_container_on_miss() {
        let container = autowired(vec![TypeSpec::new("demo::Clock")]);
        assert!(container.has("demo::Clock"));

        let first = container.get("demo::Clock").unwrap();
        let second = container.get("demo::Clock").unwrap();
        assert!(Arc::ptr_eq(
            first.as_object().unwrap(),
            second.as_object().unwrap()
        ));
    }
}
