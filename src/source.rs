//! Definition sources
//!
//! A definition source supplies, for an entry name, either a value or
//! nothing. The container consults its source after its own service map
//! and factories. Two strategies ship with the crate: autowiring, which
//! constructs any registered constructible type on demand, and the
//! annotation strategy, which additionally honors doc hints on
//! constructor parameters.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::ArmatureError;
use crate::hints::parse_hints;
use crate::lazy::Lazy;
use crate::resolver::{Overrides, Resolver, SetterMap};
use crate::value::Value;

/// Source of definitions for entries of the container.
pub trait DefinitionSource: Send + Sync {
    /// The definition for the entry name, or `None` when the source
    /// cannot supply one.
    fn get(&self, name: &str) -> Result<Option<Value>, ArmatureError>;

    fn has(&self, name: &str) -> bool;

    /// Set the definition for an entry name.
    fn set(&self, name: &str, value: Value);
}

/// Constructs registered constructible types on demand, memoizing the
/// result. Explicitly added definitions always win.
pub struct Autowiring {
    definitions: DashMap<String, Value>,
    resolver: Arc<Resolver>,
}

impl Autowiring {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self {
            definitions: DashMap::new(),
            resolver,
        }
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn add_definitions<I>(&self, definitions: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (name, value) in definitions {
            self.definitions.insert(name, value);
        }
    }
}

impl DefinitionSource for Autowiring {
    fn get(&self, name: &str) -> Result<Option<Value>, ArmatureError> {
        if let Some(value) = self.definitions.get(name) {
            return Ok(Some(value.clone()));
        }
        if !self.resolver.metadata().registry().is_constructible(name) {
            return Ok(None);
        }

        debug!(entry = name, "autowiring entry");
        let value = self.resolver.resolve_default(name)?;
        self.definitions.insert(name.to_string(), value.clone());
        Ok(Some(value))
    }

    fn has(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
            || self.resolver.metadata().registry().is_constructible(name)
    }

    fn set(&self, name: &str, value: Value) {
        self.definitions.insert(name.to_string(), value);
    }
}

/// Autowiring plus doc-hint-driven parameter overrides.
///
/// Recognized hints on a constructor parameter's doc:
/// - `@var value(...)` — a literal override
/// - `@var inject(name)` — the engine's type-agnostic definition under
///   that name, when one is registered
/// - `@var some::Type` — deferred construction of that type
pub struct Annotation {
    definitions: DashMap<String, Value>,
    resolver: Arc<Resolver>,
}

impl Annotation {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self {
            definitions: DashMap::new(),
            resolver,
        }
    }

    pub fn add_definitions<I>(&self, definitions: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (name, value) in definitions {
            self.definitions.insert(name, value);
        }
    }

    fn hint_overrides(&self, name: &str) -> Overrides {
        let mut overrides = Overrides::new();
        let Some(spec) = self.resolver.metadata().registry().get(name) else {
            return overrides;
        };

        for param in &spec.params {
            let Some(doc) = &param.doc else { continue };
            for (hint, argument) in parse_hints(doc) {
                match hint.as_str() {
                    "value" => {
                        overrides = overrides.named(&param.name, Value::Json(argument));
                    }
                    "inject" => {
                        let Some(entry) = argument.as_str() else { continue };
                        if let Some(value) = self.resolver.definition(entry) {
                            overrides = overrides.named(&param.name, value);
                        }
                    }
                    type_name
                        if self
                            .resolver
                            .metadata()
                            .registry()
                            .is_constructible(type_name) =>
                    {
                        overrides = overrides.named(
                            &param.name,
                            Value::Lazy(Lazy::construct_default(type_name)),
                        );
                    }
                    _ => {}
                }
            }
        }
        overrides
    }
}

impl DefinitionSource for Annotation {
    fn get(&self, name: &str) -> Result<Option<Value>, ArmatureError> {
        if let Some(value) = self.definitions.get(name) {
            return Ok(Some(value.clone()));
        }
        if !self.resolver.metadata().registry().is_constructible(name) {
            return Ok(None);
        }

        debug!(entry = name, "resolving entry from annotations");
        let overrides = self.hint_overrides(name);
        let value = self.resolver.resolve(name, overrides, SetterMap::new())?;
        self.definitions.insert(name.to_string(), value.clone());
        Ok(Some(value))
    }

    fn has(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
            || self.resolver.metadata().registry().is_constructible(name)
    }

    fn set(&self, name: &str, value: Value) {
        self.definitions.insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TypeMetadataCache;
    use crate::registry::{ParamSpec, TypeRegistry, TypeSpec};

    fn auto_resolver(specs: Vec<TypeSpec>) -> Arc<Resolver> {
        let registry = Arc::new(TypeRegistry::new());
        for spec in specs {
            registry.register(spec);
        }
        Arc::new(Resolver::auto_resolving(Arc::new(TypeMetadataCache::new(
            registry,
        ))))
    }

    #[test]
    fn autowiring_constructs_and_memoizes() {
        let resolver = auto_resolver(vec![TypeSpec::new("demo::Clock")]);
        let source = Autowiring::new(resolver);

        let first = source.get("demo::Clock").unwrap().expect("constructed");
        let second = source.get("demo::Clock").unwrap().expect("cached");
        let first = first.as_object().unwrap();
        let second = second.as_object().unwrap();
        assert!(Arc::ptr_eq(first, second));
        assert!(source.has("demo::Clock"));
    }

    #[test]
    fn has_covers_constructible_types_before_first_get() {
        let resolver = auto_resolver(vec![TypeSpec::new("demo::Clock")]);
        let source = Autowiring::new(Arc::clone(&resolver));
        // Whatever get can supply, has must report.
        assert!(source.has("demo::Clock"));

        let annotated = Annotation::new(resolver);
        assert!(annotated.has("demo::Clock"));
        assert!(!annotated.has("demo::Ghost"));
    }

    #[test]
    fn autowiring_returns_none_for_unknown_names() {
        let resolver = auto_resolver(vec![]);
        let source = Autowiring::new(resolver);
        assert_eq!(source.get("demo::Ghost").unwrap(), None);
        assert!(!source.has("demo::Ghost"));
    }

    #[test]
    fn explicit_definitions_win_over_construction() {
        let resolver = auto_resolver(vec![TypeSpec::new("demo::Clock")]);
        let source = Autowiring::new(resolver);
        source.set("demo::Clock", Value::from("frozen"));
        assert_eq!(
            source.get("demo::Clock").unwrap(),
            Some(Value::from("frozen"))
        );
    }

    #[test]
    fn annotation_applies_value_hints() {
        let resolver = auto_resolver(vec![TypeSpec::new("demo::Widget")
            .param_spec(ParamSpec::new("size").doc("@var value(7)"))]);
        let source = Annotation::new(resolver);

        let widget = source.get("demo::Widget").unwrap().expect("constructed");
        let widget = widget.as_object().unwrap();
        assert_eq!(widget.get("size"), Some(Value::from(7i64)));
    }

    #[test]
    fn annotation_applies_type_hints_lazily() {
        let resolver = auto_resolver(vec![
            TypeSpec::new("demo::Helper"),
            TypeSpec::new("demo::Widget")
                .param_spec(ParamSpec::new("helper").doc("@var demo::Helper")),
        ]);
        let source = Annotation::new(resolver);

        let widget = source.get("demo::Widget").unwrap().expect("constructed");
        let widget = widget.as_object().unwrap();
        let helper = widget.get("helper").expect("helper field");
        assert_eq!(helper.as_object().unwrap().type_name(), "demo::Helper");
    }

    #[test]
    fn annotation_inject_hint_uses_engine_definitions() {
        let resolver = auto_resolver(vec![TypeSpec::new("demo::Widget")
            .param_spec(ParamSpec::new("conn").doc("@var inject(database)"))]);
        resolver.define("database", "pg://localhost");
        let source = Annotation::new(resolver);

        let widget = source.get("demo::Widget").unwrap().expect("constructed");
        let widget = widget.as_object().unwrap();
        assert_eq!(widget.get("conn"), Some(Value::from("pg://localhost")));
    }
}
