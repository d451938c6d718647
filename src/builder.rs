//! Container assembly
//!
//! Wires a type registry, a resolver, and a definition source into a
//! ready `Container`. Autowiring is on by default; the annotation
//! strategy, when enabled, takes precedence over plain autowiring.

use std::sync::Arc;

use tracing::debug;

use crate::container::{Container, EntryRegistry};
use crate::metadata::TypeMetadataCache;
use crate::registry::TypeRegistry;
use crate::resolver::Resolver;
use crate::source::{Annotation, Autowiring, DefinitionSource};
use crate::value::Value;

pub struct ContainerBuilder {
    registry: Arc<TypeRegistry>,
    resolver: Option<Arc<Resolver>>,
    definitions: Vec<(String, Value)>,
    use_autowiring: bool,
    use_annotation: bool,
    delegate: Option<Arc<dyn EntryRegistry>>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(TypeRegistry::new()))
    }

    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            resolver: None,
            definitions: Vec::new(),
            use_autowiring: true,
            use_annotation: false,
            delegate: None,
        }
    }

    /// Supply a pre-configured resolver instead of the default
    /// auto-resolving one built over the registry.
    pub fn with_resolver(mut self, resolver: Arc<Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn use_autowiring(mut self, enabled: bool) -> Self {
        self.use_autowiring = enabled;
        self
    }

    /// Annotation-driven resolution. Wins over plain autowiring.
    pub fn use_annotation(mut self, enabled: bool) -> Self {
        self.use_annotation = enabled;
        self
    }

    pub fn add_definition(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.definitions.push((name.to_string(), value.into()));
        self
    }

    pub fn add_definitions<I>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.definitions.extend(definitions);
        self
    }

    /// Entries requested by service factories resolve against the
    /// delegate instead of the built container.
    pub fn set_delegate(mut self, delegate: Arc<dyn EntryRegistry>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn build(self) -> Container {
        let resolver = self.resolver.unwrap_or_else(|| {
            Arc::new(Resolver::auto_resolving(Arc::new(TypeMetadataCache::new(
                Arc::clone(&self.registry),
            ))))
        });

        let source: Option<Arc<dyn DefinitionSource>> = if self.use_annotation {
            debug!("building container with annotation source");
            Some(Arc::new(Annotation::new(resolver)))
        } else if self.use_autowiring {
            debug!("building container with autowiring source");
            Some(Arc::new(Autowiring::new(resolver)))
        } else {
            debug!("building container with no definition source");
            None
        };

        if let Some(source) = &source {
            for (name, value) in &self.definitions {
                source.set(name, value.clone());
            }
        }

        let container = Container::new(source, self.delegate);
        // Definitions stay reachable even without a source to hold them.
        if self.use_annotation || self.use_autowiring {
            return container;
        }
        for (name, value) in self.definitions {
            container.set(&name, value);
        }
        container
    }

    /// A development container: annotations enabled.
    pub fn build_dev(self) -> Container {
        self.use_annotation(true).build()
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ParamSpec, TypeSpec};

    #[test]
    fn default_build_autowires_registered_types() {
        let registry = Arc::new(TypeRegistry::new());
        registry.register(TypeSpec::new("demo::Clock"));
        let container = ContainerBuilder::with_registry(registry).build();

        let clock = container.get("demo::Clock").unwrap();
        assert_eq!(clock.as_object().unwrap().type_name(), "demo::Clock");
    }

    #[test]
    fn seeded_definitions_are_retrievable() {
        let container = ContainerBuilder::new()
            .add_definition("database", "pg://localhost")
            .build();
        assert_eq!(container.get("database").unwrap(), Value::from("pg://localhost"));
    }

    #[test]
    fn definitions_survive_without_a_source() {
        let container = ContainerBuilder::new()
            .use_autowiring(false)
            .add_definition("database", "pg://localhost")
            .build();
        assert_eq!(container.get("database").unwrap(), Value::from("pg://localhost"));
        assert!(container.get("demo::Clock").is_err());
    }

    #[test]
    fn dev_build_honors_annotations() {
        let registry = Arc::new(TypeRegistry::new());
        registry.register(
            TypeSpec::new("demo::Widget")
                .param_spec(ParamSpec::new("size").doc("@var value(9)")),
        );
        let container = ContainerBuilder::with_registry(registry).build_dev();

        let widget = container.get("demo::Widget").unwrap();
        assert_eq!(
            widget.as_object().unwrap().get("size"),
            Some(Value::from(9i64))
        );
    }
}
