//! Repeated-instance factory
//!
//! A generic factory bound to one target type and a fixed set of
//! overrides. Unlike a deferred construction, nothing is memoized:
//! every `create` call produces a fresh instance.

use std::sync::Arc;

use crate::error::ArmatureError;
use crate::resolver::{Overrides, Resolver, SetterMap};
use crate::value::Value;

pub struct ObjectFactory {
    resolver: Arc<Resolver>,
    type_name: String,
    overrides: Overrides,
    setters: SetterMap,
}

impl ObjectFactory {
    pub fn new(
        resolver: Arc<Resolver>,
        type_name: &str,
        overrides: Overrides,
        setters: SetterMap,
    ) -> Self {
        Self {
            resolver,
            type_name: type_name.to_string(),
            overrides,
            setters,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Create a new instance with the factory's fixed overrides.
    pub fn create(&self) -> Result<Value, ArmatureError> {
        self.resolver
            .resolve(&self.type_name, self.overrides.clone(), self.setters.clone())
    }

    /// Create a new instance, with call-time positional arguments
    /// overriding the fixed ones from position 0 upward.
    pub fn create_with(&self, args: Vec<Value>) -> Result<Value, ArmatureError> {
        let mut overrides = self.overrides.clone();
        for (position, value) in args.into_iter().enumerate() {
            overrides.set_positional(position, value);
        }
        self.resolver
            .resolve(&self.type_name, overrides, self.setters.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TypeMetadataCache;
    use crate::registry::{TypeRegistry, TypeSpec};

    fn factory_for(spec: TypeSpec, overrides: Overrides) -> ObjectFactory {
        let registry = Arc::new(TypeRegistry::new());
        let name = spec.name.clone();
        registry.register(spec);
        let resolver = Arc::new(Resolver::new(Arc::new(TypeMetadataCache::new(registry))));
        ObjectFactory::new(resolver, &name, overrides, SetterMap::new())
    }

    #[test]
    fn each_create_yields_a_distinct_instance() {
        let factory = factory_for(
            TypeSpec::new("demo::Widget").param_default("label", "x"),
            Overrides::new(),
        );

        let a = factory.create().unwrap();
        let b = factory.create().unwrap();
        let a = a.as_object().unwrap();
        let b = b.as_object().unwrap();
        assert!(!Arc::ptr_eq(a, b));
        assert_eq!(a.get("label"), b.get("label"));
    }

    #[test]
    fn call_time_args_override_fixed_ones() {
        let factory = factory_for(
            TypeSpec::new("demo::Widget").param("label"),
            Overrides::new().positional(0, "fixed"),
        );

        let plain = factory.create().unwrap();
        assert_eq!(
            plain.as_object().unwrap().get("label"),
            Some(Value::from("fixed"))
        );

        let overridden = factory.create_with(vec![Value::from("call-time")]).unwrap();
        assert_eq!(
            overridden.as_object().unwrap().get("label"),
            Some(Value::from("call-time"))
        );
    }
}
