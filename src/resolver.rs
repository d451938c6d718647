//! Configuration unification and merging
//!
//! The [`Resolver`] is the engine core. `unify` walks a type's ancestor
//! chain and produces one (params, setters) pair per type, memoized by
//! type name. `merge` folds caller overrides into the unified view,
//! forces deferred values, and converts surviving unresolved markers
//! into hard `MissingParam` failures. `resolve` runs both and then
//! constructs the instance and applies setters.
//!
//! Parameter precedence, first match wins:
//! 1. type-agnostic named definition
//! 2. same-type explicit value by position
//! 3. same-type explicit value by name
//! 4. inherited unified value by name
//! 5. declared default
//! 6. auto-construction by declared type (when enabled)
//! 7. unresolved marker
//!
//! Setter tiers, later overwriting earlier: parent, capabilities (in
//! declaration order), composed units, the type itself, caller overrides.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::ArmatureError;
use crate::lazy::Lazy;
use crate::metadata::{ParamDescriptor, TypeDescriptor, TypeMetadataCache};
use crate::value::{Instance, Value};

/// Ordered setter map: (method name, value) in tier overlay order.
pub type SetterMap = Vec<(String, Value)>;

/// Key for an explicit per-type parameter registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKey {
    Position(usize),
    Name(String),
}

impl From<usize> for ParamKey {
    fn from(position: usize) -> Self {
        ParamKey::Position(position)
    }
}

impl From<&str> for ParamKey {
    fn from(name: &str) -> Self {
        ParamKey::Name(name.to_string())
    }
}

/// Caller-supplied construction overrides, by position and by name.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    positional: FxHashMap<usize, Value>,
    named: FxHashMap<String, Value>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(mut self, position: usize, value: impl Into<Value>) -> Self {
        self.positional.insert(position, value.into());
        self
    }

    pub fn named(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.named.insert(name.to_string(), value.into());
        self
    }

    pub fn set_positional(&mut self, position: usize, value: Value) {
        self.positional.insert(position, value);
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    fn get_positional(&self, position: usize) -> Option<&Value> {
        self.positional.get(&position)
    }

    fn get_named(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }
}

/// The per-type merged view of constructor params and setters, after
/// walking inheritance/capability/unit layers but before caller overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedConfig {
    /// Parameter slots in declared order. Slots may hold unresolved
    /// markers; those only become failures during merging.
    pub params: Vec<(Arc<str>, Value)>,
    /// Setter map in tier overlay order.
    pub setters: SetterMap,
}

impl UnifiedConfig {
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params
            .iter()
            .find(|(param, _)| &**param == name)
            .map(|(_, value)| value)
    }

    pub fn setter(&self, method: &str) -> Option<&Value> {
        self.setters
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, value)| value)
    }
}

/// Update-or-append overlay preserving first-insertion order.
fn overlay(base: &mut SetterMap, extra: &[(String, Value)]) {
    for (method, value) in extra {
        if let Some(slot) = base.iter_mut().find(|(m, _)| m == method) {
            slot.1 = value.clone();
        } else {
            base.push((method.clone(), value.clone()));
        }
    }
}

/// The resolution engine: configuration unifier plus merge engine.
pub struct Resolver {
    metadata: Arc<TypeMetadataCache>,
    /// Type-agnostic named values, matched against parameter names first
    /// and consulted under declared-type names by auto-resolution.
    definitions: DashMap<String, Value>,
    /// Explicit per-type params: `params[type][position-or-name] = value`.
    params: DashMap<String, FxHashMap<ParamKey, Value>>,
    /// Setters keyed by owner: a type, capability, or unit name.
    setters: DashMap<String, SetterMap>,
    unified: DashMap<String, Arc<UnifiedConfig>>,
    auto_resolve: bool,
}

impl Resolver {
    pub fn new(metadata: Arc<TypeMetadataCache>) -> Self {
        Self {
            metadata,
            definitions: DashMap::new(),
            params: DashMap::new(),
            setters: DashMap::new(),
            unified: DashMap::new(),
            auto_resolve: false,
        }
    }

    /// A resolver that additionally auto-constructs unspecified params
    /// according to their declared types.
    pub fn auto_resolving(metadata: Arc<TypeMetadataCache>) -> Self {
        let mut resolver = Self::new(metadata);
        resolver.auto_resolve = true;
        resolver
    }

    pub fn metadata(&self) -> &Arc<TypeMetadataCache> {
        &self.metadata
    }

    /// Register a type-agnostic named definition. Last write per key wins.
    pub fn define(&self, name: &str, value: impl Into<Value>) {
        trace!(name, "registering definition");
        self.definitions.insert(name.to_string(), value.into());
    }

    /// Look up a type-agnostic named definition.
    pub fn definition(&self, name: &str) -> Option<Value> {
        self.definitions.get(name).map(|entry| entry.value().clone())
    }

    /// Register explicit constructor params for a type, by position or
    /// name. Merge-additive; last write per key wins.
    pub fn register_params<I>(&self, type_name: &str, params: I)
    where
        I: IntoIterator<Item = (ParamKey, Value)>,
    {
        debug!(type_name, "registering params");
        let mut entry = self.params.entry(type_name.to_string()).or_default();
        for (key, value) in params {
            entry.insert(key, value);
        }
    }

    /// Register setters against a type, capability, or unit name.
    /// Merge-additive; last write per key wins, order preserved.
    pub fn register_setters<I>(&self, owner: &str, setters: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        debug!(owner, "registering setters");
        let extra: SetterMap = setters.into_iter().collect();
        let mut entry = self.setters.entry(owner.to_string()).or_default();
        overlay(&mut entry, &extra);
    }

    /// Returns the unified constructor params and setters for a type.
    ///
    /// Recursive on the ancestor chain; memoized per type name. Unresolved
    /// parameters surface as markers here, not failures: a later explicit
    /// override at merge time may still supply the value.
    pub fn unify(&self, type_name: &str) -> Result<Arc<UnifiedConfig>, ArmatureError> {
        if let Some(config) = self.unified.get(type_name) {
            return Ok(Arc::clone(config.value()));
        }

        let descriptor = self.metadata.describe(type_name)?;
        let parent_config = match &descriptor.parent {
            Some(parent) => Some(self.unify(&parent.name)?),
            None => None,
        };

        let mut params = Vec::with_capacity(descriptor.params.len());
        for param in &descriptor.params {
            let value = self.unify_param(&descriptor, param, parent_config.as_deref());
            params.push((Arc::clone(&param.name), value));
        }
        let setters = self.unify_setters(&descriptor, parent_config.as_deref());

        debug!(
            type_name,
            params = params.len(),
            setters = setters.len(),
            "unified configuration built"
        );

        let config = Arc::new(UnifiedConfig { params, setters });
        // Computed outside the lock; racing first-unifications build
        // identical configs and the entry API keeps one canonical Arc.
        Ok(self
            .unified
            .entry(type_name.to_string())
            .or_insert(config)
            .clone())
    }

    fn unify_param(
        &self,
        descriptor: &TypeDescriptor,
        param: &ParamDescriptor,
        parent: Option<&UnifiedConfig>,
    ) -> Value {
        let name: &str = &param.name;

        if let Some(value) = self.definitions.get(name) {
            trace!(type_name = %descriptor.name, param = name, "definition tier");
            return value.clone();
        }

        if let Some(registered) = self.params.get(&*descriptor.name) {
            if let Some(value) = registered.get(&ParamKey::Position(param.position)) {
                if !value.is_unresolved() {
                    trace!(type_name = %descriptor.name, param = name, "explicit positional tier");
                    return value.clone();
                }
            }
            if let Some(value) = registered.get(&ParamKey::Name(name.to_string())) {
                if !value.is_unresolved() {
                    trace!(type_name = %descriptor.name, param = name, "explicit named tier");
                    return value.clone();
                }
            }
        }

        if let Some(parent) = parent {
            if let Some(value) = parent.param(name) {
                if !value.is_unresolved() {
                    trace!(type_name = %descriptor.name, param = name, "inherited tier");
                    return value.clone();
                }
            }
        }

        if let Some(default) = &param.default {
            return default.clone();
        }

        if self.auto_resolve {
            if let Some(hint) = &param.type_hint {
                if let Some(value) = self.definitions.get(hint) {
                    trace!(type_name = %descriptor.name, param = name, "declared-type definition tier");
                    return value.clone();
                }
                if param.constructible {
                    trace!(
                        type_name = %descriptor.name,
                        param = name,
                        hint = hint.as_str(),
                        "auto-construct tier"
                    );
                    return Value::Lazy(Lazy::construct_default(hint));
                }
            }
        }

        Value::Unresolved(Arc::clone(&param.name))
    }

    fn unify_setters(
        &self,
        descriptor: &TypeDescriptor,
        parent: Option<&UnifiedConfig>,
    ) -> SetterMap {
        let mut setters = parent.map(|p| p.setters.clone()).unwrap_or_default();
        for capability in &descriptor.capabilities {
            if let Some(registered) = self.setters.get(capability) {
                overlay(&mut setters, &registered);
            }
        }
        for unit in &descriptor.units {
            if let Some(registered) = self.setters.get(unit) {
                overlay(&mut setters, &registered);
            }
        }
        if let Some(registered) = self.setters.get(&*descriptor.name) {
            overlay(&mut setters, &registered);
        }
        setters
    }

    /// Merges caller overrides into the unified configuration, forcing
    /// deferred values and failing on any surviving unresolved marker.
    ///
    /// Parameters are forced in ascending declared position; setters in
    /// final map order (tier overlay order, caller overrides last).
    pub fn merge(
        &self,
        type_name: &str,
        unified: &UnifiedConfig,
        overrides: &Overrides,
        setter_overrides: &[(String, Value)],
    ) -> Result<(Vec<Value>, SetterMap), ArmatureError> {
        let descriptor = self.metadata.describe(type_name)?;

        let mut final_params = Vec::with_capacity(unified.params.len());
        for (position, (name, unified_value)) in unified.params.iter().enumerate() {
            let mut value = if let Some(value) = overrides.get_positional(position) {
                value.clone()
            } else if let Some(value) = overrides.get_named(name) {
                value.clone()
            } else {
                unified_value.clone()
            };

            if let Value::Unresolved(param) = &value {
                return Err(ArmatureError::MissingParam {
                    type_name: descriptor.name.to_string(),
                    param: param.to_string(),
                });
            }
            if let Value::Lazy(lazy) = &value {
                value = lazy.force(self)?;
            }
            final_params.push(value);
        }

        let mut final_setters = unified.setters.clone();
        overlay(&mut final_setters, setter_overrides);
        for (method, value) in final_setters.iter_mut() {
            if !descriptor.has_method(method) {
                return Err(ArmatureError::SetterNotFound {
                    type_name: descriptor.name.to_string(),
                    method: method.clone(),
                });
            }
            let forced = match value {
                Value::Lazy(lazy) => Some(lazy.force(self)?),
                _ => None,
            };
            if let Some(forced) = forced {
                *value = forced;
            }
        }

        Ok((final_params, final_setters))
    }

    /// Creates a new instance of a type using the unified configuration,
    /// optionally with overrides, forcing lazy values along the way.
    ///
    /// Construction either fully succeeds or fails with no instance.
    pub fn resolve(
        &self,
        type_name: &str,
        overrides: Overrides,
        setter_overrides: SetterMap,
    ) -> Result<Value, ArmatureError> {
        debug!(type_name, "resolving");
        let unified = self.unify(type_name)?;
        let (args, setters) = self.merge(type_name, &unified, &overrides, &setter_overrides)?;
        let descriptor = self.metadata.describe(type_name)?;

        let value = match &descriptor.constructor {
            Some(constructor) => constructor(args)?,
            None => {
                let fields = unified
                    .params
                    .iter()
                    .map(|(name, _)| name.to_string())
                    .zip(args);
                Value::Object(Arc::new(Instance::with_fields(type_name, fields)))
            }
        };

        if let Value::Object(instance) = &value {
            for (method, setter_value) in &setters {
                instance.set(method, setter_value.clone());
            }
        }

        Ok(value)
    }

    /// Resolve with no overrides.
    pub fn resolve_default(&self, type_name: &str) -> Result<Value, ArmatureError> {
        self.resolve(type_name, Overrides::new(), SetterMap::new())
    }
}
