//! Type metadata cache
//!
//! Builds and memoizes [`TypeDescriptor`]s from the registration table:
//! ordered constructor parameters, the ancestor chain, transitively
//! collected capability and unit names, and the full settable-method set.
//! Descriptors are immutable once built and live for the cache lifetime.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::error::ArmatureError;
use crate::registry::{Constructor, TypeKind, TypeRegistry};
use crate::value::Value;

/// Introspected facts about one constructor parameter.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub name: Arc<str>,
    pub position: usize,
    pub default: Option<Value>,
    /// Declared type name, kept only when the registry knows it.
    pub type_hint: Option<String>,
    /// Whether the declared type can be constructed by the engine.
    pub constructible: bool,
}

/// Immutable structural facts about a type, unified over registration.
pub struct TypeDescriptor {
    pub name: Arc<str>,
    pub kind: TypeKind,
    pub params: Vec<ParamDescriptor>,
    pub has_constructor: bool,
    pub parent: Option<Arc<TypeDescriptor>>,
    /// Implemented capabilities: own declaration order first, then
    /// capability ancestors, then inherited ones. Deduplicated.
    pub capabilities: Vec<String>,
    /// Composed units: the type's own chain first, then each unit's own
    /// composed sub-units. Deduplicated.
    pub units: Vec<String>,
    /// Every settable method the type exposes, including inherited,
    /// unit-provided, and capability-required methods.
    pub methods: FxHashSet<String>,
    pub constructor: Option<Constructor>,
}

impl TypeDescriptor {
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains(name)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("has_constructor", &self.has_constructor)
            .field("parent", &self.parent)
            .field("capabilities", &self.capabilities)
            .field("units", &self.units)
            .field("methods", &self.methods)
            .field("native_constructor", &self.constructor.is_some())
            .finish()
    }
}

/// Caches introspected descriptors so repeated resolutions avoid
/// redundant walks over the registration table.
pub struct TypeMetadataCache {
    registry: Arc<TypeRegistry>,
    descriptors: DashMap<String, Arc<TypeDescriptor>>,
}

impl TypeMetadataCache {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            descriptors: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Whether the name corresponds to an introspectable type.
    pub fn knows(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Returns the cached descriptor for `name`, building it on first use.
    ///
    /// Repeated calls return the identical `Arc`. Fails with
    /// `TypeNotFound` when the name was never registered.
    pub fn describe(&self, name: &str) -> Result<Arc<TypeDescriptor>, ArmatureError> {
        if let Some(descriptor) = self.descriptors.get(name) {
            return Ok(Arc::clone(descriptor.value()));
        }

        let built = self.build(name)?;
        // Racing first-introspections build identical descriptors; the
        // entry API keeps a single canonical Arc.
        let descriptor = self
            .descriptors
            .entry(name.to_string())
            .or_insert(built)
            .clone();
        Ok(descriptor)
    }

    fn build(&self, name: &str) -> Result<Arc<TypeDescriptor>, ArmatureError> {
        let spec = self
            .registry
            .get(name)
            .ok_or_else(|| ArmatureError::TypeNotFound {
                type_name: name.to_string(),
            })?;

        // Ancestors first; the lock is never held across this recursion.
        let parent = match &spec.parent {
            Some(parent_name) => Some(self.describe(parent_name)?),
            None => None,
        };

        let params = spec
            .params
            .iter()
            .enumerate()
            .map(|(position, param)| {
                let known_hint = param
                    .type_hint
                    .as_ref()
                    .filter(|hint| self.registry.contains(hint))
                    .cloned();
                if param.type_hint.is_some() && known_hint.is_none() {
                    trace!(
                        type_name = name,
                        param = %param.name,
                        hint = param.type_hint.as_deref(),
                        "declared type is not registered; hint dropped"
                    );
                }
                let constructible = known_hint
                    .as_deref()
                    .map(|hint| self.registry.is_constructible(hint))
                    .unwrap_or(false);
                ParamDescriptor {
                    name: Arc::from(param.name.as_str()),
                    position,
                    default: param.default.clone(),
                    type_hint: known_hint,
                    constructible,
                }
            })
            .collect();

        let capabilities = self.collect_capabilities(&spec.capabilities, parent.as_deref());
        let units = self.collect_units(&spec.units, parent.as_deref());
        let methods = self.collect_methods(&spec.methods, &capabilities, &units, parent.as_deref());

        debug!(
            type_name = name,
            params = spec.params.len(),
            capabilities = capabilities.len(),
            units = units.len(),
            "built type descriptor"
        );

        Ok(Arc::new(TypeDescriptor {
            name: Arc::from(name),
            kind: spec.kind,
            params,
            has_constructor: spec.has_constructor(),
            parent,
            capabilities,
            units,
            methods,
            constructor: spec.constructor.clone(),
        }))
    }

    /// Own declared capabilities in order, each followed by its own
    /// ancestors/capabilities, then everything inherited from the parent.
    fn collect_capabilities(
        &self,
        declared: &[String],
        parent: Option<&TypeDescriptor>,
    ) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();

        let mut queue: Vec<String> = declared.to_vec();
        while !queue.is_empty() {
            let cap = queue.remove(0);
            if !seen.insert(cap.clone()) {
                continue;
            }
            if let Some(spec) = self.registry.get(&cap) {
                if let Some(cap_parent) = &spec.parent {
                    queue.push(cap_parent.clone());
                }
                queue.extend(spec.capabilities.iter().cloned());
            }
            out.push(cap);
        }

        if let Some(parent) = parent {
            for cap in &parent.capabilities {
                if seen.insert(cap.clone()) {
                    out.push(cap.clone());
                }
            }
        }

        out
    }

    /// Own units, then the parent chain's (already transitive), then each
    /// unit's own composed sub-units appended breadth-first.
    fn collect_units(&self, declared: &[String], parent: Option<&TypeDescriptor>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();

        for unit in declared {
            if seen.insert(unit.clone()) {
                out.push(unit.clone());
            }
        }
        if let Some(parent) = parent {
            for unit in &parent.units {
                if seen.insert(unit.clone()) {
                    out.push(unit.clone());
                }
            }
        }

        let mut index = 0;
        while index < out.len() {
            let unit = out[index].clone();
            if let Some(spec) = self.registry.get(&unit) {
                for sub in &spec.units {
                    if seen.insert(sub.clone()) {
                        out.push(sub.clone());
                    }
                }
            }
            index += 1;
        }

        out
    }

    fn collect_methods(
        &self,
        own: &[String],
        capabilities: &[String],
        units: &[String],
        parent: Option<&TypeDescriptor>,
    ) -> FxHashSet<String> {
        let mut methods: FxHashSet<String> = own.iter().cloned().collect();
        if let Some(parent) = parent {
            methods.extend(parent.methods.iter().cloned());
        }
        for name in capabilities.iter().chain(units.iter()) {
            if let Some(spec) = self.registry.get(name) {
                methods.extend(spec.methods.iter().cloned());
            }
        }
        methods
    }
}
