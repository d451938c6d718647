//! Explicit type registration
//!
//! Rust has no runtime reflection, so the structural facts the engine
//! needs (constructor parameters, parent type, implemented capabilities,
//! composed units, settable methods) are registered up front as
//! [`TypeSpec`]s. The metadata cache introspects this table instead of a
//! reflection API; the resolution algorithm is unchanged.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::ArmatureError;
use crate::value::Value;

/// Native constructor: receives the final positional argument list.
pub type Constructor = Arc<dyn Fn(Vec<Value>) -> Result<Value, ArmatureError> + Send + Sync>;

/// What kind of thing a registered name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// An instantiable type.
    Concrete,
    /// A named contract a type declares conformance to.
    Capability,
    /// A reusable behavior bundle mixed into a type.
    Unit,
}

/// One declared constructor parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub default: Option<Value>,
    /// Declared type name; the descriptor records it only when it names a
    /// registered constructible type.
    pub type_hint: Option<String>,
    /// Structured doc comment, scanned for hints by the annotation source.
    pub doc: Option<String>,
}

impl ParamSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: None,
            type_hint: None,
            doc: None,
        }
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn typed(mut self, type_name: &str) -> Self {
        self.type_hint = Some(type_name.to_string());
        self
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }
}

/// Registered structural facts for one type name.
pub struct TypeSpec {
    pub name: String,
    pub kind: TypeKind,
    pub parent: Option<String>,
    pub capabilities: Vec<String>,
    pub units: Vec<String>,
    pub params: Vec<ParamSpec>,
    pub methods: Vec<String>,
    pub constructor: Option<Constructor>,
}

impl TypeSpec {
    /// An instantiable type.
    pub fn new(name: &str) -> Self {
        Self::with_kind(name, TypeKind::Concrete)
    }

    /// A capability (contract) name setters can be registered against.
    pub fn capability(name: &str) -> Self {
        Self::with_kind(name, TypeKind::Capability)
    }

    /// A composed unit name setters can be registered against.
    pub fn unit(name: &str) -> Self {
        Self::with_kind(name, TypeKind::Unit)
    }

    fn with_kind(name: &str, kind: TypeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            parent: None,
            capabilities: Vec::new(),
            units: Vec::new(),
            params: Vec::new(),
            methods: Vec::new(),
            constructor: None,
        }
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    /// Declaration order is preserved; it drives setter tier overlay order.
    pub fn implements(mut self, capability: &str) -> Self {
        self.capabilities.push(capability.to_string());
        self
    }

    pub fn composes(mut self, unit: &str) -> Self {
        self.units.push(unit.to_string());
        self
    }

    /// A required constructor parameter with no default.
    pub fn param(mut self, name: &str) -> Self {
        self.params.push(ParamSpec::new(name));
        self
    }

    pub fn param_default(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.push(ParamSpec::new(name).default_value(value));
        self
    }

    /// A parameter whose declared type may be auto-constructed when no
    /// other tier supplies a value.
    pub fn param_typed(mut self, name: &str, type_name: &str) -> Self {
        self.params.push(ParamSpec::new(name).typed(type_name));
        self
    }

    pub fn param_spec(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Declare a settable method.
    pub fn method(mut self, name: &str) -> Self {
        self.methods.push(name.to_string());
        self
    }

    pub fn constructor<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, ArmatureError> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(f));
        self
    }

    /// Whether the type declares a constructor at all.
    pub fn has_constructor(&self) -> bool {
        !self.params.is_empty() || self.constructor.is_some()
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("capabilities", &self.capabilities)
            .field("units", &self.units)
            .field("params", &self.params)
            .field("methods", &self.methods)
            .field("native_constructor", &self.constructor.is_some())
            .finish()
    }
}

/// Process-wide table of registered type specs.
///
/// Shared between the metadata cache, the definition sources, and the
/// embedder; last registration per name wins.
#[derive(Default)]
pub struct TypeRegistry {
    types: DashMap<String, Arc<TypeSpec>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, spec: TypeSpec) {
        debug!(type_name = %spec.name, kind = ?spec.kind, "registering type spec");
        self.types.insert(spec.name.clone(), Arc::new(spec));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<TypeSpec>> {
        self.types.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// True when `name` is registered and instantiable.
    pub fn is_constructible(&self, name: &str) -> bool {
        self.types
            .get(name)
            .map(|entry| entry.kind == TypeKind::Concrete)
            .unwrap_or(false)
    }
}
