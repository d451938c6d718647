//! Dynamic value currency for the resolution engine
//!
//! Every configuration slot in the engine holds a [`Value`]: a JSON
//! literal, a constructed instance, a deferred (lazy) value, or the
//! unresolved marker. The marker never survives a successful merge; its
//! presence after merging is always a `MissingParam` failure.

use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;

use crate::lazy::Lazy;

/// A value flowing through unification, merging, and construction.
#[derive(Debug, Clone)]
pub enum Value {
    /// A literal supplied by configuration or a caller override.
    Json(serde_json::Value),
    /// A constructed instance. Cloning shares identity.
    Object(Arc<Instance>),
    /// A deferred value, forced by the engine when actually needed.
    Lazy(Arc<Lazy>),
    /// Placeholder meaning "no value was determined for this parameter".
    Unresolved(Arc<str>),
}

impl Value {
    /// The unresolved marker for a named parameter.
    pub fn unresolved(param: &str) -> Self {
        Value::Unresolved(Arc::from(param))
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Value::Unresolved(_))
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Value::Lazy(_))
    }

    /// The JSON literal, if this is one.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }

    /// The constructed instance, if this is one.
    pub fn as_object(&self) -> Option<&Arc<Instance>> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            // Deferred values compare by identity: two independent lazies
            // for the same logical source stay independent.
            (Value::Lazy(a), Value::Lazy(b)) => Arc::ptr_eq(a, b),
            (Value::Unresolved(a), Value::Unresolved(b)) => a == b,
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Json(serde_json::Value::String(v.to_string()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Json(serde_json::Value::String(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Json(serde_json::Value::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Json(serde_json::Value::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Json(serde_json::Value::Bool(v))
    }
}

impl From<Arc<Instance>> for Value {
    fn from(v: Arc<Instance>) -> Self {
        Value::Object(v)
    }
}

impl From<Arc<Lazy>> for Value {
    fn from(v: Arc<Lazy>) -> Self {
        Value::Lazy(v)
    }
}

/// A generically constructed object: a type name plus a field map.
///
/// The default constructor fills fields from constructor parameters by
/// name; a setter `m` applied with value `v` stores `v` under field `m`.
/// Field access goes through a lock so a shared instance can still be
/// mutated by post-construction setters.
#[derive(Debug)]
pub struct Instance {
    type_name: Arc<str>,
    fields: RwLock<FxHashMap<String, Value>>,
}

impl Instance {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: Arc::from(type_name),
            fields: RwLock::new(FxHashMap::default()),
        }
    }

    /// Build an instance with an initial field map.
    pub fn with_fields<I>(type_name: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Self {
            type_name: Arc::from(type_name),
            fields: RwLock::new(fields.into_iter().collect()),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        let fields = self.fields.read().unwrap_or_else(|e| e.into_inner());
        fields.get(field).cloned()
    }

    pub fn set(&self, field: &str, value: Value) {
        let mut fields = self.fields.write().unwrap_or_else(|e| e.into_inner());
        fields.insert(field.to_string(), value);
    }

    /// Snapshot of the current field map.
    pub fn fields(&self) -> FxHashMap<String, Value> {
        let fields = self.fields.read().unwrap_or_else(|e| e.into_inner());
        fields.clone()
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.fields() == other.fields()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unresolved_marker_carries_param_name() {
        let v = Value::unresolved("label");
        assert!(v.is_unresolved());
        match v {
            Value::Unresolved(name) => assert_eq!(&*name, "label"),
            _ => panic!("expected Unresolved"),
        }
    }

    #[test]
    fn json_values_compare_by_value() {
        assert_eq!(Value::from(json!({"a": 1})), Value::from(json!({"a": 1})));
        assert_ne!(Value::from(1i64), Value::from(2i64));
    }

    #[test]
    fn object_clone_shares_identity() {
        let instance = Arc::new(Instance::new("demo::Widget"));
        let a = Value::Object(Arc::clone(&instance));
        let b = a.clone();

        instance.set("label", Value::from("hello"));

        let shared = b.as_object().expect("object");
        assert_eq!(shared.get("label"), Some(Value::from("hello")));
    }

    #[test]
    fn instances_compare_by_type_and_fields() {
        let a = Instance::with_fields("demo::Widget", [("label".to_string(), Value::from("x"))]);
        let b = Instance::with_fields("demo::Widget", [("label".to_string(), Value::from("x"))]);
        let c = Instance::with_fields("demo::Widget", [("label".to_string(), Value::from("y"))]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn conversions_wrap_json() {
        assert_eq!(Value::from("x"), Value::Json(json!("x")));
        assert_eq!(Value::from(true), Value::Json(json!(true)));
        assert_eq!(Value::from(2.5f64), Value::Json(json!(2.5)));
    }
}
