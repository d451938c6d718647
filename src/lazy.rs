//! Deferred values
//!
//! Three variants behind one `force` operation: invoke a callable,
//! construct a type through the engine, or fetch a named entry from a
//! registry. Forcing is guarded by a `OnceCell` so a shared lazy
//! evaluates at most once and every holder of the same `Arc` observes
//! the same result. Failures propagate unwrapped.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::trace;

use crate::container::EntryRegistry;
use crate::error::ArmatureError;
use crate::resolver::{Overrides, Resolver, SetterMap};
use crate::value::Value;

/// A deferred callable target.
pub type Callable = Arc<dyn Fn(&[Value]) -> Result<Value, ArmatureError> + Send + Sync>;

enum LazyKind {
    /// Invoke a callable with arguments, any of which may be lazy.
    Call { callable: Callable, args: Vec<Value> },
    /// Construct a type via the resolver, with caller overrides.
    Construct {
        type_name: String,
        overrides: Overrides,
        setters: SetterMap,
    },
    /// Fetch a named entry from an external registry.
    Lookup {
        registry: Arc<dyn EntryRegistry>,
        name: String,
    },
}

/// A value whose computation is postponed until forced.
pub struct Lazy {
    kind: LazyKind,
    forced: OnceCell<Value>,
}

impl Lazy {
    /// Defer a callable invocation.
    pub fn call<F>(callable: F, args: Vec<Value>) -> Arc<Self>
    where
        F: Fn(&[Value]) -> Result<Value, ArmatureError> + Send + Sync + 'static,
    {
        Self::call_arc(Arc::new(callable), args)
    }

    pub fn call_arc(callable: Callable, args: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            kind: LazyKind::Call { callable, args },
            forced: OnceCell::new(),
        })
    }

    /// Defer construction of `type_name` with caller overrides.
    pub fn construct(type_name: &str, overrides: Overrides, setters: SetterMap) -> Arc<Self> {
        Arc::new(Self {
            kind: LazyKind::Construct {
                type_name: type_name.to_string(),
                overrides,
                setters,
            },
            forced: OnceCell::new(),
        })
    }

    /// Defer construction with no overrides.
    pub fn construct_default(type_name: &str) -> Arc<Self> {
        Self::construct(type_name, Overrides::new(), SetterMap::new())
    }

    /// Defer a named-entry lookup. Miss behavior belongs to the registry.
    pub fn lookup(registry: Arc<dyn EntryRegistry>, name: &str) -> Arc<Self> {
        Arc::new(Self {
            kind: LazyKind::Lookup {
                registry,
                name: name.to_string(),
            },
        forced: OnceCell::new(),
        })
    }

    pub fn is_forced(&self) -> bool {
        self.forced.get().is_some()
    }

    /// Evaluate the deferred computation, at most once.
    ///
    /// Construction re-enters the resolver; no cache lock is held while
    /// forcing, so the recursion cannot deadlock against the engine.
    pub fn force(&self, resolver: &Resolver) -> Result<Value, ArmatureError> {
        self.forced
            .get_or_try_init(|| self.evaluate(resolver))
            .cloned()
    }

    fn evaluate(&self, resolver: &Resolver) -> Result<Value, ArmatureError> {
        match &self.kind {
            LazyKind::Call { callable, args } => {
                trace!(args = args.len(), "forcing deferred call");
                // Arguments are forced first, in argument order.
                let mut forced_args = Vec::with_capacity(args.len());
                for arg in args {
                    forced_args.push(match arg {
                        Value::Lazy(inner) => inner.force(resolver)?,
                        other => other.clone(),
                    });
                }
                callable(&forced_args)
            }
            LazyKind::Construct {
                type_name,
                overrides,
                setters,
            } => {
                trace!(type_name = %type_name, "forcing deferred construction");
                resolver.resolve(type_name, overrides.clone(), setters.clone())
            }
            LazyKind::Lookup { registry, name } => {
                trace!(entry = %name, "forcing deferred lookup");
                registry.get(name)
            }
        }
    }
}

impl fmt::Debug for Lazy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            LazyKind::Call { args, .. } => format!("Call({} args)", args.len()),
            LazyKind::Construct { type_name, .. } => format!("Construct({type_name})"),
            LazyKind::Lookup { name, .. } => format!("Lookup({name})"),
        };
        f.debug_struct("Lazy")
            .field("kind", &kind)
            .field("forced", &self.is_forced())
            .finish()
    }
}
