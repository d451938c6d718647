//! Armature - type resolution and lazy instantiation engine

pub mod alias;
pub mod builder;
pub mod container;
pub mod error;
pub mod factory;
pub mod hints;
pub mod lazy;
pub mod metadata;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod value;

pub use alias::{Alias, AliasIndex};
pub use builder::ContainerBuilder;
pub use container::{Container, EntryRegistry, ServiceFactory};
pub use error::{ArmatureError, FixSuggestion};
pub use factory::ObjectFactory;
pub use lazy::{Callable, Lazy};
pub use metadata::{ParamDescriptor, TypeDescriptor, TypeMetadataCache};
pub use registry::{Constructor, ParamSpec, TypeKind, TypeRegistry, TypeSpec};
pub use resolver::{Overrides, ParamKey, Resolver, SetterMap, UnifiedConfig};
pub use source::{Annotation, Autowiring, DefinitionSource};
pub use value::{Instance, Value};
