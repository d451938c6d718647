//! Error types with fix suggestions
//!
//! One variant per failure class in the resolution pipeline. A failure
//! always aborts the enclosing resolve/merge call; nothing is swallowed
//! and no partial instance is ever returned.

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All failures surfaced by the engine and the container façade.
#[derive(Error, Debug)]
pub enum ArmatureError {
    /// The requested type name has no registered metadata.
    #[error("Type not defined: '{type_name}'")]
    TypeNotFound { type_name: String },

    /// A required constructor parameter never resolved past the
    /// unresolved marker. Names the type that owns the parameter, which
    /// may be an inner dependency rather than the outer resolve target.
    #[error("Param missing: {type_name}::{param}")]
    MissingParam { type_name: String, param: String },

    /// A setter was registered against a method the type does not expose.
    #[error("Setter method not found: {type_name}::{method}()")]
    SetterNotFound { type_name: String, method: String },

    /// The container has no entry under the requested name.
    #[error("Entry not found: '{name}'")]
    EntryNotFound { name: String },

    /// A callable target or service factory failed while being forced.
    #[error("Factory error: {message}")]
    Factory { message: String },
}

impl ArmatureError {
    /// Shorthand for a callable/factory failure.
    pub fn factory(message: impl Into<String>) -> Self {
        ArmatureError::Factory {
            message: message.into(),
        }
    }
}

impl FixSuggestion for ArmatureError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ArmatureError::TypeNotFound { .. } => {
                Some("Register the type with TypeRegistry::register before resolving it")
            }
            ArmatureError::MissingParam { .. } => {
                Some("Register a value for the parameter, give it a default, or pass an override")
            }
            ArmatureError::SetterNotFound { .. } => {
                Some("Declare the method on the TypeSpec (or one of its units) with .method()")
            }
            ArmatureError::EntryNotFound { .. } => {
                Some("Set the entry on the container or add a definition source that supplies it")
            }
            ArmatureError::Factory { .. } => None,
        }
    }
}
