//! Error types for dependency injection

use thiserror::Error;

/// Errors that can occur during dependency injection operations
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// Nothing in the store, the prefix map or the class catalog resolves the identifier
    #[error("Identifier \"{id}\" is not defined")]
    NotFound { id: String },

    /// A value registered as shareable is not invokable
    #[error("Invalid definition for \"{id}\": {reason}")]
    InvalidDefinition { id: String, reason: String },

    /// An explicitly requested factory cannot be built for the class
    #[error("Unable to create factory for class {class}: {reason}")]
    InvalidFactory { class: String, reason: String },

    /// Auto-wiring re-entered the same class, or aliases form a loop
    #[error("Circular dependency detected: {class}")]
    CircularDependency { class: String },

    /// A resolved value or constructor argument has an unexpected type
    #[error("Type mismatch for \"{id}\": expected {expected}")]
    TypeMismatch { id: String, expected: &'static str },

    /// Constructor failed to create the service
    #[error("Failed to create service {class}: {reason}")]
    CreationFailed { class: String, reason: String },

    /// Unexpected failure while dereferencing an entry of the store
    #[error("Failed to resolve \"{id}\": {source}")]
    Container {
        id: String,
        #[source]
        source: Box<DiError>,
    },

    /// A factory outlived the container it was bound to
    #[error("Container has been dropped")]
    ContainerDropped,

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DiError {
    /// Create a NotFound error for an identifier
    #[inline]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create an InvalidDefinition error
    #[inline]
    pub fn invalid_definition(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidFactory error
    #[inline]
    pub fn invalid_factory(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFactory {
            class: class.into(),
            reason: reason.into(),
        }
    }

    /// Create a CircularDependency error
    #[inline]
    pub fn circular(class: impl Into<String>) -> Self {
        Self::CircularDependency {
            class: class.into(),
        }
    }

    /// Create a TypeMismatch error for the expected type `T`
    #[inline]
    pub fn type_mismatch<T: 'static>(id: impl Into<String>) -> Self {
        Self::TypeMismatch {
            id: id.into(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            class: class.into(),
            reason: reason.into(),
        }
    }

    /// Wrap this error with the identifier that was being dereferenced.
    ///
    /// Circular dependencies are passed through untouched so callers can
    /// still match on them.
    pub fn context(self, id: impl Into<String>) -> Self {
        match self {
            Self::CircularDependency { .. } | Self::Container { .. } => self,
            other => Self::Container {
                id: id.into(),
                source: Box::new(other),
            },
        }
    }

    /// Returns true for `NotFound`, including wrapped ones
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Container { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;
