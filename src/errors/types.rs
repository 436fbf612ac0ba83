//! # Error Types
//!
//! Error taxonomy for the edgeplane convergence engine using `thiserror`.

use std::fmt;

/// Custom result type for edgeplane operations
pub type Result<T> = std::result::Result<T, EdgeplaneError>;

/// Main error type for the convergence engine
#[derive(thiserror::Error, Debug)]
pub enum EdgeplaneError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed or incompatible descriptor input, rejected before any backend call
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Shared-parameter disagreement or DNS ownership conflict
    #[error("Conflict on {resource_type}: {message}")]
    Conflict { message: String, resource_type: String },

    /// The desired distribution model could not be built
    #[error("Build error: {message}")]
    Build { message: String },

    /// A remote store rejected or failed an operation
    #[error("{backend} backend error during {operation}: {message}")]
    Backend { backend: Backend, operation: String, message: String },

    /// The resource does not exist yet; never treated as a failure by the reconciler
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Combined terminal error of one reconciliation cycle
    #[error("{}", join_errors(.errors))]
    Reconcile { errors: Vec<EdgeplaneError> },
}

/// Remote store an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Distribution,
    Dns,
    Certificate,
    Status,
    Descriptor,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Distribution => write!(f, "distribution"),
            Backend::Dns => write!(f, "dns"),
            Backend::Certificate => write!(f, "certificate"),
            Backend::Status => write!(f, "status"),
            Backend::Descriptor => write!(f, "descriptor"),
        }
    }
}

fn join_errors(errors: &[EdgeplaneError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl EdgeplaneError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a conflict error
    pub fn conflict<M: Into<String>, R: Into<String>>(message: M, resource_type: R) -> Self {
        Self::Conflict { message: message.into(), resource_type: resource_type.into() }
    }

    /// Create a build error
    pub fn build<S: Into<String>>(message: S) -> Self {
        Self::Build { message: message.into() }
    }

    /// Create a backend error
    pub fn backend<O: Into<String>, M: Into<String>>(
        backend: Backend,
        operation: O,
        message: M,
    ) -> Self {
        Self::Backend { backend, operation: operation.into(), message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Combine collected errors into one terminal error.
    ///
    /// A single error is returned unchanged; nested combined errors are flattened.
    pub fn combine(errors: Vec<EdgeplaneError>) -> Self {
        let mut flat = Vec::with_capacity(errors.len());
        for error in errors {
            match error {
                EdgeplaneError::Reconcile { errors } => flat.extend(errors),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        Self::Reconcile { errors: flat }
    }

    /// Check whether this error only signals that a resource doesn't exist yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, EdgeplaneError::NotFound { .. })
    }

    /// Check whether this error aborts a reconciliation cycle before any backend mutation
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EdgeplaneError::Validation { .. }
                | EdgeplaneError::Conflict { .. }
                | EdgeplaneError::Build { .. }
                | EdgeplaneError::Config { .. }
        )
    }

    /// Short machine-readable reason used for events and metric labels
    pub fn reason(&self) -> &'static str {
        match self {
            EdgeplaneError::Config { .. } => "ConfigError",
            EdgeplaneError::Validation { .. } => "ValidationFailed",
            EdgeplaneError::Conflict { .. } => "Conflict",
            EdgeplaneError::Build { .. } => "BuildFailed",
            EdgeplaneError::Backend { .. } => "BackendError",
            EdgeplaneError::NotFound { .. } => "NotFound",
            EdgeplaneError::Serialization { .. } => "SerializationError",
            EdgeplaneError::Io { .. } => "IoError",
            EdgeplaneError::Reconcile { .. } => "ReconcileFailed",
        }
    }
}

impl From<std::io::Error> for EdgeplaneError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for EdgeplaneError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            context: "JSON serialization failed".to_string(),
            source: Box::new(error),
        }
    }
}

impl From<serde_yaml::Error> for EdgeplaneError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization {
            context: "YAML serialization failed".to_string(),
            source: Box::new(error),
        }
    }
}

impl From<config::ConfigError> for EdgeplaneError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for EdgeplaneError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
