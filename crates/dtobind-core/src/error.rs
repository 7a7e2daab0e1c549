//! Error types for the dtobind core library
//!
//! Configuration problems (bad merger parameters, conflicting attributes, unresolved
//! cascade targets, malformed XML) abort the current top-level call. Property paths
//! that cannot be resolved are never errors: the accessor degrades them to null.

use thiserror::Error;

/// Main error type for binding operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or inconsistent binding configuration
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        type_name: Option<String>,
    },

    /// A type name that is neither registered nor described by the XML mapping
    #[error("Unknown type: {type_name}")]
    UnknownType { type_name: String },

    /// A merger id with no registered implementation
    #[error("Unknown merger: {id}")]
    UnknownMerger { id: String },

    /// XML mapping document errors
    #[error("XML configuration error: {message}")]
    XmlConfiguration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Errors raised while building metadata for a type
    #[error("Inspection of {type_name} failed: {source}")]
    Inspection {
        type_name: String,
        #[source]
        source: Box<Error>,
    },

    /// A merger failed while transforming a value
    #[error("Merger '{merger}' failed on field '{field}': {source}")]
    MergerExecution {
        merger: String,
        field: String,
        #[source]
        source: Box<Error>,
    },

    /// A value had the wrong shape for the operation
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Binding could not be completed
    #[error("Binding failed: {message}")]
    Binding { message: String },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a configuration error not tied to a type
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            type_name: None,
        }
    }

    /// Shorthand for a configuration error on a specific type
    pub fn configuration_for(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            type_name: Some(type_name.into()),
        }
    }

    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn xml(message: impl Into<String>) -> Self {
        Error::XmlConfiguration {
            message: message.into(),
            source: None,
        }
    }

    /// True for errors caused by the binding configuration rather than by the data
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::Configuration { .. }
            | Error::UnknownType { .. }
            | Error::UnknownMerger { .. }
            | Error::XmlConfiguration { .. } => true,
            Error::Inspection { source, .. } | Error::MergerExecution { source, .. } => {
                source.is_configuration()
            }
            _ => false,
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlConfiguration {
            message: err.to_string(),
            source: Some(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::configuration("missing format pattern");
        assert_eq!(err.to_string(), "Configuration error: missing format pattern");
    }

    #[test]
    fn test_wrapped_configuration_is_classified() {
        let err = Error::MergerExecution {
            merger: "date_format".to_string(),
            field: "created".to_string(),
            source: Box::new(Error::configuration("missing pattern")),
        };
        assert!(err.is_configuration());

        let err = Error::MergerExecution {
            merger: "enum_name".to_string(),
            field: "color".to_string(),
            source: Box::new(Error::type_mismatch("enum", "text")),
        };
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: Error = anyhow::anyhow!("custom merger blew up").into();
        assert!(matches!(err, Error::Internal { .. }));
        assert!(err.to_string().contains("custom merger blew up"));
    }
}
