//! Unified error handling for iconforge
//!
//! Configuration and scene-state errors are fatal and abort a build
//! before any output is written. Recoverable conditions (missing
//! textures, unsupported materials) are never raised as errors; they
//! are logged and surfaced through reports instead.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for scene and pipeline operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ==================== Configuration Errors ====================

    /// A required setting is not set
    #[error("Missing configuration: {key}")]
    MissingConfig {
        key: String,
    },

    // ==================== Scene State Errors ====================

    /// No Icon Template node in the scene
    #[error("No Icon Template found in the scene")]
    MissingTemplate,

    /// The Icon Template has no node linked for a component
    #[error("Icon Template is missing its {component} component")]
    MissingComponent {
        component: String,
    },

    /// An Icon Template already exists
    #[error("An Icon Template already exists in the scene")]
    TemplateExists,

    // ==================== Snapshot Errors ====================

    /// Node id does not refer to a live node
    #[error("Node not found: #{0}")]
    NodeNotFound(usize),

    /// Node type string has no classification
    #[error("Unknown node type '{node_type}' on node '{node}'")]
    UnknownNodeType {
        node: String,
        node_type: String,
    },

    /// Structurally invalid scene document
    #[error("Invalid scene: {message}")]
    InvalidScene {
        message: String,
    },

    // ==================== General Errors ====================

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an invalid scene error
    pub fn invalid_scene(message: impl Into<String>) -> Self {
        Error::InvalidScene {
            message: message.into(),
        }
    }

    /// Create a missing configuration error
    pub fn missing_config(key: impl Into<String>) -> Self {
        Error::MissingConfig { key: key.into() }
    }

    /// Check if this is a configuration error
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Error::MissingConfig { .. } => true,
            Error::WithContext { source, .. } => source.is_configuration_error(),
            _ => false,
        }
    }

    /// Check if this is a scene state error (template or component missing)
    pub fn is_scene_state_error(&self) -> bool {
        match self {
            Error::MissingTemplate | Error::MissingComponent { .. } | Error::TemplateExists => true,
            Error::WithContext { source, .. } => source.is_scene_state_error(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::MissingTemplate;
        let contextualized = err.with_context("while exporting Model");

        assert!(contextualized.to_string().contains("while exporting Model"));
        assert!(contextualized.is_scene_state_error());
    }

    #[test]
    fn test_is_configuration_error() {
        assert!(Error::missing_config("outputPath").is_configuration_error());
        assert!(!Error::MissingTemplate.is_configuration_error());
    }

    #[test]
    fn test_missing_component_message() {
        let err = Error::MissingComponent { component: "Portal".into() };
        assert_eq!(err.to_string(), "Icon Template is missing its Portal component");
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::NodeNotFound(7));
        let with_context = result.context("reparenting");

        assert!(with_context.unwrap_err().to_string().contains("reparenting"));
    }
}
