//! Export pipeline errors

use thiserror::Error;

/// Errors raised while exporting, bundling or validating an icon
#[derive(Error, Debug)]
pub enum ExportError {
    /// Scene or configuration error
    #[error(transparent)]
    Core(#[from] iconforge_core::Error),

    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Zip bundle could not be written
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Icon folder could not be traversed
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// External tool exited unsuccessfully
    #[error("{tool} failed (exit code {code:?}): {output}")]
    ExternalTool {
        tool: String,
        code: Option<i32>,
        output: String,
    },

    /// Scene cannot be written as an interchange file
    #[error("Interchange export failed: {0}")]
    Interchange(String),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

impl ExportError {
    /// Configuration or scene-state problems that abort before any I/O
    pub fn is_fatal_precondition(&self) -> bool {
        match self {
            ExportError::Core(e) => e.is_configuration_error() || e.is_scene_state_error(),
            _ => false,
        }
    }
}
