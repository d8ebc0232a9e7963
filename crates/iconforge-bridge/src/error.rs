//! Device bridge errors

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to a device
#[derive(Error, Debug)]
pub enum BridgeError {
    /// No SDK path from the command line, settings or environment
    #[error("SDK path not set, pass --sdk-path, store sdkPath in the icon settings or set MLSDK")]
    SdkNotSet,

    /// SDK directory does not exist
    #[error("SDK path does not exist: {0}")]
    SdkNotFound(PathBuf),

    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bridge output was not the expected JSON
    #[error("Could not decode bridge output: {0}")]
    Json(#[from] serde_json::Error),

    /// Bridge or previewer exited unsuccessfully
    #[error("`{command}` failed (exit code {code:?}): {output}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    /// No device is connected
    #[error("No connected device found")]
    NoDevice,

    /// Device is connected but has no network address
    #[error("No IP address reported for device {device}")]
    NoDeviceIp { device: String },
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
