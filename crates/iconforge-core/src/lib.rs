//! iconforge Core Library
//!
//! This crate provides the error taxonomy, the value types and the
//! external tool runner shared by the scene, export and bridge crates.

pub mod error;
pub mod tool;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use tool::{ProcessRunner, ToolOutput, ToolRunner};
pub use types::*;
