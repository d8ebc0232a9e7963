//! iconforge Export Pipeline
//!
//! Turns a prepared scene snapshot into a validated icon:
//! - per-component export (material manifest, textures, FBX)
//! - zip bundling of the exported folders
//! - external validation with structured error decoding
//! - build orchestration

pub mod bundle;
pub mod config;
pub mod error;
pub mod exporter;
pub mod fbx;
pub mod manifest;
pub mod pipeline;
pub mod textures;
pub mod validator;

pub use bundle::BundleAssembler;
pub use config::{PipelineConfig, CONVERTER_TOOL};
pub use error::{ExportError, ExportResult};
pub use exporter::{ComponentExport, ComponentExporter};
pub use fbx::{FbxAsciiWriter, InterchangeWriter};
pub use manifest::{MaterialEntry, MaterialManifest};
pub use pipeline::{BuildOptions, BuildOrchestrator, BuildReport, BuildState};
pub use textures::TextureExporter;
pub use validator::{decode_output, ValidationIssue, ValidationOutcome, Validator};
