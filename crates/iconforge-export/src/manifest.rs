//! Material manifest (`.kmat`) written per component

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use iconforge_core::Rgba;
use serde::{Deserialize, Serialize};

use crate::error::ExportResult;

/// Blend mode written for every material
pub const DEFAULT_BLEND_MODE: &str = "Opaque";
/// Shader written for every material
pub const DEFAULT_SHADER: &str = "UnlitTextured";

/// Settings applied to the whole manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMaterialSettings {
    /// Base tint
    pub color: Rgba,
    /// Blend mode, always `Opaque`
    pub blendmode: String,
}

impl Default for GlobalMaterialSettings {
    fn default() -> Self {
        Self {
            color: Rgba::WHITE,
            blendmode: DEFAULT_BLEND_MODE.to_string(),
        }
    }
}

/// One material; exactly one of a texture or a flat color drives it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialEntry {
    /// Archive-style path of the color texture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub albedo: Option<String>,
    /// Flat color, white for textured entries
    pub color: Rgba,
    /// Blend mode, always `Opaque`
    pub blendmode: String,
    /// Material name from the scene
    pub name: String,
    /// Runtime shader name
    #[serde(rename = "shaderName")]
    pub shader_name: String,
}

impl MaterialEntry {
    /// Textured entry; color stays white
    pub fn textured(name: impl Into<String>, albedo: impl Into<String>) -> Self {
        Self {
            albedo: Some(albedo.into()),
            color: Rgba::WHITE,
            blendmode: DEFAULT_BLEND_MODE.to_string(),
            name: name.into(),
            shader_name: DEFAULT_SHADER.to_string(),
        }
    }

    /// Flat color entry with alpha fixed to 1
    pub fn flat(name: impl Into<String>, rgb: [f64; 3]) -> Self {
        Self {
            albedo: None,
            color: Rgba::opaque(rgb),
            blendmode: DEFAULT_BLEND_MODE.to_string(),
            name: name.into(),
            shader_name: DEFAULT_SHADER.to_string(),
        }
    }
}

/// Contents of one `.kmat` file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialManifest {
    /// Manifest-wide settings
    pub global: GlobalMaterialSettings,
    /// Supported materials in first-seen order
    pub materials: Vec<MaterialEntry>,
}

impl MaterialManifest {
    /// Load a manifest from disk
    pub fn read(path: impl AsRef<Path>) -> ExportResult<Self> {
        let file = File::open(path.as_ref())?;
        Ok(serde_json::from_reader(file)?)
    }

    /// Write as indented JSON
    pub fn write(&self, path: impl AsRef<Path>) -> ExportResult<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let manifest = MaterialManifest {
            global: GlobalMaterialSettings::default(),
            materials: vec![
                MaterialEntry::textured("blinn1", "Icon/Model/tex.png"),
                MaterialEntry::flat("lambert2", [0.5, 0.25, 0.0]),
            ],
        };

        assert_eq!(
            serde_json::to_value(&manifest).unwrap(),
            json!({
                "global": {"color": [1.0, 1.0, 1.0, 1.0], "blendmode": "Opaque"},
                "materials": [
                    {"albedo": "Icon/Model/tex.png", "color": [1.0, 1.0, 1.0, 1.0],
                     "blendmode": "Opaque", "name": "blinn1", "shaderName": "UnlitTextured"},
                    {"color": [0.5, 0.25, 0.0, 1.0], "blendmode": "Opaque",
                     "name": "lambert2", "shaderName": "UnlitTextured"}
                ]
            })
        );
    }

    #[test]
    fn test_written_with_two_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Model.kmat");
        MaterialManifest::default().write(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"global\""));
        assert_eq!(MaterialManifest::read(&path).unwrap(), MaterialManifest::default());
    }
}
