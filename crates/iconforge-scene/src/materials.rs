//! Material resolution for a mesh set

use std::collections::BTreeSet;

use iconforge_core::Result;
use tracing::debug;

use crate::graph::{FileTexture, Material, MaterialId, NodeId, SceneGraph};

/// Shading types the device runtime can display
pub const SUPPORTED_MATERIAL_TYPES: [&str; 3] = ["blinn", "lambert", "phong"];

/// Materials bound to a mesh set, partitioned by support
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMaterials {
    /// Supported materials, deduplicated by identity, in first-seen order
    pub supported: Vec<MaterialId>,
    /// Names of unsupported materials
    pub unsupported: BTreeSet<String>,
}

/// Follows mesh bindings to materials and their color textures
pub struct MaterialResolver<'a> {
    scene: &'a SceneGraph,
}

impl<'a> MaterialResolver<'a> {
    /// Resolver over `scene`
    pub fn new(scene: &'a SceneGraph) -> Self {
        Self { scene }
    }

    /// Whether a material's shading type is in the allow-list
    pub fn is_supported(material: &Material) -> bool {
        SUPPORTED_MATERIAL_TYPES.contains(&material.shading_type.as_str())
    }

    /// Materials bound to `meshes`, split into supported and unsupported
    pub fn resolve(&self, meshes: &[NodeId]) -> Result<ResolvedMaterials> {
        let mut resolved = ResolvedMaterials::default();

        for &mesh in meshes {
            for &id in &self.scene.node(mesh)?.materials {
                let Some(material) = self.scene.material(id) else {
                    continue;
                };
                if Self::is_supported(material) {
                    if !resolved.supported.contains(&id) {
                        resolved.supported.push(id);
                    }
                } else {
                    debug!(material = %material.name, shading = %material.shading_type, "Unsupported material");
                    resolved.unsupported.insert(material.name.clone());
                }
            }
        }

        Ok(resolved)
    }

    /// File texture on the color input; `None` means a flat color material
    pub fn texture_for(&self, material: MaterialId) -> Option<&'a FileTexture> {
        self.scene
            .material(material)
            .and_then(|m| m.color_texture)
            .and_then(|t| self.scene.texture(t))
    }
}
