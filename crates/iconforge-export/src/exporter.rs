//! Per-component export
//!
//! Purges and recreates the component folder, copies textures, writes
//! the material manifest, strips unsupported subtrees, flattens the
//! component to world level and writes the interchange file.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use iconforge_core::ComponentKind;
use iconforge_scene::{
    component_root, AnimationTake, MaterialResolver, NodeClass, SceneGraph, SceneGraphScanner,
};
use tracing::{debug, error, info, info_span, warn};

use crate::config::PipelineConfig;
use crate::error::ExportResult;
use crate::fbx::{FbxAsciiWriter, InterchangeWriter};
use crate::manifest::{MaterialEntry, MaterialManifest};
use crate::textures::TextureExporter;

/// Frame rate used when the scene's time unit is not recognised
const FALLBACK_FPS: f64 = 60.0;

/// Files and findings from one component export
#[derive(Debug, Clone, Default)]
pub struct ComponentExport {
    /// Component folder
    pub directory: PathBuf,
    /// Written material manifest
    pub manifest: PathBuf,
    /// Written interchange file
    pub interchange: PathBuf,
    /// Texture files written to the component folder
    pub textures: Vec<PathBuf>,
    /// Names of materials left out of the manifest
    pub unsupported_materials: BTreeSet<String>,
    /// Nodes deleted as part of unsupported subtrees
    pub removed_nodes: usize,
}

/// Exports one component of a prepared scene
pub struct ComponentExporter {
    config: PipelineConfig,
    textures: TextureExporter,
    writer: Box<dyn InterchangeWriter>,
}

impl ComponentExporter {
    /// Exporter writing ASCII FBX
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_writer(config, Box::new(FbxAsciiWriter::default()))
    }

    /// Exporter with a custom interchange writer
    pub fn with_writer(config: PipelineConfig, writer: Box<dyn InterchangeWriter>) -> Self {
        let textures = TextureExporter::new(config.image_extensions.clone());
        Self {
            config,
            textures,
            writer,
        }
    }

    /// Pipeline configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Export `kind`, logging any failure and reducing it to `false`
    pub fn export(&self, scene: &SceneGraph, kind: ComponentKind, icon_dir: &Path, takes: &[AnimationTake]) -> bool {
        match self.try_export(scene, kind, icon_dir, takes) {
            Ok(_) => true,
            Err(e) => {
                error!(component = %kind, error = %e, "Component export failed");
                false
            }
        }
    }

    /// Export `kind` into `<icon_dir>/<folder>`. The scene is not modified;
    /// destructive steps run on a private copy.
    pub fn try_export(
        &self,
        scene: &SceneGraph,
        kind: ComponentKind,
        icon_dir: &Path,
        takes: &[AnimationTake],
    ) -> ExportResult<ComponentExport> {
        let _span = info_span!("export_component", component = %kind).entered();

        let root = component_root(scene, kind)?;
        let directory = self.config.component_dir(icon_dir, kind);
        let _ = fs::remove_dir_all(&directory);
        fs::create_dir_all(&directory)?;

        let mut export = ComponentExport {
            directory: directory.clone(),
            ..Default::default()
        };

        // Textures and manifest
        let meshes = SceneGraphScanner::new(scene).meshes(root)?;
        let resolver = MaterialResolver::new(scene);
        let resolved = resolver.resolve(&meshes)?;
        for name in &resolved.unsupported {
            warn!(material = %name, "Unsupported material type, not exported");
        }
        export.unsupported_materials = resolved.unsupported.clone();

        let relative_dir = self.config.relative_component_path(kind);
        let mut manifest = MaterialManifest::default();
        for &id in &resolved.supported {
            let Some(material) = scene.material(id) else {
                continue;
            };

            match resolver.texture_for(id) {
                Some(texture) => {
                    let Some(file_name) = self.textures.target_name(&texture.path) else {
                        warn!(material = %material.name, texture = %texture.name, "Texture has no file path, skipping material");
                        continue;
                    };
                    if let Some(written) = self.textures.export(&texture.path, &directory) {
                        export.textures.push(written);
                    }
                    manifest
                        .materials
                        .push(MaterialEntry::textured(&material.name, format!("{}/{}", relative_dir, file_name)));
                }
                None => manifest.materials.push(MaterialEntry::flat(&material.name, material.color)),
            }
        }

        export.manifest = directory.join(format!("{}.{}", kind, self.config.manifest_extension));
        manifest.write(&export.manifest)?;
        debug!(materials = manifest.materials.len(), path = %export.manifest.display(), "Wrote material manifest");

        // Scene preparation on a private copy
        let mut work = scene.clone();
        work.reparent(root, None, true)?;

        let excluded = SceneGraphScanner::new(&work).unsupported_subtrees(root)?;
        for id in excluded {
            if work.contains(id) {
                export.removed_nodes += work.delete_subtree(id)?;
            }
        }
        if export.removed_nodes > 0 {
            info!(nodes = export.removed_nodes, "Removed unsupported nodes");
        }

        let selection = SceneGraphScanner::new(&work).scan(root, NodeClass::Any, true)?;
        for child in work.children(root)?.to_vec() {
            work.reparent(child, None, true)?;
        }

        // Interchange file
        let fps = work.units.fps().unwrap_or_else(|| {
            warn!(time_unit = %work.units.time_unit, fps = FALLBACK_FPS, "Unknown time unit");
            FALLBACK_FPS
        });
        export.interchange = directory.join(format!("{}.{}", kind, self.writer.extension()));
        self.writer.write(&work, &selection, takes, fps, &export.interchange)?;

        info!(path = %directory.display(), "Exported component");
        Ok(export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iconforge_core::{NodeKind, UnsupportedKind};
    use iconforge_scene::{create_icon_template, FileTexture, Material};

    fn textured_scene(texture: &Path) -> SceneGraph {
        let mut s = SceneGraph::new();
        create_icon_template(&mut s).unwrap();
        let model = component_root(&s, ComponentKind::Model).unwrap();

        let tex = s.add_texture(FileTexture {
            name: "file1".into(),
            path: texture.to_path_buf(),
        });
        let textured = s.add_material(Material {
            name: "body_mat".into(),
            shading_type: "blinn".into(),
            color: [1.0, 1.0, 1.0],
            color_texture: Some(tex),
        });
        let flat = s.add_material(Material {
            name: "trim_mat".into(),
            shading_type: "lambert".into(),
            color: [0.2, 0.4, 0.6],
            color_texture: None,
        });
        let odd = s.add_material(Material {
            name: "ai_mat".into(),
            shading_type: "aiStandardSurface".into(),
            color: [1.0, 1.0, 1.0],
            color_texture: None,
        });

        let body = s.add_node("body", NodeKind::Mesh, Some(model)).unwrap();
        let trim = s.add_node("trim", NodeKind::Mesh, Some(model)).unwrap();
        s.bind_material(body, textured).unwrap();
        s.bind_material(trim, textured).unwrap();
        s.bind_material(trim, flat).unwrap();
        s.bind_material(trim, odd).unwrap();

        let cam = s
            .add_node("cam", NodeKind::Unsupported(UnsupportedKind::Camera), Some(model))
            .unwrap();
        s.add_node("cam_child", NodeKind::Transform, Some(cam)).unwrap();
        s
    }

    #[test]
    fn test_export_model_component() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let texture = src.path().join("wood.png");
        fs::write(&texture, b"png").unwrap();
        let scene = textured_scene(&texture);
        let icon_dir = out.path().join("Icon");

        let exporter = ComponentExporter::new(PipelineConfig::default());
        let export = exporter
            .try_export(&scene, ComponentKind::Model, &icon_dir, &[AnimationTake::default_idle()])
            .unwrap();

        assert_eq!(export.manifest, icon_dir.join("Model/Model.kmat"));
        assert_eq!(export.interchange, icon_dir.join("Model/Model.fbx"));
        assert!(icon_dir.join("Model/wood.png").is_file());
        assert_eq!(export.removed_nodes, 2);
        assert!(export.unsupported_materials.contains("ai_mat"));

        let manifest = MaterialManifest::read(&export.manifest).unwrap();
        assert_eq!(
            manifest.materials,
            vec![
                MaterialEntry::textured("body_mat", "Icon/Model/wood.png"),
                MaterialEntry::flat("trim_mat", [0.2, 0.4, 0.6]),
            ]
        );

        let fbx = fs::read_to_string(&export.interchange).unwrap();
        assert!(fbx.contains("Model::body"));
        assert!(!fbx.contains("Model::cam"));
        assert!(!fbx.contains("cam_child"));
        assert!(!fbx.contains("Model::MLIcon:Model"));

        // the caller's scene is untouched
        assert_eq!(scene.node_count(), 7);
    }

    #[test]
    fn test_export_purges_previous_output() {
        let out = tempfile::tempdir().unwrap();
        let scene = textured_scene(Path::new("/nonexistent/wood.png"));
        let icon_dir = out.path().join("Icon");
        fs::create_dir_all(icon_dir.join("Model")).unwrap();
        fs::write(icon_dir.join("Model/stale.png"), b"old").unwrap();

        let exporter = ComponentExporter::new(PipelineConfig::default());
        assert!(exporter.export(&scene, ComponentKind::Model, &icon_dir, &[]));

        assert!(!icon_dir.join("Model/stale.png").exists());
        // missing texture is skipped but still referenced
        assert!(!icon_dir.join("Model/wood.png").exists());
        let manifest = MaterialManifest::read(icon_dir.join("Model/Model.kmat")).unwrap();
        assert_eq!(manifest.materials[0].albedo.as_deref(), Some("Icon/Model/wood.png"));
    }

    #[test]
    fn test_export_without_template_fails() {
        let out = tempfile::tempdir().unwrap();
        let exporter = ComponentExporter::new(PipelineConfig::default());
        assert!(!exporter.export(&SceneGraph::new(), ComponentKind::Portal, out.path(), &[]));
        assert!(!out.path().join("Portal").exists());
    }
}
