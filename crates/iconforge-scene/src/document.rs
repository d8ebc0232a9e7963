//! JSON scene document
//!
//! The on-disk form of a scene: flat node, material and texture lists
//! cross-referenced by index. A node's parent must appear before it.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use iconforge_core::{Error, NodeKind, Result, ResultExt, Transform};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::animation::AnimationCurves;
use crate::graph::{FileTexture, Material, MaterialId, MeshGeometry, NodeId, SceneGraph, SceneUnits, TextureId};

/// On-disk JSON form of a scene snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneDocument {
    /// Linear and time units
    pub units: SceneUnits,
    /// Nodes; parents always precede children
    pub nodes: Vec<NodeDocument>,
    /// Materials referenced by index
    pub materials: Vec<MaterialDocument>,
    /// Textures referenced by index
    pub textures: Vec<TextureDocument>,
}

/// One serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDocument {
    /// Node name, possibly namespaced
    pub name: String,
    /// Node type string, e.g. `mesh` or `joint`
    #[serde(rename = "type")]
    pub node_type: String,
    /// Index into `nodes`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    /// Local transform
    #[serde(default)]
    pub transform: Transform,
    /// Indices into `materials`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<usize>,
    /// Mesh geometry, meshes only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<MeshGeometry>,
    /// Keyframe curves
    #[serde(default, skip_serializing_if = "AnimationCurves::is_empty")]
    pub animation: AnimationCurves,
    /// Extra string attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Named links to other nodes, by index
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, usize>,
    /// Meta type tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_type: Option<String>,
}

/// One serialized material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDocument {
    /// Material name
    pub name: String,
    /// Shading node type
    #[serde(rename = "type")]
    pub shading_type: String,
    /// Flat RGB color
    #[serde(default = "default_color")]
    pub color: [f64; 3],
    /// Index into `textures`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_texture: Option<usize>,
}

fn default_color() -> [f64; 3] {
    [0.5, 0.5, 0.5]
}

/// One serialized file texture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureDocument {
    /// Texture node name
    pub name: String,
    /// Source image path
    pub path: PathBuf,
}

impl SceneGraph {
    /// Build a snapshot, classifying every node
    pub fn from_document(doc: &SceneDocument) -> Result<Self> {
        let mut scene = SceneGraph::new();
        scene.units = doc.units.clone();

        for texture in &doc.textures {
            scene.add_texture(FileTexture {
                name: texture.name.clone(),
                path: texture.path.clone(),
            });
        }

        for material in &doc.materials {
            if let Some(index) = material.color_texture {
                if index >= doc.textures.len() {
                    return Err(Error::invalid_scene(format!(
                        "material '{}' references missing texture {}",
                        material.name, index
                    )));
                }
            }
            scene.add_material(Material {
                name: material.name.clone(),
                shading_type: material.shading_type.clone(),
                color: material.color,
                color_texture: material.color_texture.map(TextureId),
            });
        }

        for (index, node) in doc.nodes.iter().enumerate() {
            let kind = NodeKind::from_node_type(&node.node_type).ok_or_else(|| Error::UnknownNodeType {
                node: node.name.clone(),
                node_type: node.node_type.clone(),
            })?;
            if let Some(parent) = node.parent {
                if parent >= index {
                    return Err(Error::invalid_scene(format!(
                        "node '{}' appears before its parent {}",
                        node.name, parent
                    )));
                }
            }

            let id = scene.add_node(node.name.clone(), kind, node.parent.map(NodeId))?;
            for &material in &node.materials {
                scene.bind_material(id, MaterialId(material))?;
            }

            let target = scene.node_mut(id)?;
            target.type_name = node.node_type.clone();
            target.transform = node.transform;
            target.geometry = node.geometry.clone();
            target.animation = node.animation.clone();
            target.attributes = node.attributes.clone();
            target.meta_type = node.meta_type.clone();
        }

        // Links may point forward, so resolve them once every node exists.
        for (index, node) in doc.nodes.iter().enumerate() {
            for (name, &target) in &node.links {
                if target >= doc.nodes.len() {
                    return Err(Error::invalid_scene(format!(
                        "link '{}' on '{}' points at missing node {}",
                        name, node.name, target
                    )));
                }
                scene.node_mut(NodeId(index))?.links.insert(name.clone(), NodeId(target));
            }
        }

        debug!(nodes = scene.node_count(), materials = doc.materials.len(), "Loaded scene document");
        Ok(scene)
    }

    /// Serialize live nodes in depth-first order, renumbering ids
    pub fn to_document(&self) -> Result<SceneDocument> {
        let mut order = Vec::new();
        let mut stack: Vec<NodeId> = self.roots().into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id)?.iter().rev().copied());
        }

        let remap: BTreeMap<NodeId, usize> = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut nodes = Vec::with_capacity(order.len());
        for &id in &order {
            let node = self.node(id)?;
            nodes.push(NodeDocument {
                name: node.name.clone(),
                node_type: node.type_name.clone(),
                parent: node.parent.and_then(|p| remap.get(&p).copied()),
                transform: node.transform,
                materials: node.materials.iter().map(|m| m.0).collect(),
                geometry: node.geometry.clone(),
                animation: node.animation.clone(),
                attributes: node.attributes.clone(),
                links: node
                    .links
                    .iter()
                    .filter_map(|(name, target)| remap.get(target).map(|&i| (name.clone(), i)))
                    .collect(),
                meta_type: node.meta_type.clone(),
            });
        }

        Ok(SceneDocument {
            units: self.units.clone(),
            nodes,
            materials: self
                .materials()
                .iter()
                .map(|m| MaterialDocument {
                    name: m.name.clone(),
                    shading_type: m.shading_type.clone(),
                    color: m.color,
                    color_texture: m.color_texture.map(|t| t.0),
                })
                .collect(),
            textures: self
                .textures()
                .iter()
                .map(|t| TextureDocument {
                    name: t.name.clone(),
                    path: t.path.clone(),
                })
                .collect(),
        })
    }
}

/// Read and classify a scene document from disk
pub fn load_scene(path: impl AsRef<Path>) -> Result<SceneGraph> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let reader = BufReader::new(File::open(path)?);
    let doc: SceneDocument = serde_json::from_reader(reader)
        .map_err(Error::from)
        .with_context(|| format!("reading {}", path.display()))?;

    info!(path = %path.display(), nodes = doc.nodes.len(), "Loaded scene");
    SceneGraph::from_document(&doc)
}

/// Write a scene document as pretty JSON
pub fn save_scene(scene: &SceneGraph, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &scene.to_document()?)?;

    debug!(path = %path.display(), "Saved scene");
    Ok(())
}
