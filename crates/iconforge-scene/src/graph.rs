//! Scene snapshot arena
//!
//! A [`SceneGraph`] is an immutable-by-default copy of the authored
//! scene: nodes live in a flat arena addressed by [`NodeId`], with
//! parent and child index arrays. Every pipeline stage runs against a
//! snapshot; the exporter works on a clone so the loaded scene is
//! never mutated by a build.

use std::collections::BTreeMap;
use std::path::PathBuf;

use glam::DMat4;
use iconforge_core::{Error, NodeKind, Result, Transform};
use serde::{Deserialize, Serialize};

use crate::animation::AnimationCurves;

/// Index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Index of a material; material identity is this index, not its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub usize);

/// Index of a file texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Polygon mesh data carried by a mesh node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshGeometry {
    /// Vertex positions in local space
    pub positions: Vec<[f32; 3]>,
    /// Polygons as vertex index loops
    pub polygons: Vec<Vec<u32>>,
}

/// A node in the scene snapshot
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Node name, possibly namespaced (`ns:name`)
    pub name: String,
    /// Classification, fixed at snapshot construction
    pub kind: NodeKind,
    /// Authored node type string (`pointLight`, `parentConstraint`, ...)
    pub type_name: String,
    /// Parent node (None for world-level nodes)
    pub parent: Option<NodeId>,
    /// Children in document order
    pub children: Vec<NodeId>,
    /// Local transform relative to the parent
    pub transform: Transform,
    /// Materials bound through the node's shading network
    pub materials: Vec<MaterialId>,
    /// Mesh data, for mesh nodes
    pub geometry: Option<MeshGeometry>,
    /// Authored animation keys
    pub animation: AnimationCurves,
    /// Free-form string attributes
    pub attributes: BTreeMap<String, String>,
    /// Named links to other nodes
    pub links: BTreeMap<String, NodeId>,
    /// Tool meta type tag
    pub meta_type: Option<String>,
    alive: bool,
}

impl SceneNode {
    fn new(name: String, kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            name,
            type_name: kind.node_type().to_string(),
            kind,
            parent,
            children: Vec::new(),
            transform: Transform::IDENTITY,
            materials: Vec::new(),
            geometry: None,
            animation: AnimationCurves::default(),
            attributes: BTreeMap::new(),
            links: BTreeMap::new(),
            meta_type: None,
            alive: true,
        }
    }

    /// Name without any namespace prefix
    pub fn short_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }
}

/// Material bound to meshes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Material name
    pub name: String,
    /// Shading node type (e.g. `blinn`, `lambert`, `aiStandardSurface`)
    pub shading_type: String,
    /// Flat RGB color used when no texture is connected
    pub color: [f64; 3],
    /// File texture connected to the color input
    pub color_texture: Option<TextureId>,
}

/// File texture node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileTexture {
    /// Texture node name
    pub name: String,
    /// Source image path on disk; may be empty or missing
    pub path: PathBuf,
}

/// Scene unit settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneUnits {
    /// e.g. `cm`
    pub linear_unit: String,
    /// e.g. `ntsc` or `60fps`
    pub time_unit: String,
}

/// Linear unit the device runtime expects
pub const TARGET_LINEAR_UNIT: &str = "cm";
/// Time unit the device runtime expects
pub const TARGET_TIME_UNIT: &str = "ntscf";

impl SceneUnits {
    /// Whether the linear unit matches the target
    pub fn linear_ok(&self) -> bool {
        self.linear_unit == TARGET_LINEAR_UNIT
    }

    /// Whether the time unit matches the target
    pub fn time_ok(&self) -> bool {
        self.time_unit == TARGET_TIME_UNIT
    }

    /// Frames per second for the time unit
    pub fn fps(&self) -> Option<f64> {
        let fps = match self.time_unit.as_str() {
            "game" => 15.0,
            "film" => 24.0,
            "pal" => 25.0,
            "ntsc" => 30.0,
            "show" => 48.0,
            "palf" => 50.0,
            "ntscf" => 60.0,
            _ => return None,
        };
        Some(fps)
    }
}

impl Default for SceneUnits {
    fn default() -> Self {
        Self {
            linear_unit: TARGET_LINEAR_UNIT.to_string(),
            time_unit: TARGET_TIME_UNIT.to_string(),
        }
    }
}

/// Arena-backed scene snapshot
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    materials: Vec<Material>,
    textures: Vec<FileTexture>,
    /// Scene unit settings
    pub units: SceneUnits,
}

impl SceneGraph {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node under `parent` (or at world level)
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        if let Some(parent) = parent {
            self.node(parent)?;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode::new(name.into(), kind, parent));
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        Ok(id)
    }

    /// Get a live node
    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0).filter(|n| n.alive)
    }

    /// Get a live node or fail
    pub fn node(&self, id: NodeId) -> Result<&SceneNode> {
        self.get(id).ok_or(Error::NodeNotFound(id.0))
    }

    /// Get a live node mutably or fail
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode> {
        self.nodes
            .get_mut(id.0)
            .filter(|n| n.alive)
            .ok_or(Error::NodeNotFound(id.0))
    }

    /// Check whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Iterate over live nodes in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.alive)
            .map(|(i, n)| (NodeId(i), n))
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.alive).count()
    }

    /// World-level nodes in arena order
    pub fn roots(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Children of a node in document order
    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    /// Find the first live node with the given name (namespace-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, n)| n.name == name || n.short_name() == name)
            .map(|(id, _)| id)
    }

    /// Add a material
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Get a material
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    /// All materials in arena order
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Add a file texture
    pub fn add_texture(&mut self, texture: FileTexture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    /// Get a file texture
    pub fn texture(&self, id: TextureId) -> Option<&FileTexture> {
        self.textures.get(id.0)
    }

    /// All file textures in arena order
    pub fn textures(&self) -> &[FileTexture] {
        &self.textures
    }

    /// Bind a material to a mesh node
    pub fn bind_material(&mut self, node: NodeId, material: MaterialId) -> Result<()> {
        if self.material(material).is_none() {
            return Err(Error::invalid_scene(format!("material #{} does not exist", material.0)));
        }
        let node = self.node_mut(node)?;
        if !node.materials.contains(&material) {
            node.materials.push(material);
        }
        Ok(())
    }

    /// Set a node's local transform
    pub fn set_transform(&mut self, node: NodeId, transform: Transform) -> Result<()> {
        self.node_mut(node)?.transform = transform;
        Ok(())
    }

    /// World matrix of a node (product of local matrices from the root down)
    pub fn world_matrix(&self, id: NodeId) -> Result<DMat4> {
        let mut matrix = DMat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            matrix = node.transform.to_matrix() * matrix;
            current = node.parent;
        }
        Ok(matrix)
    }

    /// Whether `ancestor` is `node` or lies above it
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Move `node` under `new_parent` (None = world), appending it to the
    /// new parent's children. With `preserve_world` the local transform
    /// is recomputed so the world placement does not change.
    pub fn reparent(
        &mut self,
        node: NodeId,
        new_parent: Option<NodeId>,
        preserve_world: bool,
    ) -> Result<()> {
        self.node(node)?;
        if let Some(parent) = new_parent {
            self.node(parent)?;
            if self.is_ancestor(node, parent) {
                return Err(Error::invalid_scene(format!(
                    "cannot parent {} under its own descendant {}",
                    node, parent
                )));
            }
        }

        let world = if preserve_world {
            Some(self.world_matrix(node)?)
        } else {
            None
        };

        if let Some(old_parent) = self.nodes[node.0].parent {
            self.nodes[old_parent.0].children.retain(|&c| c != node);
        }
        self.nodes[node.0].parent = new_parent;
        if let Some(parent) = new_parent {
            self.nodes[parent.0].children.push(node);
        }

        if let Some(world) = world {
            let parent_world = match new_parent {
                Some(parent) => self.world_matrix(parent)?,
                None => DMat4::IDENTITY,
            };
            let local = parent_world.inverse() * world;
            self.nodes[node.0].transform = Transform::from_matrix(&local);
        }

        Ok(())
    }

    /// Delete a node and everything below it; returns the number of nodes removed
    pub fn delete_subtree(&mut self, id: NodeId) -> Result<usize> {
        self.node(id)?;

        if let Some(parent) = self.nodes[id.0].parent {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.0];
            if !node.alive {
                continue;
            }
            node.alive = false;
            removed += 1;
            stack.extend(node.children.drain(..));
        }

        // Links into the removed subtree would dangle.
        let alive: Vec<bool> = self.nodes.iter().map(|n| n.alive).collect();
        for node in self.nodes.iter_mut().filter(|n| n.alive) {
            node.links.retain(|_, target| alive[target.0]);
        }

        Ok(removed)
    }

    /// Remove namespace prefixes from every node name
    pub fn strip_namespaces(&mut self) {
        for node in self.nodes.iter_mut().filter(|n| n.alive) {
            if let Some((_, short)) = node.name.rsplit_once(':') {
                node.name = short.to_string();
            }
        }
    }
}
