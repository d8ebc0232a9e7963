//! Component subtree traversal and classification filters

use std::collections::BTreeSet;

use iconforge_core::{NodeKind, Result};

use crate::graph::{NodeId, SceneGraph};

/// Filter applied while scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    /// Every node
    Any,
    /// Meshes
    Mesh,
    /// Joints
    Joint,
    /// Plain transforms only (not meshes, not joints)
    Transform,
    /// Unsupported nodes
    Unsupported,
}

impl NodeClass {
    /// Whether a node of `kind` is in this class
    pub fn matches(&self, kind: NodeKind) -> bool {
        match self {
            NodeClass::Any => true,
            NodeClass::Mesh => kind == NodeKind::Mesh,
            NodeClass::Joint => kind == NodeKind::Joint,
            NodeClass::Transform => kind == NodeKind::Transform,
            NodeClass::Unsupported => kind.is_unsupported(),
        }
    }
}

/// Read-only traversal over a snapshot
pub struct SceneGraphScanner<'a> {
    scene: &'a SceneGraph,
}

impl<'a> SceneGraphScanner<'a> {
    /// Scanner over `scene`
    pub fn new(scene: &'a SceneGraph) -> Self {
        Self { scene }
    }

    /// Depth-first, pre-order scan below `root` (the root itself is not
    /// returned). With `recursive` every child is visited whatever its
    /// parent's classification; otherwise only immediate children.
    pub fn scan(&self, root: NodeId, class: NodeClass, recursive: bool) -> Result<Vec<NodeId>> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.scene.children(root)?.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            let node = self.scene.node(id)?;
            if class.matches(node.kind) {
                found.push(id);
            }
            if recursive {
                stack.extend(node.children.iter().rev().copied());
            }
        }

        Ok(found)
    }

    /// Every node under `root` that is unsupported or lies below an
    /// unsupported node
    pub fn unsupported_subtrees(&self, root: NodeId) -> Result<BTreeSet<NodeId>> {
        let mut excluded = BTreeSet::new();
        for id in self.scan(root, NodeClass::Unsupported, true)? {
            if excluded.insert(id) {
                excluded.extend(self.scan(id, NodeClass::Any, true)?);
            }
        }
        Ok(excluded)
    }

    /// Nodes of `class` under `root`, minus whole unsupported subtrees
    pub fn supported(&self, root: NodeId, class: NodeClass) -> Result<Vec<NodeId>> {
        let excluded = self.unsupported_subtrees(root)?;
        Ok(self
            .scan(root, class, true)?
            .into_iter()
            .filter(|id| !excluded.contains(id))
            .collect())
    }

    /// Supported meshes under `root`
    pub fn meshes(&self, root: NodeId) -> Result<Vec<NodeId>> {
        self.supported(root, NodeClass::Mesh)
    }

    /// Supported joints under `root`
    pub fn joints(&self, root: NodeId) -> Result<Vec<NodeId>> {
        self.supported(root, NodeClass::Joint)
    }
}
