//! Common types used across iconforge
//!
//! Node classification, component identity and the local transform
//! representation shared by the scene and export crates.

use glam::{DMat4, DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};

/// Tolerance used when comparing transform components
pub const TRANSFORM_EPSILON: f64 = 1e-6;

/// One of the two subtrees exported independently from an Icon Template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Animated, skinned model
    Model,
    /// Backdrop shown behind the model
    Portal,
}

impl ComponentKind {
    /// Both components, in export order
    pub const ALL: [ComponentKind; 2] = [ComponentKind::Model, ComponentKind::Portal];

    /// Display name, also the default output folder and file stem
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Model => "Model",
            ComponentKind::Portal => "Portal",
        }
    }

    /// Name of the Icon Template link pointing at this component's root
    pub fn link_name(&self) -> &'static str {
        match self {
            ComponentKind::Model => "modelComponent",
            ComponentKind::Portal => "portalComponent",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "model" => Ok(ComponentKind::Model),
            "portal" => Ok(ComponentKind::Portal),
            _ => Err(format!("Unknown component: {}", s)),
        }
    }
}

/// Node types the device runtime cannot consume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnsupportedKind {
    /// Parent, aim or point constraint
    Constraint,
    /// Any light
    Light,
    /// Camera
    Camera,
}

impl UnsupportedKind {
    /// Classify a scene node type string, if it is in the exclusion set
    pub fn from_node_type(node_type: &str) -> Option<Self> {
        if node_type.ends_with("Constraint") {
            Some(UnsupportedKind::Constraint)
        } else if node_type.ends_with("Light") {
            Some(UnsupportedKind::Light)
        } else if node_type == "camera" {
            Some(UnsupportedKind::Camera)
        } else {
            None
        }
    }
}

impl std::fmt::Display for UnsupportedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UnsupportedKind::Constraint => "constraint",
            UnsupportedKind::Light => "light",
            UnsupportedKind::Camera => "camera",
        };
        f.write_str(name)
    }
}

/// Classification of a scene node, computed once per snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Transform carrying mesh geometry
    Mesh,
    /// Skeleton joint
    Joint,
    /// Plain grouping transform
    Transform,
    /// Excluded node; its whole subtree is excluded from export
    Unsupported(UnsupportedKind),
}

impl NodeKind {
    /// Classify a scene node type string
    pub fn from_node_type(node_type: &str) -> Option<Self> {
        match node_type {
            "mesh" => Some(NodeKind::Mesh),
            "joint" => Some(NodeKind::Joint),
            "transform" => Some(NodeKind::Transform),
            other => UnsupportedKind::from_node_type(other).map(NodeKind::Unsupported),
        }
    }

    /// Node type string written back into scene documents
    pub fn node_type(&self) -> &'static str {
        match self {
            NodeKind::Mesh => "mesh",
            NodeKind::Joint => "joint",
            NodeKind::Transform => "transform",
            NodeKind::Unsupported(UnsupportedKind::Constraint) => "parentConstraint",
            NodeKind::Unsupported(UnsupportedKind::Light) => "pointLight",
            NodeKind::Unsupported(UnsupportedKind::Camera) => "camera",
        }
    }

    /// Whether the node is excluded from export
    pub fn is_unsupported(&self) -> bool {
        matches!(self, NodeKind::Unsupported(_))
    }
}

/// Local transform as translate / rotate (degrees, XYZ order) / scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Translation in scene linear units
    pub translate: [f64; 3],
    /// Euler rotation in degrees
    pub rotate: [f64; 3],
    /// Per-axis scale
    pub scale: [f64; 3],
}

impl Transform {
    /// No translation or rotation, unit scale
    pub const IDENTITY: Self = Self {
        translate: [0.0; 3],
        rotate: [0.0; 3],
        scale: [1.0; 3],
    };

    /// Pure translation
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            translate: [x, y, z],
            ..Self::IDENTITY
        }
    }

    /// Whether every component is within tolerance of identity
    pub fn is_identity(&self) -> bool {
        let near = |a: f64, b: f64| (a - b).abs() <= TRANSFORM_EPSILON;
        self.translate.iter().all(|&v| near(v, 0.0))
            && self.rotate.iter().all(|&v| near(v, 0.0))
            && self.scale.iter().all(|&v| near(v, 1.0))
    }

    /// Compose into a matrix (scale, then rotate X, Y, Z, then translate)
    pub fn to_matrix(&self) -> DMat4 {
        let [rx, ry, rz] = self.rotate;
        let rotation = DQuat::from_euler(
            EulerRot::ZYX,
            rz.to_radians(),
            ry.to_radians(),
            rx.to_radians(),
        );
        DMat4::from_scale_rotation_translation(
            DVec3::from_array(self.scale),
            rotation,
            DVec3::from_array(self.translate),
        )
    }

    /// Decompose an affine matrix; shear is discarded
    pub fn from_matrix(matrix: &DMat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        let (rz, ry, rx) = rotation.to_euler(EulerRot::ZYX);
        Self {
            translate: translation.to_array(),
            rotate: [rx.to_degrees(), ry.to_degrees(), rz.to_degrees()],
            scale: scale.to_array(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Linear RGBA color as written into material manifests
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Rgba {
    /// Red
    pub r: f64,
    /// Green
    pub g: f64,
    /// Blue
    pub b: f64,
    /// Alpha
    pub a: f64,
}

impl Rgba {
    /// Opaque white
    pub const WHITE: Self = Self::opaque([1.0, 1.0, 1.0]);

    /// Color from an RGB triple with alpha fixed to 1
    pub const fn opaque(rgb: [f64; 3]) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: 1.0,
        }
    }
}

impl From<[f64; 4]> for Rgba {
    fn from([r, g, b, a]: [f64; 4]) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Rgba> for [f64; 4] {
    fn from(c: Rgba) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

/// Compare two matrices component-wise within `tolerance`
pub fn matrices_close(a: &DMat4, b: &DMat4, tolerance: f64) -> bool {
    a.to_cols_array()
        .iter()
        .zip(b.to_cols_array().iter())
        .all(|(x, y)| (x - y).abs() <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_node_types() {
        assert_eq!(NodeKind::from_node_type("mesh"), Some(NodeKind::Mesh));
        assert_eq!(
            NodeKind::from_node_type("pointConstraint"),
            Some(NodeKind::Unsupported(UnsupportedKind::Constraint))
        );
        assert_eq!(
            NodeKind::from_node_type("directionalLight"),
            Some(NodeKind::Unsupported(UnsupportedKind::Light))
        );
        assert_eq!(
            NodeKind::from_node_type("camera"),
            Some(NodeKind::Unsupported(UnsupportedKind::Camera))
        );
        assert_eq!(NodeKind::from_node_type("nurbsCurve"), None);
    }

    #[test]
    fn test_transform_matrix_round_trip() {
        let transform = Transform {
            translate: [1.0, -2.0, 3.5],
            rotate: [30.0, 45.0, -60.0],
            scale: [2.0, 1.0, 0.5],
        };

        let back = Transform::from_matrix(&transform.to_matrix());
        for i in 0..3 {
            assert!((back.translate[i] - transform.translate[i]).abs() < 1e-9);
            assert!((back.rotate[i] - transform.rotate[i]).abs() < 1e-6);
            assert!((back.scale[i] - transform.scale[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_identity() {
        assert!(Transform::IDENTITY.is_identity());
        assert!(Transform::IDENTITY.to_matrix().abs_diff_eq(DMat4::IDENTITY, 1e-12));
        assert!(!Transform::from_translation(0.0, 1.0, 0.0).is_identity());
    }

    #[test]
    fn test_rgba_serializes_as_array() {
        let json = serde_json::to_string(&Rgba::opaque([0.5, 0.25, 0.0])).unwrap();
        assert_eq!(json, "[0.5,0.25,0.0,1.0]");
    }

    #[test]
    fn test_component_kind_parse() {
        assert_eq!("portal".parse::<ComponentKind>(), Ok(ComponentKind::Portal));
        assert_eq!(ComponentKind::Model.link_name(), "modelComponent");
        assert!("sky".parse::<ComponentKind>().is_err());
    }
}
