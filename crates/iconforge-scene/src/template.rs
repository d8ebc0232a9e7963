//! Icon Template lookup and creation

use iconforge_core::{ComponentKind, Error, NodeKind, Result};
use tracing::info;

use crate::graph::{NodeId, SceneGraph};
use crate::settings::{BuildSettings, SETTINGS_ATTRIBUTE};

/// Meta type tag identifying the Icon Template node
pub const ICON_TEMPLATE_META_TYPE: &str = "IconTemplateNode";
/// Namespace the template nodes are created in
pub const TEMPLATE_NAMESPACE: &str = "MLIcon";

/// First Icon Template in the scene, if any
pub fn icon_template(scene: &SceneGraph) -> Option<NodeId> {
    scene
        .iter()
        .find(|(_, node)| node.meta_type.as_deref() == Some(ICON_TEMPLATE_META_TYPE))
        .map(|(id, _)| id)
}

/// Icon Template, or `MissingTemplate`
pub fn require_icon_template(scene: &SceneGraph) -> Result<NodeId> {
    icon_template(scene).ok_or(Error::MissingTemplate)
}

/// Root node of a component, through the template's component link
pub fn component_root(scene: &SceneGraph, kind: ComponentKind) -> Result<NodeId> {
    let template = require_icon_template(scene)?;
    scene
        .node(template)?
        .links
        .get(kind.link_name())
        .copied()
        .filter(|&id| scene.contains(id))
        .ok_or_else(|| Error::MissingComponent {
            component: kind.to_string(),
        })
}

/// Create the template node with empty Model and Portal components
pub fn create_icon_template(scene: &mut SceneGraph) -> Result<NodeId> {
    if icon_template(scene).is_some() {
        return Err(Error::TemplateExists);
    }

    let template = scene.add_node(
        format!("{}:IconTemplate", TEMPLATE_NAMESPACE),
        NodeKind::Transform,
        None,
    )?;

    for kind in ComponentKind::ALL {
        let root = scene.add_node(
            format!("{}:{}", TEMPLATE_NAMESPACE, kind),
            NodeKind::Transform,
            Some(template),
        )?;
        scene
            .node_mut(template)?
            .links
            .insert(kind.link_name().to_string(), root);
    }

    let settings = serde_json::to_string(&BuildSettings::default())?;
    let node = scene.node_mut(template)?;
    node.meta_type = Some(ICON_TEMPLATE_META_TYPE.to_string());
    node.attributes.insert(SETTINGS_ATTRIBUTE.to_string(), settings);

    info!(node = %node.name, "Created Icon Template");
    Ok(template)
}
