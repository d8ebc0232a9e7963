//! Take readiness checks and advisory scene prevalidation

use std::fmt;

use iconforge_core::{ComponentKind, Result};
use tracing::warn;

use crate::animation::Channel;
use crate::graph::{NodeId, SceneGraph, TARGET_LINEAR_UNIT, TARGET_TIME_UNIT};
use crate::scanner::{NodeClass, SceneGraphScanner};
use crate::settings::{AnimationTake, BuildSettings};
use crate::template::{component_root, icon_template};

/// Maximum frame count per clip name
pub const CLIP_CAPACITIES: [(&str, i64); 5] = [
    ("idle", 2),
    ("hover", 600),
    ("activate", 90),
    ("menu", 600),
    ("loading", 300),
];

/// Frame capacity of a known clip
pub fn clip_capacity(name: &str) -> Option<i64> {
    CLIP_CAPACITIES
        .iter()
        .find(|(clip, _)| *clip == name)
        .map(|&(_, capacity)| capacity)
}

/// Why a take is not ready for export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TakeIssue {
    /// Take name is not a known clip
    UnknownClip { name: String },
    /// Take is longer than its clip allows
    ExceedsCapacity { span: i64, capacity: i64 },
    /// Model has no joints to animate
    NoJoints,
    /// A joint has no key on a take boundary
    MissingBoundaryKeys { joint: String, frame: i64 },
}

impl fmt::Display for TakeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TakeIssue::UnknownClip { name } => write!(f, "unknown clip '{}'", name),
            TakeIssue::ExceedsCapacity { span, capacity } => {
                write!(f, "{} frames exceeds the clip capacity of {}", span, capacity)
            }
            TakeIssue::NoJoints => f.write_str("no joints under the Model component"),
            TakeIssue::MissingBoundaryKeys { joint, frame } => {
                write!(f, "joint '{}' is missing keys at frame {}", joint, frame)
            }
        }
    }
}

/// Combined result of the capacity and boundary-key checks for one take
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TakeReport {
    /// Take that was checked
    pub take: AnimationTake,
    /// Everything blocking export, empty when ready
    pub issues: Vec<TakeIssue>,
}

impl TakeReport {
    /// No issues found
    pub fn is_ready(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Clip name and length check for one take
pub fn check_take_capacity(take: &AnimationTake) -> Option<TakeIssue> {
    let Some(capacity) = clip_capacity(&take.name) else {
        return Some(TakeIssue::UnknownClip {
            name: take.name.clone(),
        });
    };

    let span = take.span();
    (span > capacity).then_some(TakeIssue::ExceedsCapacity { span, capacity })
}

/// A frame counts as keyed on a channel group only when the query hits
/// exactly one key per axis
fn has_boundary_keys(scene: &SceneGraph, joint: NodeId, frame: i64) -> Result<bool> {
    let animation = &scene.node(joint)?.animation;
    let frame = frame as f64;
    Ok(Channel::ALL
        .iter()
        .all(|&channel| animation.key_times(channel, frame, frame).len() == 3))
}

fn boundary_issues(scene: &SceneGraph, joints: &[NodeId], take: &AnimationTake) -> Result<Vec<TakeIssue>> {
    if joints.is_empty() {
        return Ok(vec![TakeIssue::NoJoints]);
    }

    let mut issues = Vec::new();
    for &joint in joints {
        for frame in [take.start_frame, take.end_frame] {
            if !has_boundary_keys(scene, joint, frame)? {
                issues.push(TakeIssue::MissingBoundaryKeys {
                    joint: scene.node(joint)?.name.clone(),
                    frame,
                });
            }
        }
    }
    Ok(issues)
}

/// Whether every joint carries translate/rotate/scale keys on both the
/// first and last frame of `take`
pub fn check_take_for_animation(scene: &SceneGraph, joints: &[NodeId], take: &AnimationTake) -> Result<bool> {
    Ok(boundary_issues(scene, joints, take)?.is_empty())
}

/// Capacity and boundary-key checks against the Model component's joints
pub fn take_report(scene: &SceneGraph, take: &AnimationTake) -> Result<TakeReport> {
    let model = component_root(scene, ComponentKind::Model)?;
    let joints = SceneGraphScanner::new(scene).joints(model)?;

    let mut issues: Vec<TakeIssue> = check_take_capacity(take).into_iter().collect();
    issues.extend(boundary_issues(scene, &joints, take)?);

    Ok(TakeReport {
        take: take.clone(),
        issues,
    })
}

/// Warnings about non-joint transforms keyed inside any take. Advisory
/// only; an empty list also comes back when there is no template.
pub fn prevalidate_scene(scene: &SceneGraph, takes: &[AnimationTake]) -> Result<Vec<String>> {
    let mut warnings = Vec::new();
    if icon_template(scene).is_none() {
        return Ok(warnings);
    }

    for kind in ComponentKind::ALL {
        let root = component_root(scene, kind)?;
        let scanner = SceneGraphScanner::new(scene);
        let mut nodes = scanner.supported(root, NodeClass::Transform)?;
        nodes.extend(scanner.meshes(root)?);

        let animated = takes.iter().any(|take| {
            let (start, end) = (take.start_frame as f64, take.end_frame as f64);
            nodes.iter().any(|&id| {
                scene
                    .get(id)
                    .is_some_and(|node| node.animation.has_keys_in(start, end))
            })
        });

        if animated {
            let message = format!("Animated transform(s) found under {} component.", kind);
            warn!("{}", message);
            warnings.push(message);
        }
    }

    Ok(warnings)
}

/// Unit settings that differ from what the device runtime expects
pub fn check_scene_units(scene: &SceneGraph) -> Vec<String> {
    let mut warnings = Vec::new();
    if !scene.units.linear_ok() {
        warnings.push(format!(
            "Linear unit is '{}', expected '{}'",
            scene.units.linear_unit, TARGET_LINEAR_UNIT
        ));
    }
    if !scene.units.time_ok() {
        warnings.push(format!(
            "Time unit is '{}', expected '{}'",
            scene.units.time_unit, TARGET_TIME_UNIT
        ));
    }
    warnings
}

/// Advisory warnings for a build of `scene`: unit mismatches plus
/// animated transforms within the enabled takes
pub fn scene_warnings(scene: &SceneGraph, settings: &BuildSettings) -> Vec<String> {
    let mut warnings = check_scene_units(scene);
    match prevalidate_scene(scene, &settings.animation_takes) {
        Ok(found) => warnings.extend(found),
        Err(e) => warn!(error = %e, "Scene prevalidation did not run"),
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::create_icon_template;
    use iconforge_core::{NodeKind, Transform};

    fn rig() -> (SceneGraph, NodeId) {
        let mut scene = SceneGraph::new();
        create_icon_template(&mut scene).unwrap();
        let model = component_root(&scene, ComponentKind::Model).unwrap();
        let joint = scene.add_node("root_jnt", NodeKind::Joint, Some(model)).unwrap();
        (scene, joint)
    }

    #[test]
    fn test_capacity_table() {
        assert_eq!(check_take_capacity(&AnimationTake::new("idle", 1, 2)), None);
        assert_eq!(
            check_take_capacity(&AnimationTake::new("idle", 1, 3)),
            Some(TakeIssue::ExceedsCapacity { span: 3, capacity: 2 })
        );
        assert_eq!(check_take_capacity(&AnimationTake::new("activate", 10, 99)), None);
        assert!(matches!(
            check_take_capacity(&AnimationTake::new("dance", 1, 2)),
            Some(TakeIssue::UnknownClip { .. })
        ));
    }

    #[test]
    fn test_boundary_keys_required_on_every_channel() {
        let (mut scene, joint) = rig();
        let take = AnimationTake::new("hover", 1, 10);
        {
            let anim = &mut scene.node_mut(joint).unwrap().animation;
            anim.key_all(1.0, &Transform::IDENTITY);
            anim.key_all(10.0, &Transform::IDENTITY);
        }
        assert!(check_take_for_animation(&scene, &[joint], &take).unwrap());

        scene.node_mut(joint).unwrap().animation.scale[1] = Default::default();
        assert!(!check_take_for_animation(&scene, &[joint], &take).unwrap());
        assert!(!check_take_for_animation(&scene, &[], &take).unwrap());
    }

    #[test]
    fn test_take_report_collects_all_issues() {
        let (scene, _) = rig();
        let report = take_report(&scene, &AnimationTake::new("idle", 1, 5)).unwrap();

        assert!(!report.is_ready());
        assert_eq!(report.issues.len(), 3);
        assert_eq!(report.issues[0], TakeIssue::ExceedsCapacity { span: 5, capacity: 2 });
    }

    #[test]
    fn test_prevalidate_flags_animated_transforms() {
        let (mut scene, joint) = rig();
        let takes = [AnimationTake::new("hover", 1, 10)];
        scene.node_mut(joint).unwrap().animation.key_all(5.0, &Transform::IDENTITY);
        assert!(prevalidate_scene(&scene, &takes).unwrap().is_empty());

        let portal = component_root(&scene, ComponentKind::Portal).unwrap();
        let group = scene.add_node("sky", NodeKind::Transform, Some(portal)).unwrap();
        scene.node_mut(group).unwrap().animation.rotate[1].set_key(3.0, 10.0);

        let warnings = prevalidate_scene(&scene, &takes).unwrap();
        assert_eq!(warnings, vec!["Animated transform(s) found under Portal component.".to_string()]);
        assert!(prevalidate_scene(&SceneGraph::new(), &takes).unwrap().is_empty());
    }

    #[test]
    fn test_scene_warnings_use_enabled_takes_only() {
        let (mut scene, _) = rig();
        let model = component_root(&scene, ComponentKind::Model).unwrap();
        let group = scene.add_node("spin", NodeKind::Transform, Some(model)).unwrap();
        scene.node_mut(group).unwrap().animation.rotate[1].set_key(1.0, 10.0);

        // nothing enabled: the default idle take is not checked
        let mut settings = BuildSettings::default();
        assert!(scene_warnings(&scene, &settings).is_empty());

        settings.animation_takes.push(AnimationTake::default_idle());
        assert_eq!(
            scene_warnings(&scene, &settings),
            vec!["Animated transform(s) found under Model component.".to_string()]
        );
    }

    #[test]
    fn test_scene_units() {
        let mut scene = SceneGraph::new();
        assert!(check_scene_units(&scene).is_empty());

        scene.units.time_unit = "film".into();
        let warnings = check_scene_units(&scene);
        assert_eq!(warnings, vec!["Time unit is 'film', expected 'ntscf'".to_string()]);
    }
}
