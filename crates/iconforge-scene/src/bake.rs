//! Transform and animation baking
//!
//! Both bakers mutate the snapshot they are given; the build pipeline
//! always hands them a clone of the loaded scene.

use iconforge_core::{Result, Transform};
use tracing::{debug, info};

use crate::animation::Keyframe;
use crate::graph::{NodeId, SceneGraph};
use crate::scanner::{NodeClass, SceneGraphScanner};
use crate::settings::AnimationTake;

/// Freezes offset transforms on plain grouping nodes
pub struct TransformBaker;

impl TransformBaker {
    /// Collapse every non-identity plain transform in the subtree at
    /// `root`, `root` included, into identity, keeping descendants where
    /// they are in world space. Parents are frozen before their children.
    /// Returns the nodes that were frozen, in traversal order.
    pub fn bake(scene: &mut SceneGraph, root: NodeId) -> Result<Vec<NodeId>> {
        let mut candidates = Vec::new();
        if NodeClass::Transform.matches(scene.node(root)?.kind) {
            candidates.push(root);
        }
        candidates.extend(SceneGraphScanner::new(scene).supported(root, NodeClass::Transform)?);
        let mut baked = Vec::new();

        for node in candidates {
            if scene.node(node)?.transform.is_identity() {
                continue;
            }

            let children = scene.children(node)?.to_vec();
            for &child in &children {
                scene.reparent(child, None, true)?;
            }
            scene.set_transform(node, Transform::IDENTITY)?;
            for &child in &children {
                scene.reparent(child, Some(node), true)?;
            }

            debug!(node = %scene.node(node)?.name, children = children.len(), "Froze transform");
            baked.push(node);
        }

        Ok(baked)
    }
}

/// Inclusive frame range covered by one dense bake pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BakeWindow {
    /// First frame
    pub start: i64,
    /// Last frame
    pub end: i64,
}

impl BakeWindow {
    /// Union range of every take, `None` when there are no takes
    pub fn union(takes: &[AnimationTake]) -> Option<Self> {
        let start = takes.iter().map(|t| t.start_frame).min()?;
        let end = takes.iter().map(|t| t.end_frame).max()?;
        Some(Self { start, end })
    }

    /// Whether `take` lies inside the window
    pub fn contains(&self, take: &AnimationTake) -> bool {
        self.start <= take.start_frame && take.end_frame <= self.end
    }

    /// Every integer frame in the window
    pub fn frames(&self) -> impl Iterator<Item = i64> {
        self.start..=self.end
    }
}

/// Dense per-frame joint baking over the union of all takes
pub struct AnimationBaker;

impl AnimationBaker {
    /// Sample every joint under `root` (outside unsupported subtrees) at
    /// each frame of the union window. Keys outside the window are kept.
    pub fn bake(
        scene: &mut SceneGraph,
        root: NodeId,
        takes: &[AnimationTake],
    ) -> Result<Option<BakeWindow>> {
        let Some(window) = BakeWindow::union(takes) else {
            return Ok(None);
        };

        let joints = SceneGraphScanner::new(scene).joints(root)?;
        let (start, end) = (window.start as f64, window.end as f64);

        for &joint in &joints {
            let node = scene.node_mut(joint)?;
            let samples: Vec<(f64, Transform)> = window
                .frames()
                .map(|frame| {
                    let frame = frame as f64;
                    (frame, node.animation.sample(&node.transform, frame))
                })
                .collect();

            for axis in 0..3 {
                let curves = &mut node.animation;
                curves.translate[axis].replace_range(
                    start,
                    end,
                    samples.iter().map(|(f, t)| Keyframe::new(*f, t.translate[axis])),
                );
                curves.rotate[axis].replace_range(
                    start,
                    end,
                    samples.iter().map(|(f, t)| Keyframe::new(*f, t.rotate[axis])),
                );
                curves.scale[axis].replace_range(
                    start,
                    end,
                    samples.iter().map(|(f, t)| Keyframe::new(*f, t.scale[axis])),
                );
            }
        }

        info!(
            joints = joints.len(),
            start = window.start,
            end = window.end,
            "Baked joint animation"
        );
        Ok(Some(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Channel;
    use iconforge_core::{matrices_close, NodeKind, UnsupportedKind};
    use proptest::prelude::*;

    fn take(name: &str, start: i64, end: i64) -> AnimationTake {
        AnimationTake::new(name, start, end)
    }

    #[test]
    fn test_transform_bake_preserves_child_world() {
        let mut s = SceneGraph::new();
        let root = s.add_node("Model", NodeKind::Transform, None).unwrap();
        let group = s.add_node("group", NodeKind::Transform, Some(root)).unwrap();
        let c1 = s.add_node("c1", NodeKind::Mesh, Some(group)).unwrap();
        let c2 = s.add_node("c2", NodeKind::Joint, Some(group)).unwrap();
        s.set_transform(
            group,
            Transform {
                translate: [2.0, 0.0, -1.0],
                rotate: [0.0, 0.0, 45.0],
                scale: [2.0, 2.0, 2.0],
            },
        )
        .unwrap();
        s.set_transform(c1, Transform::from_translation(1.0, 1.0, 0.0)).unwrap();
        let before = [s.world_matrix(c1).unwrap(), s.world_matrix(c2).unwrap()];

        let baked = TransformBaker::bake(&mut s, root).unwrap();

        assert_eq!(baked, vec![group]);
        assert!(s.node(group).unwrap().transform.is_identity());
        assert_eq!(s.children(group).unwrap(), &[c1, c2]);
        assert!(matrices_close(&before[0], &s.world_matrix(c1).unwrap(), 1e-9));
        assert!(matrices_close(&before[1], &s.world_matrix(c2).unwrap(), 1e-9));
    }

    #[test]
    fn test_transform_bake_freezes_root_then_children() {
        let mut s = SceneGraph::new();
        let root = s.add_node("Model", NodeKind::Transform, None).unwrap();
        let group = s.add_node("grp", NodeKind::Transform, Some(root)).unwrap();
        let mesh = s.add_node("mesh", NodeKind::Mesh, Some(group)).unwrap();
        s.set_transform(root, Transform::from_translation(0.0, 5.0, 0.0)).unwrap();
        let before = s.world_matrix(mesh).unwrap();

        let baked = TransformBaker::bake(&mut s, root).unwrap();

        assert_eq!(baked, vec![root, group]);
        assert!(s.node(root).unwrap().transform.is_identity());
        assert!(s.node(group).unwrap().transform.is_identity());
        assert!(matrices_close(&before, &s.world_matrix(mesh).unwrap(), 1e-9));
    }

    #[test]
    fn test_transform_bake_skips_meshes_and_joints() {
        let mut s = SceneGraph::new();
        let root = s.add_node("Model", NodeKind::Transform, None).unwrap();
        let mesh = s.add_node("mesh", NodeKind::Mesh, Some(root)).unwrap();
        let joint = s.add_node("joint", NodeKind::Joint, Some(root)).unwrap();
        s.set_transform(mesh, Transform::from_translation(0.0, 3.0, 0.0)).unwrap();
        s.set_transform(joint, Transform::from_translation(0.0, 3.0, 0.0)).unwrap();

        assert!(TransformBaker::bake(&mut s, root).unwrap().is_empty());
        assert!(!s.node(mesh).unwrap().transform.is_identity());
        assert!(!s.node(joint).unwrap().transform.is_identity());
    }

    #[test]
    fn test_animation_bake_without_takes_is_noop() {
        let mut s = SceneGraph::new();
        let root = s.add_node("Model", NodeKind::Transform, None).unwrap();
        let joint = s.add_node("joint", NodeKind::Joint, Some(root)).unwrap();

        assert_eq!(AnimationBaker::bake(&mut s, root, &[]).unwrap(), None);
        assert!(s.node(joint).unwrap().animation.is_empty());
    }

    #[test]
    fn test_animation_bake_samples_union_window() {
        let mut s = SceneGraph::new();
        let root = s.add_node("Model", NodeKind::Transform, None).unwrap();
        let joint = s.add_node("joint", NodeKind::Joint, Some(root)).unwrap();
        let light = s
            .add_node("light", NodeKind::Unsupported(UnsupportedKind::Light), Some(root))
            .unwrap();
        let hidden = s.add_node("hidden", NodeKind::Joint, Some(light)).unwrap();
        {
            let anim = &mut s.node_mut(joint).unwrap().animation;
            anim.rotate[2].set_key(0.0, 0.0);
            anim.rotate[2].set_key(10.0, 100.0);
            anim.rotate[2].set_key(40.0, 7.0);
        }

        let window = AnimationBaker::bake(&mut s, root, &[take("idle", 1, 2), take("hover", 3, 6)])
            .unwrap()
            .unwrap();
        assert_eq!(window, BakeWindow { start: 1, end: 6 });

        let anim = &s.node(joint).unwrap().animation;
        for channel in Channel::ALL {
            for frame in 1..=6 {
                let hits = anim.key_times(channel, frame as f64, frame as f64);
                assert_eq!(hits.len(), 3, "{} at {}", channel.as_str(), frame);
            }
        }
        let rz: Vec<f64> = anim.rotate[2].keys().iter().map(|k| k.frame).collect();
        assert_eq!(rz, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 10.0, 40.0]);
        assert_eq!(anim.rotate[2].evaluate(3.0), Some(30.0));

        assert!(s.node(hidden).unwrap().animation.is_empty());
    }

    proptest! {
        #[test]
        fn prop_window_covers_every_take(
            ranges in prop::collection::vec((0i64..500, 0i64..200), 1..8)
        ) {
            let takes: Vec<AnimationTake> = ranges
                .iter()
                .enumerate()
                .map(|(i, &(start, len))| take(&format!("t{}", i), start, start + len))
                .collect();

            let window = BakeWindow::union(&takes).unwrap();
            for t in &takes {
                prop_assert!(window.contains(t));
            }
        }
    }
}
