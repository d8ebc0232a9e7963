//! iconforge Scene Library
//!
//! One-shot scene snapshot plus everything that reads or rewrites it
//! before export:
//! - [`SceneGraph`] arena and its JSON [`SceneDocument`] form
//! - [`SceneGraphScanner`] classification filters
//! - [`MaterialResolver`] material and texture lookup
//! - [`TransformBaker`] / [`AnimationBaker`]
//! - take checks and advisory prevalidation
//! - [`SettingsStore`] and Icon Template helpers

pub mod animation;
pub mod bake;
pub mod document;
pub mod graph;
pub mod materials;
pub mod scanner;
pub mod settings;
pub mod takes;
pub mod template;

pub use animation::{AnimationCurves, Channel, Curve, Keyframe};
pub use bake::{AnimationBaker, BakeWindow, TransformBaker};
pub use document::{load_scene, save_scene, SceneDocument};
pub use graph::{FileTexture, Material, MaterialId, MeshGeometry, NodeId, SceneGraph, SceneNode, SceneUnits, TextureId};
pub use materials::{MaterialResolver, ResolvedMaterials, SUPPORTED_MATERIAL_TYPES};
pub use scanner::{NodeClass, SceneGraphScanner};
pub use settings::{AnimationTake, BuildSettings, SettingsStore, TakeChange, TakeEdit};
pub use takes::{
    check_scene_units, check_take_capacity, check_take_for_animation, clip_capacity, prevalidate_scene, scene_warnings,
    take_report, TakeIssue, TakeReport,
};
pub use template::{component_root, create_icon_template, icon_template, require_icon_template};
