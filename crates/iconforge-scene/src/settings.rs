//! Build settings persisted on the Icon Template node
//!
//! The settings record is typed everywhere inside the pipeline; it is
//! only serialized to JSON when written to (or read from) the template
//! node's `iconSettings` attribute.

use std::path::{Path, PathBuf};

use iconforge_core::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::graph::SceneGraph;
use crate::template::{icon_template, require_icon_template};

/// Node attribute holding the serialized settings
pub const SETTINGS_ATTRIBUTE: &str = "iconSettings";

/// A named animation clip range, inclusive on both ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationTake {
    /// Clip name, e.g. `idle` or `hover`
    pub name: String,
    /// First frame
    pub start_frame: i64,
    /// Last frame
    pub end_frame: i64,
}

impl AnimationTake {
    /// Take covering `start_frame..=end_frame`
    pub fn new(name: impl Into<String>, start_frame: i64, end_frame: i64) -> Self {
        Self {
            name: name.into(),
            start_frame,
            end_frame,
        }
    }

    /// Take exported when no take is enabled
    pub fn default_idle() -> Self {
        Self::new("idle", 1, 2)
    }

    /// Number of frames covered, counting both ends
    pub fn span(&self) -> i64 {
        self.end_frame - self.start_frame + 1
    }
}

/// Typed build configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildSettings {
    /// Folder the Icon directory is written under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Device SDK used for previews
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_path: Option<PathBuf>,
    /// Enabled takes; a take is enabled exactly when it is listed
    pub animation_takes: Vec<AnimationTake>,
}

/// Requested state of one take
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TakeEdit {
    /// Take name
    pub name: String,
    /// Whether the take should be listed
    pub enabled: bool,
    /// Requested first frame
    pub start_frame: i64,
    /// Requested last frame
    pub end_frame: i64,
}

/// What a [`TakeEdit`] did to the take list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeChange {
    /// Take was enabled
    Added,
    /// Take was disabled
    Removed,
    /// Frame range of an enabled take changed
    Updated,
    /// Nothing to do
    Unchanged,
}

impl BuildSettings {
    /// Output root, required before anything is written
    pub fn output_path(&self) -> Result<&Path> {
        self.output_path
            .as_deref()
            .ok_or_else(|| Error::missing_config("outputPath"))
    }

    /// Enabled take named `name`
    pub fn take(&self, name: &str) -> Option<&AnimationTake> {
        self.animation_takes.iter().find(|t| t.name == name)
    }

    /// Enabled takes, or the default idle take if none are enabled
    pub fn effective_takes(&self) -> Vec<AnimationTake> {
        if self.animation_takes.is_empty() {
            vec![AnimationTake::default_idle()]
        } else {
            self.animation_takes.clone()
        }
    }

    /// Add, remove or resize a take in place
    pub fn apply_take_edit(&mut self, edit: &TakeEdit) -> TakeChange {
        let position = self.animation_takes.iter().position(|t| t.name == edit.name);

        match (edit.enabled, position) {
            (true, None) => {
                self.animation_takes.push(AnimationTake::new(
                    edit.name.clone(),
                    edit.start_frame,
                    edit.end_frame,
                ));
                TakeChange::Added
            }
            (false, Some(index)) => {
                self.animation_takes.remove(index);
                TakeChange::Removed
            }
            (true, Some(index)) => {
                let take = &mut self.animation_takes[index];
                if take.start_frame == edit.start_frame && take.end_frame == edit.end_frame {
                    TakeChange::Unchanged
                } else {
                    take.start_frame = edit.start_frame;
                    take.end_frame = edit.end_frame;
                    TakeChange::Updated
                }
            }
            (false, None) => TakeChange::Unchanged,
        }
    }
}

/// Reads and writes [`BuildSettings`] through the Icon Template node
pub struct SettingsStore;

impl SettingsStore {
    /// Load settings; a missing template, attribute or unparsable blob
    /// yields empty settings
    pub fn load(scene: &SceneGraph) -> BuildSettings {
        let Some(template) = icon_template(scene) else {
            debug!("No Icon Template, using empty settings");
            return BuildSettings::default();
        };
        let Some(raw) = scene
            .get(template)
            .and_then(|node| node.attributes.get(SETTINGS_ATTRIBUTE))
        else {
            return BuildSettings::default();
        };

        match serde_json::from_str(raw) {
            Ok(settings) => settings,
            Err(e) => {
                info!(error = %e, "Ignoring unreadable icon settings");
                BuildSettings::default()
            }
        }
    }

    /// Serialize `settings` onto the Icon Template
    pub fn save(scene: &mut SceneGraph, settings: &BuildSettings) -> Result<()> {
        let template = require_icon_template(scene)?;
        let raw = serde_json::to_string(settings)?;
        scene
            .node_mut(template)?
            .attributes
            .insert(SETTINGS_ATTRIBUTE.to_string(), raw);
        Ok(())
    }

    /// Read-modify-write of the whole settings record
    pub fn update<R>(scene: &mut SceneGraph, f: impl FnOnce(&mut BuildSettings) -> R) -> Result<R> {
        require_icon_template(scene)?;
        let mut settings = Self::load(scene);
        let result = f(&mut settings);
        Self::save(scene, &settings)?;
        Ok(result)
    }

    /// [`SettingsStore::update`] holding `scene`'s lock for the whole cycle
    pub fn update_shared<R>(
        scene: &Mutex<SceneGraph>,
        f: impl FnOnce(&mut BuildSettings) -> R,
    ) -> Result<R> {
        let mut guard = scene.lock();
        Self::update(&mut guard, f)
    }

    /// Store the output folder
    pub fn set_output_path(scene: &mut SceneGraph, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        info!(path = %path.display(), "Setting output path");
        Self::update(scene, |s| s.output_path = Some(path))
    }

    /// Store the device SDK folder
    pub fn set_sdk_path(scene: &mut SceneGraph, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        info!(path = %path.display(), "Setting SDK path");
        Self::update(scene, |s| s.sdk_path = Some(path))
    }

    /// Apply a take edit and persist it
    pub fn apply_take_edit(scene: &mut SceneGraph, edit: &TakeEdit) -> Result<TakeChange> {
        let change = Self::update(scene, |s| s.apply_take_edit(edit))?;
        debug!(take = %edit.name, ?change, "Applied take edit");
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::create_icon_template;
    use std::sync::Arc;

    fn edit(name: &str, enabled: bool, start: i64, end: i64) -> TakeEdit {
        TakeEdit {
            name: name.into(),
            enabled,
            start_frame: start,
            end_frame: end,
        }
    }

    #[test]
    fn test_blob_format() {
        let settings = BuildSettings {
            output_path: Some(PathBuf::from("/out")),
            sdk_path: None,
            animation_takes: vec![AnimationTake::new("idle", 1, 2)],
        };
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "outputPath": "/out",
                "animationTakes": [{"name": "idle", "startFrame": 1, "endFrame": 2}]
            })
        );
    }

    #[test]
    fn test_load_without_template_or_with_garbage() {
        let mut scene = SceneGraph::new();
        assert_eq!(SettingsStore::load(&scene), BuildSettings::default());

        let template = create_icon_template(&mut scene).unwrap();
        scene
            .node_mut(template)
            .unwrap()
            .attributes
            .insert(SETTINGS_ATTRIBUTE.into(), "{not json".into());
        assert_eq!(SettingsStore::load(&scene), BuildSettings::default());
    }

    #[test]
    fn test_save_requires_template() {
        let mut scene = SceneGraph::new();
        let err = SettingsStore::save(&mut scene, &BuildSettings::default()).unwrap_err();
        assert!(err.is_scene_state_error());
    }

    #[test]
    fn test_field_updates_do_not_clobber() {
        let mut scene = SceneGraph::new();
        create_icon_template(&mut scene).unwrap();

        SettingsStore::set_output_path(&mut scene, "/out").unwrap();
        SettingsStore::set_sdk_path(&mut scene, "/sdk").unwrap();
        SettingsStore::apply_take_edit(&mut scene, &edit("hover", true, 1, 30)).unwrap();

        let settings = SettingsStore::load(&scene);
        assert_eq!(settings.output_path().unwrap(), Path::new("/out"));
        assert_eq!(settings.sdk_path, Some(PathBuf::from("/sdk")));
        assert_eq!(settings.animation_takes.len(), 1);
    }

    #[test]
    fn test_take_edit_transitions() {
        let mut settings = BuildSettings::default();

        assert_eq!(settings.apply_take_edit(&edit("idle", false, 1, 2)), TakeChange::Unchanged);
        assert_eq!(settings.apply_take_edit(&edit("idle", true, 1, 2)), TakeChange::Added);
        assert_eq!(settings.apply_take_edit(&edit("idle", true, 1, 2)), TakeChange::Unchanged);
        assert_eq!(settings.apply_take_edit(&edit("idle", true, 3, 4)), TakeChange::Updated);
        assert_eq!(settings.take("idle"), Some(&AnimationTake::new("idle", 3, 4)));
        assert_eq!(settings.apply_take_edit(&edit("idle", false, 0, 0)), TakeChange::Removed);
        assert!(settings.animation_takes.is_empty());
    }

    #[test]
    fn test_effective_takes_default() {
        let settings = BuildSettings::default();
        assert_eq!(settings.effective_takes(), vec![AnimationTake::default_idle()]);
        assert!(settings.output_path().unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_update_shared_serialises_writers() {
        let mut scene = SceneGraph::new();
        create_icon_template(&mut scene).unwrap();
        let shared = Arc::new(Mutex::new(scene));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    SettingsStore::update_shared(&shared, |s| {
                        s.apply_take_edit(&edit(&format!("take{}", i), true, i, i + 1))
                    })
                    .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let settings = SettingsStore::load(&shared.lock());
        assert_eq!(settings.animation_takes.len(), 8);
    }
}
