//! Pipeline layout and tool configuration

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use iconforge_core::tool::tool_path;
use iconforge_core::ComponentKind;

/// Validator executable name (without platform suffix)
pub const CONVERTER_TOOL: &str = "icon-converter";

/// Output layout, bundle filter and tool locations
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Folder created under the configured output path
    pub icon_dir_name: String,
    /// Archive written next to the icon folder
    pub archive_name: String,
    /// Component to output folder (and archive folder) name
    pub component_folders: BTreeMap<ComponentKind, String>,
    /// Material manifest extension
    pub manifest_extension: String,
    /// Extensions copied into the bundle, lower case, without the dot
    pub bundle_extensions: Vec<String>,
    /// Image extensions textures are exported in as-is
    pub image_extensions: Vec<String>,
    /// Directory holding the external tools; PATH lookup when unset
    pub tools_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            icon_dir_name: "Icon".to_string(),
            archive_name: "Icon.zip".to_string(),
            component_folders: ComponentKind::ALL
                .iter()
                .map(|&kind| (kind, kind.as_str().to_string()))
                .collect(),
            manifest_extension: "kmat".to_string(),
            bundle_extensions: ["kmat", "fbx", "png", "jpg"].map(String::from).to_vec(),
            image_extensions: ["png", "jpg"].map(String::from).to_vec(),
            tools_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Look up external tools in `dir`
    pub fn with_tools_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tools_dir = Some(dir.into());
        self
    }

    /// `<output>/Icon`
    pub fn icon_directory(&self, output_path: &Path) -> PathBuf {
        output_path.join(&self.icon_dir_name)
    }

    /// Folder name for a component
    pub fn component_folder(&self, kind: ComponentKind) -> &str {
        self.component_folders
            .get(&kind)
            .map(String::as_str)
            .unwrap_or(kind.as_str())
    }

    /// Export folder of a component inside `icon_dir`
    pub fn component_dir(&self, icon_dir: &Path, kind: ComponentKind) -> PathBuf {
        icon_dir.join(self.component_folder(kind))
    }

    /// Archive-style path of a component folder, e.g. `Icon/Model`
    pub fn relative_component_path(&self, kind: ComponentKind) -> String {
        format!("{}/{}", self.icon_dir_name, self.component_folder(kind))
    }

    /// Zip bundle path, next to the icon folder
    pub fn archive_path(&self, icon_dir: &Path) -> PathBuf {
        icon_dir
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(&self.archive_name)
    }

    /// Case-insensitive extension check against a list
    pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }

    /// Whether `path` goes into the zip bundle
    pub fn is_bundled(&self, path: &Path) -> bool {
        Self::has_extension(path, &self.bundle_extensions)
    }

    /// Resolved path of an external tool
    pub fn tool(&self, name: &str) -> PathBuf {
        tool_path(self.tools_dir.as_deref(), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = PipelineConfig::default();
        let icon_dir = config.icon_directory(Path::new("/out"));

        assert_eq!(icon_dir, PathBuf::from("/out/Icon"));
        assert_eq!(config.component_dir(&icon_dir, ComponentKind::Portal), PathBuf::from("/out/Icon/Portal"));
        assert_eq!(config.relative_component_path(ComponentKind::Model), "Icon/Model");
        assert_eq!(config.archive_path(&icon_dir), PathBuf::from("/out/Icon.zip"));
    }

    #[test]
    fn test_folder_table_drives_names() {
        let mut config = PipelineConfig::default();
        config.component_folders.insert(ComponentKind::Portal, "Backdrop".into());

        assert_eq!(config.relative_component_path(ComponentKind::Portal), "Icon/Backdrop");
        assert_eq!(config.component_folder(ComponentKind::Portal), "Backdrop");
    }

    #[test]
    fn test_bundle_filter() {
        let config = PipelineConfig::default();
        assert!(config.is_bundled(Path::new("a.kmat")));
        assert!(config.is_bundled(Path::new("tex.PNG")));
        assert!(!config.is_bundled(Path::new("notes.txt")));
        assert!(!config.is_bundled(Path::new("Makefile")));
    }
}
