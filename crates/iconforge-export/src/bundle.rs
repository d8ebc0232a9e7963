//! Icon bundle archive

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::PipelineConfig;
use crate::error::ExportResult;

/// Packs exported component folders into a single zip
pub struct BundleAssembler<'a> {
    config: &'a PipelineConfig,
}

impl<'a> BundleAssembler<'a> {
    /// Assembler using the folder and extension tables of `config`
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Archive entry name for a file: `<folder>/<file name>`
    fn entry_name(&self, icon_dir: &Path, path: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_str()?;
        let parent = path.parent()?;

        let folder = self
            .config
            .component_folders
            .iter()
            .find(|(kind, _)| self.config.component_dir(icon_dir, **kind) == parent)
            .map(|(_, folder)| folder.clone())
            .or_else(|| parent.file_name()?.to_str().map(String::from))?;

        Some(format!("{}/{}", folder, file_name))
    }

    /// Bundled files under `icon_dir` as `(entry name, path)`, sorted
    pub fn collect(&self, icon_dir: &Path) -> ExportResult<Vec<(String, PathBuf)>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(icon_dir).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || !self.config.is_bundled(path) {
                continue;
            }
            if let Some(name) = self.entry_name(icon_dir, path) {
                entries.push((name, path.to_path_buf()));
            }
        }
        entries.sort();
        Ok(entries)
    }

    /// Write `<icon_dir parent>/<archive name>` in one pass and return its path
    pub fn assemble(&self, icon_dir: &Path) -> ExportResult<PathBuf> {
        let _span = info_span!("bundle", path = %icon_dir.display()).entered();

        let entries = self.collect(icon_dir)?;
        let archive_path = self.config.archive_path(icon_dir);

        let mut zip = ZipWriter::new(BufWriter::new(File::create(&archive_path)?));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, path) in &entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(&std::fs::read(path)?)?;
            debug!(entry = %name, "Added to bundle");
        }
        zip.finish()?.flush()?;

        info!(archive = %archive_path.display(), files = entries.len(), "Bundled icon");
        Ok(archive_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn archive_names(path: &Path) -> Vec<String> {
        let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        archive.file_names().map(String::from).collect::<Vec<_>>()
    }

    #[test]
    fn test_only_allowlisted_files_bundled() {
        let out = tempfile::tempdir().unwrap();
        let model = out.path().join("Icon/Model");
        fs::create_dir_all(&model).unwrap();
        for name in ["a.kmat", "a.fbx", "tex.png", "notes.txt"] {
            fs::write(model.join(name), name).unwrap();
        }

        let config = PipelineConfig::default();
        let archive = BundleAssembler::new(&config).assemble(&out.path().join("Icon")).unwrap();

        assert_eq!(archive, out.path().join("Icon.zip"));
        let mut names = archive_names(&archive);
        names.sort();
        assert_eq!(names, ["Model/a.fbx", "Model/a.kmat", "Model/tex.png"]);
    }

    #[test]
    fn test_nested_files_use_immediate_parent() {
        let out = tempfile::tempdir().unwrap();
        let icon = out.path().join("Icon");
        fs::create_dir_all(icon.join("Portal/extra")).unwrap();
        fs::write(icon.join("Portal/Portal.kmat"), "{}").unwrap();
        fs::write(icon.join("Portal/extra/sky.jpg"), "jpg").unwrap();

        let config = PipelineConfig::default();
        let entries = BundleAssembler::new(&config).collect(&icon).unwrap();
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["Portal/Portal.kmat", "extra/sky.jpg"]);
    }

    #[test]
    fn test_reassemble_overwrites() {
        let out = tempfile::tempdir().unwrap();
        let icon = out.path().join("Icon");
        fs::create_dir_all(icon.join("Model")).unwrap();
        fs::write(icon.join("Model/Model.kmat"), "{}").unwrap();

        let config = PipelineConfig::default();
        let assembler = BundleAssembler::new(&config);
        assembler.assemble(&icon).unwrap();
        fs::remove_file(icon.join("Model/Model.kmat")).unwrap();
        let archive = assembler.assemble(&icon).unwrap();

        assert!(archive_names(&archive).is_empty());
    }
}
