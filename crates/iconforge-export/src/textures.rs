//! Texture export
//!
//! Textures already in a bundle image format are copied verbatim;
//! anything else the `image` crate can decode is re-encoded as PNG.

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::{debug, warn};

/// Copies or converts texture files into a component directory
#[derive(Debug, Clone)]
pub struct TextureExporter {
    /// Extensions that are copied without conversion
    passthrough: Vec<String>,
}

impl TextureExporter {
    /// Exporter copying files with a `passthrough` extension as is
    pub fn new(passthrough: Vec<String>) -> Self {
        Self { passthrough }
    }

    fn is_passthrough(&self, source: &Path) -> bool {
        crate::config::PipelineConfig::has_extension(source, &self.passthrough)
    }

    /// File name the texture has once exported
    pub fn target_name(&self, source: &Path) -> Option<String> {
        let file_name = source.file_name()?.to_str()?;
        if self.is_passthrough(source) {
            return Some(file_name.to_string());
        }
        let stem = source.file_stem()?.to_str()?;
        Some(format!("{}.png", stem))
    }

    /// Export `source` into `out_dir`. Returns the written path, or
    /// `None` when the source is missing, cannot be decoded or cannot
    /// be written. Texture export never fails the component.
    pub fn export(&self, source: &Path, out_dir: &Path) -> Option<PathBuf> {
        let Some(name) = self.target_name(source) else {
            warn!(path = %source.display(), "Texture path has no file name");
            return None;
        };
        if !source.is_file() {
            warn!(path = %source.display(), "Texture not found on disk, skipping");
            return None;
        }

        let target = out_dir.join(&name);
        if self.is_passthrough(source) {
            return match fs::copy(source, &target) {
                Ok(_) => {
                    debug!(from = %source.display(), to = %target.display(), "Copied texture");
                    Some(target)
                }
                Err(e) => {
                    warn!(from = %source.display(), to = %target.display(), error = %e, "Cannot copy texture, skipping");
                    None
                }
            };
        }

        let img = match image::open(source) {
            Ok(img) => img,
            Err(e) => {
                warn!(path = %source.display(), error = %e, "Cannot decode texture, skipping");
                return None;
            }
        };
        match img.save_with_format(&target, ImageFormat::Png) {
            Ok(()) => {
                debug!(from = %source.display(), to = %target.display(), "Converted texture to PNG");
                Some(target)
            }
            Err(e) => {
                warn!(to = %target.display(), error = %e, "Cannot write texture, skipping");
                None
            }
        }
    }
}

impl Default for TextureExporter {
    fn default() -> Self {
        Self::new(vec!["png".to_string(), "jpg".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_target_names() {
        let exporter = TextureExporter::default();
        assert_eq!(exporter.target_name(Path::new("/a/wood.png")).as_deref(), Some("wood.png"));
        assert_eq!(exporter.target_name(Path::new("/a/wood.JPG")).as_deref(), Some("wood.JPG"));
        assert_eq!(exporter.target_name(Path::new("/a/wood.tga")).as_deref(), Some("wood.png"));
    }

    #[test]
    fn test_copy_and_convert() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let exporter = TextureExporter::default();

        let png = src.path().join("a.png");
        std::fs::write(&png, b"not really a png").unwrap();
        let copied = exporter.export(&png, out.path()).unwrap();
        assert_eq!(std::fs::read(copied).unwrap(), b"not really a png");

        let tga = src.path().join("b.tga");
        RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])).save(&tga).unwrap();
        let converted = exporter.export(&tga, out.path()).unwrap();
        assert_eq!(converted, out.path().join("b.png"));
        assert_eq!(image::open(&converted).unwrap().width(), 2);
    }

    #[test]
    fn test_missing_or_undecodable_skipped() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let exporter = TextureExporter::default();

        assert!(exporter.export(&src.path().join("gone.png"), out.path()).is_none());

        let junk = src.path().join("junk.tga");
        std::fs::write(&junk, b"junk").unwrap();
        assert!(exporter.export(&junk, out.path()).is_none());
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_target_skipped() {
        let src = tempfile::tempdir().unwrap();
        let exporter = TextureExporter::default();
        let missing_dir = src.path().join("no_such_dir");

        let png = src.path().join("a.png");
        std::fs::write(&png, b"png").unwrap();
        assert!(exporter.export(&png, &missing_dir).is_none());

        let tga = src.path().join("b.tga");
        RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255])).save(&tga).unwrap();
        assert!(exporter.export(&tga, &missing_dir).is_none());
    }
}
