//! Interchange file output
//!
//! The exporter hands the writer a prepared scene (baked, unsupported
//! nodes removed, component flattened to world) plus the node selection
//! and the takes to split the animation into.

mod writer;

pub use writer::FbxAsciiWriter;

use std::path::Path;

use iconforge_scene::{AnimationTake, NodeId, SceneGraph};

use crate::error::ExportResult;

/// FBX time units per second
pub const KTIME_PER_SECOND: i64 = 46_186_158_000;

/// Convert a frame number to FBX time
pub fn frame_to_ktime(frame: f64, fps: f64) -> i64 {
    (frame * KTIME_PER_SECOND as f64 / fps).round() as i64
}

/// Writes one component's nodes and animation to a single file
pub trait InterchangeWriter {
    /// File extension, without the dot
    fn extension(&self) -> &'static str;

    fn write(
        &self,
        scene: &SceneGraph,
        selection: &[NodeId],
        takes: &[AnimationTake],
        fps: f64,
        path: &Path,
    ) -> ExportResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_to_ktime() {
        assert_eq!(frame_to_ktime(0.0, 60.0), 0);
        assert_eq!(frame_to_ktime(1.0, 60.0), 769_769_300);
        assert_eq!(frame_to_ktime(30.0, 30.0), KTIME_PER_SECOND);
    }
}
