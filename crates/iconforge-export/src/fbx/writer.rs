//! FBX 7.4 ASCII writer

use std::collections::BTreeSet;
use std::fmt::{Display, Write as _};
use std::fs;
use std::path::Path;

use iconforge_core::NodeKind;
use iconforge_scene::{AnimationTake, Channel, MaterialId, MeshGeometry, NodeId, SceneGraph, SceneNode};
use tracing::debug;

use super::{frame_to_ktime, InterchangeWriter};
use crate::error::{ExportError, ExportResult};

const FIRST_OBJECT_ID: i64 = 1_000;
const AXES: [&str; 3] = ["X", "Y", "Z"];

/// Sequential object ids; the same input always yields the same ids
struct IdAllocator {
    next: i64,
}

impl IdAllocator {
    fn next(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Writes scenes as FBX 7.4 ASCII documents
#[derive(Debug, Clone)]
pub struct FbxAsciiWriter {
    creator: String,
}

impl Default for FbxAsciiWriter {
    fn default() -> Self {
        Self {
            creator: format!("iconforge {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn clean_name(name: &str) -> String {
    name.replace('"', "_")
}

fn join<T: Display>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn model_type(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Mesh => "Mesh",
        NodeKind::Joint => "LimbNode",
        NodeKind::Transform | NodeKind::Unsupported(_) => "Null",
    }
}

fn channel_property(channel: Channel) -> (&'static str, &'static str) {
    match channel {
        Channel::Translate => ("Lcl Translation", "T"),
        Channel::Rotate => ("Lcl Rotation", "R"),
        Channel::Scale => ("Lcl Scaling", "S"),
    }
}

fn channel_defaults(node: &SceneNode, channel: Channel) -> [f64; 3] {
    match channel {
        Channel::Translate => node.transform.translate,
        Channel::Rotate => node.transform.rotate,
        Channel::Scale => node.transform.scale,
    }
}

impl FbxAsciiWriter {
    /// Writer stamping files with `creator`
    pub fn new(creator: impl Into<String>) -> Self {
        Self { creator: creator.into() }
    }

    /// Render the whole document
    pub fn render(
        &self,
        scene: &SceneGraph,
        selection: &[NodeId],
        takes: &[AnimationTake],
        fps: f64,
    ) -> ExportResult<String> {
        let mut out = String::new();
        let mut ids = IdAllocator { next: FIRST_OBJECT_ID };
        let mut connections = Vec::new();

        let selected: BTreeSet<NodeId> = selection.iter().copied().collect();
        let mut model_ids = Vec::with_capacity(selection.len());

        self.write_header(&mut out, fps)?;
        writeln!(out, "Objects:  {{").map_err(fmt_err)?;

        // Models and geometry
        for &id in selection {
            let node = scene.node(id)?;
            let model_id = ids.next();
            model_ids.push((id, model_id));
            Self::write_model(&mut out, model_id, node)?;

            if let Some(geometry) = &node.geometry {
                let geometry_id = ids.next();
                Self::write_geometry(&mut out, geometry_id, node, geometry)?;
                connections.push(format!("\tC: \"OO\",{},{}", geometry_id, model_id));
            }
        }

        let model_id = |node: NodeId| model_ids.iter().find(|(n, _)| *n == node).map(|&(_, m)| m);

        for &(id, own) in &model_ids {
            let parent = scene
                .node(id)?
                .parent
                .filter(|p| selected.contains(p))
                .and_then(model_id)
                .unwrap_or(0);
            connections.push(format!("\tC: \"OO\",{},{}", own, parent));
        }

        // Materials, in first-use order
        let mut materials: Vec<(MaterialId, i64)> = Vec::new();
        for &(id, own) in &model_ids {
            for &material in &scene.node(id)?.materials {
                let material_id = match materials.iter().find(|(m, _)| *m == material) {
                    Some(&(_, existing)) => existing,
                    None => {
                        let Some(def) = scene.material(material) else {
                            continue;
                        };
                        let new_id = ids.next();
                        writeln!(
                            out,
                            "\tMaterial: {}, \"Material::{}\", \"\" {{\n\t\tVersion: 102\n\t\tShadingModel: \"{}\"\n\t\tProperties70:  {{\n\t\t\tP: \"DiffuseColor\", \"Color\", \"\", \"A\",{}\n\t\t}}\n\t}}",
                            new_id,
                            clean_name(&def.name),
                            def.shading_type,
                            join(def.color)
                        )
                        .map_err(fmt_err)?;
                        materials.push((material, new_id));
                        new_id
                    }
                };
                connections.push(format!("\tC: \"OO\",{},{}", material_id, own));
            }
        }

        // One animation stack per take
        for take in takes {
            let (start, end) = (take.start_frame as f64, take.end_frame as f64);
            let stack_id = ids.next();
            let layer_id = ids.next();
            let (kstart, kend) = (frame_to_ktime(start, fps), frame_to_ktime(end, fps));

            writeln!(
                out,
                "\tAnimationStack: {}, \"AnimStack::{}\", \"\" {{\n\t\tProperties70:  {{\n\t\t\tP: \"LocalStart\", \"KTime\", \"Time\", \"\",{}\n\t\t\tP: \"LocalStop\", \"KTime\", \"Time\", \"\",{}\n\t\t\tP: \"ReferenceStart\", \"KTime\", \"Time\", \"\",{}\n\t\t\tP: \"ReferenceStop\", \"KTime\", \"Time\", \"\",{}\n\t\t}}\n\t}}",
                stack_id,
                clean_name(&take.name),
                kstart,
                kend,
                kstart,
                kend
            )
            .map_err(fmt_err)?;
            writeln!(out, "\tAnimationLayer: {}, \"AnimLayer::BaseLayer\", \"\" {{\n\t}}", layer_id)
                .map_err(fmt_err)?;
            connections.push(format!("\tC: \"OO\",{},{}", layer_id, stack_id));

            for &(id, own) in &model_ids {
                let node = scene.node(id)?;
                if node.animation.is_empty() {
                    continue;
                }

                for channel in Channel::ALL {
                    let curves = node.animation.channel(channel);
                    if curves.iter().all(|c| c.key_times_in(start, end).next().is_none()) {
                        continue;
                    }

                    let (property, label) = channel_property(channel);
                    let defaults = channel_defaults(node, channel);
                    let curve_node_id = ids.next();
                    writeln!(
                        out,
                        "\tAnimationCurveNode: {}, \"AnimCurveNode::{}\", \"\" {{\n\t\tProperties70:  {{\n\t\t\tP: \"d|X\", \"Number\", \"\", \"A\",{}\n\t\t\tP: \"d|Y\", \"Number\", \"\", \"A\",{}\n\t\t\tP: \"d|Z\", \"Number\", \"\", \"A\",{}\n\t\t}}\n\t}}",
                        curve_node_id, label, defaults[0], defaults[1], defaults[2]
                    )
                    .map_err(fmt_err)?;
                    connections.push(format!("\tC: \"OO\",{},{}", curve_node_id, layer_id));
                    connections.push(format!("\tC: \"OP\",{},{},\"{}\"", curve_node_id, own, property));

                    for (axis, curve) in curves.iter().enumerate() {
                        let keys: Vec<_> = curve
                            .keys()
                            .iter()
                            .filter(|k| k.frame >= start && k.frame <= end)
                            .collect();
                        if keys.is_empty() {
                            continue;
                        }

                        let curve_id = ids.next();
                        writeln!(
                            out,
                            "\tAnimationCurve: {}, \"AnimCurve::\", \"\" {{\n\t\tDefault: {}\n\t\tKeyVer: 4009\n\t\tKeyTime: *{} {{\n\t\t\ta: {}\n\t\t}}\n\t\tKeyValueFloat: *{} {{\n\t\t\ta: {}\n\t\t}}\n\t}}",
                            curve_id,
                            defaults[axis],
                            keys.len(),
                            join(keys.iter().map(|k| frame_to_ktime(k.frame, fps))),
                            keys.len(),
                            join(keys.iter().map(|k| k.value as f32)),
                        )
                        .map_err(fmt_err)?;
                        connections.push(format!(
                            "\tC: \"OP\",{},{},\"d|{}\"",
                            curve_id, curve_node_id, AXES[axis]
                        ));
                    }
                }
            }
        }

        writeln!(out, "}}\n\nConnections:  {{").map_err(fmt_err)?;
        for connection in &connections {
            writeln!(out, "{}", connection).map_err(fmt_err)?;
        }
        writeln!(out, "}}").map_err(fmt_err)?;

        self.write_takes(&mut out, takes, fps)?;
        Ok(out)
    }

    fn write_header(&self, out: &mut String, fps: f64) -> ExportResult<()> {
        writeln!(
            out,
            "; FBX 7.4.0 project file\n\
             ; ----------------------------------------------------\n\n\
             FBXHeaderExtension:  {{\n\
             \tFBXHeaderVersion: 1003\n\
             \tFBXVersion: 7400\n\
             \tCreator: \"{}\"\n\
             }}\n\n\
             GlobalSettings:  {{\n\
             \tVersion: 1000\n\
             \tProperties70:  {{\n\
             \t\tP: \"UpAxis\", \"int\", \"Integer\", \"\",1\n\
             \t\tP: \"UnitScaleFactor\", \"double\", \"Number\", \"\",1\n\
             \t\tP: \"TimeMode\", \"enum\", \"\", \"\",14\n\
             \t\tP: \"CustomFrameRate\", \"double\", \"Number\", \"\",{}\n\
             \t}}\n\
             }}\n",
            clean_name(&self.creator),
            fps
        )
        .map_err(fmt_err)
    }

    fn write_model(out: &mut String, id: i64, node: &SceneNode) -> ExportResult<()> {
        let t = &node.transform;
        writeln!(
            out,
            "\tModel: {}, \"Model::{}\", \"{}\" {{\n\t\tVersion: 232\n\t\tProperties70:  {{\n\t\t\tP: \"Lcl Translation\", \"Lcl Translation\", \"\", \"A\",{}\n\t\t\tP: \"Lcl Rotation\", \"Lcl Rotation\", \"\", \"A\",{}\n\t\t\tP: \"Lcl Scaling\", \"Lcl Scaling\", \"\", \"A\",{}\n\t\t}}\n\t}}",
            id,
            clean_name(&node.name),
            model_type(node.kind),
            join(t.translate),
            join(t.rotate),
            join(t.scale)
        )
        .map_err(fmt_err)
    }

    fn write_geometry(out: &mut String, id: i64, node: &SceneNode, geometry: &MeshGeometry) -> ExportResult<()> {
        let vertex_count = geometry.positions.len();
        let mut indices: Vec<i64> = Vec::new();
        for polygon in &geometry.polygons {
            if let Some(&bad) = polygon.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(ExportError::Interchange(format!(
                    "mesh '{}' references vertex {} of {}",
                    node.name, bad, vertex_count
                )));
            }
            let Some((&last, rest)) = polygon.split_last() else {
                continue;
            };
            indices.extend(rest.iter().map(|&i| i64::from(i)));
            // The last index of each polygon is stored as its bitwise complement.
            indices.push(-i64::from(last) - 1);
        }

        let vertices = geometry.positions.iter().flat_map(|p| p.iter().copied());
        writeln!(
            out,
            "\tGeometry: {}, \"Geometry::{}\", \"Mesh\" {{\n\t\tVertices: *{} {{\n\t\t\ta: {}\n\t\t}}\n\t\tPolygonVertexIndex: *{} {{\n\t\t\ta: {}\n\t\t}}\n\t\tGeometryVersion: 124\n\t}}",
            id,
            clean_name(&node.name),
            vertex_count * 3,
            join(vertices),
            indices.len(),
            join(&indices)
        )
        .map_err(fmt_err)
    }

    fn write_takes(&self, out: &mut String, takes: &[AnimationTake], fps: f64) -> ExportResult<()> {
        let Some(first) = takes.first() else {
            return Ok(());
        };

        writeln!(out, "\nTakes:  {{\n\tCurrent: \"{}\"", clean_name(&first.name)).map_err(fmt_err)?;
        for take in takes {
            let start = frame_to_ktime(take.start_frame as f64, fps);
            let end = frame_to_ktime(take.end_frame as f64, fps);
            writeln!(
                out,
                "\tTake: \"{0}\" {{\n\t\tFileName: \"{0}.tak\"\n\t\tLocalTime: {1},{2}\n\t\tReferenceTime: {1},{2}\n\t}}",
                clean_name(&take.name),
                start,
                end
            )
            .map_err(fmt_err)?;
        }
        writeln!(out, "}}").map_err(fmt_err)
    }
}

fn fmt_err(e: std::fmt::Error) -> ExportError {
    ExportError::Interchange(e.to_string())
}

impl InterchangeWriter for FbxAsciiWriter {
    fn extension(&self) -> &'static str {
        "fbx"
    }

    fn write(
        &self,
        scene: &SceneGraph,
        selection: &[NodeId],
        takes: &[AnimationTake],
        fps: f64,
        path: &Path,
    ) -> ExportResult<()> {
        let text = self.render(scene, selection, takes, fps)?;
        fs::write(path, text)?;
        debug!(path = %path.display(), nodes = selection.len(), takes = takes.len(), "Wrote FBX");
        Ok(())
    }
}
