//! egui-backed overlay scene
//!
//! Overlays are kept as retained primitives keyed by handle and painted every frame
//! through the camera projection.

use crate::app::camera::Camera;
use egui::{Color32, Shape, Stroke};
use line_lod_lib::{LodError, OverlayGeometry, OverlayScene};
use std::collections::BTreeMap;

/// Opaque handle of a primitive added to a [`PainterScene`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayHandle(u64);

#[derive(Default)]
pub struct PainterScene {
    next_handle: u64,
    primitives: BTreeMap<OverlayHandle, OverlayGeometry>,
}

impl PainterScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of primitives currently in the scene
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Draw every primitive into `viewport`
    pub fn paint(&self, painter: &egui::Painter, camera: &Camera, viewport: egui::Rect) {
        profiling::scope!("PainterScene::paint");

        for geometry in self.primitives.values() {
            let [r, g, b, a] = geometry.color;
            let stroke = Stroke::new(
                geometry.width,
                Color32::from_rgba_unmultiplied(r, g, b, a),
            );

            for line in &geometry.lines {
                let points: Vec<egui::Pos2> = line
                    .iter()
                    .map(|point| camera.project(point.xy(), viewport))
                    .collect();

                // Single-point lines show up as a dot of the line width
                if let [point] = points.as_slice() {
                    painter.circle_filled(*point, geometry.width / 2.0, stroke.color);
                } else {
                    painter.add(Shape::line(points, stroke));
                }
            }
        }
    }
}

impl OverlayScene for PainterScene {
    type Handle = OverlayHandle;

    fn add_overlay(&mut self, geometry: OverlayGeometry) -> line_lod_lib::Result<OverlayHandle> {
        if !geometry.width.is_finite() || geometry.width <= 0.0 {
            return Err(LodError::Scene(format!(
                "invalid line width {}",
                geometry.width
            )));
        }

        let handle = OverlayHandle(self.next_handle);
        self.next_handle += 1;
        self.primitives.insert(handle, geometry);
        Ok(handle)
    }

    fn remove_overlay(&mut self, handle: OverlayHandle) {
        if self.primitives.remove(&handle).is_none() {
            tracing::warn!("Overlay {:?} was already removed", handle);
        }
    }
}
