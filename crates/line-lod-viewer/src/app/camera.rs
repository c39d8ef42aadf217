//! Top-down perspective camera over the tileset plane
//!
//! World coordinates are meters with x pointing east and y pointing north. The camera
//! looks straight down from `height` meters, so the ground footprint of the viewport
//! grows linearly with the height.

use geo::{Coord, Rect};

/// Vertical field of view in radians
const DEFAULT_FOV_Y: f64 = std::f64::consts::FRAC_PI_3;

/// Height change per scrolled pixel (exponential zoom)
const ZOOM_SPEED: f64 = 0.002;

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    /// Ground point below the camera
    pub center: Coord<f64>,
    /// Height above the ground in meters
    pub height: f64,
    pub min_height: f64,
    pub max_height: f64,
    pub fov_y: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            center: Coord { x: 0.0, y: 0.0 },
            height: 1_000_000.0,
            min_height: 100.0,
            max_height: 20_000_000.0,
            fov_y: DEFAULT_FOV_Y,
        }
    }
}

impl Camera {
    /// Camera centered over `center` at `height` meters
    pub fn looking_at(center: Coord<f64>, height: f64) -> Self {
        let mut camera = Self {
            center,
            ..Self::default()
        };
        camera.set_height(height);
        camera
    }

    pub fn set_height(&mut self, height: f64) {
        if !height.is_nan() {
            self.height = height.max(self.min_height).min(self.max_height);
        }
    }

    /// Ground meters covered by one screen pixel
    pub fn meters_per_pixel(&self, viewport_height_px: f32) -> f64 {
        let viewport_height_px = f64::from(viewport_height_px.max(1.0));
        2.0 * self.height * (self.fov_y / 2.0).tan() / viewport_height_px
    }

    /// Ground position to screen position inside `viewport`
    pub fn project(&self, world: Coord<f64>, viewport: egui::Rect) -> egui::Pos2 {
        let mpp = self.meters_per_pixel(viewport.height());
        let center = viewport.center();
        egui::pos2(
            center.x + ((world.x - self.center.x) / mpp) as f32,
            center.y - ((world.y - self.center.y) / mpp) as f32,
        )
    }

    /// Screen position inside `viewport` to ground position
    pub fn unproject(&self, screen: egui::Pos2, viewport: egui::Rect) -> Coord<f64> {
        let mpp = self.meters_per_pixel(viewport.height());
        let center = viewport.center();
        Coord {
            x: self.center.x + f64::from(screen.x - center.x) * mpp,
            y: self.center.y - f64::from(screen.y - center.y) * mpp,
        }
    }

    /// Ground rectangle visible through `viewport`
    pub fn visible_bounds(&self, viewport: egui::Rect) -> Rect<f64> {
        Rect::new(
            self.unproject(viewport.left_top(), viewport),
            self.unproject(viewport.right_bottom(), viewport),
        )
    }

    /// Move the ground under the cursor along with a drag of `delta` pixels
    pub fn pan(&mut self, delta: egui::Vec2, viewport: egui::Rect) {
        let mpp = self.meters_per_pixel(viewport.height());
        self.center.x -= f64::from(delta.x) * mpp;
        self.center.y += f64::from(delta.y) * mpp;
    }

    /// Zoom by a vertical scroll of `scroll` pixels (positive zooms in)
    pub fn zoom(&mut self, scroll: f32) {
        self.set_height(self.height * (-f64::from(scroll) * ZOOM_SPEED).exp());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> egui::Rect {
        egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(800.0, 600.0))
    }

    #[test]
    fn test_project_center_and_axes() {
        let camera = Camera::looking_at(Coord { x: 100.0, y: 200.0 }, 10_000.0);
        let viewport = viewport();
        assert_eq!(camera.project(camera.center, viewport), viewport.center());

        // North is up on screen, east is right
        let north_east = camera.project(Coord { x: 1_000.0, y: 1_000.0 }, viewport);
        assert!(north_east.x > viewport.center().x);
        assert!(north_east.y < viewport.center().y);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let camera = Camera::looking_at(Coord { x: -5_000.0, y: 42.0 }, 80_000.0);
        let viewport = viewport();
        let world = Coord { x: 3_000.0, y: -7_000.0 };
        let back = camera.unproject(camera.project(world, viewport), viewport);
        assert!((back.x - world.x).abs() < 1.0);
        assert!((back.y - world.y).abs() < 1.0);
    }

    #[test]
    fn test_visible_bounds_scale_with_height() {
        let viewport = viewport();
        let low = Camera::looking_at(Coord { x: 0.0, y: 0.0 }, 1_000.0);
        let high = Camera::looking_at(Coord { x: 0.0, y: 0.0 }, 2_000.0);
        let low_bounds = low.visible_bounds(viewport);
        let high_bounds = high.visible_bounds(viewport);
        assert!((high_bounds.height() / low_bounds.height() - 2.0).abs() < 1e-9);
        assert!((low_bounds.width() / low_bounds.height() - 800.0 / 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera::default();
        camera.zoom(1.0e6);
        assert_eq!(camera.height, camera.min_height);
        camera.zoom(-1.0e6);
        assert_eq!(camera.height, camera.max_height);

        camera.set_height(f64::NAN);
        assert_eq!(camera.height, camera.max_height);
    }

    #[test]
    fn test_zoom_direction() {
        let mut camera = Camera::default();
        let before = camera.height;
        camera.zoom(50.0);
        assert!(camera.height < before);
    }

    #[test]
    fn test_pan_follows_drag() {
        let viewport = viewport();
        let mut camera = Camera::looking_at(Coord { x: 0.0, y: 0.0 }, 10_000.0);
        let grabbed = camera.unproject(egui::pos2(500.0, 200.0), viewport);
        camera.pan(egui::vec2(-100.0, 50.0), viewport);
        let under_cursor = camera.unproject(egui::pos2(400.0, 250.0), viewport);
        assert!((grabbed.x - under_cursor.x).abs() < 1e-6);
        assert!((grabbed.y - under_cursor.y).abs() < 1e-6);
    }
}
