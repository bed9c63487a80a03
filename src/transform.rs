// ============================================================================
// FIELD <-> WINDOW COORDINATE TRANSFORM
// ============================================================================

use glam::DVec2;

/// Long side of the field in inches: 3.6 m plus a 4 inch border.
pub const FIELD_WIDTH_INCHES: f64 = 3600.0 / 25.4 + 4.0;

/// Maps between window pixels (origin top-left, y down) and field inches
/// (origin at the window centre, y up).
///
/// The window is square, so a single `scale` serves both axes. It is fixed
/// once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldTransform {
    window_size: f64,
    scale: f64,
}

impl FieldTransform {
    pub fn new(window_size: f64, field_width_inches: f64) -> Self {
        Self {
            window_size,
            scale: window_size / field_width_inches,
        }
    }

    /// Pixels per inch.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn window_size(&self) -> f64 {
        self.window_size
    }

    /// The window centre, which is the field origin.
    pub fn center(&self) -> DVec2 {
        DVec2::splat(self.window_size / 2.0)
    }

    pub fn pixels_to_inches(&self, p: DVec2) -> DVec2 {
        let half = self.window_size / 2.0;
        DVec2::new((p.x - half) / self.scale, (half - p.y) / self.scale)
    }

    pub fn inches_to_pixels(&self, v: DVec2) -> DVec2 {
        DVec2::new(self.inch_x_to_pixel(v.x), self.inch_y_to_pixel(v.y))
    }

    /// Horizontal pixel coordinate for a field x in inches.
    pub fn inch_x_to_pixel(&self, x: f64) -> f64 {
        x * self.scale + self.window_size / 2.0
    }

    /// Vertical pixel coordinate for a field y in inches.
    pub fn inch_y_to_pixel(&self, y: f64) -> f64 {
        self.window_size / 2.0 - y * self.scale
    }

    /// Converts a length (not a coordinate) from inches to pixels.
    pub fn length_to_pixels(&self, inches: f64) -> f64 {
        inches * self.scale
    }
}
