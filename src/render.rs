// ============================================================================
// SOFTWARE RENDERING: CANVAS, MARKER SPRITE, ROTATED BLIT, HUD TEXT
// ============================================================================

use glam::DVec2;
use image::imageops::FilterType;
use rusttype::{point, Font, PositionedGlyph, Scale};
use std::path::Path;

use crate::config::{Color, HudStyle, MarkerStyle};

// ============================================================================
// CANVAS
// ============================================================================

/// RGBA8 view over a frame or sprite buffer.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        debug_assert_eq!(frame.len(), width * height * 4);
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, rgba: [u8; 4]) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&rgba);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let idx = (y * self.width + x) * 4;
        [
            self.frame[idx],
            self.frame[idx + 1],
            self.frame[idx + 2],
            self.frame[idx + 3],
        ]
    }

    /// Source-over blend of `color` at coverage `alpha`. Out-of-bounds
    /// coordinates are ignored.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color, alpha: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let a = alpha.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        let dst = &mut self.frame[idx..idx + 4];
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = a + dst_a * (1.0 - a);
        let src = [color.r, color.g, color.b];
        for c in 0..3 {
            let blended = (src[c] as f32 * a + dst[c] as f32 * dst_a * (1.0 - a)) / out_a;
            dst[c] = blended.round() as u8;
        }
        dst[3] = (out_a * 255.0).round() as u8;
    }

    /// Fills `[x0, x1) x [y0, y1)`, clipped to the canvas.
    pub fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        for y in y0.max(0)..y1.min(self.height as i32) {
            for x in x0.max(0)..x1.min(self.width as i32) {
                self.blend_pixel(x, y, color, 1.0);
            }
        }
    }

    /// Rectangle outline drawn inward from the canvas edges.
    pub fn stroke_border(&mut self, thickness: i32, color: Color) {
        let (w, h) = (self.width as i32, self.height as i32);
        self.fill_rect(0, 0, w, thickness, color);
        self.fill_rect(0, h - thickness, w, h, color);
        self.fill_rect(0, thickness, thickness, h - thickness, color);
        self.fill_rect(w - thickness, thickness, w, h - thickness, color);
    }

    pub fn draw_thick_line_aa(
        &mut self,
        from: (i32, i32),
        to: (i32, i32),
        thickness: f32,
        color: Color,
    ) {
        let (x0, y0) = from;
        let (x1, y1) = to;
        let pad = thickness.ceil() as i32 + 1;
        let dx = (x1 - x0) as f32;
        let dy = (y1 - y0) as f32;
        let len_sq = dx * dx + dy * dy;
        for y in (y0.min(y1) - pad)..=(y0.max(y1) + pad) {
            for x in (x0.min(x1) - pad)..=(x0.max(x1) + pad) {
                let px = (x - x0) as f32;
                let py = (y - y0) as f32;
                let t = if len_sq > 0.0 {
                    ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let dist = ((t * dx - px).powi(2) + (t * dy - py).powi(2)).sqrt();
                let aa = (1.0 - (dist - thickness / 2.0).clamp(0.0, 1.0)).clamp(0.0, 1.0);
                if aa > 0.01 {
                    self.blend_pixel(x, y, color, aa);
                }
            }
        }
    }
}

// ============================================================================
// MARKER SPRITE AND ROTATION
// ============================================================================

/// Owned RGBA image drawn onto the frame each tick.
#[derive(Debug, Clone)]
pub struct Sprite {
    rgba: Vec<u8>,
    width: usize,
    height: usize,
}

impl Sprite {
    pub fn transparent(width: usize, height: usize) -> Self {
        Self {
            rgba: vec![0; width * height * 4],
            width,
            height,
        }
    }

    /// Robot marker: outlined box with an arrow from the centre to the
    /// top edge, so heading 0 points up.
    pub fn marker(width: usize, height: usize, style: &MarkerStyle) -> Self {
        let mut sprite = Self::transparent(width.max(1), height.max(1));
        let (w, h) = (sprite.width as i32, sprite.height as i32);
        let mut canvas = sprite.canvas();
        canvas.stroke_border(style.border_width.round() as i32, style.border_color);
        canvas.draw_thick_line_aa(
            (w / 2, h / 2),
            (w / 2, style.arrow_tip_inset as i32),
            style.arrow_width,
            style.arrow_color,
        );
        sprite
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn canvas(&mut self) -> Canvas<'_> {
        Canvas::new(&mut self.rgba, self.width, self.height)
    }

    fn sample(&self, x: usize, y: usize) -> [u8; 4] {
        let idx = (y * self.width + x) * 4;
        [
            self.rgba[idx],
            self.rgba[idx + 1],
            self.rgba[idx + 2],
            self.rgba[idx + 3],
        ]
    }
}

/// Where a sprite lands after rotation: its expanded bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub top_left: DVec2,
    pub size: DVec2,
}

impl Placement {
    pub fn center(&self) -> DVec2 {
        self.top_left + self.size / 2.0
    }
}

/// Bounding box of a `size` sprite rotated clockwise by `heading` degrees
/// and centred on `center`.
pub fn rotated_placement(center: DVec2, size: DVec2, heading: f64) -> Placement {
    let (sin, cos) = heading.to_radians().sin_cos();
    let rotated = DVec2::new(
        (size.x * cos).abs() + (size.y * sin).abs(),
        (size.x * sin).abs() + (size.y * cos).abs(),
    );
    Placement {
        top_left: center - rotated / 2.0,
        size: rotated,
    }
}

/// Draws `sprite` rotated clockwise by `heading` degrees about its own
/// centre, which is placed at `center`.
pub fn blit_rotated(canvas: &mut Canvas, sprite: &Sprite, center: DVec2, heading: f64) {
    let half = DVec2::new(sprite.width as f64, sprite.height as f64) / 2.0;
    let placement = rotated_placement(center, half * 2.0, heading);
    let (sin, cos) = heading.to_radians().sin_cos();

    let min = placement.top_left.floor();
    let max = (placement.top_left + placement.size).ceil();
    let y_range = (min.y.max(0.0) as i32)..(max.y.min(canvas.height as f64) as i32);
    let x_range = (min.x.max(0.0) as i32)..(max.x.min(canvas.width as f64) as i32);

    for y in y_range {
        for x in x_range.clone() {
            let d = DVec2::new(x as f64 + 0.5, y as f64 + 0.5) - center;
            // inverse rotation back into sprite space
            let s = DVec2::new(d.x * cos + d.y * sin, -d.x * sin + d.y * cos) + half;
            if s.x < 0.0 || s.y < 0.0 {
                continue;
            }
            let (sx, sy) = (s.x as usize, s.y as usize);
            if sx >= sprite.width || sy >= sprite.height {
                continue;
            }
            let [r, g, b, a] = sprite.sample(sx, sy);
            if a > 0 {
                canvas.blend_pixel(x, y, Color::new(r, g, b), a as f32 / 255.0);
            }
        }
    }
}

// ============================================================================
// BACKGROUND
// ============================================================================

/// Field image pre-scaled to the frame size.
#[derive(Debug, Clone)]
pub struct Background {
    rgba: Vec<u8>,
    size: u32,
}

impl Background {
    pub fn load(path: impl AsRef<Path>, size: u32) -> Result<Self, image::ImageError> {
        let img = image::open(path)?;
        let scaled = img.resize_exact(size, size, FilterType::Triangle).to_rgba8();
        Ok(Self {
            rgba: scaled.into_raw(),
            size,
        })
    }

    pub fn solid(size: u32, color: Color) -> Self {
        let rgba = [color.r, color.g, color.b, 0xff]
            .into_iter()
            .cycle()
            .take(size as usize * size as usize * 4)
            .collect();
        Self { rgba, size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn draw(&self, canvas: &mut Canvas) {
        if canvas.frame.len() == self.rgba.len() {
            canvas.frame.copy_from_slice(&self.rgba);
        } else {
            canvas.clear([0x00, 0x00, 0x00, 0xff]);
        }
    }
}

// ============================================================================
// HUD TEXT
// ============================================================================

pub struct Hud {
    font: Font<'static>,
    style: HudStyle,
}

impl Hud {
    pub fn from_bytes(data: Vec<u8>, style: HudStyle) -> Option<Self> {
        Font::try_from_vec(data).map(|font| Self { font, style })
    }

    /// Draws `lines` top-left aligned, one below the other.
    pub fn draw(&self, canvas: &mut Canvas, lines: &[String]) {
        let scale = Scale::uniform(self.style.font_size);
        let ascent = self.font.v_metrics(scale).ascent;
        for (i, line) in lines.iter().enumerate() {
            let origin_y = self.style.margin + i as i32 * self.style.line_spacing;
            let glyphs: Vec<PositionedGlyph> = self
                .font
                .layout(line, scale, point(self.style.margin as f32, origin_y as f32 + ascent))
                .collect();
            for glyph in glyphs {
                if let Some(bb) = glyph.pixel_bounding_box() {
                    glyph.draw(|gx, gy, v| {
                        canvas.blend_pixel(
                            bb.min.x + gx as i32,
                            bb.min.y + gy as i32,
                            self.style.color,
                            v,
                        );
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RED: Color = Color::new(0xff, 0x00, 0x00);

    #[test]
    fn blend_over_opaque_matches_lerp() {
        let mut buf = vec![0u8; 4];
        let mut canvas = Canvas::new(&mut buf, 1, 1);
        canvas.clear([0, 0, 0, 0xff]);
        canvas.blend_pixel(0, 0, RED, 0.5);
        assert_eq!(canvas.pixel(0, 0), [128, 0, 0, 0xff]);
    }

    #[test]
    fn blend_ignores_out_of_bounds() {
        let mut buf = vec![0u8; 4 * 4];
        let mut canvas = Canvas::new(&mut buf, 2, 2);
        canvas.blend_pixel(-1, 0, RED, 1.0);
        canvas.blend_pixel(2, 1, RED, 1.0);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn marker_has_border_arrow_and_clear_body() {
        let style = MarkerStyle::default();
        let mut sprite = Sprite::marker(40, 30, &style);
        let canvas = sprite.canvas();
        assert_eq!(canvas.pixel(0, 0), [0x00, 0xff, 0x00, 0xff]);
        assert_eq!(canvas.pixel(39, 29), [0x00, 0xff, 0x00, 0xff]);
        // arrow runs from the centre (20, 15) up to y = 10
        assert_eq!(canvas.pixel(20, 12), [0xff, 0x00, 0x00, 0xff]);
        assert_eq!(canvas.pixel(8, 20)[3], 0);
    }

    #[test]
    fn rotation_keeps_center() {
        let center = DVec2::new(123.4, 56.7);
        let size = DVec2::new(40.0, 20.0);
        for heading in [0.0, 17.0, 90.0, 135.0, -30.0, 370.0] {
            let placement = rotated_placement(center, size, heading);
            assert_abs_diff_eq!(placement.center().x, center.x, epsilon = 1e-9);
            assert_abs_diff_eq!(placement.center().y, center.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn quarter_turn_swaps_extent() {
        let placement = rotated_placement(DVec2::ZERO, DVec2::new(40.0, 20.0), 90.0);
        assert_abs_diff_eq!(placement.size.x, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(placement.size.y, 40.0, epsilon = 1e-9);
        let diagonal = rotated_placement(DVec2::ZERO, DVec2::new(10.0, 10.0), 45.0);
        assert_abs_diff_eq!(diagonal.size.x, 200f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn positive_heading_turns_arrow_clockwise() {
        let sprite = Sprite::marker(40, 40, &MarkerStyle::default());
        let mut buf = vec![0u8; 100 * 100 * 4];
        let mut canvas = Canvas::new(&mut buf, 100, 100);
        canvas.clear([0, 0, 0, 0xff]);
        blit_rotated(&mut canvas, &sprite, DVec2::new(50.0, 50.0), 90.0);
        // arrow now points right of centre, not up
        assert_eq!(canvas.pixel(55, 50), [0xff, 0x00, 0x00, 0xff]);
        assert_eq!(canvas.pixel(50, 45), [0x00, 0x00, 0x00, 0xff]);
    }

    #[test]
    fn unrotated_blit_is_centred_on_position() {
        let sprite = Sprite::marker(20, 10, &MarkerStyle::default());
        let mut buf = vec![0u8; 64 * 64 * 4];
        let mut canvas = Canvas::new(&mut buf, 64, 64);
        canvas.clear([0, 0, 0, 0xff]);
        blit_rotated(&mut canvas, &sprite, DVec2::new(32.0, 32.0), 0.0);
        // border corners land at centre -/+ half size
        assert_eq!(canvas.pixel(22, 27), [0x00, 0xff, 0x00, 0xff]);
        assert_eq!(canvas.pixel(41, 36), [0x00, 0xff, 0x00, 0xff]);
        assert_eq!(canvas.pixel(21, 27), [0x00, 0x00, 0x00, 0xff]);
    }

    #[test]
    fn solid_background_fills_frame() {
        let bg = Background::solid(4, Color::new(1, 2, 3));
        let mut buf = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut buf, 4, 4);
        bg.draw(&mut canvas);
        assert_eq!(canvas.pixel(3, 3), [1, 2, 3, 0xff]);
    }
}
