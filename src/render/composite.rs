use crate::{
    config::BlurConfig,
    foundation::core::{Color, ShapeMode},
    foundation::math::{over_px, scale_px},
    render::buffer::PixelBuffer,
};

/// Paints the blurred image and overlay tint into the widget's own surface.
///
/// `blurred` is `None` whenever blurring is unavailable; implementations still paint the
/// overlay so the widget degrades to a flat tint rather than a hole.
pub trait BlurPainter {
    /// Paint into `target`, which covers exactly the widget bounds.
    fn paint(
        &self,
        target: &mut PixelBuffer,
        blurred: Option<&PixelBuffer>,
        overlay: Color,
        shape: ShapeMode,
    );
}

/// Bilinear upscale of the blurred image, then the overlay, both clipped to `shape`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPainter;

impl BlurPainter for DefaultPainter {
    fn paint(
        &self,
        target: &mut PixelBuffer,
        blurred: Option<&PixelBuffer>,
        overlay: Color,
        shape: ShapeMode,
    ) {
        let (w, h) = (target.width(), target.height());
        let tint = overlay.premultiplied().to_array();
        for y in 0..h {
            for x in 0..w {
                let coverage = shape_coverage(shape, x, y, w, h);
                if coverage == 0 {
                    continue;
                }
                let Some(mut px) = target.pixel(x, y) else {
                    continue;
                };
                if let Some(src) = blurred {
                    let sample = sample_bilinear(src, x, y, w, h);
                    px = over_px(px, scale_px(sample, coverage));
                }
                px = over_px(px, scale_px(tint, coverage));
                target.put_pixel(x, y, px);
            }
        }
    }
}

/// Owns the painter used for the widget's draw pass.
pub struct CompositeStage {
    painter: Box<dyn BlurPainter>,
}

impl CompositeStage {
    /// Stage with a custom painter.
    pub fn new(painter: Box<dyn BlurPainter>) -> Self {
        Self { painter }
    }

    /// Paint result and overlay per `config`.
    pub fn paint(
        &self,
        target: &mut PixelBuffer,
        blurred: Option<&PixelBuffer>,
        config: &BlurConfig,
    ) {
        self.painter
            .paint(target, blurred, config.overlay_color, config.shape);
    }
}

impl Default for CompositeStage {
    fn default() -> Self {
        Self::new(Box::new(DefaultPainter))
    }
}

impl std::fmt::Debug for CompositeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeStage").finish_non_exhaustive()
    }
}

// 2x2 supersampled coverage of pixel (x, y).
fn shape_coverage(shape: ShapeMode, x: u32, y: u32, w: u32, h: u32) -> u8 {
    match shape {
        ShapeMode::Rectangle => 255,
        ShapeMode::Circle => {
            let (rx, ry) = (f64::from(w) / 2.0, f64::from(h) / 2.0);
            if rx <= 0.0 || ry <= 0.0 {
                return 0;
            }
            let mut inside = 0u16;
            for (ox, oy) in [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)] {
                let dx = (f64::from(x) + ox - rx) / rx;
                let dy = (f64::from(y) + oy - ry) / ry;
                if dx * dx + dy * dy <= 1.0 {
                    inside += 1;
                }
            }
            ((inside * 255) / 4) as u8
        }
    }
}

fn sample_bilinear(src: &PixelBuffer, x: u32, y: u32, w: u32, h: u32) -> [u8; 4] {
    let (sw, sh) = (src.width(), src.height());
    if sw == 0 || sh == 0 {
        return [0; 4];
    }
    let fx = ((f64::from(x) + 0.5) * f64::from(sw) / f64::from(w) - 0.5)
        .clamp(0.0, f64::from(sw - 1));
    let fy = ((f64::from(y) + 0.5) * f64::from(sh) / f64::from(h) - 0.5)
        .clamp(0.0, f64::from(sh - 1));
    let (x0, y0) = (fx.floor() as u32, fy.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(sw - 1), (y0 + 1).min(sh - 1));
    let (tx, ty) = (fx - f64::from(x0), fy - f64::from(y0));

    let p00 = src.pixel(x0, y0).unwrap_or_default();
    let p10 = src.pixel(x1, y0).unwrap_or_default();
    let p01 = src.pixel(x0, y1).unwrap_or_default();
    let p11 = src.pixel(x1, y1).unwrap_or_default();

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00[c]) * (1.0 - tx) + f64::from(p10[c]) * tx;
        let bottom = f64::from(p01[c]) * (1.0 - tx) + f64::from(p11[c]) * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
