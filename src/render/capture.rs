use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    foundation::core::{Affine, Color, PixelSize, Point, Rect, Vec2},
    foundation::math::over_px,
    render::buffer::PixelBuffer,
    runtime::{BlurRuntime, RenderingScope},
};

/// Result of drawing part of a view tree into a capture canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    /// The traversal finished.
    Completed,
    /// A blur widget being captured was reached; the traversal stopped there.
    Stopped,
}

impl DrawOutcome {
    /// `true` for [`DrawOutcome::Stopped`].
    pub fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// What a blur widget's draw call should do right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawDecision {
    /// This widget is the one capturing: abort the traversal.
    Stop,
    /// Another widget is capturing: draw nothing and continue.
    Skip,
    /// Normal on-screen draw.
    Draw,
}

/// Window-space placement used to align the capture with the widget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureGeometry {
    /// Widget origin in window coordinates.
    pub view_origin: Point,
    /// Widget size in pixels.
    pub view_size: PixelSize,
    /// Origin of the captured root in window coordinates.
    pub root_origin: Point,
}

impl CaptureGeometry {
    /// Geometry for a widget at `view_origin` over a root at the window origin.
    pub fn new(view_origin: Point, view_size: PixelSize) -> Self {
        Self {
            view_origin,
            view_size,
            root_origin: Point::ORIGIN,
        }
    }

    /// Root-space to capture-buffer transform: translate by `root - view`, then scale down.
    pub(crate) fn capture_transform(&self, buffer: PixelSize) -> Affine {
        let sx = f64::from(buffer.width) / f64::from(self.view_size.width.max(1));
        let sy = f64::from(buffer.height) / f64::from(self.view_size.height.max(1));
        let offset: Vec2 = self.root_origin - self.view_origin;
        Affine::scale_non_uniform(sx, sy) * Affine::translate(offset)
    }
}

/// Drawable content behind the widget.
pub trait CaptureSource {
    /// Draw into `canvas`. Blur widgets met on the way consult their [`DrawGate`] and return
    /// [`DrawOutcome::Stopped`] to abort.
    fn draw(&self, canvas: &mut CaptureCanvas<'_>) -> DrawOutcome;

    /// Solid background of the captured root, if it has one.
    fn background_fill(&self) -> Option<Color> {
        None
    }
}

/// Minimal 2D target the capture pass renders into.
pub struct CaptureCanvas<'a> {
    target: &'a mut PixelBuffer,
    transform: Affine,
}

impl<'a> CaptureCanvas<'a> {
    /// Canvas over `target` with an initial transform.
    pub fn new(target: &'a mut PixelBuffer, transform: Affine) -> Self {
        Self { target, transform }
    }

    /// Target dimensions.
    pub fn size(&self) -> PixelSize {
        self.target.size()
    }

    /// Current user-to-device transform.
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Pre-translate in user space.
    pub fn translate(&mut self, by: Vec2) {
        self.transform = self.transform * Affine::translate(by);
    }

    /// Source-over fill of an axis-aligned rectangle.
    ///
    /// Pixels are covered when their center lies inside the transformed bounds.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let device = self.transform.transform_rect_bbox(rect);
        let size = self.target.size();
        let Some((x0, x1)) = covered_span(device.x0, device.x1, size.width) else {
            return;
        };
        let Some((y0, y1)) = covered_span(device.y0, device.y1, size.height) else {
            return;
        };
        let src = color.premultiplied().to_array();
        for y in y0..y1 {
            for x in x0..x1 {
                if let Some(dst) = self.target.pixel(x, y) {
                    self.target.put_pixel(x, y, over_px(dst, src));
                }
            }
        }
    }
}

fn covered_span(lo: f64, hi: f64, len: u32) -> Option<(u32, u32)> {
    let start = (lo - 0.5).ceil().max(0.0);
    let end = (hi - 0.5).ceil().min(f64::from(len));
    if start.is_nan() || end.is_nan() || start >= end {
        return None;
    }
    Some((start as u32, end as u32))
}

/// A blur widget's handle for deciding how to react to a draw call.
///
/// Hosts keep a clone wherever the widget sits in their view tree and ask it before drawing
/// the widget; during the widget's own capture pass it answers [`DrawDecision::Stop`].
#[derive(Clone, Debug)]
pub struct DrawGate {
    capturing: Arc<AtomicBool>,
    runtime: Arc<BlurRuntime>,
}

impl DrawGate {
    pub(crate) fn new(runtime: Arc<BlurRuntime>) -> Self {
        Self {
            capturing: Arc::new(AtomicBool::new(false)),
            runtime,
        }
    }

    /// Decide for the current moment.
    pub fn decide(&self) -> DrawDecision {
        if self.is_capturing() {
            DrawDecision::Stop
        } else if self.runtime.rendering_count() > 0 {
            DrawDecision::Skip
        } else {
            DrawDecision::Draw
        }
    }

    /// `true` while this widget's capture pass is on the stack.
    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::Acquire)
    }

    pub(crate) fn begin_capture(&self) -> CaptureScope<'_> {
        self.capturing.store(true, Ordering::Release);
        CaptureScope {
            gate: self,
            _rendering: self.runtime.enter_rendering(),
        }
    }
}

/// Clears the capturing flag when dropped.
pub(crate) struct CaptureScope<'a> {
    gate: &'a DrawGate,
    _rendering: RenderingScope<'a>,
}

impl Drop for CaptureScope<'_> {
    fn drop(&mut self) {
        self.gate.capturing.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/capture.rs"]
mod tests;
