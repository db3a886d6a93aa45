//! A flat display-list host: solid rectangles and blur panes, enough to drive [`BlurView`]s
//! end to end without a real view tree.

use std::path::Path;
use std::sync::Arc;

use crate::{
    backend::HostContext,
    config::BlurConfig,
    foundation::core::{Affine, Color, PixelSize, Point, Rect},
    foundation::error::{BlurError, BlurResult},
    render::buffer::{PixelBuffer, clear_to},
    render::capture::{
        CaptureCanvas, CaptureGeometry, CaptureSource, DrawDecision, DrawGate, DrawOutcome,
    },
    runtime::BlurRuntime,
    view::BlurView,
};

/// Serialized scene.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDoc {
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
    /// Root background fill.
    #[serde(default)]
    pub background: Option<Color>,
    /// Host properties shared by every pane.
    #[serde(default)]
    pub host: HostContext,
    /// Layers, bottom to top.
    pub layers: Vec<LayerDoc>,
}

/// One serialized layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum LayerDoc {
    /// Solid rectangle in window coordinates.
    Rect {
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
        /// Fill color.
        color: Color,
    },
    /// A blur pane placed at integer window coordinates.
    BlurPane {
        /// Left edge.
        x: u32,
        /// Top edge.
        y: u32,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Pane configuration.
        #[serde(default)]
        config: BlurConfig,
    },
}

impl SceneDoc {
    /// Parse from JSON.
    pub fn from_json_str(s: &str) -> BlurResult<Self> {
        serde_json::from_str(s).map_err(|e| BlurError::serde(e.to_string()))
    }

    /// Read a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> BlurResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            BlurError::Other(anyhow::anyhow!(
                "failed to read scene '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&s)
    }
}

/// A captured layer.
#[derive(Clone, Debug)]
pub enum Layer {
    /// Solid rectangle in window coordinates.
    Rect {
        /// Bounds.
        rect: Rect,
        /// Fill color.
        color: Color,
    },
    /// Placeholder for a blur pane; drawing consults its gate.
    Blur {
        /// Index into [`Stage::panes`].
        pane: usize,
        /// The pane's draw gate.
        gate: DrawGate,
    },
}

/// Layer list usable as a [`CaptureSource`].
#[derive(Clone, Debug, Default)]
pub struct Scene {
    /// Root background fill.
    pub background: Option<Color>,
    /// Layers, bottom to top.
    pub layers: Vec<Layer>,
}

impl CaptureSource for Scene {
    fn draw(&self, canvas: &mut CaptureCanvas<'_>) -> DrawOutcome {
        if let Some(bg) = self.background {
            let inv = canvas.transform().inverse();
            let size = canvas.size();
            let device = Rect::new(0.0, 0.0, f64::from(size.width), f64::from(size.height));
            canvas.fill_rect(inv.transform_rect_bbox(device), bg);
        }
        for layer in &self.layers {
            match layer {
                Layer::Rect { rect, color } => canvas.fill_rect(*rect, *color),
                Layer::Blur { gate, .. } => {
                    if gate.decide() == DrawDecision::Stop {
                        return DrawOutcome::Stopped;
                    }
                }
            }
        }
        DrawOutcome::Completed
    }

    fn background_fill(&self) -> Option<Color> {
        self.background
    }
}

/// A blur view and where it sits.
#[derive(Debug)]
pub struct Pane {
    /// The widget.
    pub view: BlurView,
    /// Top-left corner in window pixels.
    pub origin: (u32, u32),
    /// Size in pixels.
    pub size: PixelSize,
}

impl Pane {
    fn geometry(&self) -> CaptureGeometry {
        CaptureGeometry::new(
            Point::new(f64::from(self.origin.0), f64::from(self.origin.1)),
            self.size,
        )
    }
}

/// Scene plus live panes: runs pre-draw for every pane and renders whole frames.
#[derive(Debug)]
pub struct Stage {
    size: PixelSize,
    scene: Scene,
    panes: Vec<Pane>,
}

impl Stage {
    /// Build views for every pane in `doc` and attach them.
    pub fn from_doc(doc: &SceneDoc, runtime: Arc<BlurRuntime>) -> BlurResult<Self> {
        if doc.width == 0 || doc.height == 0 {
            return Err(BlurError::validation("scene dimensions must be non-zero"));
        }
        let mut scene = Scene {
            background: doc.background,
            layers: Vec::with_capacity(doc.layers.len()),
        };
        let mut panes = Vec::new();
        for layer in &doc.layers {
            match layer {
                LayerDoc::Rect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => scene.layers.push(Layer::Rect {
                    rect: Rect::new(*x, *y, x + width, y + height),
                    color: *color,
                }),
                LayerDoc::BlurPane {
                    x,
                    y,
                    width,
                    height,
                    config,
                } => {
                    let fits = |pos: u32, len: u32, limit: u32| {
                        pos.checked_add(len).is_some_and(|end| end <= limit)
                    };
                    if !fits(*x, *width, doc.width) || !fits(*y, *height, doc.height) {
                        return Err(BlurError::validation(format!(
                            "blur pane {width}x{height} at ({x}, {y}) exceeds the {}x{} window",
                            doc.width, doc.height
                        )));
                    }
                    let mut view = BlurView::new(runtime.clone(), doc.host, *config)?;
                    view.on_attach()?;
                    scene.layers.push(Layer::Blur {
                        pane: panes.len(),
                        gate: view.gate(),
                    });
                    panes.push(Pane {
                        view,
                        origin: (*x, *y),
                        size: PixelSize::new(*width, *height),
                    });
                }
            }
        }
        Ok(Self {
            size: PixelSize::new(doc.width, doc.height),
            scene,
            panes,
        })
    }

    /// Window size.
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Captured content.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Live panes, in layer order.
    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    /// Run every pane's pre-draw hook, then composite one frame.
    pub fn render_frame(&mut self) -> BlurResult<PixelBuffer> {
        for pane in &mut self.panes {
            let geometry = pane.geometry();
            pane.view.on_pre_draw(geometry, &self.scene)?;
        }

        let mut frame = PixelBuffer::try_new(self.size.width, self.size.height)?;
        clear_to(&mut frame, self.scene.background.unwrap_or(Color::TRANSPARENT));
        for layer in &self.scene.layers {
            match layer {
                Layer::Rect { rect, color } => {
                    CaptureCanvas::new(&mut frame, Affine::IDENTITY).fill_rect(*rect, *color);
                }
                Layer::Blur { pane, .. } => {
                    let Some(pane) = self.panes.get(*pane) else {
                        continue;
                    };
                    let mut local = copy_region(&frame, pane.origin, pane.size)?;
                    pane.view.draw(&mut local);
                    paste_region(&mut frame, &local, pane.origin);
                }
            }
        }
        Ok(frame)
    }

    /// Detach every pane.
    pub fn detach_all(&mut self) {
        for pane in &mut self.panes {
            if pane.view.is_attached() {
                pane.view.on_detach();
            }
        }
    }
}

fn copy_region(
    src: &PixelBuffer,
    origin: (u32, u32),
    size: PixelSize,
) -> BlurResult<PixelBuffer> {
    let mut out = PixelBuffer::try_new(size.width, size.height)?;
    for y in 0..size.height {
        for x in 0..size.width {
            let (Some(sx), Some(sy)) = (origin.0.checked_add(x), origin.1.checked_add(y)) else {
                continue;
            };
            if let Some(px) = src.pixel(sx, sy) {
                out.put_pixel(x, y, px);
            }
        }
    }
    Ok(out)
}

fn paste_region(dst: &mut PixelBuffer, src: &PixelBuffer, origin: (u32, u32)) {
    for y in 0..src.height() {
        for x in 0..src.width() {
            let (Some(dx), Some(dy)) = (origin.0.checked_add(x), origin.1.checked_add(y)) else {
                continue;
            };
            if dx < dst.width()
                && dy < dst.height()
                && let Some(px) = src.pixel(x, y)
            {
                dst.put_pixel(dx, dy, px);
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/scene.rs"]
mod tests;
