use std::sync::Arc;

use crate::{
    backend::HostContext,
    config::{BlurConfig, ClearPolicy, validate_downsample_factor, validate_radius},
    foundation::core::{Color, ShapeMode},
    foundation::error::{BlurError, BlurResult},
    render::buffer::{OffscreenOpts, PixelBuffer},
    render::capture::{CaptureGeometry, CaptureSource, DrawDecision, DrawGate, DrawOutcome},
    render::composite::{BlurPainter, CompositeStage},
    render::pipeline::BlurPipeline,
    runtime::BlurRuntime,
};

/// A live frosted-glass pane.
///
/// Hosts drive it with [`BlurView::on_attach`] / [`BlurView::on_detach`], call
/// [`BlurView::on_pre_draw`] before every frame, and [`BlurView::draw`] during their own draw
/// pass. Wherever the pane appears inside captured content, the host consults
/// [`BlurView::gate`] instead of drawing it.
#[derive(Debug)]
pub struct BlurView {
    runtime: Arc<BlurRuntime>,
    host: HostContext,
    config: BlurConfig,
    pipeline: BlurPipeline,
    composite: CompositeStage,
    gate: DrawGate,
    attached: bool,
    visible: bool,
    repaint_requested: bool,
}

impl BlurView {
    /// Create a detached view. Fails if `config` is out of range.
    pub fn new(
        runtime: Arc<BlurRuntime>,
        host: HostContext,
        config: BlurConfig,
    ) -> BlurResult<Self> {
        host.validate()?;
        config.validate()?;
        Ok(Self {
            gate: DrawGate::new(runtime.clone()),
            runtime,
            host,
            config,
            pipeline: BlurPipeline::new(OffscreenOpts::default()),
            composite: CompositeStage::default(),
            attached: false,
            visible: true,
            repaint_requested: false,
        })
    }

    /// Replace the painter used by [`BlurView::draw`].
    pub fn with_painter(mut self, painter: Box<dyn BlurPainter>) -> Self {
        self.composite = CompositeStage::new(painter);
        self
    }

    /// Replace offscreen allocation limits. Releases any existing buffers.
    pub fn with_offscreen_opts(mut self, opts: OffscreenOpts) -> Self {
        self.pipeline.release();
        self.pipeline = BlurPipeline::new(opts);
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &BlurConfig {
        &self.config
    }

    /// The offscreen pipeline, for inspection.
    pub fn pipeline(&self) -> &BlurPipeline {
        &self.pipeline
    }

    /// Handle the host consults when it meets this view inside captured content.
    pub fn gate(&self) -> DrawGate {
        self.gate.clone()
    }

    /// `true` between `on_attach` and `on_detach`.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Return and clear the pending repaint request.
    pub fn take_repaint_request(&mut self) -> bool {
        std::mem::take(&mut self.repaint_requested)
    }

    /// Set the blur radius in logical units; `0` disables blurring.
    pub fn set_blur_radius(&mut self, radius: f32) -> BlurResult<()> {
        validate_radius(radius)?;
        if self.config.radius != radius {
            self.config.radius = radius;
            self.pipeline.mark_stale();
            self.repaint_requested = true;
        }
        Ok(())
    }

    /// Set the downsample factor (`>= 1`).
    pub fn set_downsample_factor(&mut self, factor: f32) -> BlurResult<()> {
        validate_downsample_factor(factor)?;
        if self.config.downsample_factor != factor {
            self.config.downsample_factor = factor;
            self.pipeline.downsample_changed();
            self.repaint_requested = true;
        }
        Ok(())
    }

    /// Set the overlay tint.
    pub fn set_overlay_color(&mut self, color: Color) {
        if self.config.overlay_color != color {
            self.config.overlay_color = color;
            self.repaint_requested = true;
        }
    }

    /// Set the painted outline.
    pub fn set_shape_mode(&mut self, shape: ShapeMode) {
        if self.config.shape != shape {
            self.config.shape = shape;
            self.repaint_requested = true;
        }
    }

    /// Set what the capture buffer is cleared to.
    pub fn set_clear_policy(&mut self, policy: ClearPolicy) {
        if self.config.clear_policy != policy {
            self.config.clear_policy = policy;
            self.repaint_requested = true;
        }
    }

    /// Hidden views skip all pre-draw work.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.repaint_requested = true;
        }
    }

    /// Start receiving pre-draw notifications.
    pub fn on_attach(&mut self) -> BlurResult<()> {
        if self.attached {
            return Err(BlurError::validation("blur view is already attached"));
        }
        self.attached = true;
        tracing::debug!("blur view attached");
        Ok(())
    }

    /// Stop receiving notifications and free every pipeline resource.
    pub fn on_detach(&mut self) {
        self.attached = false;
        self.pipeline.release();
        tracing::debug!("blur view detached");
    }

    /// Pre-draw hook: prepare, capture `source` behind the view, blur.
    ///
    /// Never vetoes the frame. When blurring is unavailable the view simply draws its tint.
    /// Errors are returned only for diagnostic hosts.
    pub fn on_pre_draw(
        &mut self,
        geometry: CaptureGeometry,
        source: &dyn CaptureSource,
    ) -> BlurResult<()> {
        if !self.attached || !self.visible {
            return Ok(());
        }
        match self.run_frame(geometry, source) {
            Ok(()) => Ok(()),
            Err(e) if self.host.debug => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "blur frame skipped");
                Ok(())
            }
        }
    }

    fn run_frame(
        &mut self,
        geometry: CaptureGeometry,
        source: &dyn CaptureSource,
    ) -> BlurResult<()> {
        if !self
            .pipeline
            .prepare(&self.runtime, &self.host, &self.config, geometry.view_size)?
        {
            return Ok(());
        }
        self.pipeline
            .capture_frame(&self.gate, &self.config, geometry, source)?;
        self.pipeline.run_blur()
    }

    /// Draw pass. Paints the last blurred image (if any) and the overlay into `target`, which
    /// covers the view bounds.
    pub fn draw(&self, target: &mut PixelBuffer) -> DrawOutcome {
        match self.gate.decide() {
            DrawDecision::Stop => DrawOutcome::Stopped,
            DrawDecision::Skip => DrawOutcome::Completed,
            DrawDecision::Draw => {
                self.composite
                    .paint(target, self.pipeline.result(), &self.config);
                DrawOutcome::Completed
            }
        }
    }
}

impl Drop for BlurView {
    fn drop(&mut self) {
        self.pipeline.release();
    }
}

#[cfg(test)]
#[path = "../tests/unit/view.rs"]
mod tests;
