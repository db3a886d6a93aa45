use crate::{
    backend::{BlurBackend, BufferDesc, HostContext},
    config::{BlurConfig, ClearPolicy},
    foundation::core::{Color, PixelSize},
    foundation::error::{BlurError, BlurResult},
    foundation::math::downsampled_len,
    render::buffer::{OffscreenBuffers, OffscreenOpts, PixelBuffer, clear_to},
    render::capture::{CaptureCanvas, CaptureGeometry, CaptureSource, DrawGate, DrawOutcome},
    runtime::BlurRuntime,
};

/// Lifecycle of one widget's offscreen pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// No backend bound, no buffers.
    Uninitialized,
    /// Backend bound to the current buffers and radius.
    Ready,
    /// Radius or downsample factor changed since the backend was last bound.
    Stale,
    /// Torn down by detach or a zero radius; the next `prepare` rebuilds from scratch.
    Released,
}

/// Per-pipeline counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Calls to [`BlurPipeline::prepare`].
    pub prepares: u64,
    /// Successful `BlurBackend::prepare` calls.
    pub backend_binds: u64,
    /// Backend instances created from the probe's choice.
    pub backend_creations: u64,
    /// Completed `run_blur` calls.
    pub blurs: u64,
    /// Capture passes started.
    pub captures: u64,
    /// Capture passes cut short by the stop-draw signal.
    pub aborted_captures: u64,
    /// `prepare` calls that returned not-ready for a recoverable reason.
    pub degraded_frames: u64,
}

/// Naive `radius / downsample`, with the downsample raised instead when that exceeds `max_radius`.
///
/// Returns `(scaled_radius, effective_downsample)`.
pub fn clamp_radius(radius: f32, downsample: f32, max_radius: f32) -> (f32, f32) {
    let naive = radius / downsample;
    if naive > max_radius {
        (max_radius, downsample * naive / max_radius)
    } else {
        (naive, downsample)
    }
}

/// Buffer dimensions for a view of `view` pixels at `downsample`.
pub fn scaled_size(view: PixelSize, downsample: f32) -> PixelSize {
    PixelSize::new(
        downsampled_len(view.width, downsample),
        downsampled_len(view.height, downsample),
    )
}

/// Capture, downsample, blur. One instance per widget.
pub struct BlurPipeline {
    state: PipelineState,
    backend: Option<Box<dyn BlurBackend>>,
    bound: bool,
    buffers: OffscreenBuffers,
    has_result: bool,
    dirty: bool,
    scaled_radius: f32,
    effective_downsample: f32,
    stats: PipelineStats,
}

impl BlurPipeline {
    /// Empty pipeline; nothing is allocated until the first `prepare`.
    pub fn new(opts: OffscreenOpts) -> Self {
        Self {
            state: PipelineState::Uninitialized,
            backend: None,
            bound: false,
            buffers: OffscreenBuffers::new(opts),
            has_result: false,
            dirty: true,
            scaled_radius: 0.0,
            effective_downsample: 1.0,
            stats: PipelineStats::default(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Counters since creation.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Offscreen buffer manager.
    pub fn buffers(&self) -> &OffscreenBuffers {
        &self.buffers
    }

    /// Radius last handed to the backend, in buffer pixels.
    pub fn scaled_radius(&self) -> f32 {
        self.scaled_radius
    }

    /// Downsample factor actually in use after radius clamping.
    pub fn effective_downsample(&self) -> f32 {
        self.effective_downsample
    }

    /// Kind of the bound backend instance, if any.
    pub fn backend_kind(&self) -> Option<crate::backend::BackendKind> {
        self.backend.as_ref().map(|b| b.kind())
    }

    /// `true` when radius-dependent state must be re-applied.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Blurred image from the last `run_blur`, if still valid.
    pub fn result(&self) -> Option<&PixelBuffer> {
        if !self.has_result {
            return None;
        }
        self.buffers.pair().map(|p| &p.result)
    }

    /// Radius-dependent configuration changed.
    pub fn mark_stale(&mut self) {
        self.dirty = true;
        if self.state == PipelineState::Ready {
            self.state = PipelineState::Stale;
        }
    }

    /// Downsample factor changed: radius must be recomputed and buffers rebuilt.
    pub fn downsample_changed(&mut self) {
        self.mark_stale();
        self.buffers.release();
        self.bound = false;
        self.has_result = false;
    }

    /// Bring backend and buffers in line with `config` for a view of `view` pixels.
    ///
    /// Returns `Ok(false)` when blurring is disabled (zero radius) or unavailable this frame.
    /// Errors only escape from backend initialization in diagnostic builds.
    #[tracing::instrument(
        level = "debug",
        skip(self, runtime, config),
        fields(state = ?self.state)
    )]
    pub fn prepare(
        &mut self,
        runtime: &BlurRuntime,
        host: &HostContext,
        config: &BlurConfig,
        view: PixelSize,
    ) -> BlurResult<bool> {
        self.stats.prepares = self.stats.prepares.saturating_add(1);

        let radius_px = config.radius * host.density;
        if radius_px <= 0.0 {
            if self.state != PipelineState::Released {
                tracing::debug!("blur radius is zero; releasing pipeline");
                self.release();
            }
            return Ok(false);
        }

        let fresh = self.backend.is_none();
        if fresh {
            self.backend = Some(runtime.probe().create(host));
            self.bound = false;
            self.stats.backend_creations = self.stats.backend_creations.saturating_add(1);
        }
        let rebind_radius = self.dirty || fresh;
        if rebind_radius {
            let max_radius = self
                .backend
                .as_ref()
                .map_or(crate::backend::MAX_BLUR_RADIUS, |b| b.max_radius());
            let (radius, downsample) =
                clamp_radius(radius_px, config.downsample_factor, max_radius);
            if downsample != self.effective_downsample {
                tracing::debug!(
                    requested = config.downsample_factor,
                    effective = downsample,
                    "downsample raised to keep radius within backend limit"
                );
            }
            self.scaled_radius = radius;
            self.effective_downsample = downsample;
        }

        let target = scaled_size(view, self.effective_downsample);
        let resized = self.buffers.size() != Some(target);
        if resized {
            self.has_result = false;
            if !self.buffers.ensure_sized(target.width, target.height) {
                self.stats.degraded_frames = self.stats.degraded_frames.saturating_add(1);
                self.teardown(PipelineState::Uninitialized);
                return Ok(false);
            }
        }

        if resized || rebind_radius || !self.bound {
            let desc = BufferDesc { size: target };
            let outcome = match self.backend.as_mut() {
                Some(backend) => backend.prepare(host, desc, self.scaled_radius),
                None => Err(BlurError::backend("no backend instance")),
            };
            match outcome {
                Ok(true) => {
                    self.bound = true;
                    self.stats.backend_binds = self.stats.backend_binds.saturating_add(1);
                }
                Ok(false) => {
                    self.stats.degraded_frames = self.stats.degraded_frames.saturating_add(1);
                    self.teardown(PipelineState::Uninitialized);
                    return Ok(false);
                }
                Err(e) => {
                    self.teardown(PipelineState::Uninitialized);
                    return Err(e);
                }
            }
        }

        self.dirty = false;
        self.state = PipelineState::Ready;
        Ok(true)
    }

    /// Render `source` into the capture buffer under `gate`'s re-entrancy guard.
    ///
    /// A [`DrawOutcome::Stopped`] traversal is absorbed here: the capture keeps whatever was
    /// drawn before the stop.
    pub fn capture_frame(
        &mut self,
        gate: &DrawGate,
        config: &BlurConfig,
        geometry: CaptureGeometry,
        source: &dyn CaptureSource,
    ) -> BlurResult<DrawOutcome> {
        if self.state != PipelineState::Ready {
            return Err(BlurError::capture(format!(
                "capture requires a ready pipeline, state is {:?}",
                self.state
            )));
        }
        let pair = self
            .buffers
            .pair_mut()
            .ok_or_else(|| BlurError::capture("capture buffers missing"))?;

        let clear = match config.clear_policy {
            ClearPolicy::OverlayOpaque => config.overlay_color.opaque(),
            ClearPolicy::RootBackground => source.background_fill().unwrap_or(Color::TRANSPARENT),
            ClearPolicy::Transparent => Color::TRANSPARENT,
        };
        clear_to(&mut pair.capture, clear);

        let transform = geometry.capture_transform(pair.capture.size());
        let outcome = {
            let _scope = gate.begin_capture();
            let mut canvas = CaptureCanvas::new(&mut pair.capture, transform);
            source.draw(&mut canvas)
        };

        self.stats.captures = self.stats.captures.saturating_add(1);
        if outcome.is_stopped() {
            self.stats.aborted_captures = self.stats.aborted_captures.saturating_add(1);
        }
        Ok(outcome)
    }

    /// Blur the capture buffer into the result buffer.
    pub fn run_blur(&mut self) -> BlurResult<()> {
        let pair = self
            .buffers
            .pair_mut()
            .ok_or_else(|| BlurError::backend("run_blur without buffers"))?;
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| BlurError::backend("run_blur without a backend"))?;
        backend.blur(&pair.capture, &mut pair.result)?;
        self.has_result = true;
        self.stats.blurs = self.stats.blurs.saturating_add(1);
        Ok(())
    }

    /// Free buffers and backend resources. Idempotent.
    pub fn release(&mut self) {
        self.teardown(PipelineState::Released);
    }

    fn teardown(&mut self, next: PipelineState) {
        self.buffers.release();
        if let Some(mut backend) = self.backend.take() {
            backend.release();
        }
        self.bound = false;
        self.has_result = false;
        self.dirty = true;
        self.state = next;
    }
}

impl std::fmt::Debug for BlurPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlurPipeline")
            .field("state", &self.state)
            .field("backend", &self.backend_kind())
            .field("buffers", &self.buffers.size())
            .field("dirty", &self.dirty)
            .field("scaled_radius", &self.scaled_radius)
            .field("effective_downsample", &self.effective_downsample)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
