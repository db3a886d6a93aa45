//! Blur backends: the capability contract, the concrete kernels and the process-wide probe.

pub(crate) mod box_blur;
pub(crate) mod gaussian;
pub(crate) mod noop;
pub(crate) mod probe;

use crate::{
    foundation::core::PixelSize,
    foundation::error::{BlurError, BlurResult},
    render::buffer::PixelBuffer,
};

/// Largest radius, in buffer pixels, any shipped kernel accepts.
///
/// Callers clamp to [`BlurBackend::max_radius`] before `prepare`; passing a larger radius is a
/// caller bug.
pub const MAX_BLUR_RADIUS: f32 = 25.0;

/// Lowest platform version on which the native Gaussian tier is considered stable.
pub const GAUSSIAN_MIN_PLATFORM_VERSION: u32 = 17;

/// Shape of the buffers a backend must bind working memory for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferDesc {
    /// Buffer dimensions.
    pub size: PixelSize,
}

impl BufferDesc {
    /// Describe an RGBA8 premultiplied buffer of `width x height`.
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            size: PixelSize::new(width, height),
        }
    }

    /// Byte length of one buffer with this shape.
    pub fn byte_len(self) -> BlurResult<usize> {
        self.size
            .rgba8_len()
            .ok_or_else(|| BlurError::allocation("buffer size overflow"))
    }
}

fn default_platform_version() -> u32 {
    34
}

fn default_debug() -> bool {
    cfg!(debug_assertions)
}

fn default_density() -> f32 {
    1.0
}

/// Properties of the host process the widget runs in.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostContext {
    /// Platform API level, used to gate backend tiers.
    #[serde(default = "default_platform_version")]
    pub platform_version: u32,
    /// Diagnostic build: backend initialization errors are surfaced instead of swallowed.
    #[serde(default = "default_debug")]
    pub debug: bool,
    /// Logical units to pixels.
    #[serde(default = "default_density")]
    pub density: f32,
}

impl Default for HostContext {
    fn default() -> Self {
        Self {
            platform_version: default_platform_version(),
            debug: default_debug(),
            density: default_density(),
        }
    }
}

impl HostContext {
    /// Reject a density that is not a finite value `> 0`.
    pub fn validate(&self) -> BlurResult<()> {
        if !self.density.is_finite() || self.density <= 0.0 {
            return Err(BlurError::validation(format!(
                "host density must be a finite value > 0, got {}",
                self.density
            )));
        }
        Ok(())
    }
}

/// Concrete backend kinds, in probe priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Separable fixed-point Gaussian on a shared worker pool.
    Gaussian,
    /// The same Gaussian on the calling thread.
    SerialGaussian,
    /// Three successive box passes approximating a Gaussian.
    BoxBlur,
    /// Copy-through; always usable, visually inert.
    Noop,
}

impl BackendKind {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::SerialGaussian => "serial_gaussian",
            Self::BoxBlur => "box_blur",
            Self::Noop => "noop",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blur kernel execution capability.
///
/// The pipeline drives one instance per widget: `prepare` whenever the buffer shape or radius
/// changes, `blur` once per frame, `release` on teardown.
pub trait BlurBackend {
    /// Which kind this instance is.
    fn kind(&self) -> BackendKind;

    /// Largest radius this backend accepts.
    fn max_radius(&self) -> f32 {
        MAX_BLUR_RADIUS
    }

    /// Bind working memory for buffers shaped like `desc` and set the blur radius.
    ///
    /// Returns `Ok(false)` when the backend is unusable here. Initialization errors are only
    /// returned as `Err` when `host.debug` is set.
    fn prepare(&mut self, host: &HostContext, desc: BufferDesc, radius: f32) -> BlurResult<bool>;

    /// Blur `input` into `output`. Both must match the prepared shape.
    fn blur(&mut self, input: &PixelBuffer, output: &mut PixelBuffer) -> BlurResult<()>;

    /// Free all backend-side resources. Idempotent.
    fn release(&mut self);
}

/// Map an initialization failure to "unusable", unless the host is a diagnostic build.
pub(crate) fn degrade(host: &HostContext, kind: BackendKind, err: BlurError) -> BlurResult<bool> {
    if host.debug {
        return Err(err);
    }
    tracing::warn!(backend = %kind, error = %err, "blur backend unusable");
    Ok(false)
}

pub(crate) fn check_radius(radius: f32, max: f32) -> BlurResult<()> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(BlurError::validation(format!(
            "blur radius must be > 0, got {radius}"
        )));
    }
    if radius > max {
        return Err(BlurError::validation(format!(
            "blur radius {radius} exceeds backend maximum {max}"
        )));
    }
    Ok(())
}

pub(crate) fn check_shapes(
    prepared: Option<BufferDesc>,
    input: &PixelBuffer,
    output: &PixelBuffer,
) -> BlurResult<BufferDesc> {
    let desc = prepared.ok_or_else(|| BlurError::backend("blur called before prepare"))?;
    if input.size() != desc.size || output.size() != desc.size {
        return Err(BlurError::backend(format!(
            "blur buffers {:?}/{:?} do not match prepared shape {:?}",
            input.size(),
            output.size(),
            desc.size
        )));
    }
    Ok(desc)
}

/// Gaussian sigma for a radius, matching the usual intrinsic-blur convention.
pub(crate) fn sigma_for_radius(radius: f32) -> f32 {
    0.4 * radius + 0.6
}

pub use box_blur::BoxBlurBackend;
pub use gaussian::{GaussianBackend, GaussianOpts, SerialGaussianBackend};
pub use noop::NoopBackend;
pub use probe::{BackendProbe, Candidate, default_candidates};
