//! Realtime frosted-glass blur for UI panes.
//!
//! Every frame, a [`BlurView`] captures the content behind it into a downsampled offscreen
//! buffer, blurs it with the best backend the process supports, and paints the result under a
//! translucent overlay:
//!
//! - Create a shared [`BlurRuntime`] (or use [`BlurRuntime::global`])
//! - Build a [`BlurView`] per pane and call [`BlurView::on_pre_draw`] before each frame
//! - Paint it with [`BlurView::draw`]; wherever the pane shows up inside captured content,
//!   consult its [`DrawGate`] instead
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Blur backends and the process-wide probe.
pub mod backend;
pub(crate) mod config;
pub(crate) mod render;
pub(crate) mod runtime;
/// Flat display-list host used by the CLI and integration tests.
pub mod scene;
pub(crate) mod view;

pub use crate::foundation::core::{
    Affine, Color, PixelSize, Point, Rect, Rgba8Premul, ShapeMode, Vec2,
};
pub use crate::foundation::error::{BlurError, BlurResult};

pub use crate::backend::{
    BackendKind, BackendProbe, BlurBackend, BufferDesc, Candidate, HostContext, MAX_BLUR_RADIUS,
};
pub use crate::config::{BlurConfig, ClearPolicy};
pub use crate::render::buffer::{
    BufferPair, OffscreenBuffers, OffscreenOpts, OffscreenStats, PixelBuffer,
};
pub use crate::render::capture::{
    CaptureCanvas, CaptureGeometry, CaptureSource, DrawDecision, DrawGate, DrawOutcome,
};
pub use crate::render::composite::{BlurPainter, CompositeStage, DefaultPainter};
pub use crate::render::pipeline::{
    BlurPipeline, PipelineState, PipelineStats, clamp_radius, scaled_size,
};
pub use crate::runtime::BlurRuntime;
pub use crate::scene::{Scene, SceneDoc, Stage};
pub use crate::view::BlurView;
