use std::path::Path;

use crate::foundation::core::{Color, ShapeMode};
use crate::foundation::error::{BlurError, BlurResult};

/// What the capture buffer is cleared to before the background is drawn into it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearPolicy {
    /// The overlay color with its alpha forced opaque.
    #[default]
    OverlayOpaque,
    /// The capture root's background fill, or transparent when it has none.
    RootBackground,
    /// Fully transparent.
    Transparent,
}

/// Widget configuration. Radius is in logical units, scaled by [`crate::HostContext::density`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlurConfig {
    /// Blur radius; `0` disables blurring.
    pub radius: f32,
    /// Capture resolution divisor, `>= 1`.
    pub downsample_factor: f32,
    /// Tint painted over the blurred image.
    pub overlay_color: Color,
    /// Outline of the painted pane.
    pub shape: ShapeMode,
    /// Capture buffer clear color.
    pub clear_policy: ClearPolicy,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            radius: 10.0,
            downsample_factor: 4.0,
            overlay_color: Color::default(),
            shape: ShapeMode::Rectangle,
            clear_policy: ClearPolicy::OverlayOpaque,
        }
    }
}

impl BlurConfig {
    /// Parse from a JSON string and validate.
    pub fn from_json_str(s: &str) -> BlurResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| BlurError::serde(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a JSON file and validate.
    pub fn from_path(path: impl AsRef<Path>) -> BlurResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            BlurError::Other(anyhow::anyhow!(
                "failed to read blur config '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&s)
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> BlurResult<()> {
        validate_radius(self.radius)?;
        validate_downsample_factor(self.downsample_factor)
    }
}

pub(crate) fn validate_radius(radius: f32) -> BlurResult<()> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(BlurError::validation(format!(
            "blur radius must be a finite value >= 0, got {radius}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_downsample_factor(factor: f32) -> BlurResult<()> {
    if !factor.is_finite() || factor < 1.0 {
        return Err(BlurError::validation(format!(
            "downsample factor must be a finite value >= 1, got {factor}"
        )));
    }
    Ok(())
}
