use crate::foundation::core::{Color, PixelSize, Rgba8Premul};
use crate::foundation::error::{BlurError, BlurResult};

/// Allocate `len` zeroed bytes without aborting on exhaustion.
pub(crate) fn try_alloc_bytes(len: usize) -> BlurResult<Vec<u8>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| BlurError::allocation(format!("failed to reserve {len} bytes: {e}")))?;
    v.resize(len, 0);
    Ok(v)
}

/// Owned premultiplied RGBA8 pixels, tightly packed, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    size: PixelSize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a transparent buffer.
    pub fn try_new(width: u32, height: u32) -> BlurResult<Self> {
        let size = PixelSize::new(width, height);
        let len = size
            .rgba8_len()
            .ok_or_else(|| BlurError::allocation("pixel buffer size overflow"))?;
        Ok(Self {
            size,
            data: try_alloc_bytes(len)?,
        })
    }

    /// Wrap existing premultiplied bytes.
    pub fn from_premul_bytes(width: u32, height: u32, data: Vec<u8>) -> BlurResult<Self> {
        let size = PixelSize::new(width, height);
        if size.rgba8_len() != Some(data.len()) {
            return Err(BlurError::validation(
                "pixel data length must equal width*height*4",
            ));
        }
        Ok(Self { size, data })
    }

    /// Dimensions.
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes, mutable.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Overwrite every pixel with `color` (no blending).
    pub fn fill(&mut self, color: Rgba8Premul) {
        let px = color.to_array();
        for d in self.data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
    }

    /// Premultiplied pixel at `(x, y)`, or `None` out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let i = ((y as usize) * (self.size.width as usize) + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    pub(crate) fn put_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let i = ((y as usize) * (self.size.width as usize) + x as usize) * 4;
        self.data[i..i + 4].copy_from_slice(&px);
    }

    /// Straight-alpha copy, for encoding.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let mut out = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            let a = px[3];
            if a == 0 {
                out.extend_from_slice(&[0, 0, 0, 0]);
                continue;
            }
            let unpremul =
                |c: u8| ((u16::from(c) * 255 + u16::from(a) / 2) / u16::from(a)).min(255) as u8;
            out.extend_from_slice(&[unpremul(px[0]), unpremul(px[1]), unpremul(px[2]), a]);
        }
        image::RgbaImage::from_raw(self.size.width, self.size.height, out)
            .unwrap_or_else(|| image::RgbaImage::new(self.size.width, self.size.height))
    }
}

/// Fill a buffer with a straight-alpha color.
pub(crate) fn clear_to(buf: &mut PixelBuffer, color: Color) {
    buf.fill(color.premultiplied());
}

/// Same-size capture and result buffers.
#[derive(Debug)]
pub struct BufferPair {
    /// Downsampled snapshot of the content behind the widget.
    pub capture: PixelBuffer,
    /// Blurred copy of `capture`.
    pub result: PixelBuffer,
}

impl BufferPair {
    /// Shared dimensions of both buffers.
    pub fn size(&self) -> PixelSize {
        self.capture.size()
    }
}

/// Limits for offscreen allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffscreenOpts {
    /// Largest byte count a single buffer pair may occupy.
    pub max_buffer_bytes: usize,
}

impl Default for OffscreenOpts {
    fn default() -> Self {
        Self {
            max_buffer_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Allocation counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OffscreenStats {
    /// Buffer pairs successfully allocated.
    pub allocations: u64,
    /// Bytes allocated across all pairs.
    pub allocated_bytes: u64,
    /// Pairs dropped by `release` or by a resize.
    pub releases: u64,
    /// Allocation attempts that failed.
    pub failures: u64,
}

/// Keeps exactly one capture/result pair sized to the current target.
#[derive(Debug, Default)]
pub struct OffscreenBuffers {
    opts: OffscreenOpts,
    pair: Option<BufferPair>,
    stats: OffscreenStats,
}

impl OffscreenBuffers {
    /// Create an empty manager.
    pub fn new(opts: OffscreenOpts) -> Self {
        Self {
            opts,
            pair: None,
            stats: OffscreenStats::default(),
        }
    }

    /// Counters since creation.
    pub fn stats(&self) -> OffscreenStats {
        self.stats
    }

    /// Current pair, if allocated.
    pub fn pair(&self) -> Option<&BufferPair> {
        self.pair.as_ref()
    }

    pub(crate) fn pair_mut(&mut self) -> Option<&mut BufferPair> {
        self.pair.as_mut()
    }

    /// Current dimensions, if allocated.
    pub fn size(&self) -> Option<PixelSize> {
        self.pair.as_ref().map(BufferPair::size)
    }

    /// Make the pair match `width x height`, reallocating only on change.
    ///
    /// Dimensions of zero are raised to one. Returns `false` when allocation fails; no partial
    /// pair is kept in that case.
    pub fn ensure_sized(&mut self, width: u32, height: u32) -> bool {
        let target = PixelSize::new(width.max(1), height.max(1));
        if self.size() == Some(target) {
            return true;
        }

        self.release();
        match self.allocate(target) {
            Ok(pair) => {
                self.stats.allocations = self.stats.allocations.saturating_add(1);
                self.stats.allocated_bytes = self
                    .stats
                    .allocated_bytes
                    .saturating_add(2 * target.rgba8_len().unwrap_or(0) as u64);
                tracing::debug!(
                    width = target.width,
                    height = target.height,
                    "offscreen buffers allocated"
                );
                self.pair = Some(pair);
                true
            }
            Err(e) => {
                self.stats.failures = self.stats.failures.saturating_add(1);
                tracing::warn!(
                    width = target.width,
                    height = target.height,
                    error = %e,
                    "offscreen allocation failed"
                );
                false
            }
        }
    }

    fn allocate(&self, target: PixelSize) -> BlurResult<BufferPair> {
        let bytes = target
            .rgba8_len()
            .and_then(|v| v.checked_mul(2))
            .ok_or_else(|| BlurError::allocation("buffer pair size overflow"))?;
        if bytes > self.opts.max_buffer_bytes {
            return Err(BlurError::allocation(format!(
                "buffer pair of {bytes} bytes exceeds limit of {}",
                self.opts.max_buffer_bytes
            )));
        }
        let capture = PixelBuffer::try_new(target.width, target.height)?;
        let result = PixelBuffer::try_new(target.width, target.height)?;
        Ok(BufferPair { capture, result })
    }

    /// Drop both buffers. Idempotent.
    pub fn release(&mut self) {
        if self.pair.take().is_some() {
            self.stats.releases = self.stats.releases.saturating_add(1);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/buffer.rs"]
mod tests;
