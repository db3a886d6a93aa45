use crate::{
    backend::{
        BackendKind, BlurBackend, BufferDesc, HostContext, MAX_BLUR_RADIUS, check_radius,
        check_shapes, degrade, sigma_for_radius,
    },
    foundation::error::BlurResult,
    render::buffer::{PixelBuffer, try_alloc_bytes},
};

const PASSES: usize = 3;

/// Three successive box passes approximating a Gaussian of the same sigma.
///
/// Single-threaded with one scratch buffer; used where the worker-pool kernel is unavailable.
#[derive(Default)]
pub struct BoxBlurBackend {
    box_radius: usize,
    scratch: Vec<u8>,
    desc: Option<BufferDesc>,
}

impl BoxBlurBackend {
    /// Create an unprepared backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-pass box radius currently bound.
    pub fn box_radius(&self) -> usize {
        self.box_radius
    }
}

/// Box radius whose `PASSES`-fold convolution matches `sigma`.
pub(crate) fn box_radius_for_sigma(sigma: f32) -> usize {
    let ideal = ((12.0 * sigma * sigma / PASSES as f32) + 1.0).sqrt();
    (((ideal - 1.0) / 2.0).round() as usize).max(1)
}

impl BlurBackend for BoxBlurBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::BoxBlur
    }

    fn prepare(&mut self, host: &HostContext, desc: BufferDesc, radius: f32) -> BlurResult<bool> {
        check_radius(radius, MAX_BLUR_RADIUS)?;
        self.scratch = Vec::new();
        let scratch = desc.byte_len().and_then(try_alloc_bytes);
        match scratch {
            Ok(s) => {
                self.scratch = s;
                self.box_radius = box_radius_for_sigma(sigma_for_radius(radius));
                self.desc = Some(desc);
                Ok(true)
            }
            Err(e) => {
                self.release();
                degrade(host, self.kind(), e)
            }
        }
    }

    fn blur(&mut self, input: &PixelBuffer, output: &mut PixelBuffer) -> BlurResult<()> {
        let desc = check_shapes(self.desc, input, output)?;
        let (w, h) = (desc.size.width as usize, desc.size.height as usize);
        let r = self.box_radius;
        if w == 0 || h == 0 {
            return Ok(());
        }

        box_horizontal(input.data(), &mut self.scratch, w, h, r);
        box_vertical(&self.scratch, output.data_mut(), w, h, r);
        for _ in 1..PASSES {
            box_horizontal(output.data(), &mut self.scratch, w, h, r);
            box_vertical(&self.scratch, output.data_mut(), w, h, r);
        }
        Ok(())
    }

    fn release(&mut self) {
        self.scratch = Vec::new();
        self.box_radius = 0;
        self.desc = None;
    }
}

fn box_horizontal(src: &[u8], dst: &mut [u8], w: usize, h: usize, r: usize) {
    let span = (2 * r + 1) as u32;
    let last = w - 1;
    for y in 0..h {
        let row = y * w * 4;
        for c in 0..4 {
            let at = |x: usize| u32::from(src[row + x.min(last) * 4 + c]);
            let mut sum: u32 = (0..=r).map(at).sum::<u32>() + (r as u32) * at(0);
            for x in 0..w {
                dst[row + x * 4 + c] = ((sum + span / 2) / span) as u8;
                sum += at(x + r + 1);
                sum -= at(x.saturating_sub(r));
            }
        }
    }
}

fn box_vertical(src: &[u8], dst: &mut [u8], w: usize, h: usize, r: usize) {
    let span = (2 * r + 1) as u32;
    let last = h - 1;
    for x in 0..w {
        for c in 0..4 {
            let at = |y: usize| u32::from(src[y.min(last) * w * 4 + x * 4 + c]);
            let mut sum: u32 = (0..=r).map(at).sum::<u32>() + (r as u32) * at(0);
            for y in 0..h {
                dst[y * w * 4 + x * 4 + c] = ((sum + span / 2) / span) as u8;
                sum += at(y + r + 1);
                sum -= at(y.saturating_sub(r));
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/box_blur.rs"]
mod tests;
