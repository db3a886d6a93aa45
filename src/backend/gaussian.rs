use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::{
    backend::{
        BackendKind, BlurBackend, BufferDesc, HostContext, MAX_BLUR_RADIUS, check_radius,
        check_shapes, degrade, sigma_for_radius,
    },
    foundation::error::{BlurError, BlurResult},
    render::buffer::{PixelBuffer, try_alloc_bytes},
};

/// Worker pool settings for [`GaussianBackend`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GaussianOpts {
    /// Worker thread count; `None` lets rayon decide.
    pub threads: Option<usize>,
}

/// Lazily built rayon pool shared by every backend created from one candidate.
#[derive(Clone, Default)]
pub(crate) struct SharedPool(Arc<Mutex<Option<Arc<rayon::ThreadPool>>>>);

impl SharedPool {
    fn get_or_build(&self, threads: Option<usize>) -> BlurResult<Arc<rayon::ThreadPool>> {
        let mut slot = self
            .0
            .lock()
            .map_err(|_| BlurError::backend("gaussian worker pool lock poisoned"))?;
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }
        let pool = Arc::new(build_thread_pool(threads)?);
        *slot = Some(pool.clone());
        Ok(pool)
    }
}

/// Separable fixed-point Gaussian, rows fanned out on a rayon pool.
///
/// Kernel and scratch storage are bound by `prepare` and dropped by `release`. The pool is
/// shared with every other instance built from the same [`crate::Candidate`], so many panes
/// do not multiply worker threads.
pub struct GaussianBackend {
    opts: GaussianOpts,
    shared: SharedPool,
    pool: Option<Arc<rayon::ThreadPool>>,
    kernel: Vec<u32>,
    scratch: Vec<u8>,
    desc: Option<BufferDesc>,
}

impl GaussianBackend {
    /// Create an unprepared backend with a pool of its own.
    pub fn new(opts: GaussianOpts) -> Self {
        Self::with_shared_pool(opts, SharedPool::default())
    }

    pub(crate) fn with_shared_pool(opts: GaussianOpts, shared: SharedPool) -> Self {
        Self {
            opts,
            shared,
            pool: None,
            kernel: Vec::new(),
            scratch: Vec::new(),
            desc: None,
        }
    }

    fn bind(&mut self, desc: BufferDesc, radius: f32) -> BlurResult<()> {
        if self.pool.is_none() {
            self.pool = Some(self.shared.get_or_build(self.opts.threads)?);
        }
        self.kernel = kernel_for_radius(radius)?;
        self.scratch = Vec::new();
        self.scratch = try_alloc_bytes(desc.byte_len()?)?;
        self.desc = Some(desc);
        Ok(())
    }
}

impl Default for GaussianBackend {
    fn default() -> Self {
        Self::new(GaussianOpts::default())
    }
}

impl BlurBackend for GaussianBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gaussian
    }

    fn prepare(&mut self, host: &HostContext, desc: BufferDesc, radius: f32) -> BlurResult<bool> {
        check_radius(radius, MAX_BLUR_RADIUS)?;
        match self.bind(desc, radius) {
            Ok(()) => Ok(true),
            Err(e) => {
                self.release();
                degrade(host, self.kind(), e)
            }
        }
    }

    fn blur(&mut self, input: &PixelBuffer, output: &mut PixelBuffer) -> BlurResult<()> {
        let desc = check_shapes(self.desc, input, output)?;
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| BlurError::backend("gaussian worker pool released"))?;
        let width = desc.size.width as usize;
        let height = desc.size.height as usize;
        if width == 0 || height == 0 {
            return Ok(());
        }
        let row_bytes = width * 4;
        let kernel = &self.kernel;
        let scratch = &mut self.scratch;

        pool.install(|| {
            scratch
                .par_chunks_mut(row_bytes)
                .zip(input.data().par_chunks(row_bytes))
                .for_each(|(dst_row, src_row)| blur_row_horizontal(src_row, dst_row, kernel));
            let scratch = &scratch[..];
            output
                .data_mut()
                .par_chunks_mut(row_bytes)
                .enumerate()
                .for_each(|(y, dst_row)| blur_row_vertical(scratch, dst_row, y, height, kernel));
        });
        Ok(())
    }

    fn release(&mut self) {
        self.pool = None;
        self.kernel = Vec::new();
        self.scratch = Vec::new();
        self.desc = None;
    }
}

/// The same Gaussian run row by row on the calling thread.
///
/// Compat tier for hosts where the worker pool cannot be built.
#[derive(Debug, Default)]
pub struct SerialGaussianBackend {
    kernel: Vec<u32>,
    scratch: Vec<u8>,
    desc: Option<BufferDesc>,
}

impl SerialGaussianBackend {
    /// Create an unprepared backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&mut self, desc: BufferDesc, radius: f32) -> BlurResult<()> {
        self.kernel = kernel_for_radius(radius)?;
        self.scratch = Vec::new();
        self.scratch = try_alloc_bytes(desc.byte_len()?)?;
        self.desc = Some(desc);
        Ok(())
    }
}

impl BlurBackend for SerialGaussianBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SerialGaussian
    }

    fn prepare(&mut self, host: &HostContext, desc: BufferDesc, radius: f32) -> BlurResult<bool> {
        check_radius(radius, MAX_BLUR_RADIUS)?;
        match self.bind(desc, radius) {
            Ok(()) => Ok(true),
            Err(e) => {
                self.release();
                degrade(host, self.kind(), e)
            }
        }
    }

    fn blur(&mut self, input: &PixelBuffer, output: &mut PixelBuffer) -> BlurResult<()> {
        let desc = check_shapes(self.desc, input, output)?;
        let height = desc.size.height as usize;
        let row_bytes = desc.size.width as usize * 4;
        if row_bytes == 0 || height == 0 {
            return Ok(());
        }
        let kernel = &self.kernel;

        for (dst_row, src_row) in self
            .scratch
            .chunks_mut(row_bytes)
            .zip(input.data().chunks(row_bytes))
        {
            blur_row_horizontal(src_row, dst_row, kernel);
        }
        for (y, dst_row) in output.data_mut().chunks_mut(row_bytes).enumerate() {
            blur_row_vertical(&self.scratch, dst_row, y, height, kernel);
        }
        Ok(())
    }

    fn release(&mut self) {
        self.kernel = Vec::new();
        self.scratch = Vec::new();
        self.desc = None;
    }
}

fn build_thread_pool(threads: Option<usize>) -> BlurResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(BlurError::validation(
            "gaussian 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("blur-gauss-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| BlurError::backend(format!("failed to build rayon thread pool: {e}")))
}

fn kernel_for_radius(radius: f32) -> BlurResult<Vec<u32>> {
    gaussian_kernel_q16(radius.ceil() as u32, sigma_for_radius(radius))
}

/// Normalized Gaussian weights in Q16, summing exactly to `1 << 16`.
pub(crate) fn gaussian_kernel_q16(radius: u32, sigma: f32) -> BlurResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(BlurError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(BlurError::backend("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let new_mid = (i64::from(weights[mid]) + delta).clamp(0, 65536);
        weights[mid] = new_mid as u32;
    }

    Ok(weights)
}

fn blur_row_horizontal(src_row: &[u8], dst_row: &mut [u8], k: &[u32]) {
    let radius = (k.len() / 2) as isize;
    let w = (src_row.len() / 4) as isize;
    for x in 0..w {
        let mut acc = [0u64; 4];
        for (ki, &kw) in k.iter().enumerate() {
            let idx = (x + ki as isize - radius).clamp(0, w - 1) as usize * 4;
            for c in 0..4 {
                acc[c] += u64::from(kw) * u64::from(src_row[idx + c]);
            }
        }
        let out = (x as usize) * 4;
        for c in 0..4 {
            dst_row[out + c] = q16_to_u8(acc[c]);
        }
    }
}

fn blur_row_vertical(src: &[u8], dst_row: &mut [u8], y: usize, height: usize, k: &[u32]) {
    let radius = (k.len() / 2) as isize;
    let row_bytes = dst_row.len();
    let h = height as isize;
    for x in 0..row_bytes / 4 {
        let mut acc = [0u64; 4];
        for (ki, &kw) in k.iter().enumerate() {
            let sy = (y as isize + ki as isize - radius).clamp(0, h - 1) as usize;
            let idx = sy * row_bytes + x * 4;
            for c in 0..4 {
                acc[c] += u64::from(kw) * u64::from(src[idx + c]);
            }
        }
        for c in 0..4 {
            dst_row[x * 4 + c] = q16_to_u8(acc[c]);
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/backend/gaussian.rs"]
mod tests;
