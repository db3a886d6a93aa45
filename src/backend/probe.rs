use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::{
    backend::{
        BackendKind, BlurBackend, BoxBlurBackend, BufferDesc, GAUSSIAN_MIN_PLATFORM_VERSION,
        GaussianBackend, GaussianOpts, HostContext, NoopBackend, SerialGaussianBackend,
        gaussian::SharedPool,
    },
    foundation::error::{BlurError, BlurResult},
    render::buffer::PixelBuffer,
};

const SELF_TEST_SIZE: u32 = 4;
const SELF_TEST_RADIUS: f32 = 1.0;

type Factory = Arc<dyn Fn() -> Box<dyn BlurBackend> + Send + Sync>;

/// One entry of the probe priority list.
#[derive(Clone)]
pub struct Candidate {
    kind: BackendKind,
    min_platform_version: Option<u32>,
    factory: Factory,
}

impl Candidate {
    /// A candidate built by `factory`, usable on every platform version.
    pub fn new(
        kind: BackendKind,
        factory: impl Fn() -> Box<dyn BlurBackend> + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            min_platform_version: None,
            factory: Arc::new(factory),
        }
    }

    /// Skip this candidate on hosts older than `version`.
    pub fn with_min_platform_version(mut self, version: u32) -> Self {
        self.min_platform_version = Some(version);
        self
    }

    /// Native Gaussian tier. Every backend this candidate creates shares one worker pool.
    pub fn gaussian(opts: GaussianOpts) -> Self {
        let pool = SharedPool::default();
        Self::new(BackendKind::Gaussian, move || {
            Box::new(GaussianBackend::with_shared_pool(opts, pool.clone()))
        })
        .with_min_platform_version(GAUSSIAN_MIN_PLATFORM_VERSION)
    }

    /// Single-threaded Gaussian tier.
    pub fn serial_gaussian() -> Self {
        Self::new(BackendKind::SerialGaussian, || {
            Box::new(SerialGaussianBackend::new())
        })
    }

    /// Box-approximation tier.
    pub fn box_blur() -> Self {
        Self::new(BackendKind::BoxBlur, || Box::new(BoxBlurBackend::new()))
    }

    /// Copy-through fallback.
    pub fn noop() -> Self {
        Self::new(BackendKind::Noop, || Box::new(NoopBackend::new()))
    }

    /// Kind tag.
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Instantiate a fresh, unprepared backend.
    pub fn create(&self) -> Box<dyn BlurBackend> {
        (self.factory)()
    }

    fn supported_on(&self, host: &HostContext) -> bool {
        self.min_platform_version
            .is_none_or(|v| host.platform_version >= v)
    }
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("kind", &self.kind)
            .field("min_platform_version", &self.min_platform_version)
            .finish_non_exhaustive()
    }
}

/// Default priority list: native Gaussian, serial Gaussian, box approximation, no-op.
pub fn default_candidates() -> Vec<Candidate> {
    vec![
        Candidate::gaussian(GaussianOpts::default()),
        Candidate::serial_gaussian(),
        Candidate::box_blur(),
        Candidate::noop(),
    ]
}

/// Selects one backend kind per process scope and remembers it.
///
/// The probe sequence runs at most once; every later [`BackendProbe::select`] returns the same
/// candidate. The list always ends with a no-op entry, so selection cannot fail.
pub struct BackendProbe {
    candidates: Vec<Candidate>,
    chosen: OnceLock<usize>,
    probe_runs: AtomicUsize,
}

impl BackendProbe {
    /// Probe over [`default_candidates`].
    pub fn new() -> Self {
        Self::with_candidates(default_candidates())
    }

    /// Probe over a custom priority list; a no-op entry is appended if missing.
    pub fn with_candidates(mut candidates: Vec<Candidate>) -> Self {
        if candidates.last().map(Candidate::kind) != Some(BackendKind::Noop) {
            candidates.push(Candidate::noop());
        }
        Self {
            candidates,
            chosen: OnceLock::new(),
            probe_runs: AtomicUsize::new(0),
        }
    }

    /// Priority list, including the trailing no-op.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Memoized choice, if probing already happened.
    pub fn chosen_kind(&self) -> Option<BackendKind> {
        self.chosen.get().map(|&i| self.candidates[i].kind)
    }

    /// How many times the probe sequence has executed.
    pub fn probe_runs(&self) -> usize {
        self.probe_runs.load(Ordering::Relaxed)
    }

    /// Chosen candidate, probing on first call.
    pub fn select(&self, host: &HostContext) -> &Candidate {
        let idx = *self.chosen.get_or_init(|| self.run_probe(host));
        &self.candidates[idx]
    }

    /// Fresh per-widget backend of the chosen kind.
    pub fn create(&self, host: &HostContext) -> Box<dyn BlurBackend> {
        self.select(host).create()
    }

    #[tracing::instrument(skip(self), fields(candidates = self.candidates.len()))]
    fn run_probe(&self, host: &HostContext) -> usize {
        self.probe_runs.fetch_add(1, Ordering::Relaxed);
        let last = self.candidates.len() - 1;

        for (i, candidate) in self.candidates.iter().enumerate() {
            if !candidate.supported_on(host) {
                tracing::debug!(
                    backend = %candidate.kind,
                    platform_version = host.platform_version,
                    "blur backend skipped on this platform version"
                );
                continue;
            }
            match self_test(candidate, host) {
                Ok(true) => {
                    tracing::info!(backend = %candidate.kind, "blur backend selected");
                    return i;
                }
                Ok(false) => {
                    tracing::debug!(backend = %candidate.kind, "blur backend self-test declined");
                }
                Err(e) => {
                    tracing::debug!(
                        backend = %candidate.kind,
                        error = %e,
                        "blur backend self-test failed"
                    );
                }
            }
        }

        tracing::warn!("no blur backend passed its self-test; falling back to no-op");
        last
    }
}

impl Default for BackendProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BackendProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendProbe")
            .field("candidates", &self.candidates)
            .field("chosen", &self.chosen_kind())
            .field("probe_runs", &self.probe_runs())
            .finish()
    }
}

/// Prepare, blur and release a tiny buffer. Panics count as failure.
fn self_test(candidate: &Candidate, host: &HostContext) -> BlurResult<bool> {
    let host = HostContext {
        debug: true,
        ..*host
    };
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut backend = candidate.create();
        let result = exercise(backend.as_mut(), &host);
        backend.release();
        result
    }));
    outcome.unwrap_or_else(|_| {
        Err(BlurError::backend(format!(
            "{} backend panicked during self-test",
            candidate.kind
        )))
    })
}

fn exercise(backend: &mut dyn BlurBackend, host: &HostContext) -> BlurResult<bool> {
    let desc = BufferDesc::new(SELF_TEST_SIZE, SELF_TEST_SIZE);
    if !backend.prepare(host, desc, SELF_TEST_RADIUS)? {
        return Ok(false);
    }
    let input = PixelBuffer::try_new(SELF_TEST_SIZE, SELF_TEST_SIZE)?;
    let mut output = PixelBuffer::try_new(SELF_TEST_SIZE, SELF_TEST_SIZE)?;
    backend.blur(&input, &mut output)?;
    Ok(true)
}

#[cfg(test)]
#[path = "../../tests/unit/backend/probe.rs"]
mod tests;
