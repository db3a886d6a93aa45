use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::backend::BackendProbe;

/// Process-scoped state shared by every blur widget.
///
/// Holds the memoized backend choice and the count of captures currently on the stack. Widgets
/// receive it by `Arc`; [`BlurRuntime::global`] is the process-wide instance, while tests and
/// embedders can build isolated ones.
#[derive(Debug, Default)]
pub struct BlurRuntime {
    probe: BackendProbe,
    rendering: AtomicUsize,
}

impl BlurRuntime {
    /// Runtime with the default backend priority list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime over a custom probe.
    pub fn with_probe(probe: BackendProbe) -> Self {
        Self {
            probe,
            rendering: AtomicUsize::new(0),
        }
    }

    /// The process-wide runtime, created on first use.
    pub fn global() -> Arc<BlurRuntime> {
        static GLOBAL: OnceLock<Arc<BlurRuntime>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(BlurRuntime::new())).clone()
    }

    /// Backend selection shared by all widgets of this runtime.
    pub fn probe(&self) -> &BackendProbe {
        &self.probe
    }

    /// Number of capture passes currently in progress.
    pub fn rendering_count(&self) -> usize {
        self.rendering.load(Ordering::Acquire)
    }

    pub(crate) fn enter_rendering(&self) -> RenderingScope<'_> {
        self.rendering.fetch_add(1, Ordering::AcqRel);
        RenderingScope { runtime: self }
    }
}

/// Decrements the rendering count when the capture pass ends, however it ends.
pub(crate) struct RenderingScope<'a> {
    runtime: &'a BlurRuntime,
}

impl Drop for RenderingScope<'_> {
    fn drop(&mut self) {
        self.runtime.rendering.fetch_sub(1, Ordering::AcqRel);
    }
}
