use crate::{
    backend::{BackendKind, BlurBackend, BufferDesc, HostContext, check_shapes},
    foundation::error::BlurResult,
    render::buffer::PixelBuffer,
};

/// Copy-through backend selected when no real kernel is usable.
#[derive(Debug, Default)]
pub struct NoopBackend {
    desc: Option<BufferDesc>,
}

impl NoopBackend {
    /// Create an unprepared backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlurBackend for NoopBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Noop
    }

    fn prepare(&mut self, _host: &HostContext, desc: BufferDesc, _radius: f32) -> BlurResult<bool> {
        self.desc = Some(desc);
        Ok(true)
    }

    fn blur(&mut self, input: &PixelBuffer, output: &mut PixelBuffer) -> BlurResult<()> {
        check_shapes(self.desc, input, output)?;
        output.data_mut().copy_from_slice(input.data());
        Ok(())
    }

    fn release(&mut self) {
        self.desc = None;
    }
}
