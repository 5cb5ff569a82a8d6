use std::marker::PhantomData;

use super::BindingSource;
use crate::backend::{BufferDesc, BufferId, GpuBackend, ResourceRegistry};
use crate::errors::Result;
use crate::painter::Painter;
use crate::uniform::{Uniform, to_aligned};

/// A typed, caller-owned uniform buffer.
///
/// Drawables reference the live buffer id, so [`update`](Self::update) is
/// visible on the next render without re-resolving any bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingBuffer<T: Uniform> {
    buffer: BufferId,
    _marker: PhantomData<T>,
}

impl<T: Uniform> BindingBuffer<T> {
    pub(crate) fn new<R>(registry: &mut R, initial: T) -> Result<Self>
    where
        R: ResourceRegistry + ?Sized,
    {
        let bytes = to_aligned(initial.to_uniform());
        let buffer = registry.create_buffer(&BufferDesc {
            label: Some(T::KIND.wgsl_type_name()),
            size: bytes.size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })?;
        registry.write_buffer(buffer, 0, bytes.as_bytes())?;
        Ok(Self {
            buffer,
            _marker: PhantomData,
        })
    }

    /// Writes a new value into the buffer.
    pub fn update<B: GpuBackend>(&self, painter: &mut Painter<B>, value: T) -> Result<()> {
        let bytes = to_aligned(value.to_uniform());
        painter
            .backend_mut()
            .write_buffer(self.buffer, 0, bytes.as_bytes())
    }

    #[inline]
    #[must_use]
    pub fn binding(&self) -> BindingSource {
        BindingSource::Buffer(self.buffer)
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }
}
