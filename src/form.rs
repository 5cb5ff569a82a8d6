//! Forms
//!
//! A [`Form`] is uploaded geometry: one vertex buffer, an optional `u32`
//! index buffer, counts and a primitive topology.

use bytemuck::Pod;

use crate::backend::{BufferDesc, BufferId, ResourceRegistry};
use crate::errors::{PainterError, Result};

/// Geometry to upload.
#[derive(Debug, Clone, Copy)]
pub struct FormConfig<'a> {
    pub vertices: &'a [u8],
    /// Size of one vertex in bytes.
    pub vertex_stride: u64,
    pub indices: Option<&'a [u32]>,
    pub topology: wgpu::PrimitiveTopology,
}

impl<'a> FormConfig<'a> {
    /// Vertex data from a slice of plain vertex structs (or glam vectors).
    #[must_use]
    pub fn new<T: Pod>(vertices: &'a [T]) -> Self {
        Self {
            vertices: bytemuck::cast_slice(vertices),
            vertex_stride: size_of::<T>() as u64,
            indices: None,
            topology: wgpu::PrimitiveTopology::TriangleList,
        }
    }
}

/// Uploaded geometry. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Form {
    pub(crate) vertex_buffer: BufferId,
    pub(crate) index_buffer: Option<BufferId>,
    pub(crate) vertex_count: u32,
    pub(crate) index_count: u32,
    pub(crate) vertex_stride: u64,
    pub(crate) topology: wgpu::PrimitiveTopology,
}

impl Form {
    pub fn new<R>(registry: &mut R, config: &FormConfig<'_>) -> Result<Self>
    where
        R: ResourceRegistry + ?Sized,
    {
        if config.vertex_stride == 0 {
            return Err(PainterError::InvalidForm("vertex stride is zero".to_string()));
        }
        if config.vertices.is_empty() {
            return Err(PainterError::InvalidForm("no vertices".to_string()));
        }
        let len = config.vertices.len() as u64;
        if len % config.vertex_stride != 0 {
            return Err(PainterError::InvalidForm(format!(
                "{len} vertex bytes are not a multiple of the stride {}",
                config.vertex_stride
            )));
        }
        let vertex_count = (len / config.vertex_stride) as u32;

        match config.indices {
            Some([]) => {
                return Err(PainterError::InvalidForm("empty index list".to_string()));
            }
            Some(indices) => {
                if let Some(bad) = indices.iter().find(|i| **i >= vertex_count) {
                    return Err(PainterError::InvalidForm(format!(
                        "index {bad} out of range for {vertex_count} vertices"
                    )));
                }
            }
            None => {}
        }

        let vertex_buffer = upload(
            registry,
            "Form Vertices",
            config.vertices,
            wgpu::BufferUsages::VERTEX,
        )?;

        let (index_buffer, index_count) = match config.indices {
            Some(indices) => {
                let buffer = upload(
                    registry,
                    "Form Indices",
                    bytemuck::cast_slice(indices),
                    wgpu::BufferUsages::INDEX,
                )?;
                (Some(buffer), indices.len() as u32)
            }
            None => (None, 0),
        };

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_count,
            index_count,
            vertex_stride: config.vertex_stride,
            topology: config.topology,
        })
    }

    #[inline]
    #[must_use]
    pub fn vertex_buffer(&self) -> BufferId {
        self.vertex_buffer
    }

    #[inline]
    #[must_use]
    pub fn index_buffer(&self) -> Option<BufferId> {
        self.index_buffer
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    #[inline]
    #[must_use]
    pub fn vertex_stride(&self) -> u64 {
        self.vertex_stride
    }

    #[inline]
    #[must_use]
    pub fn topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    /// Index format strip topologies need to restart primitives.
    #[must_use]
    pub fn strip_index_format(&self) -> Option<wgpu::IndexFormat> {
        (self.index_buffer.is_some() && self.topology.is_strip())
            .then_some(wgpu::IndexFormat::Uint32)
    }
}

fn upload<R>(
    registry: &mut R,
    label: &str,
    data: &[u8],
    usage: wgpu::BufferUsages,
) -> Result<BufferId>
where
    R: ResourceRegistry + ?Sized,
{
    let buffer = registry.create_buffer(&BufferDesc {
        label: Some(label),
        size: data.len().next_multiple_of(4) as u64,
        usage: usage | wgpu::BufferUsages::COPY_DST,
    })?;
    // Buffer writes must be 4-byte aligned; pad the tail.
    if data.len() % 4 == 0 {
        registry.write_buffer(buffer, 0, data)?;
    } else {
        let mut padded = data.to_vec();
        padded.resize(data.len().next_multiple_of(4), 0);
        registry.write_buffer(buffer, 0, &padded)?;
    }
    Ok(buffer)
}
