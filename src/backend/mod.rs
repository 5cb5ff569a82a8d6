//! GPU Backend Seam
//!
//! Everything above this module talks to the GPU through two traits:
//!
//! - [`ResourceRegistry`]: the sole owner of raw GPU handles. It hands out
//!   generational ids (one strongly typed arena per resource kind) and is the
//!   only code that creates, writes or destroys GPU objects.
//! - [`GpuBackend`]: frame control on top of the registry. It acquires the
//!   presentation texture, opens command recorders, submits and presents.
//!
//! Two implementations ship with the crate: [`WgpuBackend`] drives a real
//! device, [`HeadlessBackend`] records every call without touching a GPU.

mod headless;
mod wgpu_backend;

pub use headless::{
    HeadlessBackend, HeadlessRecorder, PassCommand, PipelineInfo, RecordedPass, TextureInfo,
};
pub use wgpu_backend::{WgpuBackend, WgpuRecorder};

use std::borrow::Cow;
use std::ops::Range;

use slotmap::new_key_type;

use crate::binding::BindingKind;
use crate::errors::{PainterError, Result};

new_key_type! {
    /// GPU buffer handle.
    pub struct BufferId;
    /// GPU texture handle (a texture plus its default view).
    pub struct TextureId;
    /// Sampler handle.
    pub struct SamplerId;
    /// Compiled shader module handle.
    pub struct ModuleId;
    /// Bind group layout handle.
    pub struct LayoutId;
    /// Bind group handle.
    pub struct BindGroupId;
    /// Render pipeline handle.
    pub struct PipelineId;
}

// ============================================================================
// Descriptors
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct BufferDesc<'a> {
    pub label: Option<&'a str>,
    pub size: u64,
    pub usage: wgpu::BufferUsages,
}

#[derive(Debug, Clone, Copy)]
pub struct TextureDesc<'a> {
    pub label: Option<&'a str>,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub usage: wgpu::TextureUsages,
}

#[derive(Debug, Clone, Copy)]
pub struct SamplerDesc<'a> {
    pub label: Option<&'a str>,
    pub address_mode: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
}

/// Shader source handed to the registry as opaque text (or words).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShaderSource {
    Wgsl(Cow<'static, str>),
    #[cfg(feature = "spirv")]
    SpirV(Cow<'static, [u32]>),
}

impl ShaderSource {
    /// Raw bytes of the source, used to deduplicate modules.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Wgsl(code) => code.as_bytes(),
            #[cfg(feature = "spirv")]
            Self::SpirV(words) => bytemuck::cast_slice(words),
        }
    }
}

impl From<&'static str> for ShaderSource {
    fn from(code: &'static str) -> Self {
        Self::Wgsl(Cow::Borrowed(code))
    }
}

impl From<String> for ShaderSource {
    fn from(code: String) -> Self {
        Self::Wgsl(Cow::Owned(code))
    }
}

/// One entry of a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutEntry {
    pub binding: u32,
    pub visibility: wgpu::ShaderStages,
    pub kind: BindingKind,
}

/// A concrete resource bound at one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Buffer(BufferId),
    Sampler(SamplerId),
    Texture(TextureId),
}

impl ResourceRef {
    #[must_use]
    pub fn kind(&self) -> BindingKind {
        match self {
            Self::Buffer(_) => BindingKind::UniformBuffer,
            Self::Sampler(_) => BindingKind::Sampler,
            Self::Texture(_) => BindingKind::Texture,
        }
    }
}

/// One entry of a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupEntry {
    pub binding: u32,
    pub resource: ResourceRef,
}

/// Depth test state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub format: wgpu::TextureFormat,
    pub write_enabled: bool,
    pub compare: wgpu::CompareFunction,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineDesc<'a> {
    pub label: Option<&'a str>,
    pub layouts: &'a [LayoutId],
    pub vertex: ModuleId,
    pub fragment: ModuleId,
    /// Tightly packed per-vertex attributes at locations `0..n`.
    pub vertex_attributes: &'a [wgpu::VertexFormat],
    pub primitive: wgpu::PrimitiveState,
    pub depth: Option<DepthState>,
    pub color_format: wgpu::TextureFormat,
    pub blend: Option<wgpu::BlendState>,
    pub sample_count: u32,
}

/// What happens to a color attachment when a pass begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadAction {
    Clear(wgpu::Color),
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachment {
    pub target: TextureId,
    pub resolve_target: Option<TextureId>,
    pub load: LoadAction,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthAttachment {
    pub target: TextureId,
    pub clear: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct PassDesc<'a> {
    pub label: Option<&'a str>,
    pub color: ColorAttachment,
    pub depth: Option<DepthAttachment>,
}

/// Device limits the registry enforces on allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub max_texture_dimension_2d: u32,
    pub max_buffer_size: u64,
}

impl ResourceLimits {
    pub(crate) fn check_texture(&self, desc: &TextureDesc<'_>) -> Result<()> {
        let max = self.max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(PainterError::AllocationFailed {
                resource: "texture",
                reason: format!(
                    "{}x{} is outside the supported range 1..={max}",
                    desc.width, desc.height
                ),
            });
        }
        Ok(())
    }

    pub(crate) fn check_buffer(&self, desc: &BufferDesc<'_>) -> Result<()> {
        if desc.size > self.max_buffer_size {
            return Err(PainterError::AllocationFailed {
                resource: "buffer",
                reason: format!(
                    "{} bytes exceeds the limit of {} bytes",
                    desc.size, self.max_buffer_size
                ),
            });
        }
        Ok(())
    }
}

impl From<&wgpu::Limits> for ResourceLimits {
    fn from(limits: &wgpu::Limits) -> Self {
        Self {
            max_texture_dimension_2d: limits.max_texture_dimension_2d,
            max_buffer_size: limits.max_buffer_size,
        }
    }
}

/// Byte stride of tightly packed vertex attributes.
#[must_use]
pub fn vertex_stride(attributes: &[wgpu::VertexFormat]) -> u64 {
    attributes.iter().map(|format| format.size()).sum()
}

// ============================================================================
// Traits
// ============================================================================

/// Owner of raw GPU handles.
pub trait ResourceRegistry {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId>;

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()>;

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId>;

    /// Uploads tightly packed texel rows covering the whole texture.
    fn write_texture(&mut self, texture: TextureId, data: &[u8]) -> Result<()>;

    /// Destroys a texture. Unknown ids are ignored.
    fn destroy_texture(&mut self, texture: TextureId);

    fn create_sampler(&mut self, desc: &SamplerDesc<'_>) -> Result<SamplerId>;

    fn create_shader_module(
        &mut self,
        label: Option<&str>,
        source: &ShaderSource,
    ) -> Result<ModuleId>;

    fn create_bind_group_layout(
        &mut self,
        label: Option<&str>,
        entries: &[LayoutEntry],
    ) -> Result<LayoutId>;

    fn create_bind_group(
        &mut self,
        label: Option<&str>,
        layout: LayoutId,
        entries: &[GroupEntry],
    ) -> Result<BindGroupId>;

    /// Drops a bind group. Unknown ids are ignored.
    fn release_bind_group(&mut self, group: BindGroupId);

    fn create_render_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineId>;

    /// Texture of the frame currently being rendered to the surface, if any.
    fn current_presentation_texture(&self) -> Option<TextureId>;

    /// Color format of the surface, `None` for surfaceless backends.
    fn presentation_format(&self) -> Option<wgpu::TextureFormat>;

    fn limits(&self) -> ResourceLimits;
}

/// Frame control on top of a [`ResourceRegistry`].
pub trait GpuBackend: ResourceRegistry {
    type Commands;
    type Recorder<'a>: CommandRecorder<Commands = Self::Commands>
    where
        Self: 'a;

    /// Current size of the presentation surface (or the virtual canvas).
    fn surface_size(&self) -> (u32, u32);

    fn resize_surface(&mut self, width: u32, height: u32);

    /// Acquires the presentation texture for the current frame.
    ///
    /// Returns `Ok(false)` when the surface is temporarily unavailable and the
    /// frame should be skipped. Calling it twice in one frame is a no-op.
    fn begin_frame(&mut self) -> Result<bool>;

    fn create_recorder(&self, label: Option<&str>) -> Self::Recorder<'_>;

    fn submit(&mut self, commands: Self::Commands);

    /// Presents the acquired frame, if any, and releases its texture id.
    fn present(&mut self);
}

/// Records render passes into one command buffer.
pub trait CommandRecorder {
    type Commands;

    fn begin_pass<'p>(&'p mut self, desc: &PassDesc<'_>) -> Result<Box<dyn PassRecorder + 'p>>;

    fn finish(self) -> Self::Commands;
}

/// An open render pass.
pub trait PassRecorder {
    fn set_pipeline(&mut self, pipeline: PipelineId) -> Result<()>;

    fn set_bind_group(&mut self, index: u32, group: BindGroupId) -> Result<()>;

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<()>;

    fn set_index_buffer(&mut self, buffer: BufferId, format: wgpu::IndexFormat) -> Result<()>;

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>);

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>);
}
