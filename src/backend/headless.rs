//! Headless Backend
//!
//! A [`GpuBackend`] that never touches a GPU. Every resource request is
//! stored as a descriptor, buffer writes are kept as bytes, and every
//! submitted pass is recorded as a list of [`PassCommand`]s.
//!
//! Used by the test suite and by applications that want to check their layer
//! setups without a device.

use std::cell::Cell;
use std::ops::Range;

use log::debug;
use slotmap::SlotMap;

use super::{
    BindGroupId, BufferDesc, BufferId, CommandRecorder, DepthState, GpuBackend, GroupEntry,
    LayoutEntry, LayoutId, LoadAction, ModuleId, PassDesc, PassRecorder, PipelineDesc, PipelineId,
    ResourceLimits, ResourceRegistry, SamplerDesc, SamplerId, ShaderSource, TextureDesc,
    TextureId,
};
use crate::errors::{PainterError, Result};

/// Stored texture descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub usage: wgpu::TextureUsages,
    pub presentation: bool,
}

/// Stored pipeline descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInfo {
    pub layouts: Vec<LayoutId>,
    pub vertex: ModuleId,
    pub fragment: ModuleId,
    pub vertex_attributes: Vec<wgpu::VertexFormat>,
    pub primitive: wgpu::PrimitiveState,
    pub depth: Option<DepthState>,
    pub color_format: wgpu::TextureFormat,
    pub sample_count: u32,
}

/// A command recorded inside a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassCommand {
    SetPipeline(PipelineId),
    SetBindGroup(u32, BindGroupId),
    SetVertexBuffer(u32, BufferId),
    SetIndexBuffer(BufferId, wgpu::IndexFormat),
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
    DrawIndexed {
        indices: Range<u32>,
        base_vertex: i32,
        instances: Range<u32>,
    },
}

impl PassCommand {
    #[must_use]
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::Draw { .. } | Self::DrawIndexed { .. })
    }
}

/// A submitted render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPass {
    pub label: Option<String>,
    pub target: TextureId,
    pub resolve_target: Option<TextureId>,
    pub depth_target: Option<TextureId>,
    pub load: LoadAction,
    pub commands: Vec<PassCommand>,
}

impl RecordedPass {
    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    /// Bind groups bound at `index`, in order.
    #[must_use]
    pub fn bind_groups_at(&self, index: u32) -> Vec<BindGroupId> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                PassCommand::SetBindGroup(i, group) if *i == index => Some(*group),
                _ => None,
            })
            .collect()
    }
}

/// Recording backend with a virtual surface.
pub struct HeadlessBackend {
    size: (u32, u32),
    format: Option<wgpu::TextureFormat>,
    limits: ResourceLimits,

    buffers: SlotMap<BufferId, Vec<u8>>,
    textures: SlotMap<TextureId, TextureInfo>,
    samplers: SlotMap<SamplerId, wgpu::FilterMode>,
    modules: SlotMap<ModuleId, ShaderSource>,
    layouts: SlotMap<LayoutId, Vec<LayoutEntry>>,
    bind_groups: SlotMap<BindGroupId, (LayoutId, Vec<GroupEntry>)>,
    pipelines: SlotMap<PipelineId, PipelineInfo>,

    presentation: Option<TextureId>,
    submitted: Vec<RecordedPass>,
    destroyed_textures: Vec<TextureId>,
    frames_presented: u64,
    recorders_opened: Cell<u64>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl HeadlessBackend {
    /// Creates a backend with a virtual `Bgra8UnormSrgb` surface.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            format: Some(wgpu::TextureFormat::Bgra8UnormSrgb),
            limits: ResourceLimits::from(&wgpu::Limits::default()),
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            samplers: SlotMap::with_key(),
            modules: SlotMap::with_key(),
            layouts: SlotMap::with_key(),
            bind_groups: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            presentation: None,
            submitted: Vec::new(),
            destroyed_textures: Vec::new(),
            frames_presented: 0,
            recorders_opened: Cell::new(0),
        }
    }

    /// Removes the virtual surface; surface-backed layers fail to paint.
    #[must_use]
    pub fn without_surface(mut self) -> Self {
        self.format = None;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn buffer_data(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn texture(&self, id: TextureId) -> Option<&TextureInfo> {
        self.textures.get(id)
    }

    /// Live textures, excluding the presentation texture.
    #[must_use]
    pub fn live_texture_count(&self) -> usize {
        self.textures.values().filter(|t| !t.presentation).count()
    }

    #[must_use]
    pub fn destroyed_textures(&self) -> &[TextureId] {
        &self.destroyed_textures
    }

    #[must_use]
    pub fn bind_group(&self, id: BindGroupId) -> Option<(LayoutId, &[GroupEntry])> {
        self.bind_groups
            .get(id)
            .map(|(layout, entries)| (*layout, entries.as_slice()))
    }

    #[must_use]
    pub fn bind_group_count(&self) -> usize {
        self.bind_groups.len()
    }

    #[must_use]
    pub fn layout(&self, id: LayoutId) -> Option<&[LayoutEntry]> {
        self.layouts.get(id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn layout_count(&self) -> usize {
        self.layouts.len()
    }

    #[must_use]
    pub fn pipeline(&self, id: PipelineId) -> Option<&PipelineInfo> {
        self.pipelines.get(id)
    }

    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }

    /// Every pass submitted so far, in submission order.
    #[must_use]
    pub fn submitted_passes(&self) -> &[RecordedPass] {
        &self.submitted
    }

    pub fn clear_submitted(&mut self) {
        self.submitted.clear();
    }

    #[must_use]
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    #[must_use]
    pub fn recorders_opened(&self) -> u64 {
        self.recorders_opened.get()
    }

    fn check_texture_id(&self, id: TextureId) -> Result<()> {
        if self.textures.contains_key(id) {
            Ok(())
        } else {
            Err(PainterError::UnknownHandle("texture"))
        }
    }
}

impl ResourceRegistry for HeadlessBackend {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId> {
        self.limits.check_buffer(desc)?;
        let size = desc.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        Ok(self.buffers.insert(vec![0; size as usize]))
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let bytes = self
            .buffers
            .get_mut(buffer)
            .ok_or(PainterError::UnknownHandle("buffer"))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > bytes.len() {
            return Err(PainterError::AllocationFailed {
                resource: "buffer write",
                reason: format!("write of {end} bytes exceeds buffer size {}", bytes.len()),
            });
        }
        bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId> {
        self.limits.check_texture(desc)?;
        let id = self.textures.insert(TextureInfo {
            label: desc.label.map(str::to_owned),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            sample_count: desc.sample_count,
            usage: desc.usage,
            presentation: false,
        });
        debug!("headless: texture {id:?} {}x{}", desc.width, desc.height);
        Ok(id)
    }

    fn write_texture(&mut self, texture: TextureId, _data: &[u8]) -> Result<()> {
        self.check_texture_id(texture)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(texture).is_some() {
            self.destroyed_textures.push(texture);
        }
    }

    fn create_sampler(&mut self, desc: &SamplerDesc<'_>) -> Result<SamplerId> {
        Ok(self.samplers.insert(desc.mag_filter))
    }

    fn create_shader_module(
        &mut self,
        _label: Option<&str>,
        source: &ShaderSource,
    ) -> Result<ModuleId> {
        Ok(self.modules.insert(source.clone()))
    }

    fn create_bind_group_layout(
        &mut self,
        _label: Option<&str>,
        entries: &[LayoutEntry],
    ) -> Result<LayoutId> {
        Ok(self.layouts.insert(entries.to_vec()))
    }

    fn create_bind_group(
        &mut self,
        _label: Option<&str>,
        layout: LayoutId,
        entries: &[GroupEntry],
    ) -> Result<BindGroupId> {
        if !self.layouts.contains_key(layout) {
            return Err(PainterError::UnknownHandle("bind group layout"));
        }
        Ok(self.bind_groups.insert((layout, entries.to_vec())))
    }

    fn release_bind_group(&mut self, group: BindGroupId) {
        self.bind_groups.remove(group);
    }

    fn create_render_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineId> {
        Ok(self.pipelines.insert(PipelineInfo {
            layouts: desc.layouts.to_vec(),
            vertex: desc.vertex,
            fragment: desc.fragment,
            vertex_attributes: desc.vertex_attributes.to_vec(),
            primitive: desc.primitive,
            depth: desc.depth,
            color_format: desc.color_format,
            sample_count: desc.sample_count,
        }))
    }

    fn current_presentation_texture(&self) -> Option<TextureId> {
        self.presentation
    }

    fn presentation_format(&self) -> Option<wgpu::TextureFormat> {
        self.format
    }

    fn limits(&self) -> ResourceLimits {
        self.limits
    }
}

impl GpuBackend for HeadlessBackend {
    type Commands = Vec<RecordedPass>;
    type Recorder<'a> = HeadlessRecorder<'a>;

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.size = (width, height);
        }
    }

    fn begin_frame(&mut self) -> Result<bool> {
        let Some(format) = self.format else {
            return Ok(true);
        };
        if self.presentation.is_none() {
            let (width, height) = self.size;
            self.presentation = Some(self.textures.insert(TextureInfo {
                label: Some("Presentation".to_owned()),
                width,
                height,
                format,
                sample_count: 1,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                presentation: true,
            }));
        }
        Ok(true)
    }

    fn create_recorder(&self, _label: Option<&str>) -> HeadlessRecorder<'_> {
        self.recorders_opened.set(self.recorders_opened.get() + 1);
        HeadlessRecorder {
            backend: self,
            passes: Vec::new(),
        }
    }

    fn submit(&mut self, commands: Vec<RecordedPass>) {
        self.submitted.extend(commands);
    }

    fn present(&mut self) {
        if let Some(id) = self.presentation.take() {
            self.textures.remove(id);
            self.frames_presented += 1;
        }
    }
}

pub struct HeadlessRecorder<'a> {
    backend: &'a HeadlessBackend,
    passes: Vec<RecordedPass>,
}

impl CommandRecorder for HeadlessRecorder<'_> {
    type Commands = Vec<RecordedPass>;

    fn begin_pass<'p>(&'p mut self, desc: &PassDesc<'_>) -> Result<Box<dyn PassRecorder + 'p>> {
        self.backend.check_texture_id(desc.color.target)?;
        if let Some(resolve) = desc.color.resolve_target {
            self.backend.check_texture_id(resolve)?;
        }
        if let Some(depth) = desc.depth {
            self.backend.check_texture_id(depth.target)?;
        }

        self.passes.push(RecordedPass {
            label: desc.label.map(str::to_owned),
            target: desc.color.target,
            resolve_target: desc.color.resolve_target,
            depth_target: desc.depth.map(|d| d.target),
            load: desc.color.load,
            commands: Vec::new(),
        });
        let backend = self.backend;
        let pass = self
            .passes
            .last_mut()
            .ok_or(PainterError::UnknownHandle("pass"))?;
        Ok(Box::new(HeadlessPass { backend, pass }))
    }

    fn finish(self) -> Vec<RecordedPass> {
        self.passes
    }
}

struct HeadlessPass<'p> {
    backend: &'p HeadlessBackend,
    pass: &'p mut RecordedPass,
}

impl PassRecorder for HeadlessPass<'_> {
    fn set_pipeline(&mut self, pipeline: PipelineId) -> Result<()> {
        if !self.backend.pipelines.contains_key(pipeline) {
            return Err(PainterError::UnknownHandle("pipeline"));
        }
        self.pass.commands.push(PassCommand::SetPipeline(pipeline));
        Ok(())
    }

    fn set_bind_group(&mut self, index: u32, group: BindGroupId) -> Result<()> {
        if !self.backend.bind_groups.contains_key(group) {
            return Err(PainterError::UnknownHandle("bind group"));
        }
        self.pass
            .commands
            .push(PassCommand::SetBindGroup(index, group));
        Ok(())
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<()> {
        if !self.backend.buffers.contains_key(buffer) {
            return Err(PainterError::UnknownHandle("buffer"));
        }
        self.pass
            .commands
            .push(PassCommand::SetVertexBuffer(slot, buffer));
        Ok(())
    }

    fn set_index_buffer(&mut self, buffer: BufferId, format: wgpu::IndexFormat) -> Result<()> {
        if !self.backend.buffers.contains_key(buffer) {
            return Err(PainterError::UnknownHandle("buffer"));
        }
        self.pass
            .commands
            .push(PassCommand::SetIndexBuffer(buffer, format));
        Ok(())
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.commands.push(PassCommand::Draw {
            vertices,
            instances,
        });
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.pass.commands.push(PassCommand::DrawIndexed {
            indices,
            base_vertex,
            instances,
        });
    }
}
