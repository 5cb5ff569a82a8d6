//! wgpu Backend
//!
//! [`WgpuBackend`] holds the core GPU handles (device, queue and an optional
//! window surface) and stores every created object in a per-kind arena.

use std::ops::Range;

use log::{debug, info, warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use slotmap::SlotMap;

use super::{
    BindGroupId, BufferDesc, BufferId, CommandRecorder, GpuBackend, GroupEntry, LayoutEntry,
    LayoutId, LoadAction, ModuleId, PassDesc, PassRecorder, PipelineDesc, PipelineId,
    ResourceLimits, ResourceRef, ResourceRegistry, SamplerDesc, SamplerId, ShaderSource,
    TextureDesc, TextureId,
};
use crate::binding::BindingKind;
use crate::errors::{PainterError, Result};
use crate::settings::PainterSettings;

struct GpuTexture {
    /// `None` for the borrowed surface texture.
    texture: Option<wgpu::Texture>,
    view: wgpu::TextureView,
}

#[derive(Default)]
struct WgpuResources {
    buffers: SlotMap<BufferId, wgpu::Buffer>,
    textures: SlotMap<TextureId, GpuTexture>,
    samplers: SlotMap<SamplerId, wgpu::Sampler>,
    modules: SlotMap<ModuleId, wgpu::ShaderModule>,
    layouts: SlotMap<LayoutId, wgpu::BindGroupLayout>,
    bind_groups: SlotMap<BindGroupId, wgpu::BindGroup>,
    pipelines: SlotMap<PipelineId, wgpu::RenderPipeline>,
}

impl WgpuResources {
    fn view(&self, id: TextureId) -> Result<&wgpu::TextureView> {
        self.textures
            .get(id)
            .map(|t| &t.view)
            .ok_or(PainterError::UnknownHandle("texture"))
    }
}

struct SurfaceState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

struct AcquiredFrame {
    output: wgpu::SurfaceTexture,
    id: TextureId,
}

/// Backend driving a real wgpu device.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: Option<SurfaceState>,
    /// Canvas size; mirrors the surface configuration when there is one.
    size: (u32, u32),
    limits: ResourceLimits,
    resources: WgpuResources,
    frame: Option<AcquiredFrame>,
}

impl WgpuBackend {
    /// Creates a backend presenting to `window`.
    pub async fn new<W>(
        window: W,
        width: u32,
        height: u32,
        settings: &PainterSettings,
    ) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;

        let adapter = Self::request_adapter(&instance, settings, Some(&surface)).await?;
        let (device, queue) = Self::request_device(&adapter, settings).await?;

        let mut config = surface
            .get_default_config(&adapter, width.max(1), height.max(1))
            .ok_or_else(|| {
                PainterError::AdapterRequestFailed("Surface not supported by adapter".to_string())
            })?;
        config.present_mode = if settings.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        surface.configure(&device, &config);
        info!("Surface configured: {:?} {}x{}", config.format, config.width, config.height);

        let limits = ResourceLimits::from(&device.limits());
        Ok(Self {
            device,
            queue,
            size: (config.width, config.height),
            surface: Some(SurfaceState { surface, config }),
            limits,
            resources: WgpuResources::default(),
            frame: None,
        })
    }

    /// Creates a backend without a surface; only texture-output layers can
    /// be painted.
    pub async fn headless(width: u32, height: u32, settings: &PainterSettings) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = Self::request_adapter(&instance, settings, None).await?;
        let (device, queue) = Self::request_device(&adapter, settings).await?;

        let limits = ResourceLimits::from(&device.limits());
        Ok(Self {
            device,
            queue,
            surface: None,
            size: (width, height),
            limits,
            resources: WgpuResources::default(),
            frame: None,
        })
    }

    async fn request_adapter(
        instance: &wgpu::Instance,
        settings: &PainterSettings,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<wgpu::Adapter> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| PainterError::AdapterRequestFailed(e.to_string()))?;
        info!("Using adapter: {}", adapter.get_info().name);
        Ok(adapter)
    }

    async fn request_device(
        adapter: &wgpu::Adapter,
        settings: &PainterSettings,
    ) -> Result<(wgpu::Device, wgpu::Queue)> {
        let pair = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Painter Device"),
                required_features: settings.required_features,
                required_limits: settings.required_limits.clone(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;
        Ok(pair)
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl ResourceRegistry for WgpuBackend {
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId> {
        self.limits.check_buffer(desc)?;
        // Writes must cover whole 4-byte words.
        let size = desc.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: desc.label,
            size,
            usage: desc.usage,
            mapped_at_creation: false,
        });
        Ok(self.resources.buffers.insert(buffer))
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<()> {
        let buffer = self
            .resources
            .buffers
            .get(buffer)
            .ok_or(PainterError::UnknownHandle("buffer"))?;
        self.queue.write_buffer(buffer, offset, data);
        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId> {
        self.limits.check_texture(desc)?;
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: desc.label,
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: desc.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(self.resources.textures.insert(GpuTexture {
            texture: Some(texture),
            view,
        }))
    }

    fn write_texture(&mut self, texture: TextureId, data: &[u8]) -> Result<()> {
        let texture = self
            .resources
            .textures
            .get(texture)
            .and_then(|t| t.texture.as_ref())
            .ok_or(PainterError::UnknownHandle("texture"))?;
        let size = texture.size();
        let block_size = texture.format().block_copy_size(None).unwrap_or(4);

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * block_size),
                rows_per_image: Some(size.height),
            },
            size,
        );
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if let Some(GpuTexture {
            texture: Some(texture),
            ..
        }) = self.resources.textures.remove(texture)
        {
            texture.destroy();
        }
    }

    fn create_sampler(&mut self, desc: &SamplerDesc<'_>) -> Result<SamplerId> {
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: desc.label,
            address_mode_u: desc.address_mode,
            address_mode_v: desc.address_mode,
            address_mode_w: desc.address_mode,
            mag_filter: desc.mag_filter,
            min_filter: desc.min_filter,
            ..Default::default()
        });
        Ok(self.resources.samplers.insert(sampler))
    }

    fn create_shader_module(
        &mut self,
        label: Option<&str>,
        source: &ShaderSource,
    ) -> Result<ModuleId> {
        let source = match source {
            ShaderSource::Wgsl(code) => wgpu::ShaderSource::Wgsl(code.clone()),
            #[cfg(feature = "spirv")]
            ShaderSource::SpirV(words) => wgpu::ShaderSource::SpirV(words.clone()),
        };
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor { label, source });
        Ok(self.resources.modules.insert(module))
    }

    fn create_bind_group_layout(
        &mut self,
        label: Option<&str>,
        entries: &[LayoutEntry],
    ) -> Result<LayoutId> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = entries
            .iter()
            .map(|entry| wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: entry.visibility,
                ty: match entry.kind {
                    BindingKind::UniformBuffer => wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    BindingKind::Sampler => {
                        wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                    }
                    BindingKind::Texture => wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                },
                count: None,
            })
            .collect();

        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label,
                entries: &entries,
            });
        Ok(self.resources.layouts.insert(layout))
    }

    fn create_bind_group(
        &mut self,
        label: Option<&str>,
        layout: LayoutId,
        entries: &[GroupEntry],
    ) -> Result<BindGroupId> {
        let res = &self.resources;
        let layout = res
            .layouts
            .get(layout)
            .ok_or(PainterError::UnknownHandle("bind group layout"))?;

        let entries = entries
            .iter()
            .map(|entry| {
                let resource = match entry.resource {
                    ResourceRef::Buffer(id) => res
                        .buffers
                        .get(id)
                        .ok_or(PainterError::UnknownHandle("buffer"))?
                        .as_entire_binding(),
                    ResourceRef::Sampler(id) => wgpu::BindingResource::Sampler(
                        res.samplers
                            .get(id)
                            .ok_or(PainterError::UnknownHandle("sampler"))?,
                    ),
                    ResourceRef::Texture(id) => wgpu::BindingResource::TextureView(res.view(id)?),
                };
                Ok(wgpu::BindGroupEntry {
                    binding: entry.binding,
                    resource,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label,
            layout,
            entries: &entries,
        });
        Ok(self.resources.bind_groups.insert(group))
    }

    fn release_bind_group(&mut self, group: BindGroupId) {
        self.resources.bind_groups.remove(group);
    }

    fn create_render_pipeline(&mut self, desc: &PipelineDesc<'_>) -> Result<PipelineId> {
        let res = &self.resources;
        let layouts = desc
            .layouts
            .iter()
            .map(|id| {
                res.layouts
                    .get(*id)
                    .ok_or(PainterError::UnknownHandle("bind group layout"))
            })
            .collect::<Result<Vec<_>>>()?;
        let vertex = res
            .modules
            .get(desc.vertex)
            .ok_or(PainterError::UnknownHandle("shader module"))?;
        let fragment = res
            .modules
            .get(desc.fragment)
            .ok_or(PainterError::UnknownHandle("shader module"))?;

        let mut offset = 0;
        let attributes: Vec<wgpu::VertexAttribute> = desc
            .vertex_attributes
            .iter()
            .enumerate()
            .map(|(location, format)| {
                let attribute = wgpu::VertexAttribute {
                    format: *format,
                    offset,
                    shader_location: location as u32,
                };
                offset += format.size();
                attribute
            })
            .collect();
        let vertex_buffers = [wgpu::VertexBufferLayout {
            array_stride: offset,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }];
        let buffers: &[wgpu::VertexBufferLayout] = if attributes.is_empty() {
            &[]
        } else {
            &vertex_buffers
        };

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: desc.label,
                bind_group_layouts: &layouts.iter().copied().map(Some).collect::<Vec<_>>(),
                immediate_size: 0,
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: desc.label,
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: vertex,
                    entry_point: None,
                    buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: fragment,
                    entry_point: None,
                    targets: &[Some(wgpu::ColorTargetState {
                        format: desc.color_format,
                        blend: desc.blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: desc.primitive,
                depth_stencil: desc.depth.map(|depth| wgpu::DepthStencilState {
                    format: depth.format,
                    depth_write_enabled: Some(depth.write_enabled),
                    depth_compare: Some(depth.compare),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: desc.sample_count,
                    ..Default::default()
                },
                multiview_mask: None,
                cache: None,
            });
        Ok(self.resources.pipelines.insert(pipeline))
    }

    fn current_presentation_texture(&self) -> Option<TextureId> {
        self.frame.as_ref().map(|frame| frame.id)
    }

    fn presentation_format(&self) -> Option<wgpu::TextureFormat> {
        self.surface.as_ref().map(|s| s.config.format)
    }

    fn limits(&self) -> ResourceLimits {
        self.limits
    }
}

impl GpuBackend for WgpuBackend {
    type Commands = wgpu::CommandBuffer;
    type Recorder<'a> = WgpuRecorder<'a>;

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        if let Some(state) = &mut self.surface {
            state.config.width = width;
            state.config.height = height;
            state.surface.configure(&self.device, &state.config);
            debug!("Surface reconfigured to {width}x{height}");
        }
    }

    fn begin_frame(&mut self) -> Result<bool> {
        let Some(state) = &self.surface else {
            return Ok(true);
        };
        if self.frame.is_some() {
            return Ok(true);
        }

        let output = match state.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output)
            | wgpu::CurrentSurfaceTexture::Suboptimal(output) => output,
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                warn!("Surface lost, reconfiguring");
                state.surface.configure(&self.device, &state.config);
                return Ok(false);
            }
            wgpu::CurrentSurfaceTexture::Timeout => return Ok(false),
            e @ (wgpu::CurrentSurfaceTexture::Occluded
            | wgpu::CurrentSurfaceTexture::Validation) => {
                return Err(PainterError::Surface(format!("{e:?}")));
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let id = self
            .resources
            .textures
            .insert(GpuTexture { texture: None, view });
        self.frame = Some(AcquiredFrame { output, id });
        Ok(true)
    }

    fn create_recorder(&self, label: Option<&str>) -> WgpuRecorder<'_> {
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label });
        WgpuRecorder {
            resources: &self.resources,
            encoder,
        }
    }

    fn submit(&mut self, commands: wgpu::CommandBuffer) {
        self.queue.submit(Some(commands));
    }

    fn present(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.resources.textures.remove(frame.id);
            frame.output.present();
        }
    }
}

/// Command encoder plus read access to the resource arenas.
pub struct WgpuRecorder<'a> {
    resources: &'a WgpuResources,
    encoder: wgpu::CommandEncoder,
}

impl CommandRecorder for WgpuRecorder<'_> {
    type Commands = wgpu::CommandBuffer;

    fn begin_pass<'p>(&'p mut self, desc: &PassDesc<'_>) -> Result<Box<dyn PassRecorder + 'p>> {
        let res = self.resources;
        let view = res.view(desc.color.target)?;
        let resolve_target = desc.color.resolve_target.map(|id| res.view(id)).transpose()?;
        let depth_view = desc.depth.map(|d| res.view(d.target)).transpose()?;

        let load = match desc.color.load {
            LoadAction::Clear(color) => wgpu::LoadOp::Clear(color),
            LoadAction::Load => wgpu::LoadOp::Load,
        };
        let depth_stencil_attachment = desc.depth.zip(depth_view).map(|(depth, view)| {
            wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(depth.clear),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }
        });

        let pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: desc.label,
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment,
            ..Default::default()
        });

        Ok(Box::new(WgpuPass {
            resources: res,
            pass,
        }))
    }

    fn finish(self) -> wgpu::CommandBuffer {
        self.encoder.finish()
    }
}

struct WgpuPass<'p> {
    resources: &'p WgpuResources,
    pass: wgpu::RenderPass<'p>,
}

impl PassRecorder for WgpuPass<'_> {
    fn set_pipeline(&mut self, pipeline: PipelineId) -> Result<()> {
        let pipeline = self
            .resources
            .pipelines
            .get(pipeline)
            .ok_or(PainterError::UnknownHandle("pipeline"))?;
        self.pass.set_pipeline(pipeline);
        Ok(())
    }

    fn set_bind_group(&mut self, index: u32, group: BindGroupId) -> Result<()> {
        let group = self
            .resources
            .bind_groups
            .get(group)
            .ok_or(PainterError::UnknownHandle("bind group"))?;
        self.pass.set_bind_group(index, group, &[]);
        Ok(())
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<()> {
        let buffer = self
            .resources
            .buffers
            .get(buffer)
            .ok_or(PainterError::UnknownHandle("buffer"))?;
        self.pass.set_vertex_buffer(slot, buffer.slice(..));
        Ok(())
    }

    fn set_index_buffer(&mut self, buffer: BufferId, format: wgpu::IndexFormat) -> Result<()> {
        let buffer = self
            .resources
            .buffers
            .get(buffer)
            .ok_or(PainterError::UnknownHandle("buffer"))?;
        self.pass.set_index_buffer(buffer.slice(..), format);
        Ok(())
    }

    fn draw(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draw(vertices, instances);
    }

    fn draw_indexed(&mut self, indices: Range<u32>, base_vertex: i32, instances: Range<u32>) {
        self.pass.draw_indexed(indices, base_vertex, instances);
    }
}
