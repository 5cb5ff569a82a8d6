//! Painter Context
//!
//! [`Painter`] is the explicit context every object is created through. It
//! owns the GPU backend, one arena per object kind, the pipeline cache, the
//! pooled constant buffers and the queue of textures waiting for a frame
//! boundary before destruction.
//!
//! # Frame Flow
//!
//! ```rust,ignore
//! let mut p = Painter::new(window, 800, 600, PainterSettings::default()).await?;
//!
//! let form = p.form(&VERTICES).create()?;
//! let shader = p
//!     .shade(&[wgpu::VertexFormat::Float32x2])
//!     .with_bindings(&[BINDING_BUFFER_FRAG])
//!     .with_vertex(VERT_WGSL)
//!     .with_fragment(FRAG_WGSL)
//!     .create()?;
//! let color = p.bind_vec4(Vec4::ONE)?;
//! let shape = p
//!     .shape(form, shader)
//!     .with_bindings(bindings! { 0 => color.binding() })
//!     .create()?;
//! let layer = p.layer().with_shape(shape).with_clear_color(wgpu::Color::BLACK).create()?;
//!
//! // Every frame
//! color.update(&mut p, Vec4::new(1.0, 0.0, 0.0, 1.0))?;
//! p.paint_and_show(layer)?;
//! ```

mod builders;

pub use builders::{EffectBuilder, FormBuilder, LayerBuilder, ShaderBuilder, ShapeBuilder};

use bytemuck::Pod;
use glam::{Mat3, Mat4, UVec2, Vec2, Vec3, Vec4};
use log::{debug, info, warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use slotmap::{SlotMap, new_key_type};

use crate::backend::{
    CommandRecorder, GpuBackend, SamplerDesc, SamplerId, TextureDesc, TextureId, WgpuBackend,
};
use crate::binding::{BindingBuffer, ConstantPool};
use crate::drawable::{Effect, EffectConfig, Shape, ShapeConfig};
use crate::errors::{PainterError, Result};
use crate::form::{Form, FormConfig};
use crate::layer::{Layer, LayerConfig, LayerContext, LayerOutput, RetireQueue};
use crate::pipeline::PipelineCache;
use crate::settings::PainterSettings;
use crate::shader::{ModuleCache, Shader, ShaderConfig};
use crate::uniform::Uniform;

new_key_type! {
    /// Handle to a [`Form`].
    pub struct FormId;
    /// Handle to a [`Shader`].
    pub struct ShaderId;
    /// Handle to a [`Shape`].
    pub struct ShapeId;
    /// Handle to an [`Effect`].
    pub struct EffectId;
    /// Handle to a [`Layer`].
    pub struct LayerId;
}

/// Configuration of a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// `None` uses [`PainterSettings::default_address_mode`].
    pub address_mode: Option<wgpu::AddressMode>,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
}

impl SamplerConfig {
    pub const LINEAR: Self = Self {
        address_mode: None,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
    };

    pub const NEAREST: Self = Self {
        address_mode: None,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
    };
}

/// Configuration of a sampled texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureConfig<'a> {
    pub label: Option<&'a str>,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    /// Tightly packed texel rows, uploaded once at creation.
    pub data: Option<&'a [u8]>,
}

impl<'a> TextureConfig<'a> {
    /// An `Rgba8UnormSrgb` texture filled with `data`.
    #[must_use]
    pub fn rgba8(width: u32, height: u32, data: &'a [u8]) -> Self {
        Self {
            label: None,
            width,
            height,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            data: Some(data),
        }
    }
}

/// Builds a [`LayerContext`] from the painter's fields so the layer arena
/// can stay borrowed alongside it.
macro_rules! layer_context {
    ($painter:expr) => {
        LayerContext {
            surface_size: $painter.backend.surface_size(),
            registry: &mut $painter.backend,
            pipelines: &mut $painter.pipelines,
            shaders: &$painter.shaders,
            shapes: &$painter.shapes,
            effects: &$painter.effects,
            settings: &$painter.settings,
            retired: &mut $painter.retired,
            frame_index: $painter.frame_index,
        }
    };
}

/// The retained-mode rendering context.
///
/// Generic over the [`GpuBackend`] so the same code runs on a real device
/// ([`WgpuBackend`], the default) and on the recording
/// [`HeadlessBackend`](crate::backend::HeadlessBackend).
pub struct Painter<B: GpuBackend = WgpuBackend> {
    backend: B,
    settings: PainterSettings,

    forms: SlotMap<FormId, Form>,
    shaders: SlotMap<ShaderId, Shader>,
    shapes: SlotMap<ShapeId, Shape>,
    effects: SlotMap<EffectId, Effect>,
    layers: SlotMap<LayerId, Layer>,

    pipelines: PipelineCache,
    constants: ConstantPool,
    modules: ModuleCache,
    retired: RetireQueue,

    frame_index: u64,
    redraw_requested: bool,
}

impl Painter<WgpuBackend> {
    /// Acquires a device and configures the window surface.
    ///
    /// # Arguments
    ///
    /// * `window` - A window that provides display and window handles
    /// * `width` - Initial surface width in pixels
    /// * `height` - Initial surface height in pixels
    /// * `settings` - Device and default target configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No compatible GPU adapter is found
    /// - The device request fails (unsupported features or limits)
    /// - The surface cannot be created
    pub async fn new<W>(
        window: W,
        width: u32,
        height: u32,
        settings: PainterSettings,
    ) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let backend = WgpuBackend::new(window, width, height, &settings).await?;
        Ok(Self::with_backend(backend, settings))
    }
}

impl<B: GpuBackend> Painter<B> {
    #[must_use]
    pub fn with_backend(backend: B, settings: PainterSettings) -> Self {
        info!(
            "Painter ready: surface {:?}, {}x MSAA",
            backend.presentation_format(),
            settings.msaa_samples
        );
        Self {
            backend,
            settings,
            forms: SlotMap::with_key(),
            shaders: SlotMap::with_key(),
            shapes: SlotMap::with_key(),
            effects: SlotMap::with_key(),
            layers: SlotMap::with_key(),
            pipelines: PipelineCache::new(),
            constants: ConstantPool::default(),
            modules: ModuleCache::default(),
            retired: RetireQueue::default(),
            frame_index: 0,
            redraw_requested: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &PainterSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn pipelines(&self) -> &PipelineCache {
        &self.pipelines
    }

    #[inline]
    #[must_use]
    pub fn surface_size(&self) -> (u32, u32) {
        self.backend.surface_size()
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Starts a [`Form`] from tightly packed vertices.
    pub fn form<'a, T: Pod>(&mut self, vertices: &'a [T]) -> FormBuilder<'_, 'a, B> {
        FormBuilder::new(self, FormConfig::new(vertices))
    }

    /// Uploads a form.
    ///
    /// # Errors
    ///
    /// [`PainterError::InvalidForm`] for empty or inconsistent geometry.
    pub fn create_form(&mut self, config: &FormConfig<'_>) -> Result<FormId> {
        let form = Form::new(&mut self.backend, config)?;
        Ok(self.forms.insert(form))
    }

    /// Starts a [`Shader`] reading the given vertex attributes.
    pub fn shade(&mut self, attributes: &[wgpu::VertexFormat]) -> ShaderBuilder<'_, B> {
        ShaderBuilder::new(
            self,
            ShaderConfig {
                attributes: attributes.to_vec(),
                ..ShaderConfig::default()
            },
        )
    }

    /// Compiles a shader. Identical sources share one module.
    ///
    /// # Errors
    ///
    /// [`PainterError::MissingStage`] without a fragment stage,
    /// [`PainterError::UnsupportedBinding`] for a non-texture layer binding.
    pub fn create_shader(&mut self, config: &ShaderConfig) -> Result<ShaderId> {
        let shader = Shader::new(&mut self.backend, &mut self.modules, config)?;
        debug!(
            "Created shader {:?} ({} bindings, {} layer bindings)",
            config.label,
            config.bindings.len(),
            config.layer_bindings.len()
        );
        Ok(self.shaders.insert(shader))
    }

    pub fn shape(&mut self, form: FormId, shader: ShaderId) -> ShapeBuilder<'_, B> {
        ShapeBuilder::new(self, ShapeConfig::new(form, shader))
    }

    /// Resolves a shape's bindings.
    ///
    /// All bindings are validated before any GPU resource is created.
    ///
    /// # Errors
    ///
    /// Binding errors ([`PainterError::MissingBinding`] and friends),
    /// [`PainterError::MissingStage`] for a shader without a vertex stage,
    /// [`PainterError::UnknownHandle`] for a stale form or shader id.
    pub fn create_shape(&mut self, config: &ShapeConfig) -> Result<ShapeId> {
        let form = self
            .forms
            .get(config.form)
            .ok_or(PainterError::UnknownHandle("form"))?;
        let shader = self
            .shaders
            .get(config.shader)
            .ok_or(PainterError::UnknownHandle("shader"))?;
        let shape = Shape::new(&mut self.backend, &mut self.constants, form, shader, config)?;
        Ok(self.shapes.insert(shape))
    }

    pub fn effect(&mut self, shader: ShaderId) -> EffectBuilder<'_, B> {
        EffectBuilder::new(self, EffectConfig::new(shader))
    }

    /// Resolves an effect's bindings.
    ///
    /// # Errors
    ///
    /// Same as [`create_shape`](Self::create_shape), minus the vertex stage
    /// requirement.
    pub fn create_effect(&mut self, config: &EffectConfig) -> Result<EffectId> {
        let shader = self
            .shaders
            .get(config.shader)
            .ok_or(PainterError::UnknownHandle("shader"))?;
        let effect = Effect::new(&mut self.backend, &mut self.constants, shader, config)?;
        Ok(self.effects.insert(effect))
    }

    pub fn layer(&mut self) -> LayerBuilder<'_, B> {
        LayerBuilder::new(self)
    }

    /// Creates a layer and allocates its targets.
    ///
    /// # Errors
    ///
    /// - [`PainterError::UnsatisfiableComposition`] when an effect reads the
    ///   upstream pass of a layer without shapes, or a fixed-size layer
    ///   targets the surface
    /// - [`PainterError::InvalidLayerSize`] for a zero fixed size
    /// - [`PainterError::NoPresentationTarget`] for a surface layer on a
    ///   surfaceless backend
    /// - [`PainterError::AllocationFailed`] when a target exceeds the device
    ///   limits
    pub fn create_layer(&mut self, config: LayerConfig) -> Result<LayerId> {
        let mut ctx = layer_context!(self);
        let layer = Layer::new(&mut ctx, config)?;
        debug!(
            "Created layer {:?} at {}x{}",
            layer.composition(),
            layer.size().0,
            layer.size().1
        );
        Ok(self.layers.insert(layer))
    }

    /// Creates a sampler.
    pub fn sampler(&mut self, config: &SamplerConfig) -> Result<SamplerId> {
        let address_mode = config
            .address_mode
            .unwrap_or(self.settings.default_address_mode);
        self.backend.create_sampler(&SamplerDesc {
            label: None,
            address_mode,
            mag_filter: config.mag_filter,
            min_filter: config.min_filter,
        })
    }

    pub fn sampler_linear(&mut self) -> Result<SamplerId> {
        self.sampler(&SamplerConfig::LINEAR)
    }

    pub fn sampler_nearest(&mut self) -> Result<SamplerId> {
        self.sampler(&SamplerConfig::NEAREST)
    }

    /// Creates a sampled texture, uploading its data if given.
    ///
    /// # Errors
    ///
    /// [`PainterError::InvalidTexture`] if `data` is not exactly one
    /// tightly packed image.
    pub fn texture(&mut self, config: &TextureConfig<'_>) -> Result<TextureId> {
        if let Some(data) = config.data {
            let texel = u64::from(config.format.block_copy_size(None).unwrap_or(4));
            let expected = u64::from(config.width) * u64::from(config.height) * texel;
            if data.len() as u64 != expected {
                return Err(PainterError::InvalidTexture(format!(
                    "{} bytes given for a {}x{} texture ({expected} expected)",
                    data.len(),
                    config.width,
                    config.height
                )));
            }
        }
        let id = self.backend.create_texture(&TextureDesc {
            label: config.label,
            width: config.width,
            height: config.height,
            format: config.format,
            sample_count: 1,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
        })?;
        if let Some(data) = config.data {
            self.backend.write_texture(id, data)?;
        }
        Ok(id)
    }

    // ========================================================================
    // Uniform buffers
    // ========================================================================

    /// Creates an owned uniform buffer holding `value`.
    pub fn bind_uniform<T: Uniform>(&mut self, value: T) -> Result<BindingBuffer<T>> {
        BindingBuffer::new(&mut self.backend, value)
    }

    pub fn bind_f32(&mut self, value: f32) -> Result<BindingBuffer<f32>> {
        self.bind_uniform(value)
    }

    pub fn bind_vec2(&mut self, value: Vec2) -> Result<BindingBuffer<Vec2>> {
        self.bind_uniform(value)
    }

    pub fn bind_vec3(&mut self, value: Vec3) -> Result<BindingBuffer<Vec3>> {
        self.bind_uniform(value)
    }

    pub fn bind_vec4(&mut self, value: Vec4) -> Result<BindingBuffer<Vec4>> {
        self.bind_uniform(value)
    }

    pub fn bind_mat3(&mut self, value: Mat3) -> Result<BindingBuffer<Mat3>> {
        self.bind_uniform(value)
    }

    pub fn bind_mat4(&mut self, value: Mat4) -> Result<BindingBuffer<Mat4>> {
        self.bind_uniform(value)
    }

    pub fn bind_uvec2(&mut self, value: UVec2) -> Result<BindingBuffer<UVec2>> {
        self.bind_uniform(value)
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Replaces the shapes of a layer. Its targets are reallocated to match
    /// the new composition.
    ///
    /// # Errors
    ///
    /// Same configuration errors as [`create_layer`](Self::create_layer). The
    /// layer keeps its previous shapes on error.
    pub fn set_layer_shapes(&mut self, layer: LayerId, shapes: Vec<ShapeId>) -> Result<()> {
        let mut ctx = layer_context!(self);
        let layer = self
            .layers
            .get_mut(layer)
            .ok_or(PainterError::UnknownHandle("layer"))?;
        layer.set_shapes(&mut ctx, shapes)
    }

    /// Replaces the effect chain of a layer.
    ///
    /// # Errors
    ///
    /// See [`set_layer_shapes`](Self::set_layer_shapes).
    pub fn set_layer_effects(&mut self, layer: LayerId, effects: Vec<EffectId>) -> Result<()> {
        let mut ctx = layer_context!(self);
        let layer = self
            .layers
            .get_mut(layer)
            .ok_or(PainterError::UnknownHandle("layer"))?;
        layer.set_effects(&mut ctx, effects)
    }

    /// Resizes one window-sized layer.
    ///
    /// # Errors
    ///
    /// [`PainterError::FixedSizeResize`] for fixed-size layers.
    pub fn resize_layer(&mut self, layer: LayerId, width: u32, height: u32) -> Result<()> {
        let mut ctx = layer_context!(self);
        let layer = self
            .layers
            .get_mut(layer)
            .ok_or(PainterError::UnknownHandle("layer"))?;
        layer.resize(&mut ctx, width, height)
    }

    /// Resizes the surface and every window-sized layer. Fixed-size layers
    /// are left alone.
    ///
    /// # Errors
    ///
    /// The first layer error. Every window-sized layer is still resized; a
    /// layer that failed has no targets until its next successful resize.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.backend.resize_surface(width, height);
        let mut ctx = layer_context!(self);
        let mut first_error = None;
        for (id, layer) in self.layers.iter_mut().filter(|(_, l)| !l.is_fixed_size()) {
            if let Err(e) = layer.resize(&mut ctx, width, height) {
                warn!("Layer {id:?} failed to resize to {width}x{height}: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Output texture of an off-screen layer, for use as a texture binding.
    ///
    /// # Errors
    ///
    /// [`PainterError::NoPresentationTarget`] for surface layers,
    /// [`PainterError::LayerNotReady`] while a window-sized layer has no
    /// size.
    pub fn layer_texture(&self, layer: LayerId) -> Result<TextureId> {
        let layer = self
            .layers
            .get(layer)
            .ok_or(PainterError::UnknownHandle("layer"))?;
        if layer.config().output == LayerOutput::Surface {
            return Err(PainterError::NoPresentationTarget);
        }
        layer.output_texture().ok_or(PainterError::LayerNotReady)
    }

    /// Removes a layer. Its textures are destroyed now, or at the next
    /// frame boundary if the last submitted frame used them.
    ///
    /// Shapes and effects stay alive; other layers may still draw them.
    pub fn remove_layer(&mut self, layer: LayerId) -> Result<()> {
        let mut layer = self
            .layers
            .remove(layer)
            .ok_or(PainterError::UnknownHandle("layer"))?;
        layer.release(&mut self.backend, &mut self.retired, self.frame_index);
        Ok(())
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Records and submits every pass of one layer.
    pub fn paint(&mut self, layer: LayerId) -> Result<()> {
        self.paint_layers(&[layer])
    }

    /// Records the passes of several layers, in order, into one submission.
    ///
    /// Acquires the presentation texture first if any of them draws to the
    /// surface. Skips the frame silently if the surface is unavailable.
    ///
    /// # Errors
    ///
    /// - [`PainterError::LayerNotReady`] if a layer with something to draw
    ///   has no targets
    /// - [`PainterError::UnknownHandle`] for stale ids
    /// - Surface errors from the backend
    pub fn paint_layers(&mut self, layers: &[LayerId]) -> Result<()> {
        let mut draws_to_surface = false;
        for id in layers {
            let layer = self
                .layers
                .get(*id)
                .ok_or(PainterError::UnknownHandle("layer"))?;
            draws_to_surface |=
                layer.config().output == LayerOutput::Surface && !layer.plan().is_empty();
        }

        let mut output = None;
        if draws_to_surface {
            if !self.backend.begin_frame()? {
                debug!("Surface unavailable, skipping frame {}", self.frame_index);
                return Ok(());
            }
            output = self.backend.current_presentation_texture();
        }

        let mut recorder = self.backend.create_recorder(Some("Painter Frame"));
        for id in layers {
            let layer = self
                .layers
                .get(*id)
                .ok_or(PainterError::UnknownHandle("layer"))?;
            layer.render(&mut recorder, &self.shapes, &self.effects, output)?;
        }
        let commands = recorder.finish();
        self.backend.submit(commands);

        for id in layers {
            if let Some(layer) = self.layers.get_mut(*id) {
                layer.mark_rendered(self.frame_index);
            }
        }
        Ok(())
    }

    /// Presents the frame and crosses the frame boundary: textures retired
    /// during the frame are destroyed now.
    pub fn show(&mut self) {
        self.backend.present();
        self.retired.flush(&mut self.backend);
        self.frame_index += 1;
    }

    pub fn paint_and_show(&mut self, layer: LayerId) -> Result<()> {
        self.paint(layer)?;
        self.show();
        Ok(())
    }

    /// Asks the runner for another redraw after the current one.
    #[inline]
    pub fn request_next_frame(&mut self) {
        self.redraw_requested = true;
    }

    /// Returns and clears the pending redraw request.
    #[inline]
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    /// Number of frame boundaries crossed so far.
    #[inline]
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Resources waiting for the next frame boundary.
    #[inline]
    #[must_use]
    pub fn retired(&self) -> &RetireQueue {
        &self.retired
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[must_use]
    pub fn get_form(&self, id: FormId) -> Option<&Form> {
        self.forms.get(id)
    }

    #[must_use]
    pub fn get_shader(&self, id: ShaderId) -> Option<&Shader> {
        self.shaders.get(id)
    }

    #[must_use]
    pub fn get_shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    #[must_use]
    pub fn get_effect(&self, id: EffectId) -> Option<&Effect> {
        self.effects.get(id)
    }

    #[must_use]
    pub fn get_layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }
}
