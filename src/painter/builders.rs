//! Fluent builders. Each one only fills a config struct and hands it to the
//! matching `Painter::create_*` call.

use super::{EffectId, FormId, LayerId, Painter, ShaderId, ShapeId};
use crate::backend::{GpuBackend, ShaderSource};
use crate::binding::{BindingDecl, Bindings};
use crate::drawable::{EffectConfig, ShapeConfig};
use crate::errors::Result;
use crate::form::FormConfig;
use crate::layer::{LayerConfig, LayerOutput, LayerSize};
use crate::shader::ShaderConfig;

pub struct FormBuilder<'p, 'a, B: GpuBackend> {
    painter: &'p mut Painter<B>,
    config: FormConfig<'a>,
}

impl<'p, 'a, B: GpuBackend> FormBuilder<'p, 'a, B> {
    pub(super) fn new(painter: &'p mut Painter<B>, config: FormConfig<'a>) -> Self {
        Self { painter, config }
    }

    #[must_use]
    pub fn with_indices(mut self, indices: &'a [u32]) -> Self {
        self.config.indices = Some(indices);
        self
    }

    #[must_use]
    pub fn with_topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.config.topology = topology;
        self
    }

    pub fn create(self) -> Result<FormId> {
        self.painter.create_form(&self.config)
    }
}

pub struct ShaderBuilder<'p, B: GpuBackend> {
    painter: &'p mut Painter<B>,
    config: ShaderConfig,
}

impl<'p, B: GpuBackend> ShaderBuilder<'p, B> {
    pub(super) fn new(painter: &'p mut Painter<B>, config: ShaderConfig) -> Self {
        Self { painter, config }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.config.label = Some(label.into());
        self
    }

    /// Group 0 slots, indexed by position.
    #[must_use]
    pub fn with_bindings(mut self, bindings: &[BindingDecl]) -> Self {
        self.config.bindings = bindings.to_vec();
        self
    }

    /// Group 1 texture slots, indexed by position.
    #[must_use]
    pub fn with_layer_bindings(mut self, bindings: &[BindingDecl]) -> Self {
        self.config.layer_bindings = bindings.to_vec();
        self
    }

    #[must_use]
    pub fn with_vertex(mut self, source: impl Into<ShaderSource>) -> Self {
        self.config.vertex = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_fragment(mut self, source: impl Into<ShaderSource>) -> Self {
        self.config.fragment = Some(source.into());
        self
    }

    pub fn create(self) -> Result<ShaderId> {
        self.painter.create_shader(&self.config)
    }
}

pub struct ShapeBuilder<'p, B: GpuBackend> {
    painter: &'p mut Painter<B>,
    config: ShapeConfig,
}

impl<'p, B: GpuBackend> ShapeBuilder<'p, B> {
    pub(super) fn new(painter: &'p mut Painter<B>, config: ShapeConfig) -> Self {
        Self { painter, config }
    }

    #[must_use]
    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.config.bindings = bindings;
        self
    }

    #[must_use]
    pub fn with_layer_bindings(mut self, bindings: Bindings) -> Self {
        self.config.layer_bindings = bindings;
        self
    }

    #[must_use]
    pub fn with_cull_mode(mut self, cull_mode: Option<wgpu::Face>) -> Self {
        self.config.cull_mode = cull_mode;
        self
    }

    #[must_use]
    pub fn with_front_face(mut self, front_face: wgpu::FrontFace) -> Self {
        self.config.front_face = front_face;
        self
    }

    #[must_use]
    pub fn with_depth_write(mut self, enabled: bool) -> Self {
        self.config.depth_write = enabled;
        self
    }

    #[must_use]
    pub fn with_depth_compare(mut self, compare: wgpu::CompareFunction) -> Self {
        self.config.depth_compare = compare;
        self
    }

    #[must_use]
    pub fn with_blend_state(mut self, blend: wgpu::BlendState) -> Self {
        self.config.blend = Some(blend);
        self
    }

    #[must_use]
    pub fn with_instances(mut self, instances: u32) -> Self {
        self.config.instances = instances;
        self
    }

    pub fn create(self) -> Result<ShapeId> {
        self.painter.create_shape(&self.config)
    }
}

pub struct EffectBuilder<'p, B: GpuBackend> {
    painter: &'p mut Painter<B>,
    config: EffectConfig,
}

impl<'p, B: GpuBackend> EffectBuilder<'p, B> {
    pub(super) fn new(painter: &'p mut Painter<B>, config: EffectConfig) -> Self {
        Self { painter, config }
    }

    #[must_use]
    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.config.bindings = bindings;
        self
    }

    /// Group 1 sources. Slot 0 is reserved for the upstream pass when the
    /// effect is chained after shapes.
    #[must_use]
    pub fn with_layer_bindings(mut self, bindings: Bindings) -> Self {
        self.config.layer_bindings = bindings;
        self
    }

    #[must_use]
    pub fn with_blend_state(mut self, blend: wgpu::BlendState) -> Self {
        self.config.blend = Some(blend);
        self
    }

    pub fn create(self) -> Result<EffectId> {
        self.painter.create_effect(&self.config)
    }
}

pub struct LayerBuilder<'p, B: GpuBackend> {
    painter: &'p mut Painter<B>,
    config: LayerConfig,
}

impl<'p, B: GpuBackend> LayerBuilder<'p, B> {
    pub(super) fn new(painter: &'p mut Painter<B>) -> Self {
        Self {
            painter,
            config: LayerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_shape(mut self, shape: ShapeId) -> Self {
        self.config.shapes.push(shape);
        self
    }

    #[must_use]
    pub fn with_shapes(mut self, shapes: &[ShapeId]) -> Self {
        self.config.shapes.extend_from_slice(shapes);
        self
    }

    #[must_use]
    pub fn with_effect(mut self, effect: EffectId) -> Self {
        self.config.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: &[EffectId]) -> Self {
        self.config.effects.extend_from_slice(effects);
        self
    }

    /// A fixed-size layer. Implies texture output.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.config.size = LayerSize::Fixed { width, height };
        self.config.output = LayerOutput::Texture;
        self
    }

    #[must_use]
    pub fn with_clear_color(mut self, color: wgpu::Color) -> Self {
        self.config.clear_color = Some(color);
        self
    }

    #[must_use]
    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.config.depth_test = enabled;
        self
    }

    #[must_use]
    pub fn with_multisampling(mut self, enabled: bool) -> Self {
        self.config.multisampling = enabled;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.config.format = Some(format);
        self
    }

    /// Renders into an owned texture instead of the surface.
    #[must_use]
    pub fn offscreen(mut self) -> Self {
        self.config.output = LayerOutput::Texture;
        self
    }

    pub fn create(self) -> Result<LayerId> {
        self.painter.create_layer(self.config)
    }
}
