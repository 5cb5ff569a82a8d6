use super::{DrawTarget, Drawable};
use crate::backend::{BindGroupId, PassRecorder, PipelineId, ResourceRegistry, TextureId};
use crate::binding::{BindingResolver, Bindings, ConstantPool, ResolvedBindings};
use crate::errors::Result;
use crate::painter::ShaderId;
use crate::pipeline::{GeometryKey, PipelineKey, RenderState};
use crate::shader::Shader;

/// Vertices of the fullscreen triangle strip.
const QUAD_VERTICES: u32 = 4;

/// Configuration of an [`Effect`].
#[derive(Debug, Clone)]
pub struct EffectConfig {
    pub shader: ShaderId,
    /// Group 0 sources.
    pub bindings: Bindings,
    /// Group 1 sources, excluding slot 0 which receives the upstream pass.
    pub layer_bindings: Bindings,
    pub blend: Option<wgpu::BlendState>,
}

impl EffectConfig {
    #[must_use]
    pub fn new(shader: ShaderId) -> Self {
        Self {
            shader,
            bindings: Bindings::new(),
            layer_bindings: Bindings::new(),
            blend: None,
        }
    }
}

/// A fullscreen pass. Never reads an index buffer, never writes depth.
#[derive(Debug, Clone)]
pub struct Effect {
    shader: ShaderId,
    bindings: ResolvedBindings,
    blend: Option<wgpu::BlendState>,
}

impl Effect {
    pub(crate) fn new<R>(
        registry: &mut R,
        constants: &mut ConstantPool,
        shader: &Shader,
        config: &EffectConfig,
    ) -> Result<Self>
    where
        R: ResourceRegistry + ?Sized,
    {
        let bindings = BindingResolver::new(registry, constants).resolve(
            shader,
            &config.bindings,
            &config.layer_bindings,
            shader.has_layer_bindings(),
        )?;

        Ok(Self {
            shader: config.shader,
            bindings,
            blend: config.blend,
        })
    }

    #[inline]
    #[must_use]
    pub fn shader(&self) -> ShaderId {
        self.shader
    }

    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &ResolvedBindings {
        &self.bindings
    }

    /// Whether the effect samples the output of the previous pass.
    #[must_use]
    pub fn consumes_upstream(&self) -> bool {
        self.bindings.pending_group().is_some()
    }

    /// Builds the group-1 bind group with `upstream` at slot 0.
    pub fn bind_upstream<R>(&self, registry: &mut R, upstream: TextureId) -> Result<BindGroupId>
    where
        R: ResourceRegistry + ?Sized,
    {
        self.bindings.bind_upstream(registry, upstream)
    }
}

impl Drawable for Effect {
    fn pipeline_key(&self, target: &DrawTarget) -> PipelineKey {
        PipelineKey {
            geometry: GeometryKey::FullscreenQuad,
            shader: self.shader,
            state: RenderState::effect(self.blend),
            color_format: target.color_format,
            sample_count: 1,
        }
    }

    fn draw(
        &self,
        pass: &mut dyn PassRecorder,
        pipeline: PipelineId,
        input: Option<BindGroupId>,
    ) -> Result<()> {
        pass.set_pipeline(pipeline)?;
        for (index, group) in self.bindings.bind_groups() {
            pass.set_bind_group(index, group)?;
        }
        if let Some(input) = input {
            pass.set_bind_group(1, input)?;
        }
        pass.draw(0..QUAD_VERTICES, 0..1);
        Ok(())
    }
}
