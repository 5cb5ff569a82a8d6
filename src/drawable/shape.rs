use super::{DrawTarget, Drawable};
use crate::backend::{BindGroupId, DepthState, PassRecorder, PipelineId, ResourceRegistry};
use crate::binding::{BindingResolver, Bindings, ConstantPool, ResolvedBindings};
use crate::errors::{PainterError, Result};
use crate::form::Form;
use crate::painter::{FormId, ShaderId};
use crate::pipeline::{GeometryKey, PipelineKey, RenderState};
use crate::shader::{Shader, ShaderStage};

/// Configuration of a [`Shape`].
#[derive(Debug, Clone)]
pub struct ShapeConfig {
    pub form: FormId,
    pub shader: ShaderId,
    /// Group 0 sources.
    pub bindings: Bindings,
    /// Group 1 sources.
    pub layer_bindings: Bindings,
    pub cull_mode: Option<wgpu::Face>,
    pub front_face: wgpu::FrontFace,
    /// Only used when the layer has depth testing enabled.
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
    pub blend: Option<wgpu::BlendState>,
    pub instances: u32,
}

impl ShapeConfig {
    #[must_use]
    pub fn new(form: FormId, shader: ShaderId) -> Self {
        Self {
            form,
            shader,
            bindings: Bindings::new(),
            layer_bindings: Bindings::new(),
            cull_mode: Some(wgpu::Face::Back),
            front_face: wgpu::FrontFace::Ccw,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
            blend: None,
            instances: 1,
        }
    }
}

/// A form drawn with a shader and resolved bindings.
#[derive(Debug, Clone)]
pub struct Shape {
    form: Form,
    shader: ShaderId,
    bindings: ResolvedBindings,
    cull_mode: Option<wgpu::Face>,
    front_face: wgpu::FrontFace,
    depth_write: bool,
    depth_compare: wgpu::CompareFunction,
    blend: Option<wgpu::BlendState>,
    instances: u32,
}

impl Shape {
    pub(crate) fn new<R>(
        registry: &mut R,
        constants: &mut ConstantPool,
        form: &Form,
        shader: &Shader,
        config: &ShapeConfig,
    ) -> Result<Self>
    where
        R: ResourceRegistry + ?Sized,
    {
        if !shader.has_vertex_stage() {
            return Err(PainterError::MissingStage(ShaderStage::Vertex));
        }
        if form.vertex_stride() != shader.vertex_stride() {
            return Err(PainterError::InvalidForm(format!(
                "vertex stride {} does not match the shader attributes ({} bytes)",
                form.vertex_stride(),
                shader.vertex_stride()
            )));
        }

        let bindings = BindingResolver::new(registry, constants).resolve(
            shader,
            &config.bindings,
            &config.layer_bindings,
            false,
        )?;

        Ok(Self {
            form: *form,
            shader: config.shader,
            bindings,
            cull_mode: config.cull_mode,
            front_face: config.front_face,
            depth_write: config.depth_write,
            depth_compare: config.depth_compare,
            blend: config.blend,
            instances: config.instances.max(1),
        })
    }

    #[inline]
    #[must_use]
    pub fn form(&self) -> &Form {
        &self.form
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
}

impl Drawable for Shape {
    fn pipeline_key(&self, target: &DrawTarget) -> PipelineKey {
        PipelineKey {
            geometry: GeometryKey::Form {
                stride: self.form.vertex_stride(),
                topology: self.form.topology(),
                strip_index_format: self.form.strip_index_format(),
            },
            shader: self.shader,
            state: RenderState {
                cull_mode: self.cull_mode,
                front_face: self.front_face,
                depth: target.depth_format.map(|format| DepthState {
                    format,
                    write_enabled: self.depth_write,
                    compare: self.depth_compare,
                }),
                blend: self.blend.map(Into::into),
            },
            color_format: target.color_format,
            sample_count: target.sample_count,
        }
    }

    fn draw(
        &self,
        pass: &mut dyn PassRecorder,
        pipeline: PipelineId,
        _input: Option<BindGroupId>,
    ) -> Result<()> {
        pass.set_pipeline(pipeline)?;
        for (index, group) in self.bindings.bind_groups() {
            pass.set_bind_group(index, group)?;
        }
        pass.set_vertex_buffer(0, self.form.vertex_buffer())?;

        let instances = 0..self.instances;
        match self.form.index_buffer() {
            Some(indices) => {
                pass.set_index_buffer(indices, wgpu::IndexFormat::Uint32)?;
                pass.draw_indexed(0..self.form.index_count(), 0, instances);
            }
            None => pass.draw(0..self.form.vertex_count(), instances),
        }
        Ok(())
    }
}
