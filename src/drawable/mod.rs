//! Drawables
//!
//! A [`Shape`] draws a form, an [`Effect`] draws the fullscreen quad. Both
//! resolve their bindings once at creation; the layer that renders them
//! supplies the pipeline (which depends on the layer's targets).

mod effect;
mod shape;

pub use effect::{Effect, EffectConfig};
pub use shape::{Shape, ShapeConfig};

use crate::backend::{BindGroupId, PassRecorder, PipelineId};
use crate::errors::Result;
use crate::pipeline::PipelineKey;

/// Color and depth configuration of the pass a drawable renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawTarget {
    pub color_format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub depth_format: Option<wgpu::TextureFormat>,
}

/// Anything that issues one draw into an open render pass.
pub trait Drawable {
    /// Pipeline signature for rendering into `target`.
    fn pipeline_key(&self, target: &DrawTarget) -> PipelineKey;

    /// Binds `pipeline`, the drawable's resources and `input` (the upstream
    /// group of an effect), then draws.
    fn draw(
        &self,
        pass: &mut dyn PassRecorder,
        pipeline: PipelineId,
        input: Option<BindGroupId>,
    ) -> Result<()>;
}
