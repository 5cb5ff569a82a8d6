//! Pipeline signatures.
//!
//! `wgpu` blend descriptors do not implement `Hash` / `Eq`, so the key uses
//! mirror types holding just the fields that decide pipeline identity.

use crate::backend::DepthState;
use crate::painter::ShaderId;

// ─── Hashable Mirror Types ────────────────────────────────────────────────────

/// Hashable mirror of `wgpu::BlendComponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponentKey {
    pub src_factor: wgpu::BlendFactor,
    pub dst_factor: wgpu::BlendFactor,
    pub operation: wgpu::BlendOperation,
}

impl From<wgpu::BlendComponent> for BlendComponentKey {
    fn from(b: wgpu::BlendComponent) -> Self {
        Self {
            src_factor: b.src_factor,
            dst_factor: b.dst_factor,
            operation: b.operation,
        }
    }
}

impl From<BlendComponentKey> for wgpu::BlendComponent {
    fn from(b: BlendComponentKey) -> Self {
        Self {
            src_factor: b.src_factor,
            dst_factor: b.dst_factor,
            operation: b.operation,
        }
    }
}

/// Hashable mirror of `wgpu::BlendState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendStateKey {
    pub color: BlendComponentKey,
    pub alpha: BlendComponentKey,
}

impl From<wgpu::BlendState> for BlendStateKey {
    fn from(b: wgpu::BlendState) -> Self {
        Self {
            color: b.color.into(),
            alpha: b.alpha.into(),
        }
    }
}

impl From<BlendStateKey> for wgpu::BlendState {
    fn from(b: BlendStateKey) -> Self {
        Self {
            color: b.color.into(),
            alpha: b.alpha.into(),
        }
    }
}

// ─── Signature ───────────────────────────────────────────────────────────────

/// Geometry a pipeline consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKey {
    /// A form's vertex layout: stride plus primitive assembly.
    Form {
        stride: u64,
        topology: wgpu::PrimitiveTopology,
        strip_index_format: Option<wgpu::IndexFormat>,
    },
    /// The vertex-less 4-vertex strip used by effects.
    FullscreenQuad,
}

/// Fixed-function state of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderState {
    pub cull_mode: Option<wgpu::Face>,
    pub front_face: wgpu::FrontFace,
    pub depth: Option<DepthState>,
    pub blend: Option<BlendStateKey>,
}

impl RenderState {
    /// State of an effect pass: no culling and no depth.
    #[must_use]
    pub fn effect(blend: Option<wgpu::BlendState>) -> Self {
        Self {
            cull_mode: None,
            front_face: wgpu::FrontFace::Ccw,
            depth: None,
            blend: blend.map(Into::into),
        }
    }
}

/// Full structural signature of a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub geometry: GeometryKey,
    pub shader: ShaderId,
    pub state: RenderState,
    pub color_format: wgpu::TextureFormat,
    pub sample_count: u32,
}

impl PipelineKey {
    pub(crate) fn primitive(&self) -> wgpu::PrimitiveState {
        match self.geometry {
            GeometryKey::Form {
                topology,
                strip_index_format,
                ..
            } => wgpu::PrimitiveState {
                topology,
                strip_index_format,
                front_face: self.state.front_face,
                cull_mode: self.state.cull_mode,
                ..Default::default()
            },
            GeometryKey::FullscreenQuad => wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                front_face: self.state.front_face,
                cull_mode: None,
                ..Default::default()
            },
        }
    }
}
