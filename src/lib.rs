//! # Painter
//!
//! Retained-mode layers, shapes and effects on top of `wgpu`.
//!
//! Geometry ([`Form`]), programs ([`Shader`]), draw instances ([`Shape`])
//! and fullscreen post-processing passes ([`Effect`]) are created once
//! through a [`Painter`] and attached to [`Layer`]s. A layer decides from
//! its composition how many passes to record each frame and manages the
//! intermediate textures a chain of effects needs.
//!
//! # Modules
//!
//! - [`uniform`]: typed uniform values and their GPU byte layout
//! - [`binding`]: binding slots, sources and the resolver
//! - [`pipeline`]: the render pipeline cache
//! - [`drawable`]: shapes and effects
//! - [`layer`]: composition, pass planning and render targets
//! - [`backend`]: the GPU seam and its wgpu and headless implementations
//! - [`app`]: a winit runner (feature `winit`)

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

#[cfg(feature = "winit")]
pub mod app;
pub mod backend;
pub mod binding;
pub mod drawable;
pub mod errors;
pub mod form;
pub mod layer;
pub mod painter;
pub mod pipeline;
pub mod settings;
pub mod shader;
pub mod uniform;

pub use backend::{GpuBackend, HeadlessBackend, ResourceRegistry, WgpuBackend};
pub use binding::{BindingBuffer, BindingSource, Bindings};
pub use drawable::{Effect, EffectConfig, Shape, ShapeConfig};
pub use errors::{ErrorKind, PainterError, Result};
pub use form::{Form, FormConfig};
pub use layer::{Composition, Layer, LayerConfig, LayerOutput, LayerSize};
pub use painter::{
    EffectId, FormId, LayerId, Painter, SamplerConfig, ShaderId, ShapeId, TextureConfig,
};
pub use settings::PainterSettings;
pub use shader::{Shader, ShaderConfig};
pub use uniform::{AlignedBytes, Uniform, UniformValue, to_aligned};

// Re-export external crates used in the public API
pub use glam;
pub use wgpu;

pub mod prelude {
    #[cfg(feature = "winit")]
    pub use crate::app::{AppConfig, CanvasApp, Event};
    pub use crate::binding::{
        BINDING_BUFFER_BOTH, BINDING_BUFFER_FRAG, BINDING_BUFFER_VERT, BINDING_LAYER_FRAG,
        BINDING_SAMPLER_FRAG, BINDING_TEXTURE_FRAG, BindingBuffer, BindingSource,
    };
    pub use crate::bindings;
    pub use crate::errors::{PainterError, Result};
    pub use crate::layer::{LayerOutput, LayerSize};
    pub use crate::painter::{EffectId, FormId, LayerId, Painter, ShaderId, ShapeId};
    pub use crate::settings::PainterSettings;
    pub use glam::{Mat3, Mat4, UVec2, Vec2, Vec3, Vec4};
}
