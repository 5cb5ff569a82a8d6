//! Bindings
//!
//! A shader declares its binding slots once, at creation. Drawables then
//! supply one [`BindingSource`] per declared slot and the
//! [`BindingResolver`] turns the pair into concrete bind groups:
//!
//! - group 0: per-draw uniforms, samplers and textures,
//! - group 1: external texture inputs (for effects, slot 0 is the output of
//!   the previous pass and is bound by the layer).
//!
//! ```rust,ignore
//! let shape = p
//!     .shape(form, shader)
//!     .with_bindings(bindings! {
//!         0 => view_proj.binding(),
//!         1 => BindingSource::constant(Mat4::IDENTITY),
//!     })
//!     .create()?;
//! ```

mod buffer;
mod resolve;

pub use buffer::BindingBuffer;
pub use resolve::{BindingResolver, ConstantPool, ResolvedBinding, ResolvedBindings, ResolvedGroup};

use crate::backend::{BufferId, SamplerId, TextureId};
use crate::uniform::UniformValue;

/// Resource kind a slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    UniformBuffer,
    Sampler,
    Texture,
}

/// Shader stages a slot is visible to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Vertex,
    Fragment,
    Both,
}

impl Visibility {
    #[must_use]
    pub fn stages(self) -> wgpu::ShaderStages {
        match self {
            Self::Vertex => wgpu::ShaderStages::VERTEX,
            Self::Fragment => wgpu::ShaderStages::FRAGMENT,
            Self::Both => wgpu::ShaderStages::VERTEX_FRAGMENT,
        }
    }
}

/// A slot declaration as written in a shader config; its index is its
/// position in the declaration list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingDecl {
    pub kind: BindingKind,
    pub visibility: Visibility,
}

impl BindingDecl {
    #[must_use]
    pub const fn new(kind: BindingKind, visibility: Visibility) -> Self {
        Self { kind, visibility }
    }
}

pub const BINDING_BUFFER_VERT: BindingDecl =
    BindingDecl::new(BindingKind::UniformBuffer, Visibility::Vertex);
pub const BINDING_BUFFER_FRAG: BindingDecl =
    BindingDecl::new(BindingKind::UniformBuffer, Visibility::Fragment);
pub const BINDING_BUFFER_BOTH: BindingDecl =
    BindingDecl::new(BindingKind::UniformBuffer, Visibility::Both);
pub const BINDING_SAMPLER_FRAG: BindingDecl =
    BindingDecl::new(BindingKind::Sampler, Visibility::Fragment);
pub const BINDING_TEXTURE_FRAG: BindingDecl =
    BindingDecl::new(BindingKind::Texture, Visibility::Fragment);
/// Group-1 texture input (slot 0 of an effect receives the upstream pass).
pub const BINDING_LAYER_FRAG: BindingDecl =
    BindingDecl::new(BindingKind::Texture, Visibility::Fragment);

/// A declared slot of a built shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingSlot {
    pub index: u32,
    pub kind: BindingKind,
    pub visibility: Visibility,
}

/// Where the resource for a slot comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingSource {
    /// A live uniform buffer; later writes are visible without re-resolving.
    Buffer(BufferId),
    /// A fixed value, materialized once into a pooled buffer.
    Const(UniformValue),
    Sampler(SamplerId),
    Texture(TextureId),
}

impl BindingSource {
    #[must_use]
    pub fn constant(value: impl Into<UniformValue>) -> Self {
        Self::Const(value.into())
    }

    #[must_use]
    pub fn kind(&self) -> BindingKind {
        match self {
            Self::Buffer(_) | Self::Const(_) => BindingKind::UniformBuffer,
            Self::Sampler(_) => BindingKind::Sampler,
            Self::Texture(_) => BindingKind::Texture,
        }
    }
}

impl From<SamplerId> for BindingSource {
    fn from(id: SamplerId) -> Self {
        Self::Sampler(id)
    }
}

impl From<TextureId> for BindingSource {
    fn from(id: TextureId) -> Self {
        Self::Texture(id)
    }
}

/// Slot index to source pairs supplied by the caller.
pub type Bindings = Vec<(u32, BindingSource)>;

/// Builds [`Bindings`] from `slot => source` pairs.
///
/// ```rust,ignore
/// let bindings = bindings! { 0 => cam.binding(), 1 => sampler.into() };
/// ```
#[macro_export]
macro_rules! bindings {
    () => {
        $crate::binding::Bindings::new()
    };
    ($($slot:expr => $source:expr),+ $(,)?) => {
        vec![$(($slot, $crate::binding::BindingSource::from($source))),+]
    };
}
