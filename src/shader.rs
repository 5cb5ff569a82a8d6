//! Shaders
//!
//! A [`Shader`] is built once from a [`ShaderConfig`]: its modules are
//! compiled (deduplicated by source hash), its binding slots are fixed and its
//! bind group layouts are created. Nothing about it changes afterwards.

use log::debug;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use xxhash_rust::xxh3::xxh3_64;

use crate::backend::{
    LayoutEntry, LayoutId, ModuleId, ResourceRegistry, ShaderSource, vertex_stride,
};
use crate::binding::{BindingDecl, BindingKind, BindingSlot};
use crate::errors::{PainterError, Result};

/// Vertex stage used by effects that do not provide one.
///
/// Emits a 4-vertex triangle strip covering the target and passes
/// `uv` (0,0 top-left to 1,1 bottom-right) at location 0.
pub const FULLSCREEN_QUAD_WGSL: &str = r"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32(index & 1u), f32(index >> 1u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Everything needed to build a [`Shader`].
#[derive(Debug, Clone, Default)]
pub struct ShaderConfig {
    pub label: Option<String>,
    /// Per-vertex attributes, tightly packed at locations `0..n`.
    pub attributes: Vec<wgpu::VertexFormat>,
    /// Group 0 slots.
    pub bindings: Vec<BindingDecl>,
    /// Group 1 slots; textures only.
    pub layer_bindings: Vec<BindingDecl>,
    pub vertex: Option<ShaderSource>,
    pub fragment: Option<ShaderSource>,
}

/// Compiled modules keyed by the xxh3 hash of their source.
#[derive(Debug, Default)]
pub struct ModuleCache {
    modules: FxHashMap<u64, ModuleId>,
}

impl ModuleCache {
    pub fn get_or_create<R>(
        &mut self,
        registry: &mut R,
        label: Option<&str>,
        source: &ShaderSource,
    ) -> Result<ModuleId>
    where
        R: ResourceRegistry + ?Sized,
    {
        let hash = xxh3_64(source.as_bytes());
        if let Some(id) = self.modules.get(&hash) {
            return Ok(*id);
        }
        let id = registry.create_shader_module(label, source)?;
        debug!("Compiled shader module {id:?} ({hash:016x})");
        self.modules.insert(hash, id);
        Ok(id)
    }

    pub fn fullscreen_quad<R>(&mut self, registry: &mut R) -> Result<ModuleId>
    where
        R: ResourceRegistry + ?Sized,
    {
        self.get_or_create(
            registry,
            Some("Fullscreen Quad"),
            &ShaderSource::from(FULLSCREEN_QUAD_WGSL),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// A built shader program.
#[derive(Debug, Clone)]
pub struct Shader {
    attributes: SmallVec<[wgpu::VertexFormat; 4]>,
    bindings: Vec<BindingSlot>,
    layer_bindings: Vec<BindingSlot>,
    vertex: ModuleId,
    vertex_declared: bool,
    fragment: ModuleId,
    layouts: SmallVec<[LayoutId; 2]>,
}

impl Shader {
    pub fn new<R>(
        registry: &mut R,
        modules: &mut ModuleCache,
        config: &ShaderConfig,
    ) -> Result<Self>
    where
        R: ResourceRegistry + ?Sized,
    {
        let fragment_source = config
            .fragment
            .as_ref()
            .ok_or(PainterError::MissingStage(ShaderStage::Fragment))?;

        let bindings = to_slots(&config.bindings);
        let layer_bindings = to_slots(&config.layer_bindings);
        if let Some(slot) = layer_bindings
            .iter()
            .find(|slot| slot.kind != BindingKind::Texture)
        {
            return Err(PainterError::UnsupportedBinding {
                group: 1,
                slot: slot.index,
                kind: slot.kind,
            });
        }

        let label = config.label.as_deref();
        let fragment = modules.get_or_create(registry, label, fragment_source)?;
        let (vertex, vertex_declared) = match &config.vertex {
            Some(source) => (modules.get_or_create(registry, label, source)?, true),
            None => (modules.fullscreen_quad(registry)?, false),
        };

        // Group 0 exists whenever group 1 does, even if it holds nothing.
        let mut layouts = SmallVec::new();
        if !bindings.is_empty() || !layer_bindings.is_empty() {
            layouts.push(registry.create_bind_group_layout(label, &layout_entries(&bindings))?);
        }
        if !layer_bindings.is_empty() {
            let entries = layout_entries(&layer_bindings);
            layouts.push(registry.create_bind_group_layout(label, &entries)?);
        }

        Ok(Self {
            attributes: config.attributes.iter().copied().collect(),
            bindings,
            layer_bindings,
            vertex,
            vertex_declared,
            fragment,
            layouts,
        })
    }

    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[wgpu::VertexFormat] {
        &self.attributes
    }

    /// Byte stride a form must have to feed this shader.
    #[must_use]
    pub fn vertex_stride(&self) -> u64 {
        vertex_stride(&self.attributes)
    }

    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &[BindingSlot] {
        &self.bindings
    }

    #[inline]
    #[must_use]
    pub fn layer_bindings(&self) -> &[BindingSlot] {
        &self.layer_bindings
    }

    /// Whether the shader reads the output of a previous pass (group 1).
    #[inline]
    #[must_use]
    pub fn has_layer_bindings(&self) -> bool {
        !self.layer_bindings.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn vertex_module(&self) -> ModuleId {
        self.vertex
    }

    /// `false` when the built-in fullscreen vertex stage stands in.
    #[inline]
    #[must_use]
    pub fn has_vertex_stage(&self) -> bool {
        self.vertex_declared
    }

    #[inline]
    #[must_use]
    pub fn fragment_module(&self) -> ModuleId {
        self.fragment
    }

    /// Bind group layouts in group order.
    #[inline]
    #[must_use]
    pub fn layouts(&self) -> &[LayoutId] {
        &self.layouts
    }

    #[must_use]
    pub fn group_layout(&self, group: u32) -> Option<LayoutId> {
        self.layouts.get(group as usize).copied()
    }
}

fn to_slots(decls: &[BindingDecl]) -> Vec<BindingSlot> {
    decls
        .iter()
        .enumerate()
        .map(|(index, decl)| BindingSlot {
            index: index as u32,
            kind: decl.kind,
            visibility: decl.visibility,
        })
        .collect()
}

fn layout_entries(slots: &[BindingSlot]) -> SmallVec<[LayoutEntry; 8]> {
    slots
        .iter()
        .map(|slot| LayoutEntry {
            binding: slot.index,
            visibility: slot.visibility.stages(),
            kind: slot.kind,
        })
        .collect()
}
