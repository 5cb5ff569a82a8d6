use log::debug;
use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};

use super::{BindingSlot, BindingSource};
use crate::backend::{
    BindGroupId, BufferDesc, BufferId, GroupEntry, LayoutId, ResourceRef, ResourceRegistry,
    TextureId,
};
use crate::errors::{PainterError, Result};
use crate::shader::Shader;
use crate::uniform::{AlignedBytes, UniformValue, to_aligned};

/// Owned buffers holding constant binding values, shared by equal bytes.
#[derive(Debug, Default)]
pub struct ConstantPool {
    buffers: FxHashMap<AlignedBytes, BufferId>,
}

impl ConstantPool {
    pub fn get_or_create<R>(&mut self, registry: &mut R, value: UniformValue) -> Result<BufferId>
    where
        R: ResourceRegistry + ?Sized,
    {
        let bytes = to_aligned(value);
        if let Some(id) = self.buffers.get(&bytes) {
            return Ok(*id);
        }

        let id = registry.create_buffer(&BufferDesc {
            label: Some("Constant Uniform"),
            size: bytes.size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })?;
        registry.write_buffer(id, 0, bytes.as_bytes())?;
        debug!("Materialized constant {:?} into {id:?}", value.kind());

        self.buffers.insert(bytes, id);
        Ok(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// A declared slot paired with the resource bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub slot: BindingSlot,
    pub resource: ResourceRef,
}

/// The resolved contents of one bind group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGroup {
    pub index: u32,
    pub layout: LayoutId,
    pub bindings: SmallVec<[ResolvedBinding; 4]>,
    /// `None` while slot 0 waits for the upstream texture of a layer.
    pub bind_group: Option<BindGroupId>,
}

impl ResolvedGroup {
    fn entries(&self) -> SmallVec<[GroupEntry; 4]> {
        self.bindings
            .iter()
            .map(|b| GroupEntry {
                binding: b.slot.index,
                resource: b.resource,
            })
            .collect()
    }
}

/// Up to two resolved groups in ascending index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedBindings {
    groups: SmallVec<[ResolvedGroup; 2]>,
}

impl ResolvedBindings {
    #[must_use]
    pub fn groups(&self) -> &[ResolvedGroup] {
        &self.groups
    }

    /// Complete groups as `(index, bind group)` pairs.
    pub fn bind_groups(&self) -> impl Iterator<Item = (u32, BindGroupId)> + '_ {
        self.groups
            .iter()
            .filter_map(|g| g.bind_group.map(|bg| (g.index, bg)))
    }

    /// The group waiting for an upstream texture, if any.
    #[must_use]
    pub fn pending_group(&self) -> Option<&ResolvedGroup> {
        self.groups.iter().find(|g| g.bind_group.is_none())
    }

    /// Every resource referenced across all groups.
    pub fn resources(&self) -> impl Iterator<Item = ResourceRef> + '_ {
        self.groups
            .iter()
            .flat_map(|g| g.bindings.iter().map(|b| b.resource))
    }

    /// Creates the pending group with `upstream` bound at slot 0.
    pub fn bind_upstream<R>(&self, registry: &mut R, upstream: TextureId) -> Result<BindGroupId>
    where
        R: ResourceRegistry + ?Sized,
    {
        let group = self
            .pending_group()
            .ok_or(PainterError::UnknownHandle("pending bind group"))?;
        let mut entries = group.entries();
        entries.insert(
            0,
            GroupEntry {
                binding: 0,
                resource: ResourceRef::Texture(upstream),
            },
        );
        registry.create_bind_group(Some("Upstream Input"), group.layout, &entries)
    }
}

/// Resolves caller bindings against a shader's declared slots.
pub struct BindingResolver<'a, R: ?Sized> {
    registry: &'a mut R,
    constants: &'a mut ConstantPool,
}

impl<'a, R: ResourceRegistry + ?Sized> BindingResolver<'a, R> {
    pub fn new(registry: &'a mut R, constants: &'a mut ConstantPool) -> Self {
        Self {
            registry,
            constants,
        }
    }

    /// Validates every supplied source, then materializes constants and
    /// creates the bind groups.
    ///
    /// With `upstream_input` set, group 1 slot 0 is left for the layer and
    /// the group is returned pending.
    pub fn resolve(
        &mut self,
        shader: &Shader,
        bindings: &[(u32, BindingSource)],
        layer_bindings: &[(u32, BindingSource)],
        upstream_input: bool,
    ) -> Result<ResolvedBindings> {
        let reserved = upstream_input.then_some(0);
        let group0 = validate_group(0, shader.bindings(), bindings, None)?;
        let group1 = validate_group(1, shader.layer_bindings(), layer_bindings, reserved)?;

        let mut resolved = ResolvedBindings::default();
        for (index, validated) in [(0, group0), (1, group1)] {
            let Some(layout) = shader.group_layout(index) else {
                continue;
            };
            let bindings = validated
                .into_iter()
                .map(|(slot, source)| {
                    Ok(ResolvedBinding {
                        slot,
                        resource: self.materialize(source)?,
                    })
                })
                .collect::<Result<SmallVec<_>>>()?;

            let mut group = ResolvedGroup {
                index,
                layout,
                bindings,
                bind_group: None,
            };
            if !(index == 1 && upstream_input) {
                group.bind_group = Some(self.registry.create_bind_group(
                    Some("Drawable Bindings"),
                    layout,
                    &group.entries(),
                )?);
            }
            resolved.groups.push(group);
        }

        Ok(resolved)
    }

    fn materialize(&mut self, source: BindingSource) -> Result<ResourceRef> {
        Ok(match source {
            BindingSource::Buffer(id) => ResourceRef::Buffer(id),
            BindingSource::Const(value) => {
                ResourceRef::Buffer(self.constants.get_or_create(&mut *self.registry, value)?)
            }
            BindingSource::Sampler(id) => ResourceRef::Sampler(id),
            BindingSource::Texture(id) => ResourceRef::Texture(id),
        })
    }
}

/// Checks one group and returns its sources ordered by slot.
fn validate_group(
    group: u32,
    slots: &[BindingSlot],
    supplied: &[(u32, BindingSource)],
    reserved: Option<u32>,
) -> Result<SmallVec<[(BindingSlot, BindingSource); 4]>> {
    let mut seen: SmallVec<[Option<BindingSource>; 8]> = smallvec![None; slots.len()];

    for &(slot, source) in supplied {
        let Some(decl) = slots.get(slot as usize) else {
            return Err(PainterError::UndeclaredBinding { group, slot });
        };
        if reserved == Some(slot) || seen[slot as usize].is_some() {
            return Err(PainterError::DuplicateBinding { group, slot });
        }
        if decl.kind != source.kind() {
            return Err(PainterError::BindingKindMismatch {
                group,
                slot,
                expected: decl.kind,
                found: source.kind(),
            });
        }
        seen[slot as usize] = Some(source);
    }

    slots
        .iter()
        .zip(seen)
        .filter(|(decl, _)| reserved != Some(decl.index))
        .map(|(decl, source)| {
            source
                .map(|s| (*decl, s))
                .ok_or(PainterError::MissingBinding {
                    group,
                    slot: decl.index,
                })
        })
        .collect()
}
