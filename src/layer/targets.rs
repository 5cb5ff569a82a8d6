//! Layer-owned render targets and their deferred destruction.

use log::debug;

use super::composition::{Composition, ping_pong_source};
use crate::backend::{BindGroupId, ResourceRegistry, TextureDesc, TextureId};
use crate::drawable::Effect;
use crate::errors::Result;

/// What a layer needs allocated at a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TargetDesc {
    pub size: (u32, u32),
    pub format: wgpu::TextureFormat,
    /// Sample count of the shape pass.
    pub sample_count: u32,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub composition: Composition,
    /// The layer renders into its own output texture instead of the surface.
    pub owns_output: bool,
}

/// Textures owned by one layer. All share the layer's size.
#[derive(Debug, Default)]
pub struct LayerTargets {
    size: (u32, u32),
    output: Option<TextureId>,
    ping_pong: Option<[TextureId; 2]>,
    depth: Option<TextureId>,
    msaa: Option<TextureId>,
    /// Per effect: group 1 bound to the ping-pong texture it reads.
    inputs: Vec<Option<BindGroupId>>,
}

impl LayerTargets {
    pub(crate) fn allocate<R>(
        registry: &mut R,
        desc: &TargetDesc,
        effects: &[&Effect],
    ) -> Result<Self>
    where
        R: ResourceRegistry + ?Sized,
    {
        let mut targets = Self {
            size: desc.size,
            ..Self::default()
        };
        match targets.fill(registry, desc, effects) {
            Ok(()) => {
                debug!(
                    "Allocated layer targets {}x{} ({:?})",
                    desc.size.0, desc.size.1, desc.composition
                );
                Ok(targets)
            }
            Err(e) => {
                targets.release(registry, None);
                Err(e)
            }
        }
    }

    fn fill<R>(&mut self, registry: &mut R, desc: &TargetDesc, effects: &[&Effect]) -> Result<()>
    where
        R: ResourceRegistry + ?Sized,
    {
        let sampled = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let texture = |registry: &mut R, label, format, usage, sample_count| {
            registry.create_texture(&TextureDesc {
                label: Some(label),
                width: desc.size.0,
                height: desc.size.1,
                format,
                sample_count,
                usage,
            })
        };

        if desc.owns_output {
            self.output = Some(texture(
                registry,
                "Layer Output",
                desc.format,
                sampled | wgpu::TextureUsages::COPY_SRC,
                1,
            )?);
        }

        if desc.composition.needs_ping_pong() {
            let first = texture(registry, "Ping-Pong Texture 0", desc.format, sampled, 1)?;
            // Keep the first texture owned even if the second fails.
            self.ping_pong = Some([first, first]);
            let second = texture(registry, "Ping-Pong Texture 1", desc.format, sampled, 1)?;
            self.ping_pong = Some([first, second]);
        }

        // Sample count must match the shape pass.
        if let Some(format) = desc.depth_format {
            self.depth = Some(texture(
                registry,
                "Layer Depth",
                format,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
                desc.sample_count,
            )?);
        }

        if desc.sample_count > 1 && desc.composition.has_shapes() {
            self.msaa = Some(texture(
                registry,
                "Layer MSAA Color",
                desc.format,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
                desc.sample_count,
            )?);
        }

        if let Some(ping_pong) = self.ping_pong {
            for (i, effect) in effects.iter().enumerate() {
                let input = if effect.consumes_upstream() {
                    Some(effect.bind_upstream(registry, ping_pong[ping_pong_source(i)])?)
                } else {
                    None
                };
                self.inputs.push(input);
            }
        }
        Ok(())
    }

    /// Gives every owned resource back. With a queue the resources are
    /// retired until the next frame boundary, otherwise destroyed now.
    pub(crate) fn release<R>(self, registry: &mut R, retire: Option<&mut RetireQueue>)
    where
        R: ResourceRegistry + ?Sized,
    {
        let mut textures: Vec<TextureId> = [self.output, self.depth, self.msaa]
            .into_iter()
            .flatten()
            .collect();
        if let Some([a, b]) = self.ping_pong {
            textures.push(a);
            if b != a {
                textures.push(b);
            }
        }
        let bind_groups = self.inputs.into_iter().flatten();

        match retire {
            Some(queue) => {
                debug!("Retiring {} layer textures until the frame boundary", textures.len());
                queue.textures.extend(textures);
                queue.bind_groups.extend(bind_groups);
            }
            None => {
                for group in bind_groups {
                    registry.release_bind_group(group);
                }
                for texture in textures {
                    registry.destroy_texture(texture);
                }
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    #[inline]
    #[must_use]
    pub fn output(&self) -> Option<TextureId> {
        self.output
    }

    #[inline]
    #[must_use]
    pub fn ping_pong(&self) -> Option<[TextureId; 2]> {
        self.ping_pong
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> Option<TextureId> {
        self.depth
    }

    #[inline]
    #[must_use]
    pub fn msaa(&self) -> Option<TextureId> {
        self.msaa
    }

    #[must_use]
    pub fn input(&self, effect: usize) -> Option<BindGroupId> {
        self.inputs.get(effect).copied().flatten()
    }
}

/// Resources waiting for the next frame boundary before destruction.
#[derive(Debug, Default)]
pub struct RetireQueue {
    textures: Vec<TextureId>,
    bind_groups: Vec<BindGroupId>,
}

impl RetireQueue {
    /// Destroys everything queued.
    pub fn flush<R>(&mut self, registry: &mut R)
    where
        R: ResourceRegistry + ?Sized,
    {
        if self.is_empty() {
            return;
        }
        debug!(
            "Frame boundary: destroying {} textures, {} bind groups",
            self.textures.len(),
            self.bind_groups.len()
        );
        for group in self.bind_groups.drain(..) {
            registry.release_bind_group(group);
        }
        for texture in self.textures.drain(..) {
            registry.destroy_texture(texture);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len() + self.bind_groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty() && self.bind_groups.is_empty()
    }

    #[must_use]
    pub fn contains_texture(&self, texture: TextureId) -> bool {
        self.textures.contains(&texture)
    }
}
