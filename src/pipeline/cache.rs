//! Pipeline Cache
//!
//! Owns the lookup from [`PipelineKey`] to the registry's [`PipelineId`].
//! Equal keys always return the same id; a miss builds exactly one pipeline.
//! Entries live for the lifetime of the painter, there is no eviction.

use log::debug;
use rustc_hash::FxHashMap;

use super::key::{GeometryKey, PipelineKey};
use crate::backend::{PipelineDesc, PipelineId, ResourceRegistry};
use crate::errors::Result;
use crate::shader::Shader;

#[derive(Debug, Default)]
pub struct PipelineCache {
    lookup: FxHashMap<PipelineKey, PipelineId>,
    builds: u64,
}

impl PipelineCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pipeline for `key`, building it on first use.
    ///
    /// `shader` must be the shader `key.shader` refers to.
    pub fn get_or_create<R>(
        &mut self,
        registry: &mut R,
        key: &PipelineKey,
        shader: &Shader,
    ) -> Result<PipelineId>
    where
        R: ResourceRegistry + ?Sized,
    {
        if let Some(id) = self.lookup.get(key) {
            return Ok(*id);
        }

        let vertex_attributes = match key.geometry {
            GeometryKey::Form { .. } => shader.attributes(),
            GeometryKey::FullscreenQuad => &[][..],
        };

        let id = registry.create_render_pipeline(&PipelineDesc {
            label: Some("Painter Pipeline"),
            layouts: shader.layouts(),
            vertex: shader.vertex_module(),
            fragment: shader.fragment_module(),
            vertex_attributes,
            primitive: key.primitive(),
            depth: key.state.depth,
            color_format: key.color_format,
            blend: key.state.blend.map(Into::into),
            sample_count: key.sample_count,
        })?;

        self.builds += 1;
        debug!(
            "Pipeline cache miss: built {id:?} ({:?}, {:?}, x{})",
            key.geometry, key.color_format, key.sample_count
        );
        self.lookup.insert(*key, id);
        Ok(id)
    }

    #[must_use]
    pub fn get(&self, key: &PipelineKey) -> Option<PipelineId> {
        self.lookup.get(key).copied()
    }

    /// Number of pipelines built so far (cache misses).
    #[inline]
    #[must_use]
    pub fn builds(&self) -> u64 {
        self.builds
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}
