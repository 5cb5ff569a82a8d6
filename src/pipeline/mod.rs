//! Render pipeline signatures and their cache.

mod cache;
mod key;

pub use cache::PipelineCache;
pub use key::{BlendComponentKey, BlendStateKey, GeometryKey, PipelineKey, RenderState};
