//! Layers
//!
//! A layer owns a list of shapes, a list of effects and the textures needed
//! to render them. Its [`Composition`] decides how many passes it records
//! and where each one reads from and writes to:
//!
//! | Composition          | Passes                                    | Owned color textures      |
//! |----------------------|-------------------------------------------|---------------------------|
//! | `Empty`              | one clear pass, or nothing                | output (off-screen only)  |
//! | `ShapesOnly`         | shapes → output                           | output (off-screen only)  |
//! | `EffectsOnly`        | effect → output, for each effect          | output (off-screen only)  |
//! | `ShapesWithEffects`  | shapes → A, A → B, B → A, ..., last → out | two ping-pong + output    |
//!
//! Depth and multisample textures are added on top when enabled. Every
//! texture is allocated eagerly: at creation, on resize and whenever the
//! attached drawables change.

mod composition;
mod targets;

pub use composition::{
    Composition, PassKind, PassPlan, PlannedPass, Slot, ping_pong_destination, ping_pong_source,
    plan,
};
pub use targets::{LayerTargets, RetireQueue};

use log::{debug, warn};
use slotmap::SlotMap;

use crate::backend::{
    ColorAttachment, CommandRecorder, DepthAttachment, LoadAction, PassDesc, PipelineId,
    ResourceRegistry, TextureId,
};
use crate::drawable::{DrawTarget, Drawable, Effect, Shape};
use crate::errors::{PainterError, Result};
use crate::painter::{EffectId, ShaderId, ShapeId};
use crate::pipeline::PipelineCache;
use crate::settings::PainterSettings;
use crate::shader::Shader;
use targets::TargetDesc;

/// Depth value every depth attachment is cleared to.
const DEPTH_CLEAR: f32 = 1.0;

/// Sizing policy of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayerSize {
    /// Follows the surface size.
    #[default]
    Window,
    Fixed { width: u32, height: u32 },
}

/// Where the last pass of a layer writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayerOutput {
    /// The presentation texture of the current frame.
    #[default]
    Surface,
    /// A texture owned by the layer, readable by other drawables.
    Texture,
}

/// Configuration of a [`Layer`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerConfig {
    pub shapes: Vec<ShapeId>,
    /// Applied in order.
    pub effects: Vec<EffectId>,
    pub size: LayerSize,
    pub output: LayerOutput,
    pub clear_color: Option<wgpu::Color>,
    pub depth_test: bool,
    pub multisampling: bool,
    /// Color format of an off-screen layer. Surface layers always use the
    /// surface format.
    pub format: Option<wgpu::TextureFormat>,
}

/// Everything a layer reads or allocates through while it is being
/// (re)configured.
pub(crate) struct LayerContext<'a, R: ?Sized> {
    pub registry: &'a mut R,
    pub pipelines: &'a mut PipelineCache,
    pub shaders: &'a SlotMap<ShaderId, Shader>,
    pub shapes: &'a SlotMap<ShapeId, Shape>,
    pub effects: &'a SlotMap<EffectId, Effect>,
    pub settings: &'a PainterSettings,
    pub surface_size: (u32, u32),
    pub retired: &'a mut RetireQueue,
    pub frame_index: u64,
}

/// A render target with its drawables and pass schedule.
#[derive(Debug)]
pub struct Layer {
    config: LayerConfig,
    composition: Composition,
    format: wgpu::TextureFormat,
    /// Sample count of the shape pass. Effects are always single-sampled.
    sample_count: u32,
    size: (u32, u32),
    shape_pipelines: Vec<PipelineId>,
    effect_pipelines: Vec<PipelineId>,
    /// `None` until the layer has a non-zero size.
    targets: Option<LayerTargets>,
    last_rendered: Option<u64>,
}

impl Layer {
    pub(crate) fn new<R>(ctx: &mut LayerContext<'_, R>, config: LayerConfig) -> Result<Self>
    where
        R: ResourceRegistry + ?Sized,
    {
        let size = match config.size {
            LayerSize::Fixed { width, height } => {
                if config.output == LayerOutput::Surface {
                    return Err(PainterError::UnsatisfiableComposition(
                        "a fixed-size layer cannot render to the surface".into(),
                    ));
                }
                if width == 0 || height == 0 {
                    return Err(PainterError::InvalidLayerSize { width, height });
                }
                (width, height)
            }
            LayerSize::Window => ctx.surface_size,
        };

        let format = match config.output {
            LayerOutput::Surface => {
                let surface = ctx
                    .registry
                    .presentation_format()
                    .ok_or(PainterError::NoPresentationTarget)?;
                if config.format.is_some_and(|f| f != surface) {
                    return Err(PainterError::UnsatisfiableComposition(format!(
                        "surface layers render in the surface format {surface:?}"
                    )));
                }
                surface
            }
            LayerOutput::Texture => config.format.unwrap_or(ctx.settings.offscreen_format),
        };

        let sample_count = if config.multisampling {
            ctx.settings.msaa_samples.max(1)
        } else {
            1
        };

        let mut layer = Self {
            composition: Composition::Empty,
            format,
            sample_count,
            size,
            shape_pipelines: Vec::new(),
            effect_pipelines: Vec::new(),
            targets: None,
            last_rendered: None,
            config,
        };
        layer.rebuild(ctx)?;
        Ok(layer)
    }

    /// Replaces the shapes and reallocates the targets.
    pub(crate) fn set_shapes<R>(
        &mut self,
        ctx: &mut LayerContext<'_, R>,
        shapes: Vec<ShapeId>,
    ) -> Result<()>
    where
        R: ResourceRegistry + ?Sized,
    {
        let previous = std::mem::replace(&mut self.config.shapes, shapes);
        self.rebuild(ctx).inspect_err(|_| {
            self.config.shapes = previous;
            self.restore_targets(ctx);
        })
    }

    /// Replaces the effects and reallocates the targets.
    pub(crate) fn set_effects<R>(
        &mut self,
        ctx: &mut LayerContext<'_, R>,
        effects: Vec<EffectId>,
    ) -> Result<()>
    where
        R: ResourceRegistry + ?Sized,
    {
        let previous = std::mem::replace(&mut self.config.effects, effects);
        self.rebuild(ctx).inspect_err(|_| {
            self.config.effects = previous;
            self.restore_targets(ctx);
        })
    }

    /// Recreates every owned texture at the new size.
    ///
    /// Fails with [`PainterError::FixedSizeResize`] on fixed-size layers. A
    /// zero dimension releases the targets until the next non-zero resize.
    pub(crate) fn resize<R>(
        &mut self,
        ctx: &mut LayerContext<'_, R>,
        width: u32,
        height: u32,
    ) -> Result<()>
    where
        R: ResourceRegistry + ?Sized,
    {
        if self.is_fixed_size() {
            return Err(PainterError::FixedSizeResize);
        }
        if self.size == (width, height) && self.targets.is_some() {
            return Ok(());
        }
        debug!("Resizing layer to {width}x{height}");
        self.size = (width, height);
        self.reallocate(ctx)
    }

    /// Revalidates the drawables, prepares their pipelines and reallocates
    /// the targets. On error the previous composition and pipelines are
    /// kept; the targets may be gone if allocation was reached.
    fn rebuild<R>(&mut self, ctx: &mut LayerContext<'_, R>) -> Result<()>
    where
        R: ResourceRegistry + ?Sized,
    {
        let shapes = lookup(ctx.shapes, &self.config.shapes, "shape")?;
        let effects = lookup(ctx.effects, &self.config.effects, "effect")?;
        let composition = Composition::classify(shapes.len(), effects.len());

        if composition == Composition::EffectsOnly
            && let Some(i) = effects.iter().position(|e| e.consumes_upstream())
        {
            return Err(PainterError::UnsatisfiableComposition(format!(
                "effect {i} reads the upstream pass but the layer has no shapes"
            )));
        }

        let shape_target = DrawTarget {
            color_format: self.format,
            sample_count: self.sample_count,
            depth_format: self.depth_format(ctx.settings),
        };
        let effect_target = DrawTarget {
            color_format: self.format,
            sample_count: 1,
            depth_format: None,
        };

        let mut shape_pipelines = Vec::with_capacity(shapes.len());
        for shape in &shapes {
            let key = shape.pipeline_key(&shape_target);
            let shader = lookup_one(ctx.shaders, shape.shader(), "shader")?;
            shape_pipelines.push(ctx.pipelines.get_or_create(&mut *ctx.registry, &key, shader)?);
        }
        let mut effect_pipelines = Vec::with_capacity(effects.len());
        for effect in &effects {
            let key = effect.pipeline_key(&effect_target);
            let shader = lookup_one(ctx.shaders, effect.shader(), "shader")?;
            effect_pipelines.push(ctx.pipelines.get_or_create(&mut *ctx.registry, &key, shader)?);
        }

        let composition = std::mem::replace(&mut self.composition, composition);
        let shape_pipelines = std::mem::replace(&mut self.shape_pipelines, shape_pipelines);
        let effect_pipelines = std::mem::replace(&mut self.effect_pipelines, effect_pipelines);
        self.reallocate(ctx).inspect_err(|_| {
            self.composition = composition;
            self.shape_pipelines = shape_pipelines;
            self.effect_pipelines = effect_pipelines;
        })
    }

    /// Allocates targets for the restored drawables after a failed change.
    fn restore_targets<R>(&mut self, ctx: &mut LayerContext<'_, R>)
    where
        R: ResourceRegistry + ?Sized,
    {
        if self.targets.is_some() {
            return;
        }
        if let Err(e) = self.reallocate(ctx) {
            warn!("Layer could not restore its targets: {e}");
        }
    }

    /// Releases the current targets, then allocates new ones.
    fn reallocate<R>(&mut self, ctx: &mut LayerContext<'_, R>) -> Result<()>
    where
        R: ResourceRegistry + ?Sized,
    {
        if let Some(old) = self.targets.take() {
            let retire = self.in_flight(ctx.frame_index).then_some(&mut *ctx.retired);
            old.release(&mut *ctx.registry, retire);
        }

        let (width, height) = self.size;
        if width == 0 || height == 0 {
            debug!("Layer has a zero-sized window, targets deferred");
            return Ok(());
        }

        let effects = lookup(ctx.effects, &self.config.effects, "effect")?;
        let desc = TargetDesc {
            size: self.size,
            format: self.format,
            sample_count: self.sample_count,
            depth_format: self.depth_format(ctx.settings),
            composition: self.composition,
            owns_output: self.config.output == LayerOutput::Texture,
        };
        self.targets = Some(LayerTargets::allocate(&mut *ctx.registry, &desc, &effects)?);
        Ok(())
    }

    /// Whether the GPU may still be using textures of this layer.
    fn in_flight(&self, frame_index: u64) -> bool {
        self.last_rendered.is_some_and(|f| f + 1 >= frame_index)
    }

    fn depth_format(&self, settings: &PainterSettings) -> Option<wgpu::TextureFormat> {
        self.config.depth_test.then_some(settings.depth_format)
    }

    pub(crate) fn mark_rendered(&mut self, frame_index: u64) {
        self.last_rendered = Some(frame_index);
    }

    /// Records every pass of one frame into `recorder`.
    ///
    /// `output` is the texture the final pass writes when the layer renders
    /// to the surface; off-screen layers ignore it.
    pub(crate) fn render<C>(
        &self,
        recorder: &mut C,
        shapes: &SlotMap<ShapeId, Shape>,
        effects: &SlotMap<EffectId, Effect>,
        output: Option<TextureId>,
    ) -> Result<()>
    where
        C: CommandRecorder,
    {
        let passes = self.plan();
        if passes.is_empty() {
            return Ok(());
        }

        let targets = self.targets.as_ref().ok_or(PainterError::LayerNotReady)?;
        let output = match self.config.output {
            LayerOutput::Surface => output.ok_or(PainterError::NoPresentationTarget)?,
            LayerOutput::Texture => targets.output().ok_or(PainterError::LayerNotReady)?,
        };
        let texture_of = |slot: Slot| -> Result<TextureId> {
            match slot {
                Slot::Output => Ok(output),
                Slot::PingPong(i) => targets
                    .ping_pong()
                    .map(|pair| pair[i])
                    .ok_or(PainterError::LayerNotReady),
            }
        };
        let clear = self.config.clear_color;
        let transparent = clear.unwrap_or(wgpu::Color::TRANSPARENT);

        for planned in &passes {
            let destination = texture_of(planned.destination)?;
            match planned.kind {
                PassKind::Clear => {
                    recorder.begin_pass(&PassDesc {
                        label: Some("Layer Clear"),
                        color: ColorAttachment {
                            target: destination,
                            resolve_target: None,
                            load: LoadAction::Clear(transparent),
                        },
                        depth: None,
                    })?;
                }
                PassKind::Shapes => {
                    // Multisampled content is resolved into the destination,
                    // so the MSAA texture itself always starts cleared.
                    let color = match targets.msaa() {
                        Some(msaa) => ColorAttachment {
                            target: msaa,
                            resolve_target: Some(destination),
                            load: LoadAction::Clear(transparent),
                        },
                        None => ColorAttachment {
                            target: destination,
                            resolve_target: None,
                            load: load_action(planned.destination, clear),
                        },
                    };
                    let mut pass = recorder.begin_pass(&PassDesc {
                        label: Some("Layer Shapes"),
                        color,
                        depth: targets.depth().map(|target| DepthAttachment {
                            target,
                            clear: DEPTH_CLEAR,
                        }),
                    })?;
                    for (id, pipeline) in self.config.shapes.iter().zip(&self.shape_pipelines) {
                        let shape = lookup_one(shapes, *id, "shape")?;
                        shape.draw(pass.as_mut(), *pipeline, None)?;
                    }
                }
                PassKind::Effect(i) => {
                    // Effects-only passes stack on top of each other.
                    let load = if self.composition == Composition::EffectsOnly && i > 0 {
                        LoadAction::Load
                    } else {
                        load_action(planned.destination, clear)
                    };
                    let mut pass = recorder.begin_pass(&PassDesc {
                        label: Some("Layer Effect"),
                        color: ColorAttachment {
                            target: destination,
                            resolve_target: None,
                            load,
                        },
                        depth: None,
                    })?;
                    let effect = lookup_one(effects, self.config.effects[i], "effect")?;
                    effect.draw(pass.as_mut(), self.effect_pipelines[i], targets.input(i))?;
                }
            }
        }
        Ok(())
    }

    /// Passes this layer records per frame.
    #[must_use]
    pub fn plan(&self) -> PassPlan {
        plan(
            self.composition,
            self.config.effects.len(),
            self.config.clear_color.is_some(),
        )
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn composition(&self) -> Composition {
        self.composition
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    #[inline]
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    #[inline]
    #[must_use]
    pub fn is_fixed_size(&self) -> bool {
        matches!(self.config.size, LayerSize::Fixed { .. })
    }

    #[inline]
    #[must_use]
    pub fn targets(&self) -> Option<&LayerTargets> {
        self.targets.as_ref()
    }

    /// Output texture of an off-screen layer.
    #[must_use]
    pub fn output_texture(&self) -> Option<TextureId> {
        self.targets.as_ref().and_then(LayerTargets::output)
    }

    #[inline]
    #[must_use]
    pub fn last_rendered(&self) -> Option<u64> {
        self.last_rendered
    }

    /// Hands every owned texture back to the registry.
    pub(crate) fn release<R>(
        &mut self,
        registry: &mut R,
        retired: &mut RetireQueue,
        frame_index: u64,
    ) where
        R: ResourceRegistry + ?Sized,
    {
        if let Some(targets) = self.targets.take() {
            let retire = self.in_flight(frame_index).then_some(retired);
            targets.release(registry, retire);
        }
    }
}

/// Ping-pong textures are always cleared; the real output keeps what earlier
/// layers drew unless the layer has its own clear color.
fn load_action(destination: Slot, clear: Option<wgpu::Color>) -> LoadAction {
    match (destination, clear) {
        (Slot::PingPong(_), c) => LoadAction::Clear(c.unwrap_or(wgpu::Color::TRANSPARENT)),
        (Slot::Output, Some(c)) => LoadAction::Clear(c),
        (Slot::Output, None) => LoadAction::Load,
    }
}

fn lookup_one<'a, K: slotmap::Key, V>(
    arena: &'a SlotMap<K, V>,
    id: K,
    what: &'static str,
) -> Result<&'a V> {
    arena.get(id).ok_or(PainterError::UnknownHandle(what))
}

fn lookup<'a, K: slotmap::Key, V>(
    arena: &'a SlotMap<K, V>,
    ids: &[K],
    what: &'static str,
) -> Result<Vec<&'a V>> {
    ids.iter().map(|id| lookup_one(arena, *id, what)).collect()
}
