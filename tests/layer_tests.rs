//! Layer Orchestrator Tests
//!
//! Tests for:
//! - Composition: empty, shapes-only, effects-only, shapes-with-effects
//! - Ping-pong schedule: sources, destinations and the final redirect
//! - Configuration errors raised at creation
//! - Resize policy for window-sized and fixed-size layers
//! - Depth and multisample attachments
//! - Deferred destruction at the frame boundary
//! - Off-screen output used as a texture input
//! - Allocation failures during resize and composition changes

use glam::Vec2;

use painter::backend::{
    HeadlessBackend, LoadAction, PassCommand, RecordedPass, ResourceLimits, ResourceRef, TextureId,
};
use painter::binding::{BINDING_LAYER_FRAG, BINDING_TEXTURE_FRAG};
use painter::errors::ErrorKind;
use painter::layer::{Composition, LayerConfig, LayerOutput, LayerSize, Slot, plan};
use painter::{
    EffectId, FormId, LayerId, Painter, PainterError, PainterSettings, ResourceRegistry, ShaderId,
    ShapeId, bindings,
};

const VERT: &str = "@vertex fn vs() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";
const FRAG: &str = "@fragment fn fs() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
const POST: &str = "@fragment fn post() -> @location(0) vec4<f32> { return vec4<f32>(0.5); }";
const FILL: &str = "@fragment fn fill() -> @location(0) vec4<f32> { return vec4<f32>(0.2); }";

const RED: wgpu::Color = wgpu::Color {
    r: 1.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

struct Fixture {
    p: Painter<HeadlessBackend>,
    form: FormId,
    shader: ShaderId,
    post: ShaderId,
    fill: ShaderId,
}

impl Fixture {
    fn new() -> Self {
        Self::with_backend(HeadlessBackend::default())
    }

    fn with_backend(backend: HeadlessBackend) -> Self {
        let mut p = Painter::with_backend(backend, PainterSettings::default());
        let form = p.form(&[Vec2::ZERO, Vec2::X, Vec2::Y]).create().unwrap();
        let shader = p
            .shade(&[wgpu::VertexFormat::Float32x2])
            .with_vertex(VERT)
            .with_fragment(FRAG)
            .create()
            .unwrap();
        let post = p
            .shade(&[])
            .with_layer_bindings(&[BINDING_LAYER_FRAG])
            .with_fragment(POST)
            .create()
            .unwrap();
        let fill = p.shade(&[]).with_fragment(FILL).create().unwrap();
        Self {
            p,
            form,
            shader,
            post,
            fill,
        }
    }

    fn shape(&mut self) -> ShapeId {
        self.p.shape(self.form, self.shader).create().unwrap()
    }

    /// An effect reading the previous pass.
    fn chained(&mut self) -> EffectId {
        self.p.effect(self.post).create().unwrap()
    }

    /// An effect drawing without any input.
    fn standalone(&mut self) -> EffectId {
        self.p.effect(self.fill).create().unwrap()
    }

    /// Paints `layer` and returns the passes it recorded.
    fn frame(&mut self, layer: LayerId) -> Vec<RecordedPass> {
        self.p.backend_mut().clear_submitted();
        self.p.paint(layer).unwrap();
        self.p.backend().submitted_passes().to_vec()
    }

    fn presentation(&self) -> TextureId {
        self.p.backend().current_presentation_texture().unwrap()
    }

    fn ping_pong(&self, layer: LayerId) -> [TextureId; 2] {
        self.p
            .get_layer(layer)
            .unwrap()
            .targets()
            .unwrap()
            .ping_pong()
            .unwrap()
    }

    /// Texture bound at group 1 slot 0 of an effect pass.
    fn input_of(&self, pass: &RecordedPass) -> TextureId {
        let group = *pass.bind_groups_at(1).last().unwrap();
        let (_, entries) = self.p.backend().bind_group(group).unwrap();
        match entries.iter().find(|e| e.binding == 0).unwrap().resource {
            ResourceRef::Texture(id) => id,
            other => panic!("expected a texture at slot 0, got {other:?}"),
        }
    }

    fn size_of(&self, texture: TextureId) -> (u32, u32) {
        let info = self.p.backend().texture(texture).unwrap();
        (info.width, info.height)
    }
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn empty_layer_without_clear_color_records_nothing() {
    let mut f = Fixture::new();
    let layer = f.p.layer().create().unwrap();

    assert_eq!(f.p.get_layer(layer).unwrap().composition(), Composition::Empty);
    assert!(f.frame(layer).is_empty());
}

#[test]
fn empty_layer_with_clear_color_only_clears() {
    let mut f = Fixture::new();
    let layer = f.p.layer().with_clear_color(RED).create().unwrap();

    let passes = f.frame(layer);
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].draw_count(), 0);
    assert_eq!(passes[0].load, LoadAction::Clear(RED));
    assert_eq!(passes[0].target, f.presentation());
}

#[test]
fn shapes_only_draws_straight_into_the_surface() {
    let mut f = Fixture::new();
    let a = f.shape();
    let b = f.shape();
    let layer = f.p.layer().with_shapes(&[a, b]).create().unwrap();

    let passes = f.frame(layer);
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].draw_count(), 2);
    assert_eq!(passes[0].target, f.presentation());
    assert_eq!(passes[0].load, LoadAction::Load);
    assert!(passes[0].resolve_target.is_none());

    let targets = f.p.get_layer(layer).unwrap().targets().unwrap();
    assert!(targets.ping_pong().is_none());
    assert!(targets.output().is_none());
}

#[test]
fn effects_only_passes_stack_on_the_output() {
    let mut f = Fixture::new();
    let a = f.standalone();
    let b = f.standalone();
    let layer = f
        .p
        .layer()
        .with_effects(&[a, b])
        .with_clear_color(RED)
        .create()
        .unwrap();

    assert_eq!(
        f.p.get_layer(layer).unwrap().composition(),
        Composition::EffectsOnly
    );
    let passes = f.frame(layer);
    let output = f.presentation();
    assert_eq!(passes.len(), 2);
    assert!(passes.iter().all(|pass| pass.target == output));
    assert!(passes.iter().all(|pass| pass.draw_count() == 1));
    assert!(passes.iter().all(|pass| pass.bind_groups_at(1).is_empty()));
    assert_eq!(passes[0].load, LoadAction::Clear(RED));
    assert_eq!(passes[1].load, LoadAction::Load);
    assert!(
        f.p.get_layer(layer)
            .unwrap()
            .targets()
            .unwrap()
            .ping_pong()
            .is_none()
    );
}

#[test]
fn effect_draws_a_fullscreen_strip() {
    let mut f = Fixture::new();
    let e = f.standalone();
    let layer = f.p.layer().with_effect(e).create().unwrap();

    let passes = f.frame(layer);
    assert!(passes[0].commands.iter().any(|c| matches!(
        c,
        PassCommand::Draw { vertices, instances }
            if *vertices == (0..4) && *instances == (0..1)
    )));
    assert!(!passes[0].commands.iter().any(|c| matches!(
        c,
        PassCommand::SetVertexBuffer(..)
            | PassCommand::SetIndexBuffer(..)
    )));
}

// ============================================================================
// Ping-pong
// ============================================================================

#[test]
fn ping_pong_chain_alternates_and_ends_on_the_output() {
    for n in 1..=5 {
        let mut f = Fixture::new();
        let s = f.shape();
        let effects: Vec<EffectId> = (0..n).map(|_| f.chained()).collect();
        let layer = f
            .p
            .layer()
            .with_shape(s)
            .with_effects(&effects)
            .with_size(256, 256)
            .create()
            .unwrap();

        let pp = f.ping_pong(layer);
        let output = f.p.layer_texture(layer).unwrap();
        let passes = f.frame(layer);
        assert_eq!(passes.len(), n + 1);

        // Shapes rasterize into the first ping-pong texture.
        assert_eq!(passes[0].target, pp[0]);
        assert_eq!(passes[0].draw_count(), 1);

        for (i, pass) in passes[1..].iter().enumerate() {
            let source = f.input_of(pass);
            assert_eq!(source, pp[i % 2], "effect {i} of {n}");
            if i + 1 < n {
                assert_eq!(pass.target, pp[1 - i % 2], "effect {i} of {n}");
            } else {
                assert_eq!(pass.target, output, "last effect of {n}");
            }
            assert_ne!(pass.target, source);
        }
    }
}

#[test]
fn surface_layer_redirects_the_last_effect_to_the_surface() {
    let mut f = Fixture::new();
    let s = f.shape();
    let a = f.chained();
    let b = f.chained();
    let layer = f
        .p
        .layer()
        .with_shape(s)
        .with_effects(&[a, b])
        .create()
        .unwrap();

    let passes = f.frame(layer);
    let pp = f.ping_pong(layer);
    assert_eq!(passes.len(), 3);
    assert_eq!(passes[2].target, f.presentation());
    assert_eq!(passes[1].target, pp[1]);
    assert!(!pp.contains(&passes[2].target));
}

#[test]
fn ping_pong_destinations_are_always_cleared() {
    let mut f = Fixture::new();
    let s = f.shape();
    let a = f.chained();
    let b = f.chained();
    let layer = f
        .p
        .layer()
        .with_shape(s)
        .with_effects(&[a, b])
        .create()
        .unwrap();

    let passes = f.frame(layer);
    assert_eq!(passes[0].load, LoadAction::Clear(wgpu::Color::TRANSPARENT));
    assert_eq!(passes[1].load, LoadAction::Clear(wgpu::Color::TRANSPARENT));
    // No clear color: the surface keeps what earlier layers drew.
    assert_eq!(passes[2].load, LoadAction::Load);
}

#[test]
fn pass_plan_matches_the_recorded_passes() {
    let mut f = Fixture::new();
    let s = f.shape();
    let effects: Vec<EffectId> = (0..3).map(|_| f.chained()).collect();
    let layer = f
        .p
        .layer()
        .with_shape(s)
        .with_effects(&effects)
        .create()
        .unwrap();

    let planned = f.p.get_layer(layer).unwrap().plan();
    assert_eq!(planned, plan(Composition::ShapesWithEffects, 3, false));
    assert_eq!(planned.last().unwrap().destination, Slot::Output);
    assert_eq!(f.frame(layer).len(), planned.len());
}

#[test]
fn effect_reading_upstream_needs_shapes() {
    let mut f = Fixture::new();
    let e = f.chained();

    let err = f.p.layer().with_effect(e).create().unwrap_err();
    assert!(matches!(err, PainterError::UnsatisfiableComposition(_)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn removing_shapes_under_a_chained_effect_is_rejected() {
    let mut f = Fixture::new();
    let s = f.shape();
    let e = f.chained();
    let layer = f.p.layer().with_shape(s).with_effect(e).create().unwrap();

    let err = f.p.set_layer_shapes(layer, Vec::new()).unwrap_err();
    assert!(matches!(err, PainterError::UnsatisfiableComposition(_)));

    let layer = f.p.get_layer(layer).unwrap();
    assert_eq!(layer.config().shapes, vec![s]);
    assert_eq!(layer.composition(), Composition::ShapesWithEffects);
}

#[test]
fn attaching_effects_reallocates_targets() {
    let mut f = Fixture::new();
    let s = f.shape();
    let layer = f.p.layer().with_shape(s).create().unwrap();
    let live = f.p.backend().live_texture_count();

    let e = f.chained();
    f.p.set_layer_effects(layer, vec![e]).unwrap();

    let layer_ref = f.p.get_layer(layer).unwrap();
    assert_eq!(layer_ref.composition(), Composition::ShapesWithEffects);
    assert!(layer_ref.targets().unwrap().ping_pong().is_some());
    assert_eq!(f.p.backend().live_texture_count(), live + 2);
    assert_eq!(f.frame(layer).len(), 2);
}

// ============================================================================
// Configuration errors
// ============================================================================

#[test]
fn fixed_size_layer_cannot_target_the_surface() {
    let mut f = Fixture::new();
    let err = f
        .p
        .create_layer(LayerConfig {
            size: LayerSize::Fixed {
                width: 64,
                height: 64,
            },
            output: LayerOutput::Surface,
            ..LayerConfig::default()
        })
        .unwrap_err();
    assert!(matches!(err, PainterError::UnsatisfiableComposition(_)));
}

#[test]
fn fixed_size_must_be_non_zero() {
    let mut f = Fixture::new();
    let err = f.p.layer().with_size(0, 32).create().unwrap_err();
    assert!(matches!(
        err,
        PainterError::InvalidLayerSize {
            width: 0,
            height: 32
        }
    ));
}

#[test]
fn surface_layer_must_use_the_surface_format() {
    let mut f = Fixture::new();
    let err = f
        .p
        .layer()
        .with_format(wgpu::TextureFormat::Rgba16Float)
        .create()
        .unwrap_err();
    assert!(matches!(err, PainterError::UnsatisfiableComposition(_)));
}

#[test]
fn surface_layer_needs_a_presentation_target() {
    let mut f = Fixture::with_backend(HeadlessBackend::default().without_surface());
    let s = f.shape();

    let err = f.p.layer().with_shape(s).create().unwrap_err();
    assert!(matches!(err, PainterError::NoPresentationTarget));
    assert_eq!(err.kind(), ErrorKind::Misuse);

    // Off-screen layers still work.
    let layer = f.p.layer().with_shape(s).with_size(32, 32).create().unwrap();
    assert_eq!(f.frame(layer).len(), 1);
}

#[test]
fn unknown_drawables_are_rejected() {
    let mut f = Fixture::new();
    let s = f.shape();
    let layer = f.p.layer().with_shape(s).create().unwrap();

    // No effect was ever created on this painter.
    let mut other = Fixture::new();
    let foreign = other.standalone();

    let err = f.p.set_layer_effects(layer, vec![foreign]).unwrap_err();
    assert!(matches!(err, PainterError::UnknownHandle("effect")));
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn window_layer_resize_recreates_color_and_depth() {
    let mut f = Fixture::new();
    let s = f.shape();
    let e = f.chained();
    let layer = f
        .p
        .layer()
        .with_shape(s)
        .with_effect(e)
        .with_depth_test(true)
        .offscreen()
        .create()
        .unwrap();

    let old = {
        let targets = f.p.get_layer(layer).unwrap().targets().unwrap();
        let pp = targets.ping_pong().unwrap();
        vec![targets.output().unwrap(), pp[0], pp[1], targets.depth().unwrap()]
    };
    assert!(old.iter().all(|t| f.size_of(*t) == (800, 600)));
    let live = f.p.backend().live_texture_count();

    f.p.resize(1024, 768).unwrap();

    let targets = f.p.get_layer(layer).unwrap().targets().unwrap();
    let pp = targets.ping_pong().unwrap();
    let new = [targets.output().unwrap(), pp[0], pp[1], targets.depth().unwrap()];
    assert!(new.iter().all(|t| f.size_of(*t) == (1024, 768)));
    assert!(new.iter().all(|t| !old.contains(t)));
    assert!(old.iter().all(|t| f.p.backend().destroyed_textures().contains(t)));
    assert_eq!(f.p.backend().live_texture_count(), live);
    assert_eq!(f.p.get_layer(layer).unwrap().size(), (1024, 768));
}

#[test]
fn depth_texture_matches_the_shape_sample_count() {
    let mut f = Fixture::new();
    let s = f.shape();
    let layer = f
        .p
        .layer()
        .with_shape(s)
        .with_depth_test(true)
        .with_multisampling(true)
        .create()
        .unwrap();

    let targets = f.p.get_layer(layer).unwrap().targets().unwrap();
    let depth = f.p.backend().texture(targets.depth().unwrap()).unwrap();
    assert_eq!(depth.format, wgpu::TextureFormat::Depth24Plus);
    assert_eq!(depth.sample_count, 4);
    assert!(targets.ping_pong().is_none());
}

#[test]
fn fixed_layer_ignores_window_resize() {
    let mut f = Fixture::new();
    let s = f.shape();
    let layer = f
        .p
        .layer()
        .with_shape(s)
        .with_size(128, 128)
        .with_depth_test(true)
        .create()
        .unwrap();
    let output = f.p.layer_texture(layer).unwrap();

    f.p.resize(1920, 1080).unwrap();

    assert_eq!(f.p.layer_texture(layer).unwrap(), output);
    assert_eq!(f.size_of(output), (128, 128));
    assert!(f.p.backend().destroyed_textures().is_empty());
}

#[test]
fn explicit_resize_of_fixed_layer_is_misuse() {
    let mut f = Fixture::new();
    let layer = f.p.layer().with_size(16, 16).create().unwrap();

    let err = f.p.resize_layer(layer, 32, 32).unwrap_err();
    assert!(matches!(err, PainterError::FixedSizeResize));
    assert_eq!(err.kind(), ErrorKind::Misuse);
}

#[test]
fn resize_to_the_same_size_keeps_targets() {
    let mut f = Fixture::new();
    let s = f.shape();
    let layer = f.p.layer().with_shape(s).offscreen().create().unwrap();
    let output = f.p.layer_texture(layer).unwrap();

    f.p.resize(800, 600).unwrap();
    assert_eq!(f.p.layer_texture(layer).unwrap(), output);
}

#[test]
fn zero_sized_window_layer_is_not_ready() {
    let mut f = Fixture::new();
    let s = f.shape();
    let layer = f.p.layer().with_shape(s).create().unwrap();
    let empty = f.p.layer().create().unwrap();

    f.p.resize(0, 0).unwrap();
    let err = f.p.paint(layer).unwrap_err();
    assert!(matches!(err, PainterError::LayerNotReady));
    assert_eq!(err.kind(), ErrorKind::Misuse);

    // Nothing to draw is never an error.
    f.p.paint(empty).unwrap();

    f.p.resize(640, 480).unwrap();
    assert_eq!(f.frame(layer).len(), 1);
}

// ============================================================================
// Multisampling
// ============================================================================

#[test]
fn multisampled_shapes_resolve_into_the_destination() {
    let mut f = Fixture::new();
    let s = f.shape();
    let e = f.chained();
    let layer = f
        .p
        .layer()
        .with_shape(s)
        .with_effect(e)
        .with_multisampling(true)
        .create()
        .unwrap();

    let msaa = f
        .p
        .get_layer(layer)
        .unwrap()
        .targets()
        .unwrap()
        .msaa()
        .unwrap();
    assert_eq!(f.p.backend().texture(msaa).unwrap().sample_count, 4);

    let passes = f.frame(layer);
    let pp = f.ping_pong(layer);
    assert_eq!(passes[0].target, msaa);
    assert_eq!(passes[0].resolve_target, Some(pp[0]));
    assert_eq!(passes[1].target, f.presentation());
    assert!(passes[1].resolve_target.is_none());
    assert_eq!(f.p.backend().texture(pp[0]).unwrap().sample_count, 1);
}

#[test]
fn effects_only_layer_has_no_multisample_texture() {
    let mut f = Fixture::new();
    let e = f.standalone();
    let layer = f
        .p
        .layer()
        .with_effect(e)
        .with_multisampling(true)
        .create()
        .unwrap();

    assert!(
        f.p.get_layer(layer)
            .unwrap()
            .targets()
            .unwrap()
            .msaa()
            .is_none()
    );
}

// ============================================================================
// Deferred destruction
// ============================================================================

#[test]
fn textures_of_a_rendered_layer_wait_for_the_frame_boundary() {
    let mut f = Fixture::new();
    let s = f.shape();
    let e = f.chained();
    let layer = f
        .p
        .layer()
        .with_shape(s)
        .with_effect(e)
        .create()
        .unwrap();
    let old = f.ping_pong(layer);

    f.p.paint(layer).unwrap();
    f.p.resize(400, 300).unwrap();

    // Still referenced by the submitted frame.
    for t in old {
        assert!(f.p.backend().texture(t).is_some());
        assert!(f.p.retired().contains_texture(t));
    }
    assert_ne!(f.ping_pong(layer), old);

    f.p.show();
    for t in old {
        assert!(f.p.backend().texture(t).is_none());
        assert!(f.p.backend().destroyed_textures().contains(&t));
    }
    assert!(f.p.retired().is_empty());
}

#[test]
fn layer_idle_for_a_frame_releases_immediately() {
    let mut f = Fixture::new();
    let s = f.shape();
    let e = f.chained();
    let layer = f
        .p
        .layer()
        .with_shape(s)
        .with_effect(e)
        .create()
        .unwrap();

    f.p.paint_and_show(layer).unwrap();
    f.p.show();
    let old = f.ping_pong(layer);
    f.p.resize(400, 300).unwrap();

    assert!(f.p.retired().is_empty());
    assert!(old.iter().all(|t| f.p.backend().texture(*t).is_none()));
}

#[test]
fn retired_input_bind_groups_are_released_with_their_textures() {
    let mut f = Fixture::new();
    let s = f.shape();
    let e = f.chained();
    let layer = f
        .p
        .layer()
        .with_shape(s)
        .with_effect(e)
        .create()
        .unwrap();
    let input = f.p.get_layer(layer).unwrap().targets().unwrap().input(0).unwrap();

    f.p.paint(layer).unwrap();
    f.p.resize(400, 300).unwrap();
    assert!(f.p.backend().bind_group(input).is_some());

    f.p.show();
    assert!(f.p.backend().bind_group(input).is_none());
}

// ============================================================================
// Allocation and off-screen output
// ============================================================================

#[test]
fn oversized_layer_fails_without_leaking() {
    let limits = ResourceLimits {
        max_texture_dimension_2d: 256,
        max_buffer_size: 1 << 20,
    };
    let mut f = Fixture::with_backend(HeadlessBackend::default().with_limits(limits));
    let s = f.shape();
    let live = f.p.backend().live_texture_count();

    let err = f
        .p
        .layer()
        .with_shape(s)
        .with_size(512, 128)
        .create()
        .unwrap_err();
    assert!(matches!(err, PainterError::AllocationFailed { resource: "texture", .. }));
    assert_eq!(err.kind(), ErrorKind::ResourceExhaustion);
    assert_eq!(f.p.backend().live_texture_count(), live);

    assert!(f.p.layer().with_shape(s).with_size(256, 256).create().is_ok());
}

fn limited(max_texture_dimension_2d: u32) -> Fixture {
    Fixture::with_backend(HeadlessBackend::default().with_limits(ResourceLimits {
        max_texture_dimension_2d,
        max_buffer_size: 1 << 20,
    }))
}

#[test]
fn failed_effect_change_keeps_the_previous_composition() {
    let mut f = limited(1024);
    let s = f.shape();
    let e = f.chained();
    let layer = f
        .p
        .layer()
        .with_shape(s)
        .with_multisampling(true)
        .create()
        .unwrap();

    let err = f.p.resize(2000, 2000).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhaustion);
    let err = f.p.set_layer_effects(layer, vec![e]).unwrap_err();
    assert!(matches!(err, PainterError::AllocationFailed { .. }));

    let l = f.p.get_layer(layer).unwrap();
    assert!(l.config().effects.is_empty());
    assert_eq!(l.config().shapes, vec![s]);
    assert_eq!(l.composition(), Composition::ShapesOnly);
    assert_eq!(l.plan(), plan(Composition::ShapesOnly, 0, false));

    f.p.resize(800, 600).unwrap();
    let passes = f.frame(layer);
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].resolve_target, Some(f.presentation()));
}

#[test]
fn failed_shape_change_restores_the_previous_targets() {
    let mut f = limited(1024);
    let s = f.shape();
    let e = f.standalone();
    let layer = f.p.layer().with_effect(e).create().unwrap();

    // Effects-only surface layers own no textures, so any size fits.
    f.p.resize(2000, 2000).unwrap();
    let live = f.p.backend().live_texture_count();

    let err = f.p.set_layer_shapes(layer, vec![s]).unwrap_err();
    assert!(matches!(err, PainterError::AllocationFailed { resource: "texture", .. }));
    assert_eq!(f.p.backend().live_texture_count(), live);

    let l = f.p.get_layer(layer).unwrap();
    assert!(l.config().shapes.is_empty());
    assert_eq!(l.composition(), Composition::EffectsOnly);
    assert_eq!(l.plan(), plan(Composition::EffectsOnly, 1, false));
    assert!(l.targets().is_some());

    let passes = f.frame(layer);
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].target, f.presentation());
    assert_eq!(f.size_of(passes[0].target), (2000, 2000));
}

#[test]
fn failed_layer_does_not_stop_the_window_resize() {
    let mut f = limited(1024);
    let s = f.shape();
    let multisampled = f
        .p
        .layer()
        .with_shape(s)
        .with_multisampling(true)
        .create()
        .unwrap();
    let plain = f.p.layer().with_shape(s).create().unwrap();

    let err = f.p.resize(2000, 2000).unwrap_err();
    assert!(matches!(err, PainterError::AllocationFailed { .. }));

    assert_eq!(f.p.get_layer(plain).unwrap().size(), (2000, 2000));
    let passes = f.frame(plain);
    assert_eq!(f.size_of(passes[0].target), (2000, 2000));

    assert!(matches!(
        f.p.paint(multisampled),
        Err(PainterError::LayerNotReady)
    ));
}

#[test]
fn offscreen_output_feeds_another_layer() {
    let mut f = Fixture::new();
    let s = f.shape();
    let source = f
        .p
        .layer()
        .with_shape(s)
        .with_size(64, 64)
        .with_clear_color(RED)
        .create()
        .unwrap();
    let texture = f.p.layer_texture(source).unwrap();

    let textured = f
        .p
        .shade(&[wgpu::VertexFormat::Float32x2])
        .with_bindings(&[BINDING_TEXTURE_FRAG])
        .with_vertex(VERT)
        .with_fragment(FRAG)
        .create()
        .unwrap();
    let quad = f
        .p
        .shape(f.form, textured)
        .with_bindings(bindings! { 0 => texture })
        .create()
        .unwrap();
    let screen = f.p.layer().with_shape(quad).create().unwrap();

    f.p.backend_mut().clear_submitted();
    f.p.paint_layers(&[source, screen]).unwrap();
    let passes = f.p.backend().submitted_passes();

    assert_eq!(passes.len(), 2);
    assert_eq!(passes[0].target, texture);
    assert_eq!(passes[0].load, LoadAction::Clear(RED));
    assert_eq!(passes[1].target, f.presentation());

    let group = passes[1].bind_groups_at(0)[0];
    let (_, entries) = f.p.backend().bind_group(group).unwrap();
    assert_eq!(entries[0].resource, ResourceRef::Texture(texture));

    let info = f.p.backend().texture(texture).unwrap();
    assert!(info.usage.contains(wgpu::TextureUsages::TEXTURE_BINDING));
    assert_eq!(info.format, wgpu::TextureFormat::Rgba8Unorm);
}

#[test]
fn surface_layer_has_no_texture_to_share() {
    let mut f = Fixture::new();
    let layer = f.p.layer().create().unwrap();
    assert!(matches!(
        f.p.layer_texture(layer),
        Err(PainterError::NoPresentationTarget)
    ));
}

#[test]
fn layers_are_recorded_in_the_order_given() {
    let mut f = Fixture::new();
    let s = f.shape();
    let a = f.p.layer().with_shape(s).with_size(8, 8).create().unwrap();
    let b = f.p.layer().with_shape(s).with_size(16, 16).create().unwrap();
    let ta = f.p.layer_texture(a).unwrap();
    let tb = f.p.layer_texture(b).unwrap();

    f.p.paint_layers(&[b, a]).unwrap();
    let targets: Vec<TextureId> = f
        .p
        .backend()
        .submitted_passes()
        .iter()
        .map(|pass| pass.target)
        .collect();
    assert_eq!(targets, vec![tb, ta]);
    // Off-screen only: the surface is never acquired.
    assert!(f.p.backend().current_presentation_texture().is_none());
}

#[test]
fn removing_a_layer_releases_its_textures() {
    let mut f = Fixture::new();
    let s = f.shape();
    let e = f.chained();
    let idle = f
        .p
        .layer()
        .with_shape(s)
        .with_effect(e)
        .with_size(32, 32)
        .create()
        .unwrap();
    let live = f.p.backend().live_texture_count();

    f.p.remove_layer(idle).unwrap();
    assert_eq!(f.p.backend().live_texture_count(), live - 3);
    assert!(f.p.get_layer(idle).is_none());
    assert!(matches!(
        f.p.remove_layer(idle),
        Err(PainterError::UnknownHandle("layer"))
    ));

    // Shapes outlive the layer.
    assert!(f.p.get_shape(s).is_some());
}

#[test]
fn removing_a_just_painted_layer_waits_for_the_frame_boundary() {
    let mut f = Fixture::new();
    let s = f.shape();
    let layer = f.p.layer().with_shape(s).with_size(32, 32).create().unwrap();
    let output = f.p.layer_texture(layer).unwrap();

    f.p.paint(layer).unwrap();
    f.p.remove_layer(layer).unwrap();
    assert!(f.p.retired().contains_texture(output));

    f.p.show();
    assert!(f.p.backend().texture(output).is_none());
}
