//! Pipeline Cache Tests
//!
//! Tests for:
//! - Identical signatures share one pipeline, across shapes and layers
//! - Each signature component (cull mode, target format, sample count,
//!   depth state, blend) splits the cache
//! - Effect pipelines: fullscreen quad, single-sampled, no depth

use glam::Vec2;

use painter::backend::{HeadlessBackend, PassCommand, PipelineId};
use painter::{FormId, LayerId, Painter, PainterSettings, ShaderId, ShapeId};

const VERT: &str = "@vertex fn vs() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";
const FRAG: &str = "@fragment fn fs() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";

fn painter() -> Painter<HeadlessBackend> {
    Painter::with_backend(HeadlessBackend::default(), PainterSettings::default())
}

fn setup(p: &mut Painter<HeadlessBackend>) -> (FormId, ShaderId) {
    let form = p.form(&[Vec2::ZERO, Vec2::X, Vec2::Y]).create().unwrap();
    let shader = p
        .shade(&[wgpu::VertexFormat::Float32x2])
        .with_vertex(VERT)
        .with_fragment(FRAG)
        .create()
        .unwrap();
    (form, shader)
}

/// Pipelines bound by the last painted frame, in order.
fn bound_pipelines(p: &mut Painter<HeadlessBackend>, layer: LayerId) -> Vec<PipelineId> {
    p.backend_mut().clear_submitted();
    p.paint(layer).unwrap();
    p.backend()
        .submitted_passes()
        .iter()
        .flat_map(|pass| pass.commands.iter())
        .filter_map(|c| match c {
            PassCommand::SetPipeline(id) => Some(*id),
            _ => None,
        })
        .collect()
}

fn shape(p: &mut Painter<HeadlessBackend>, form: FormId, shader: ShaderId) -> ShapeId {
    p.shape(form, shader).create().unwrap()
}

// ============================================================================
// Sharing
// ============================================================================

#[test]
fn identical_signatures_share_a_pipeline() {
    let mut p = painter();
    let (form, shader) = setup(&mut p);
    let a = shape(&mut p, form, shader);
    let b = shape(&mut p, form, shader);
    let layer = p.layer().with_shapes(&[a, b]).create().unwrap();

    let pipelines = bound_pipelines(&mut p, layer);
    assert_eq!(pipelines.len(), 2);
    assert_eq!(pipelines[0], pipelines[1]);
    assert_eq!(p.pipelines().builds(), 1);
    assert_eq!(p.backend().pipeline_count(), 1);
}

#[test]
fn layers_with_equal_targets_share_pipelines() {
    let mut p = painter();
    let (form, shader) = setup(&mut p);
    let s = shape(&mut p, form, shader);
    let first = p.layer().with_shape(s).create().unwrap();
    let second = p.layer().with_shape(s).create().unwrap();

    assert_eq!(bound_pipelines(&mut p, first), bound_pipelines(&mut p, second));
    assert_eq!(p.pipelines().builds(), 1);
}

#[test]
fn repainting_never_builds_pipelines() {
    let mut p = painter();
    let (form, shader) = setup(&mut p);
    let s = shape(&mut p, form, shader);
    let layer = p.layer().with_shape(s).create().unwrap();
    let builds = p.pipelines().builds();

    for _ in 0..5 {
        p.paint_and_show(layer).unwrap();
    }
    assert_eq!(p.pipelines().builds(), builds);
}

// ============================================================================
// Signature components
// ============================================================================

#[test]
fn cull_mode_splits_the_cache() {
    let mut p = painter();
    let (form, shader) = setup(&mut p);
    let back = shape(&mut p, form, shader);
    let none = p
        .shape(form, shader)
        .with_cull_mode(None)
        .create()
        .unwrap();
    let layer = p.layer().with_shapes(&[back, none]).create().unwrap();

    let pipelines = bound_pipelines(&mut p, layer);
    assert_ne!(pipelines[0], pipelines[1]);
    assert_eq!(p.pipelines().len(), 2);
}

#[test]
fn target_format_splits_the_cache() {
    let mut p = painter();
    let (form, shader) = setup(&mut p);
    let s = shape(&mut p, form, shader);
    let surface = p.layer().with_shape(s).create().unwrap();
    let offscreen = p
        .layer()
        .with_shape(s)
        .with_size(64, 64)
        .with_format(wgpu::TextureFormat::Rgba16Float)
        .create()
        .unwrap();

    let a = bound_pipelines(&mut p, surface)[0];
    let b = bound_pipelines(&mut p, offscreen)[0];
    assert_ne!(a, b);
    assert_eq!(
        p.backend().pipeline(a).unwrap().color_format,
        wgpu::TextureFormat::Bgra8UnormSrgb
    );
    assert_eq!(
        p.backend().pipeline(b).unwrap().color_format,
        wgpu::TextureFormat::Rgba16Float
    );
}

#[test]
fn multisampled_and_depth_tested_layers_get_their_own_pipelines() {
    let mut p = painter();
    let (form, shader) = setup(&mut p);
    let s = shape(&mut p, form, shader);
    let plain = p.layer().with_shape(s).create().unwrap();
    let msaa = p.layer().with_shape(s).with_multisampling(true).create().unwrap();
    let depth = p.layer().with_shape(s).with_depth_test(true).create().unwrap();

    let plain = bound_pipelines(&mut p, plain)[0];
    let msaa = bound_pipelines(&mut p, msaa)[0];
    let depth = bound_pipelines(&mut p, depth)[0];

    let backend = p.backend();
    assert_eq!(backend.pipeline(plain).unwrap().sample_count, 1);
    assert_eq!(backend.pipeline(msaa).unwrap().sample_count, 4);
    assert!(backend.pipeline(plain).unwrap().depth.is_none());

    let depth_state = backend.pipeline(depth).unwrap().depth.unwrap();
    assert_eq!(depth_state.format, wgpu::TextureFormat::Depth24Plus);
    assert!(depth_state.write_enabled);
    assert_eq!(depth_state.compare, wgpu::CompareFunction::Less);
    assert_eq!(p.pipelines().len(), 3);
}

#[test]
fn depth_state_of_a_shape_is_part_of_the_signature() {
    let mut p = painter();
    let (form, shader) = setup(&mut p);
    let writes = shape(&mut p, form, shader);
    let reads = p
        .shape(form, shader)
        .with_depth_write(false)
        .with_depth_compare(wgpu::CompareFunction::LessEqual)
        .create()
        .unwrap();
    let layer = p
        .layer()
        .with_shapes(&[writes, reads])
        .with_depth_test(true)
        .create()
        .unwrap();

    let pipelines = bound_pipelines(&mut p, layer);
    assert_ne!(pipelines[0], pipelines[1]);
}

#[test]
fn blend_state_splits_the_cache() {
    let mut p = painter();
    let (form, shader) = setup(&mut p);
    let opaque = shape(&mut p, form, shader);
    let blended = p
        .shape(form, shader)
        .with_blend_state(wgpu::BlendState::ALPHA_BLENDING)
        .create()
        .unwrap();
    let layer = p.layer().with_shapes(&[opaque, blended]).create().unwrap();

    let pipelines = bound_pipelines(&mut p, layer);
    assert_ne!(pipelines[0], pipelines[1]);
}

// ============================================================================
// Effects
// ============================================================================

#[test]
fn effect_pipelines_are_single_sampled_without_depth() {
    let mut p = painter();
    let (form, shader) = setup(&mut p);
    let s = shape(&mut p, form, shader);
    let post = p
        .shade(&[])
        .with_layer_bindings(&[painter::binding::BINDING_LAYER_FRAG])
        .with_fragment(FRAG)
        .create()
        .unwrap();
    let e = p.effect(post).create().unwrap();
    let layer = p
        .layer()
        .with_shape(s)
        .with_effect(e)
        .with_multisampling(true)
        .with_depth_test(true)
        .create()
        .unwrap();

    let pipelines = bound_pipelines(&mut p, layer);
    assert_eq!(pipelines.len(), 2);

    let shape_pipeline = p.backend().pipeline(pipelines[0]).unwrap();
    assert_eq!(shape_pipeline.sample_count, 4);
    assert!(shape_pipeline.depth.is_some());
    assert_eq!(shape_pipeline.vertex_attributes, vec![wgpu::VertexFormat::Float32x2]);

    let effect_pipeline = p.backend().pipeline(pipelines[1]).unwrap();
    assert_eq!(effect_pipeline.sample_count, 1);
    assert!(effect_pipeline.depth.is_none());
    assert!(effect_pipeline.vertex_attributes.is_empty());
    assert_eq!(
        effect_pipeline.primitive.topology,
        wgpu::PrimitiveTopology::TriangleStrip
    );
}
