//! Uniform Layout Tests
//!
//! Tests for:
//! - to_aligned: stride per value kind, zeroed padding, mat3 column padding
//! - Uniform trait: kind constants match the produced values
//! - BindingBuffer: creation and update write aligned bytes

use glam::{Mat3, Mat4, UVec2, Vec2, Vec3, Vec4, uvec2, vec2, vec3, vec4};

use painter::backend::HeadlessBackend;
use painter::uniform::{Mat3A, Uniform, UniformKind, UniformValue, to_aligned};
use painter::{Painter, PainterSettings};

fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes(c.try_into().unwrap()))
        .collect()
}

fn painter() -> Painter<HeadlessBackend> {
    Painter::with_backend(HeadlessBackend::default(), PainterSettings::default())
}

// ============================================================================
// Strides
// ============================================================================

#[test]
fn every_kind_has_its_documented_stride() {
    let cases = [
        (UniformValue::F32(0.5), 16),
        (UniformValue::UVec2(uvec2(7, 9)), 16),
        (UniformValue::Vec2(vec2(1.0, 2.0)), 16),
        (UniformValue::Vec3(vec3(1.0, 2.0, 3.0)), 16),
        (UniformValue::Vec4(vec4(1.0, 2.0, 3.0, 4.0)), 16),
        (UniformValue::Mat3(Mat3::from_cols_array(&[1.0; 9])), 48),
        (UniformValue::Mat4(Mat4::from_cols_array(&[1.0; 16])), 64),
    ];

    for (value, stride) in cases {
        let bytes = to_aligned(value);
        assert_eq!(bytes.size(), stride as u64, "{:?}", value.kind());
        assert_eq!(bytes.as_bytes().len(), stride);
        assert_eq!(value.kind().stride(), stride);
    }
}

#[test]
fn trait_kinds_match_values() {
    assert_eq!(f32::KIND, UniformKind::F32);
    assert_eq!(UVec2::KIND, UniformKind::UVec2);
    assert_eq!(Vec2::KIND, UniformKind::Vec2);
    assert_eq!(Vec3::KIND, UniformKind::Vec3);
    assert_eq!(Vec4::KIND, UniformKind::Vec4);
    assert_eq!(Mat3::KIND, UniformKind::Mat3);
    assert_eq!(Mat4::KIND, UniformKind::Mat4);
    assert_eq!(Vec3::ONE.to_uniform().kind(), UniformKind::Vec3);
}

// ============================================================================
// Padding
// ============================================================================

#[test]
fn scalar_occupies_low_bytes_and_pads_with_zeros() {
    let bytes = to_aligned(UniformValue::F32(2.5));
    assert_eq!(&bytes.as_bytes()[..4], &2.5f32.to_ne_bytes());
    assert!(bytes.as_bytes()[4..].iter().all(|b| *b == 0));
}

#[test]
fn uvec2_keeps_both_components() {
    let bytes = to_aligned(UniformValue::UVec2(uvec2(3, u32::MAX)));
    let raw = bytes.as_bytes();
    assert_eq!(&raw[0..4], &3u32.to_ne_bytes());
    assert_eq!(&raw[4..8], &u32::MAX.to_ne_bytes());
    assert!(raw[8..].iter().all(|b| *b == 0));
}

#[test]
fn vec3_fourth_component_is_always_zero() {
    // NaN bit patterns must not leak into the padding either.
    let bytes = to_aligned(UniformValue::Vec3(vec3(f32::NAN, -1.0, 1e30)));
    let raw = bytes.as_bytes();
    assert!(raw[12..16].iter().all(|b| *b == 0));
    assert_eq!(floats(&raw[4..12]), vec![-1.0, 1e30]);
}

#[test]
fn vec4_has_no_padding() {
    let bytes = to_aligned(UniformValue::Vec4(vec4(1.0, 2.0, 3.0, 4.0)));
    assert_eq!(floats(bytes.as_bytes()), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn mat3_columns_are_padded_to_four_floats_in_order() {
    let m = Mat3::from_cols(
        vec3(1.0, 2.0, 3.0),
        vec3(4.0, 5.0, 6.0),
        vec3(7.0, 8.0, 9.0),
    );
    let bytes = to_aligned(UniformValue::Mat3(m));
    assert_eq!(
        floats(bytes.as_bytes()),
        vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0, 7.0, 8.0, 9.0, 0.0]
    );
}

#[test]
fn mat3a_matches_aligned_mat3() {
    let m = Mat3::from_cols_array(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    let padded = Mat3A::from_mat3(m);
    let bytes = to_aligned(UniformValue::Mat3(m));
    assert_eq!(bytemuck::bytes_of(&padded), bytes.as_bytes());
}

#[test]
fn mat4_is_column_major_without_padding() {
    let m = Mat4::from_cols_array(&std::array::from_fn::<f32, 16, _>(|i| i as f32));
    let bytes = to_aligned(UniformValue::Mat4(m));
    assert_eq!(floats(bytes.as_bytes()), m.to_cols_array().to_vec());
}

// ============================================================================
// BindingBuffer
// ============================================================================

#[test]
fn binding_buffer_starts_with_initial_value() {
    let mut p = painter();
    let color = p.bind_vec3(vec3(0.25, 0.5, 0.75)).unwrap();

    let data = p.backend().buffer_data(color.buffer()).unwrap();
    assert_eq!(data.len(), 16);
    assert_eq!(floats(data), vec![0.25, 0.5, 0.75, 0.0]);
}

#[test]
fn binding_buffer_update_rewrites_in_place() {
    let mut p = painter();
    let transform = p.bind_mat3(Mat3::IDENTITY).unwrap();
    let buffers = p.backend().buffer_count();

    let scale = Mat3::from_diagonal(vec3(2.0, 3.0, 1.0));
    transform.update(&mut p, scale).unwrap();

    assert_eq!(p.backend().buffer_count(), buffers);
    let data = p.backend().buffer_data(transform.buffer()).unwrap();
    assert_eq!(data, to_aligned(UniformValue::Mat3(scale)).as_bytes());
}

#[test]
fn generic_bind_uniform_uses_kind_stride() {
    let mut p = painter();
    let time = p.bind_uniform(1.5f32).unwrap();
    let size = p.bind_uvec2(uvec2(640, 480)).unwrap();

    assert_eq!(p.backend().buffer_data(time.buffer()).unwrap().len(), 16);
    assert_eq!(p.backend().buffer_data(size.buffer()).unwrap().len(), 16);
}
