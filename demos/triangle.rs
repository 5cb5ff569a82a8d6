//! Rotating Triangle
//!
//! A multisampled, vertex-colored triangle. The rotation lives in a `mat3`
//! uniform buffer updated every frame; the tint is a constant binding.

use bytemuck::{Pod, Zeroable};
use painter::prelude::*;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 3],
}

const VERTICES: [Vertex; 3] = [
    Vertex {
        position: [0.0, 0.6],
        color: [1.0, 0.2, 0.2],
    },
    Vertex {
        position: [-0.52, -0.3],
        color: [0.2, 1.0, 0.2],
    },
    Vertex {
        position: [0.52, -0.3],
        color: [0.2, 0.2, 1.0],
    },
];

const VERTEX_SHADER: &str = r"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@group(0) @binding(0) var<uniform> rotation: mat3x3<f32>;

@vertex
fn main(@location(0) position: vec2<f32>, @location(1) color: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>((rotation * vec3<f32>(position, 1.0)).xy, 0.0, 1.0);
    out.color = color;
    return out;
}
";

const FRAGMENT_SHADER: &str = r"
@group(0) @binding(1) var<uniform> tint: vec4<f32>;

@fragment
fn main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0) * tint;
}
";

struct Triangle {
    layer: LayerId,
    rotation: BindingBuffer<Mat3>,
    angle: f32,
}

impl CanvasApp for Triangle {
    fn init(p: &mut Painter) -> Result<Self> {
        let form = p.form(&VERTICES).create()?;
        let shader = p
            .shade(&[
                wgpu::VertexFormat::Float32x2,
                wgpu::VertexFormat::Float32x3,
            ])
            .with_label("triangle")
            .with_bindings(&[BINDING_BUFFER_VERT, BINDING_BUFFER_FRAG])
            .with_vertex(VERTEX_SHADER)
            .with_fragment(FRAGMENT_SHADER)
            .create()?;

        let rotation = p.bind_mat3(Mat3::IDENTITY)?;
        let shape = p
            .shape(form, shader)
            .with_cull_mode(None)
            .with_bindings(bindings! {
                0 => rotation.binding(),
                1 => BindingSource::constant(Vec4::new(1.0, 1.0, 1.0, 1.0)),
            })
            .create()?;

        let layer = p
            .layer()
            .with_shape(shape)
            .with_clear_color(wgpu::Color {
                r: 0.05,
                g: 0.05,
                b: 0.08,
                a: 1.0,
            })
            .with_multisampling(true)
            .create()?;

        Ok(Self {
            layer,
            rotation,
            angle: 0.0,
        })
    }

    fn update(&mut self, p: &mut Painter, tpf: f32) {
        self.angle += tpf;
        if let Err(e) = self.rotation.update(p, Mat3::from_angle(self.angle)) {
            log::error!("Failed to update rotation: {e}");
        }
        p.request_next_frame();
    }

    fn render(&self, p: &mut Painter) -> Result<()> {
        p.paint_and_show(self.layer)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    Triangle::create()?
        .config(AppConfig::default().with_title("Triangle"))
        .start()?;
    Ok(())
}
