//! Shapes With Effects
//!
//! A static quad drawn into a ping-pong texture and post-processed by two
//! chained effects: a color inversion followed by a vignette whose strength
//! follows the cursor.

use painter::app::WindowEvent;
use painter::prelude::*;

const QUAD: [Vec2; 4] = [
    Vec2::new(-0.5, -0.5),
    Vec2::new(0.5, -0.5),
    Vec2::new(-0.5, 0.5),
    Vec2::new(0.5, 0.5),
];

const VERTEX_SHADER: &str = r"
@vertex
fn main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 0.0, 1.0);
}
";

const FRAGMENT_SHADER: &str = r"
@fragment
fn main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.9, 0.6, 0.1, 1.0);
}
";

const INVERT_SHADER: &str = r"
@group(1) @binding(0) var upstream: texture_2d<f32>;

@fragment
fn main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let color = textureLoad(upstream, vec2<i32>(position.xy), 0);
    return vec4<f32>(1.0 - color.rgb, 1.0);
}
";

const VIGNETTE_SHADER: &str = r"
@group(0) @binding(0) var<uniform> strength: f32;
@group(1) @binding(0) var upstream: texture_2d<f32>;

@fragment
fn main(@builtin(position) position: vec4<f32>, @location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let color = textureLoad(upstream, vec2<i32>(position.xy), 0);
    let d = distance(uv, vec2<f32>(0.5));
    return vec4<f32>(color.rgb * (1.0 - strength * d * d * 2.0), 1.0);
}
";

struct Simple {
    layer: LayerId,
    strength: BindingBuffer<f32>,
    width: f32,
}

impl CanvasApp for Simple {
    fn init(p: &mut Painter) -> Result<Self> {
        let form = p
            .form(&QUAD)
            .with_topology(wgpu::PrimitiveTopology::TriangleStrip)
            .create()?;
        let shader = p
            .shade(&[wgpu::VertexFormat::Float32x2])
            .with_vertex(VERTEX_SHADER)
            .with_fragment(FRAGMENT_SHADER)
            .create()?;
        let quad = p.shape(form, shader).with_cull_mode(None).create()?;

        let invert = p
            .shade(&[])
            .with_label("invert")
            .with_layer_bindings(&[BINDING_LAYER_FRAG])
            .with_fragment(INVERT_SHADER)
            .create()?;
        let vignette = p
            .shade(&[])
            .with_label("vignette")
            .with_bindings(&[BINDING_BUFFER_FRAG])
            .with_layer_bindings(&[BINDING_LAYER_FRAG])
            .with_fragment(VIGNETTE_SHADER)
            .create()?;

        let strength = p.bind_f32(0.5)?;
        let invert = p.effect(invert).create()?;
        let vignette = p
            .effect(vignette)
            .with_bindings(bindings! { 0 => strength.binding() })
            .create()?;

        let layer = p
            .layer()
            .with_shape(quad)
            .with_effects(&[invert, vignette])
            .with_clear_color(wgpu::Color::BLACK)
            .create()?;

        let (width, _) = p.surface_size();
        Ok(Self {
            layer,
            strength,
            width: width as f32,
        })
    }

    fn resize(&mut self, _p: &mut Painter, width: u32, _height: u32) {
        self.width = width as f32;
    }

    fn event(&mut self, event: Event<()>, p: &mut Painter) {
        if let Event::Window(WindowEvent::CursorMoved { position, .. }) = event {
            let strength = (position.x as f32 / self.width.max(1.0)).clamp(0.0, 1.0);
            match self.strength.update(p, strength) {
                Ok(()) => p.request_next_frame(),
                Err(e) => log::warn!("Failed to update vignette: {e}"),
            }
        }
    }

    fn render(&self, p: &mut Painter) -> Result<()> {
        p.paint_and_show(self.layer)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    Simple::create()?
        .config(AppConfig::default().with_title("Shapes With Effects"))
        .start()?;
    Ok(())
}
