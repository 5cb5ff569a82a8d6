//! Painter Settings
//!
//! Device-level and default render configuration, fixed when the
//! [`Painter`](crate::Painter) is created.
//!
//! ```rust,ignore
//! use painter::PainterSettings;
//!
//! let settings = PainterSettings {
//!     msaa_samples: 8,
//!     vsync: false,
//!     ..Default::default()
//! };
//! ```

/// Configuration of a [`Painter`](crate::Painter) and its backend.
#[derive(Debug, Clone)]
pub struct PainterSettings {
    /// Adapter selection preference.
    pub power_preference: wgpu::PowerPreference,
    /// Features the device must support.
    pub required_features: wgpu::Features,
    /// Limits the device must support.
    pub required_limits: wgpu::Limits,
    /// Present with vertical sync.
    pub vsync: bool,
    /// Format of every layer depth texture.
    pub depth_format: wgpu::TextureFormat,
    /// Sample count used by layers with multisampling enabled.
    pub msaa_samples: u32,
    /// Color format of texture-output layers that do not set their own.
    pub offscreen_format: wgpu::TextureFormat,
    /// Address mode of the `sampler_linear` / `sampler_nearest` shortcuts.
    pub default_address_mode: wgpu::AddressMode,
}

impl Default for PainterSettings {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            vsync: true,
            depth_format: wgpu::TextureFormat::Depth24Plus,
            msaa_samples: 4,
            offscreen_format: wgpu::TextureFormat::Rgba8Unorm,
            default_address_mode: wgpu::AddressMode::ClampToEdge,
        }
    }
}
