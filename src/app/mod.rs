//! Winit Application Runner
//!
//! Implement [`CanvasApp`] and start it with [`CanvasApp::create`]:
//!
//! ```rust,ignore
//! use painter::app::{AppConfig, CanvasApp};
//! use painter::prelude::*;
//!
//! struct Demo {
//!     layer: LayerId,
//! }
//!
//! impl CanvasApp for Demo {
//!     fn init(p: &mut Painter) -> Result<Self> {
//!         let layer = p.layer().with_clear_color(wgpu::Color::BLUE).create()?;
//!         Ok(Self { layer })
//!     }
//!
//!     fn render(&self, p: &mut Painter) -> Result<()> {
//!         p.paint_and_show(self.layer)
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     Demo::create()?.config(AppConfig::default().with_title("Demo")).start()
//! }
//! ```
//!
//! The runner redraws once after start-up, after every resize and whenever
//! the app called [`Painter::request_next_frame`] during the previous
//! callback. Apps that animate request the next frame from `update`.

mod runner;

pub use runner::{CanvasAppRunner, CanvasHandle};

pub use winit::event::WindowEvent;

use crate::errors::Result;
use crate::painter::Painter;
use crate::settings::PainterSettings;

/// Input delivered to [`CanvasApp::event`].
#[derive(Debug)]
pub enum Event<E> {
    /// Sent through a [`CanvasHandle`].
    UserEvent(E),
    /// A window event the runner does not handle itself.
    Window(WindowEvent),
}

/// Window and painter configuration of a runner.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    /// Logical window width.
    pub width: u32,
    /// Logical window height.
    pub height: u32,
    pub settings: PainterSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Painter".into(),
            width: 800,
            height: 600,
            settings: PainterSettings::default(),
        }
    }
}

impl AppConfig {
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: PainterSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Application callbacks driven by [`CanvasAppRunner`].
///
/// # Lifecycle
///
/// 1. [`init`](Self::init) - once, after the window and device exist
/// 2. [`resize`](Self::resize) - after the painter resized its layers
/// 3. [`update`](Self::update) then [`render`](Self::render) - per redraw
/// 4. [`event`](Self::event) - for user events and unhandled window events
pub trait CanvasApp<E: 'static = ()>: Sized + 'static {
    /// Creates the app's forms, shaders, shapes and layers.
    fn init(painter: &mut Painter) -> Result<Self>;

    #[allow(unused_variables)]
    fn resize(&mut self, painter: &mut Painter, width: u32, height: u32) {}

    /// Advances the app state. `tpf` is the time since the previous frame in
    /// seconds.
    #[allow(unused_variables)]
    fn update(&mut self, painter: &mut Painter, tpf: f32) {}

    /// Paints and shows the frame.
    fn render(&self, painter: &mut Painter) -> Result<()>;

    #[allow(unused_variables)]
    fn event(&mut self, event: Event<E>, painter: &mut Painter) {}

    /// Creates the event loop for this app.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform event loop cannot be created.
    fn create() -> Result<CanvasAppRunner<Self, E>> {
        CanvasAppRunner::new()
    }
}
