use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::window::{Window, WindowId};

use super::{AppConfig, CanvasApp, Event};
use crate::backend::WgpuBackend;
use crate::errors::Result;
use crate::painter::Painter;

/// Owns the event loop of a [`CanvasApp`] until [`start`](Self::start).
pub struct CanvasAppRunner<A: CanvasApp<E>, E: 'static = ()> {
    event_loop: EventLoop<E>,
    config: AppConfig,
    _app: PhantomData<A>,
}

impl<A: CanvasApp<E>, E: 'static> CanvasAppRunner<A, E> {
    pub(super) fn new() -> Result<Self> {
        let event_loop = EventLoop::<E>::with_user_event().build()?;
        event_loop.set_control_flow(ControlFlow::Wait);
        Ok(Self {
            event_loop,
            config: AppConfig::default(),
            _app: PhantomData,
        })
    }

    #[must_use]
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// A sender for user events, usable from other threads.
    #[must_use]
    pub fn handle(&self) -> CanvasHandle<E> {
        CanvasHandle {
            proxy: self.event_loop.create_proxy(),
        }
    }

    /// Runs the event loop on the current thread until the window closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the event loop fails.
    pub fn start(self) -> Result<()> {
        let mut state = RunnerState::<A, E> {
            config: self.config,
            window: None,
            painter: None,
            app: None,
            last_frame: Instant::now(),
            _event: PhantomData,
        };
        self.event_loop.run_app(&mut state)?;
        Ok(())
    }
}

/// Sends user events to a running [`CanvasApp`].
pub struct CanvasHandle<E: 'static> {
    proxy: EventLoopProxy<E>,
}

impl<E: 'static> Clone for CanvasHandle<E> {
    fn clone(&self) -> Self {
        Self {
            proxy: self.proxy.clone(),
        }
    }
}

impl<E: 'static> CanvasHandle<E> {
    /// Returns `false` if the event loop has already exited.
    pub fn send(&self, event: E) -> bool {
        self.proxy.send_event(event).is_ok()
    }
}

struct RunnerState<A, E> {
    config: AppConfig,
    window: Option<Arc<Window>>,
    painter: Option<Painter>,
    app: Option<A>,
    last_frame: Instant,
    _event: PhantomData<E>,
}

impl<A: CanvasApp<E>, E: 'static> RunnerState<A, E> {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.width,
                self.config.height,
            ));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();

        info!("Initializing painter backend...");
        let mut painter = pollster::block_on(Painter::<WgpuBackend>::new(
            window.clone(),
            size.width.max(1),
            size.height.max(1),
            self.config.settings.clone(),
        ))?;
        let app = A::init(&mut painter)?;

        window.request_redraw();
        self.last_frame = Instant::now();
        self.window = Some(window);
        self.painter = Some(painter);
        self.app = Some(app);
        Ok(())
    }

    fn redraw(&mut self) {
        let (Some(painter), Some(app)) = (&mut self.painter, &mut self.app) else {
            return;
        };
        let now = Instant::now();
        let tpf = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        app.update(painter, tpf);
        if let Err(e) = app.render(painter) {
            error!("Render failed: {e}");
        }
    }

    /// Requests a redraw if the app asked for one.
    fn schedule(&mut self) {
        if let (Some(window), Some(painter)) = (&self.window, &mut self.painter)
            && painter.take_redraw_request()
        {
            window.request_redraw();
        }
    }
}

impl<A: CanvasApp<E>, E: 'static> ApplicationHandler<E> for RunnerState<A, E> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            error!("Fatal painter error: {e}");
            event_loop.exit();
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: E) {
        if let (Some(painter), Some(app)) = (&mut self.painter, &mut self.app) {
            app.event(Event::UserEvent(event), painter);
        }
        self.schedule();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let (Some(window), Some(painter), Some(app)) =
                    (&self.window, &mut self.painter, &mut self.app)
                else {
                    return;
                };
                if let Err(e) = painter.resize(size.width, size.height) {
                    error!("Resize to {}x{} failed: {e}", size.width, size.height);
                }
                app.resize(painter, size.width, size.height);
                window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                self.schedule();
            }
            other => {
                if let (Some(painter), Some(app)) = (&mut self.painter, &mut self.app) {
                    app.event(Event::Window(other), painter);
                }
                self.schedule();
            }
        }
    }
}
