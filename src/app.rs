//! Window, event loop, and the glue between winit events and the frame driver.
//!
//! The window and GPU are created when the event loop resumes. Every redraw runs one
//! [`FrameDriver::tick`], renders, and immediately requests the next redraw, so the loop
//! is paced by the surface's vsync.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowAttributes, WindowId};

use crate::config::Config;
use crate::frame::FrameDriver;
use crate::gpu::{GpuContext, GpuError};
use crate::hud::{Hud, HudInput};
use crate::input::Input;
use crate::renderer::Renderer;

/// Errors that stop the viewer.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("window creation: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Open the viewer window and run until it is closed.
pub fn run(config: Config) -> Result<(), RunError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = MarblewalkApp::Pending {
        config,
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app {
        MarblewalkApp::Pending { error: Some(e), .. } => Err(e),
        _ => Ok(()),
    }
}

enum MarblewalkApp {
    Pending {
        config: Config,
        error: Option<RunError>,
    },
    Running(Box<Running>),
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: Renderer,
    driver: FrameDriver,
    input: Input,
    hud: Hud,
}

impl Running {
    fn new(event_loop: &ActiveEventLoop, config: &Config) -> Result<Self, RunError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.window.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.window.width,
                config.window.height,
            ));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;
        let renderer = Renderer::new(&gpu);

        let mut driver = FrameDriver::new(config, Instant::now());
        driver.resize(gpu.width(), gpu.height());
        driver.load_assets(config);

        let mut input = Input::new();
        input.set_viewport(gpu.width(), gpu.height());

        log::info!(
            "viewer ready: {}x{}, model {}, floor texture {}",
            gpu.width(),
            gpu.height(),
            config.scene.model_path.display(),
            config.scene.floor_texture.display()
        );

        Ok(Self {
            window,
            gpu,
            renderer,
            driver,
            input,
            hud: Hud::new(),
        })
    }

    fn viewport(&self) -> (u32, u32) {
        (self.gpu.width(), self.gpu.height())
    }

    /// Grab or release the cursor for any pending lock request.
    fn apply_pointer_lock(&mut self) {
        let Some(lock) = self.driver.controls.take_lock_request() else {
            return;
        };

        let result = if lock {
            self.window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined))
        } else {
            self.window.set_cursor_grab(CursorGrabMode::None)
        };

        match result {
            Ok(()) => {
                self.window.set_cursor_visible(!lock);
                self.driver.controls.set_locked(lock);
            }
            Err(e) => {
                log::debug!("pointer lock request failed: {e:?}");
                self.window.set_cursor_visible(true);
                self.driver.controls.set_locked(false);
            }
        }
        self.input.set_pointer_frozen(self.driver.controls.is_locked());
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let viewport = self.viewport();
        let engaged = self.driver.controls.is_locked();

        let clicked_panel = self.hud.update(
            HudInput::from_input(&self.input),
            &mut self.driver.scene,
            engaged,
            viewport,
        );
        if !engaged && !clicked_panel && self.input.mouse_pressed(MouseButton::Left) {
            self.driver.controls.lock();
        }

        self.driver.input = self.input.state();
        self.driver.tick(Instant::now());

        self.renderer.sync(&self.gpu, &mut self.driver.scene.world);
        let camera = self.driver.camera();
        let engaged = self.driver.controls.is_locked();
        let hud = &self.hud;
        let scene = &self.driver.scene;
        let result = self.renderer.render(&self.gpu, scene, &camera, |draw2d| {
            hud.draw(draw2d, scene, engaged, viewport)
        });

        if let Err(err) = result {
            match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    log::info!("surface {err}, reconfiguring");
                    self.gpu.reconfigure();
                }
                wgpu::SurfaceError::OutOfMemory => {
                    log::error!("surface out of memory");
                    event_loop.exit();
                }
                e => log::warn!("render error: {e}"),
            }
        }

        self.input.begin_frame();
        self.apply_pointer_lock();
        self.window.request_redraw();
    }
}

impl ApplicationHandler for MarblewalkApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let MarblewalkApp::Pending { config, error } = self else {
            return;
        };

        match Running::new(event_loop, config) {
            Ok(running) => {
                running.window.request_redraw();
                *self = MarblewalkApp::Running(Box::new(running));
            }
            Err(e) => {
                log::error!("failed to start: {e}");
                *error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let MarblewalkApp::Running(app) = self else {
            return;
        };

        app.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                app.gpu.resize(size.width, size.height);
                app.renderer.resize(&app.gpu);
                app.driver.resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                app.driver.controls.unlock();
                app.apply_pointer_lock();
            }
            WindowEvent::Focused(false) => {
                app.driver.controls.unlock();
                app.apply_pointer_lock();
            }
            WindowEvent::RedrawRequested => app.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let MarblewalkApp::Running(app) = self {
            app.input.handle_device_event(&event);
        }
    }
}
