//! Application event loop.
//!
//! One [`App`] drives the viewer through winit's [`ApplicationHandler`]:
//! window and device events are translated into [`InputEvent`]s, and every
//! redraw runs one frame:
//! 1. Drain the queued input into the scene
//! 2. Advance the scene by the elapsed time
//! 3. Upload the frame's data and render it
//! 4. Present and request the next redraw

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    config::{DEFAULT_CONFIG_FILE, SceneConfig},
    context::Context,
    diagnostics::DebugLogs,
    input::InputCollector,
    renderer::Renderer,
    resources::glb::GltfAsset,
    scene::Scene,
};

pub const WINDOW_TITLE: &str = "frost-ngin";

/// Startup parameters of the viewer.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub models: Vec<PathBuf>,
    pub debug_logs: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            models: Vec::new(),
            debug_logs: DebugLogs::from_env().enabled(),
        }
    }
}

/// The saved configuration if there is a readable one, defaults otherwise.
pub fn initial_config(path: &std::path::Path) -> SceneConfig {
    if !path.is_file() {
        return SceneConfig::default();
    }
    match SceneConfig::load(path) {
        Ok(config) => {
            log::info!("loaded config from {}", path.display());
            config
        }
        Err(e) => {
            log::warn!("ignoring config: {e:#}");
            SceneConfig::default()
        }
    }
}

#[derive(Debug)]
struct Running {
    ctx: Context,
    scene: Scene,
    renderer: Renderer,
    is_surface_configured: bool,
}

impl Running {
    fn new(window: Arc<Window>, options: &RunOptions) -> Result<Self> {
        let ctx = futures::executor::block_on(Context::new(window))?;
        let [width, height] = ctx.size();
        let config = initial_config(&options.config_path);
        let mut renderer = Renderer::new(
            &ctx.device,
            &ctx.queue,
            ctx.config.format,
            ctx.size(),
            config.material.to_uniform(),
        )?;
        let mut scene = Scene::new(config, width, height)
            .with_config_path(options.config_path.clone())
            .with_debug_logs(DebugLogs::new(options.debug_logs));

        // A model that fails to load is skipped; the scene still starts.
        for path in &options.models {
            match GltfAsset::load(path) {
                Ok(asset) => {
                    renderer.add_model(&ctx.device, &ctx.queue, &asset);
                    scene.add_model(asset);
                }
                Err(e) => log::error!("{e:#}"),
            }
        }

        Ok(Self {
            ctx,
            scene,
            renderer,
            is_surface_configured: true,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.is_surface_configured = self.ctx.resize(width, height);
        if self.is_surface_configured {
            self.renderer.resize(&self.ctx.device, [width, height]);
            self.scene.resize(width, height);
        }
    }

    fn frame(&mut self, input: &mut InputCollector, dt: f32) -> Result<(), wgpu::SurfaceError> {
        for event in input.drain() {
            self.scene.handle(event);
        }
        self.scene.update(dt);
        if self.scene.take_field_rebuilt() {
            self.renderer.release_object_buffers();
        }
        if self.scene.ui_visible() {
            self.ctx.window.set_title(&self.scene.hud_title());
        }

        if !self.is_surface_configured {
            return Ok(());
        }
        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let inputs = self.scene.render_inputs();
        self.renderer
            .render(&self.ctx.device, &self.ctx.queue, &view, &inputs);
        self.ctx.window.pre_present_notify();
        output.present();
        Ok(())
    }
}

pub struct App {
    options: RunOptions,
    input: InputCollector,
    state: Option<Running>,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            input: InputCollector::new(),
            state: None,
            last_time: Instant::now(),
            error: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes().with_title(WINDOW_TITLE);
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.error = Some(e.into());
                event_loop.exit();
                return;
            }
        };
        match Running::new(window, &self.options) {
            Ok(running) => {
                running.ctx.window.request_redraw();
                self.state = Some(running);
                self.last_time = Instant::now();
            }
            Err(e) => {
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if self.state.is_some() {
            self.input.device_event(&event);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };
        self.input.window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed().as_secs_f32();
                self.last_time = Instant::now();

                match state.frame(&mut self.input, dt) {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => log::error!("Unable to render {e}"),
                }
                if state.scene.should_quit() {
                    event_loop.exit();
                    return;
                }
                state.ctx.window.request_redraw();
            }
            _ => {}
        }
    }
}

pub fn run(options: RunOptions) -> Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(options);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
