//! Interactive window host.
//!
//! Keys: `Space` pauses (trails keep fading), `R` scatters the particles and
//! rewinds the timeline, `Up`/`Down` double or halve the time scale, `[`/`]`
//! shorten or lengthen the trails, `Escape` quits.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::config::WindConfig;
use crate::error::Error;
use crate::field::EncodedField;
use crate::gpu::{GpuContext, WindowSurface};
use crate::pipeline::WindPipeline;
use crate::ramp::ColorRamp;
use crate::time::FrameClock;

/// Everything needed to build the pipeline once a window exists.
pub struct Scene {
    pub fields: Vec<EncodedField>,
    pub config: WindConfig,
    pub ramp: ColorRamp,
}

struct Running {
    window: Arc<Window>,
    ctx: GpuContext,
    surface: WindowSurface,
    pipeline: WindPipeline,
}

pub struct App {
    scene: Option<Scene>,
    running: Option<Running>,
    clock: FrameClock,
    error: Option<Box<dyn std::error::Error>>,
}

/// Frames between window title refreshes.
const TITLE_INTERVAL: u64 = 30;

impl App {
    pub fn new(scene: Scene, clock: FrameClock) -> Self {
        Self {
            scene: Some(scene),
            running: None,
            clock,
            error: None,
        }
    }

    /// Open a window and run until it closes, timing frames with `clock`.
    pub fn run(scene: Scene, clock: FrameClock) -> Result<(), Box<dyn std::error::Error>> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        let mut app = App::new(scene, clock);
        event_loop.run_app(&mut app)?;
        match app.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn start(event_loop: &ActiveEventLoop, scene: Scene) -> Result<Running, Box<dyn std::error::Error>> {
        let window_attrs = Window::default_attributes()
            .with_title("windtrail")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 640));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let (ctx, surface) = GpuContext::for_window(window.clone())?;
        let pipeline = WindPipeline::new(
            &ctx,
            scene.fields,
            scene.config,
            &scene.ramp,
            surface.format(),
            surface.config.width,
            surface.config.height,
        )?;
        Ok(Running {
            window,
            ctx,
            surface,
            pipeline,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: Box<dyn std::error::Error>) {
        log::error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl Running {
    fn render(&mut self, clock: &mut FrameClock) -> Result<(), wgpu::SurfaceError> {
        let dt = clock.tick();
        let frame = self.surface.surface.get_current_texture()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        if clock.is_paused() {
            self.pipeline.render_paused(&self.ctx, &view);
        } else {
            self.pipeline.advance_and_render(&self.ctx, dt, &view);
        }
        self.window.pre_present_notify();
        frame.present();

        if clock.frame() % TITLE_INTERVAL == 0 {
            self.window.set_title(&format!(
                "windtrail - {:.0} fps, x{} speed{}",
                clock.fps(),
                clock.time_scale(),
                if clock.is_paused() { " (paused)" } else { "" }
            ));
        }
        Ok(())
    }

    /// Nudge the trail fade, ignoring steps that would leave `(0, 1)`.
    fn adjust_fade(&mut self, step: f32) {
        let fade = self.pipeline.trails().fade_opacity() + step;
        match self.pipeline.set_fade_opacity(&self.ctx, fade) {
            Ok(()) => log::info!(
                "fade opacity {fade:.3} (half-life {:.0} frames)",
                self.pipeline.trails().half_life_frames()
            ),
            Err(err) => log::debug!("{err}"),
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.surface.resize(&self.ctx, width, height);
        self.pipeline.resize(&self.ctx, width, height)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(scene) = self.scene.take() else {
            return;
        };
        match Self::start(event_loop, scene) {
            Ok(running) => {
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Err(err) = running.resize(physical_size.width, physical_size.height) {
                    self.fail(event_loop, err.into());
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match key {
                KeyCode::Space => self.clock.toggle_pause(),
                KeyCode::KeyR => running.pipeline.reset(&running.ctx),
                KeyCode::ArrowUp => self.clock.set_time_scale(self.clock.time_scale() * 2.0),
                KeyCode::ArrowDown => self.clock.set_time_scale(self.clock.time_scale() * 0.5),
                KeyCode::BracketLeft => running.adjust_fade(-0.002),
                KeyCode::BracketRight => running.adjust_fade(0.002),
                KeyCode::Escape => event_loop.exit(),
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                match running.render(&mut self.clock) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let (width, height) = (running.surface.config.width, running.surface.config.height);
                        running.surface.resize(&running.ctx, width, height);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("surface out of memory");
                        event_loop.exit();
                    }
                    Err(e) => log::warn!("render error: {e:?}"),
                }
                running.window.request_redraw();
            }
            _ => {}
        }
    }
}
