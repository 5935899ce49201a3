use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use shadertext::prelude::*;
use shadertext::settings::{SettingsFormat, SettingsStore, SettingsWatcher};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

const FPS_LOG_INTERVAL: Duration = Duration::from_secs(5);
const WINDOW_TITLE: &str = "ShaderText";

pub fn run(
    settings: SettingsStore,
    settings_path: Option<PathBuf>,
    size: [f64; 2],
) -> Result<(), String> {
    let watcher = settings_path.as_ref().and_then(|path| {
        SettingsWatcher::start(path.clone())
            .inspect_err(|err| {
                warn!(
                    "failed to watch settings file '{}': {}",
                    path.display(),
                    err
                );
            })
            .ok()
    });

    let event_loop = EventLoop::new().map_err(|err| err.to_string())?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = Runner::new(settings, settings_path, watcher, size);
    event_loop
        .run_app(&mut runner)
        .map_err(|err| err.to_string())
}

struct Gpu {
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

struct Runner {
    settings: SettingsStore,
    settings_path: Option<PathBuf>,
    watcher: Option<SettingsWatcher>,
    initial_size: [f64; 2],
    window: Option<Arc<Window>>,
    window_id: Option<WindowId>,
    // Dropped before the device it was created on.
    preview: Option<Preview>,
    gpu: Option<Gpu>,
    last_fps_log: Instant,
    shown_error: Option<ProgramCompileError>,
}

impl Runner {
    fn new(
        settings: SettingsStore,
        settings_path: Option<PathBuf>,
        watcher: Option<SettingsWatcher>,
        initial_size: [f64; 2],
    ) -> Self {
        Self {
            settings,
            settings_path,
            watcher,
            initial_size,
            window: None,
            window_id: None,
            preview: None,
            gpu: None,
            last_fps_log: Instant::now(),
            shown_error: None,
        }
    }

    fn init_runtime(
        &mut self,
        event_loop: &ActiveEventLoop,
    ) -> Result<(), String> {
        let [w, h] = self.initial_size;
        let attrs = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(w, h));

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|err| err.to_string())?,
        );

        let instance =
            wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let surface = instance
            .create_surface(window.clone())
            .map_err(|err| err.to_string())?;

        let adapter = pollster::block_on(instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            },
        ))
        .map_err(|err| err.to_string())?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("shadertext-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::default(),
            },
        ))
        .map_err(|err| err.to_string())?;

        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps.formats)
            .ok_or_else(|| "surface has no supported formats".to_string())?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);

        let viewport =
            Viewport::new(width, height, window.scale_factor() as f32);
        let preview = Preview::with_system_fonts(
            &device,
            viewport,
            format,
            self.settings.current(),
        )
        .map_err(|err| err.to_string())?;

        info!("surface format {:?}", format);

        self.window_id = Some(window.id());
        self.window = Some(window);
        self.preview = Some(preview);
        self.gpu = Some(Gpu {
            surface,
            surface_config,
            device,
            queue,
        });

        Ok(())
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let Some(window) = self.window.as_ref() else {
            return;
        };

        gpu.surface_config.width = new_size.width;
        gpu.surface_config.height = new_size.height;
        gpu.surface.configure(&gpu.device, &gpu.surface_config);

        if let Some(preview) = self.preview.as_mut() {
            preview.queue_resize(Viewport::new(
                new_size.width,
                new_size.height,
                window.scale_factor() as f32,
            ));
        }
    }

    fn render(&mut self, event_loop: &ActiveEventLoop) {
        self.reload_settings_if_changed();

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let Some(preview) = self.preview.as_mut() else {
            return;
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.surface_config);
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout while acquiring frame");
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory; exiting");
                self.shutdown();
                event_loop.exit();
                return;
            }
            Err(wgpu::SurfaceError::Other) => {
                warn!("surface error while acquiring frame");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        preview.render(
            &gpu.device,
            &gpu.queue,
            &view,
            self.settings.current(),
            Instant::now(),
        );
        output.present();

        let program_error = preview.last_error();
        if program_error != self.shown_error.as_ref() {
            if program_error.is_none() {
                info!("pattern error cleared");
            }
            if let Some(window) = self.window.as_ref() {
                window.set_title(&window_title(
                    program_error,
                    preview.active_pattern(),
                ));
            }
            self.shown_error = program_error.cloned();
        }

        if self.last_fps_log.elapsed() >= FPS_LOG_INTERVAL {
            self.last_fps_log = Instant::now();
            debug!(
                "frame {} at {:.1} fps",
                preview.clock().frame_count(),
                preview.clock().average_fps()
            );
        }
    }

    fn reload_settings_if_changed(&mut self) {
        let Some(watcher) = self.watcher.as_ref() else {
            return;
        };
        let Some(path) = self.settings_path.as_ref() else {
            return;
        };

        if !watcher.take_changed() {
            return;
        }

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                warn!("failed to read settings '{}': {}", path.display(), err);
                return;
            }
        };

        match self.settings.import(&source, SettingsFormat::from_path(path)) {
            Ok(()) => info!("reloaded settings: {}", path.display()),
            Err(err) => warn!(
                "keeping previous settings; '{}' rejected: {}",
                path.display(),
                err
            ),
        }
    }

    fn shutdown(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.shutdown();
        }
        self.gpu = None;
    }
}

impl ApplicationHandler for Runner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.init_runtime(event_loop) {
            error!("failed to initialize viewer: {}", err);
            event_loop.exit();
            return;
        }

        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window_id != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => self.resize(new_size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = self.window.as_ref() {
                    let size = window.inner_size();
                    self.resize(size);
                }
            }
            WindowEvent::RedrawRequested => self.render(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

/// Names the failing pattern while an older one keeps drawing.
fn window_title(
    program_error: Option<&ProgramCompileError>,
    drawing: PatternId,
) -> String {
    match program_error {
        Some(err) => format!(
            "{} ('{}' failed to compile, showing '{}')",
            WINDOW_TITLE, err.program, drawing
        ),
        None => WINDOW_TITLE.to_string(),
    }
}

/// Patterns compute display values directly, so a linear (non-sRGB) view is
/// preferred to keep colors identical to the offscreen target.
fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
}
