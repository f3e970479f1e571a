use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use egui::Context as EguiContext;
use spincube_common::Viewport;
use spincube_controls::{SLIDER, SpeedPreset};
use spincube_input::Action;
use spincube_kernel::Phase;
use spincube_render::{CapabilityProbe, Rgb, StaticProbe};
use spincube_render_wgpu::{HardwareProbe, WgpuScene};
use spincube_tools::WidgetInspector;
use spincube_widget::{Widget, WidgetConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "spincube-desktop", about = "Interactive rotating cube")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Initial window width in physical pixels
    #[arg(long, default_value_t = 1200)]
    width: u32,

    /// Initial window height in physical pixels
    #[arg(long, default_value_t = 800)]
    height: u32,

    /// Starting rotation speed in radians per frame (clamped to 0..=0.05)
    #[arg(long, default_value_t = 0.01)]
    speed: f32,

    /// How long the loading overlay stays up
    #[arg(long, default_value_t = 800)]
    startup_delay_ms: u64,

    /// Behave as if no hardware acceleration were available
    #[arg(long)]
    force_fallback: bool,
}

const FEATURES: [&str; 5] = [
    "Continuous Y-axis rotation",
    "Mouse interaction with subtle tilting",
    "Dynamic shadows and realistic lighting",
    "Responsive layout with a static fallback panel",
    "Adjustable rotation speed controls",
];

const FALLBACK_TITLE: &str = "3D Not Supported";
const FALLBACK_MESSAGE: &str = "Your device doesn't support hardware-accelerated 3D";

/// Behind the fallback panel.
const FALLBACK_BACKGROUND: Rgb = Rgb(0x1f2937);

struct Gpu {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct GpuApp {
    widget_config: WidgetConfig,
    initial_size: PhysicalSize<u32>,
    force_fallback: bool,
    show_debug: bool,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    widget: Option<Widget<WgpuScene>>,
    egui_ctx: EguiContext,
}

impl GpuApp {
    fn new(cli: &Cli) -> Self {
        Self {
            widget_config: WidgetConfig::default()
                .with_speed(cli.speed)
                .with_startup_delay(Duration::from_millis(cli.startup_delay_ms)),
            initial_size: PhysicalSize::new(cli.width.max(1), cli.height.max(1)),
            force_fallback: cli.force_fallback,
            show_debug: cli.verbose,
            window: None,
            gpu: None,
            widget: None,
            egui_ctx: EguiContext::default(),
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Interactive 3D Widget")
            .with_inner_size(self.initial_size);
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let mut probe =
            HardwareProbe::new(&instance, Some(&surface)).disabled(self.force_fallback);
        let capability = probe.probe();
        let adapter = match probe.into_adapter() {
            Some(adapter) => adapter,
            None => ui_adapter(&instance, &surface)?,
        };

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("spincube_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface reports no texture formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let sample_count = if adapter
            .get_texture_format_features(surface_format)
            .flags
            .sample_count_supported(4)
        {
            4
        } else {
            1
        };

        // The probe above already ran; the widget replays its answer.
        let container = Viewport::new(config.width, config.height);
        let widget = Widget::mount(
            self.widget_config,
            container,
            &mut StaticProbe(capability),
            |desc| WgpuScene::new(&device, desc, container, surface_format, sample_count),
            Instant::now(),
        )?;

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            sample_count,
            phase = %widget.phase(),
            "GPU initialized"
        );

        self.window = Some(window);
        self.gpu = Some(Gpu {
            surface,
            device,
            queue,
            config,
            egui_winit,
            egui_renderer,
        });
        self.widget = Some(widget);
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(mut widget) = self.widget.take() {
            widget.unmount();
            tracing::debug!("{}", WidgetInspector::summary(&widget));
        }
    }

    fn redraw(&mut self) {
        let (Some(window), Some(gpu), Some(widget)) =
            (&self.window, &mut self.gpu, &mut self.widget)
        else {
            return;
        };

        widget.poll(Instant::now());
        for event in widget.drain_events() {
            tracing::debug!(?event, "widget event");
        }

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Only a refresh that will be presented advances the cube.
        widget.frame();

        let scene_drawn = match widget.scene_mut() {
            Some(scene) => {
                scene.render(&gpu.device, &gpu.queue, &view);
                true
            }
            None => false,
        };

        let raw_input = gpu.egui_winit.take_egui_input(window);
        let show_debug = self.show_debug;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            draw_ui(ctx, widget, show_debug);
        });
        gpu.egui_winit
            .handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let load = if scene_drawn {
            wgpu::LoadOp::Load
        } else {
            let [r, g, b] = FALLBACK_BACKGROUND.to_linear();
            wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            })
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("overlay_encoder"),
            });
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("overlay_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
    }
}

/// Any adapter that can present, used only to draw the fallback panel.
fn ui_adapter(instance: &wgpu::Instance, surface: &wgpu::Surface<'static>) -> Result<wgpu::Adapter> {
    let request = |force_fallback_adapter| {
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(surface),
            force_fallback_adapter,
        }))
    };
    request(false)
        .or_else(|| request(true))
        .ok_or_else(|| anyhow!("no adapter available to draw the interface"))
}

fn draw_ui(ctx: &EguiContext, widget: &mut Widget<WgpuScene>, show_debug: bool) {
    egui::TopBottomPanel::bottom("controls")
        .resizable(false)
        .show(ctx, |ui| {
            ui.add_space(8.0);
            if widget.is_supported() {
                draw_controls(ui, widget);
                ui.separator();
            }

            ui.collapsing("Features", |ui| {
                for feature in FEATURES {
                    ui.label(format!("• {feature}"));
                }
            });

            if show_debug {
                ui.collapsing("Debug", |ui| {
                    ui.monospace(WidgetInspector::summary(widget).to_string());
                });
            }
            ui.add_space(4.0);
        });

    match widget.phase() {
        Phase::Loading => {
            egui::Area::new(egui::Id::new("loading"))
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    overlay_frame().show(ui, |ui| {
                        ui.vertical_centered(|ui| {
                            ui.add(egui::Spinner::new().size(48.0));
                            ui.add_space(12.0);
                            ui.label(
                                egui::RichText::new("Initializing 3D Experience...")
                                    .color(egui::Color32::WHITE)
                                    .strong(),
                            );
                        });
                    });
                });
        }
        Phase::Ready => {
            egui::Area::new(egui::Id::new("hint"))
                .anchor(egui::Align2::LEFT_TOP, [16.0, 16.0])
                .interactable(false)
                .show(ctx, |ui| {
                    overlay_frame().show(ui, |ui| {
                        ui.label(
                            egui::RichText::new("Move your mouse to interact")
                                .color(egui::Color32::WHITE)
                                .small(),
                        );
                    });
                });
        }
        Phase::Unsupported => {
            egui::Area::new(egui::Id::new("fallback"))
                .anchor(egui::Align2::CENTER_CENTER, [0.0, -40.0])
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.heading(
                            egui::RichText::new(FALLBACK_TITLE)
                                .color(egui::Color32::WHITE)
                                .strong(),
                        );
                        ui.label(
                            egui::RichText::new(FALLBACK_MESSAGE)
                                .color(egui::Color32::LIGHT_GRAY),
                        );
                    });
                });
        }
    }
}

fn draw_controls(ui: &mut egui::Ui, widget: &mut Widget<WgpuScene>) {
    ui.horizontal(|ui| {
        ui.strong("Rotation Speed");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.small(widget.controls().label());
        });
    });

    let mut speed = widget.speed().get();
    ui.horizontal(|ui| {
        ui.small("Slow");
        let slider = egui::Slider::new(&mut speed, SLIDER.min..=SLIDER.max)
            .step_by(SLIDER.step as f64)
            .show_value(false);
        if ui.add(slider).changed() {
            widget.handle(Action::SetSpeed(speed));
        }
        ui.small("Fast");
    });

    ui.horizontal(|ui| {
        for preset in SpeedPreset::ALL {
            let selected = widget.controls().active_preset() == Some(preset);
            if ui.selectable_label(selected, preset.label()).clicked() {
                widget.handle(Action::Preset(preset));
            }
        }
    });
}

fn overlay_frame() -> egui::Frame {
    egui::Frame::new()
        .fill(egui::Color32::from_black_alpha(128))
        .inner_margin(12.0)
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            tracing::error!("failed to start: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(window), Some(gpu)) = (&self.window, &mut self.gpu) {
            let response = gpu.egui_winit.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.teardown();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if new_size.width == 0 || new_size.height == 0 {
                    return;
                }
                if let Some(gpu) = &mut self.gpu {
                    gpu.config.width = new_size.width;
                    gpu.config.height = new_size.height;
                    gpu.surface.configure(&gpu.device, &gpu.config);
                }
                if let Some(widget) = &mut self.widget {
                    widget.handle(Action::Resized(Viewport::new(
                        new_size.width,
                        new_size.height,
                    )));
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(widget) = &mut self.widget {
                    let container = widget.container();
                    widget.handle(Action::pointer_in(
                        container,
                        position.x as f32,
                        position.y as f32,
                    ));
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("spincube-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(&cli);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_copy() {
        assert_eq!(FALLBACK_TITLE, "3D Not Supported");
        assert_eq!(
            FALLBACK_MESSAGE,
            "Your device doesn't support hardware-accelerated 3D"
        );
    }

    #[test]
    fn features_do_not_promise_software_rendering() {
        assert!(FEATURES.iter().all(|f| !f.contains("software")));
        assert!(FEATURES.iter().any(|f| f.contains("fallback panel")));
    }
}
