use anyhow::Context as _;
use clap::{Parser, Subcommand};
use spincube_common::{PointerState, Viewport};
use spincube_controls::{SLIDER, SpeedPreset};
use spincube_input::Action;
use spincube_render::{DebugTextRenderer, SceneDesc, StaticProbe};
use spincube_tools::{WidgetInspector, WidgetSummary};
use spincube_widget::{Widget, WidgetConfig};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spincube-cli", about = "Drive the cube widget without a window")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Container width in pixels
    #[arg(long, default_value = "800", global = true)]
    width: u32,

    /// Container height in pixels
    #[arg(long, default_value = "400", global = true)]
    height: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and default scene parameters
    Info,
    /// List the speed presets
    Presets,
    /// Run frames against a fixed pointer and print the final state
    Simulate {
        /// Number of frames after the loading delay
        #[arg(short, long, default_value = "100")]
        frames: u64,
        /// Rotation speed in radians per frame
        #[arg(short, long, default_value = "0.01")]
        speed: f32,
        /// Normalized pointer x in -1..=1
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        pointer_x: f32,
        /// Normalized pointer y in -1..=1
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        pointer_y: f32,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print what the renderer receives on each frame
    Trace {
        #[arg(short, long, default_value = "5")]
        frames: u64,
    },
    /// Mount without hardware acceleration and report the outcome
    Fallback,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    // stdout carries command output only.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let container = Viewport::new(cli.width, cli.height);

    match cli.command {
        Commands::Info => {
            let desc = SceneDesc::standard(container);
            println!("spincube-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "speed: default={} range={}..={} step={}",
                WidgetConfig::default().initial_speed.get(),
                SLIDER.min,
                SLIDER.max,
                SLIDER.step
            );
            println!(
                "startup delay: {} ms",
                WidgetConfig::default().startup_delay.as_millis()
            );
            println!(
                "cube: size={} color={:#08x} metalness={} roughness={}",
                desc.cube.size,
                desc.cube.material.color.0,
                desc.cube.material.metalness,
                desc.cube.material.roughness
            );
            println!(
                "camera: fov={:.0}° aspect={:.3}",
                desc.camera.fov.to_degrees(),
                desc.camera.aspect
            );
            match desc.directional.shadow {
                Some(shadow) => println!("shadows: {0}x{0} map", shadow.map_size),
                None => println!("shadows: off"),
            }
        }
        Commands::Presets => {
            for preset in SpeedPreset::ALL {
                println!(
                    "{:<7} {:.3} rad/frame ({:.1}%)",
                    preset.label(),
                    preset.value(),
                    preset.value() * 100.0
                );
            }
        }
        Commands::Simulate {
            frames,
            speed,
            pointer_x,
            pointer_y,
            json,
        } => {
            let summary = simulate(container, frames, speed, pointer_x, pointer_y)?;
            println!("{}", format_summary(&summary, json)?);
        }
        Commands::Trace { frames } => {
            let mut widget = mount_ready(WidgetConfig::default(), container)?;
            for _ in 0..frames {
                widget.frame();
                if let Some(scene) = widget.scene_mut() {
                    for line in scene.drain_lines() {
                        println!("{line}");
                    }
                }
            }
            widget.unmount();
            for line in WidgetInspector::event_log(&widget) {
                println!("# {line}");
            }
        }
        Commands::Fallback => {
            let mut widget: Widget<DebugTextRenderer> = Widget::mount(
                WidgetConfig::default(),
                container,
                &mut StaticProbe::unsupported("hardware acceleration unavailable"),
                |desc| DebugTextRenderer::new(desc, container),
                Instant::now(),
            )?;
            println!("{}", WidgetInspector::summary(&widget));
            println!("scene built: {}", widget.scene().is_some());
            println!("frame requested: {}", widget.wants_frame());
            widget.unmount();
            for line in WidgetInspector::event_log(&widget) {
                println!("# {line}");
            }
        }
    }

    Ok(())
}

/// Run `frames` frames with the pointer held at a normalized position.
fn simulate(
    container: Viewport,
    frames: u64,
    speed: f32,
    pointer_x: f32,
    pointer_y: f32,
) -> anyhow::Result<WidgetSummary> {
    let config = WidgetConfig::default().with_speed(speed);
    let mut widget = mount_ready(config, container)?;

    let pointer = PointerState::new(pointer_x, pointer_y);
    let client_x = (pointer.x + 1.0) / 2.0 * container.width as f32;
    let client_y = (1.0 - pointer.y) / 2.0 * container.height as f32;
    widget.handle(Action::pointer_in(container, client_x, client_y));

    for _ in 0..frames {
        widget.frame();
    }

    let summary = WidgetInspector::summary(&widget);
    widget.unmount();
    Ok(summary)
}

fn format_summary(summary: &WidgetSummary, json: bool) -> anyhow::Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(summary)?)
    } else {
        Ok(summary.to_string())
    }
}

/// Mount with a supported capability and skip straight past the loading delay.
fn mount_ready(
    config: WidgetConfig,
    container: Viewport,
) -> anyhow::Result<Widget<DebugTextRenderer>> {
    let start = Instant::now();
    let mut widget = Widget::mount(
        config,
        container,
        &mut StaticProbe::supported("debug-text"),
        |desc| DebugTextRenderer::new(desc, container),
        start,
    )
    .context("mount widget")?;
    widget.poll(start + config.startup_delay);
    tracing::debug!("{}", WidgetInspector::summary(&widget));
    Ok(widget)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_json_is_a_single_document() {
        let summary = simulate(Viewport::new(800, 400), 10, 0.02, 0.5, -0.5).unwrap();
        let text = format_summary(&summary, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["frames"], 10);
        assert_eq!(value["phase"], "Ready");
        assert_eq!(value["mounted"], true);
        assert_eq!(value["pending_callbacks"], 1);
        assert!((value["pointer"]["x"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn simulate_plain_is_one_line() {
        let summary = simulate(Viewport::new(800, 400), 100, 0.01, 0.0, 0.0).unwrap();
        let text = format_summary(&summary, false).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("frames=100"));
    }
}
