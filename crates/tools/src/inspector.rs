use serde::Serialize;
use spincube_common::{MountId, PointerState};
use spincube_kernel::{Phase, WidgetEvent};
use spincube_render::SceneHandle;
use spincube_widget::Widget;

/// Read-only view of a mounted widget for debugging and developer UI.
pub struct WidgetInspector;

impl WidgetInspector {
    /// Snapshot of the widget's lifecycle and motion state.
    pub fn summary<S: SceneHandle>(widget: &Widget<S>) -> WidgetSummary {
        let pose = widget.pose();
        WidgetSummary {
            id: widget.id(),
            phase: widget.phase(),
            mounted: widget.is_mounted(),
            frames: widget.state().frames(),
            yaw_deg: pose.yaw.to_degrees(),
            pitch_deg: pose.pitch.to_degrees(),
            roll_deg: pose.roll.to_degrees(),
            speed: widget.speed().get(),
            pointer: widget.pointer(),
            pending_callbacks: widget.pending_callbacks(),
            listeners: widget.listener_count(),
        }
    }

    /// One line per recorded lifecycle event, oldest first.
    pub fn event_log<S: SceneHandle>(widget: &Widget<S>) -> Vec<String> {
        widget.state().events().iter().map(describe).collect()
    }
}

fn describe(event: &WidgetEvent) -> String {
    match event {
        WidgetEvent::Mounted { id, container } => format!(
            "mounted {} into {}x{}",
            id.short(),
            container.width,
            container.height
        ),
        WidgetEvent::Unsupported { reason } => format!("unsupported: {reason}"),
        WidgetEvent::Ready => "ready".to_string(),
        WidgetEvent::SpeedChanged { old, new } => {
            format!("speed {old:.3} -> {new:.3}")
        }
        WidgetEvent::Resized { viewport } => {
            format!("resized to {}x{}", viewport.width, viewport.height)
        }
        WidgetEvent::Unmounted { frames } => format!("unmounted after {frames} frames"),
    }
}

/// Summary of a widget for the inspector.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetSummary {
    pub id: MountId,
    pub phase: Phase,
    pub mounted: bool,
    pub frames: u64,
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    pub roll_deg: f32,
    pub speed: f32,
    pub pointer: PointerState,
    pub pending_callbacks: usize,
    pub listeners: usize,
}

impl std::fmt::Display for WidgetSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Widget [{}] phase={} frames={} yaw={:.1}° pitch={:.1}° roll={:.1}° speed={:.3} pending={} listeners={}",
            self.id.short(),
            self.phase,
            self.frames,
            self.yaw_deg,
            self.pitch_deg,
            self.roll_deg,
            self.speed,
            self.pending_callbacks,
            self.listeners,
        )
    }
}
