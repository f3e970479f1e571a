use crate::camera::PerspectiveCamera;
use crate::scene::SceneDesc;
use spincube_common::{CubePose, Viewport};
use std::collections::VecDeque;

/// Errors from scene construction and drawing.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("cannot build a scene for an empty viewport")]
    EmptyViewport,
    #[error("scene construction failed: {0}")]
    Bootstrap(String),
    #[error("surface error: {0}")]
    Surface(String),
}

/// Outcome of capability detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// A hardware-accelerated adapter is available.
    Supported { adapter: String },
    /// No usable adapter; the reason is shown in logs.
    Unsupported { reason: String },
}

impl Capability {
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported { .. })
    }
}

/// Detects hardware-accelerated rendering once per mount.
pub trait CapabilityProbe {
    fn probe(&mut self) -> Capability;
}

/// Probe with a predetermined answer, for headless hosts and tests.
#[derive(Debug, Clone)]
pub struct StaticProbe(pub Capability);

impl StaticProbe {
    pub fn supported(adapter: &str) -> Self {
        Self(Capability::Supported {
            adapter: adapter.to_string(),
        })
    }

    pub fn unsupported(reason: &str) -> Self {
        Self(Capability::Unsupported {
            reason: reason.to_string(),
        })
    }
}

impl CapabilityProbe for StaticProbe {
    fn probe(&mut self) -> Capability {
        self.0.clone()
    }
}

/// The live rendering objects of one mount.
///
/// Built from a `SceneDesc` and owned exclusively by the mount. Dropping the
/// handle releases every resource it created.
pub trait SceneHandle {
    fn camera(&self) -> &PerspectiveCamera;

    /// Resize the drawing surface and match the camera aspect.
    fn resize(&mut self, viewport: Viewport);

    /// Hand the scene and camera over for drawing with the cube at `pose`.
    fn submit(&mut self, pose: &CubePose);
}

/// Debug text renderer: writes one line per submitted frame.
///
/// Only the newest [`DebugTextRenderer::LINE_CAPACITY`] undrained lines are
/// kept. Stands in for a GPU backend in the CLI and in tests.
#[derive(Debug)]
pub struct DebugTextRenderer {
    desc: SceneDesc,
    viewport: Viewport,
    submitted: u64,
    lines: VecDeque<String>,
}

impl DebugTextRenderer {
    pub fn new(desc: &SceneDesc, viewport: Viewport) -> Result<Self, RenderError> {
        if viewport.is_empty() {
            return Err(RenderError::EmptyViewport);
        }
        Ok(Self {
            desc: *desc,
            viewport,
            submitted: 0,
            lines: VecDeque::new(),
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    pub const LINE_CAPACITY: usize = 64;

    /// Take the lines written since the last drain, oldest first.
    pub fn drain_lines(&mut self) -> Vec<String> {
        self.lines.drain(..).collect()
    }
}

impl SceneHandle for DebugTextRenderer {
    fn camera(&self) -> &PerspectiveCamera {
        &self.desc.camera
    }

    fn resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            return;
        }
        self.viewport = viewport;
        self.desc.camera.set_viewport(viewport);
        tracing::debug!(width = viewport.width, height = viewport.height, "debug surface resized");
    }

    fn submit(&mut self, pose: &CubePose) {
        self.submitted += 1;
        if self.lines.len() >= Self::LINE_CAPACITY {
            self.lines.pop_front();
        }
        self.lines.push_back(format!(
            "frame {:>5}  yaw={:>7.2}°  pitch={:>6.2}°  roll={:>6.2}°  surface={}x{} aspect={:.3}",
            self.submitted,
            pose.yaw.to_degrees(),
            pose.pitch.to_degrees(),
            pose.roll.to_degrees(),
            self.viewport.width,
            self.viewport.height,
            self.desc.camera.aspect,
        ));
    }
}
