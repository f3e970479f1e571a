use serde::{Deserialize, Serialize};
use spincube_common::RotationSpeed;
use std::time::Duration;

/// Per-mount settings supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// How long the loading overlay stays up before the frame loop starts.
    pub startup_delay: Duration,
    pub initial_speed: RotationSpeed,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_millis(800),
            initial_speed: RotationSpeed::default(),
        }
    }
}

impl WidgetConfig {
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.initial_speed = RotationSpeed::new(speed);
        self
    }
}
