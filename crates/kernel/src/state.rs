use crate::frame;
use serde::{Deserialize, Serialize};
use spincube_common::{CubePose, MountId, PointerState, RotationSpeed, Viewport};

/// Most events a `WidgetState` keeps before dropping the oldest.
pub const EVENT_LOG_CAPACITY: usize = 256;

/// Lifecycle phase of one mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Capability was found; waiting for the startup delay.
    Loading,
    /// The frame loop is running.
    Ready,
    /// No hardware acceleration; the fallback panel is shown.
    Unsupported,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Errors from phase transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },
}

/// A record produced by every observable change to the widget state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WidgetEvent {
    /// A mount was created with the given container size.
    Mounted { id: MountId, container: Viewport },
    /// Capability detection failed.
    Unsupported { reason: String },
    /// The startup delay elapsed and the frame loop started.
    Ready,
    /// The rotation speed changed.
    SpeedChanged { old: f32, new: f32 },
    /// The container was resized.
    Resized { viewport: Viewport },
    /// The mount was torn down after `frames` frames.
    Unmounted { frames: u64 },
}

/// Mutable per-mount state read by the frame callback and written by input.
///
/// One writer path per field: pointer events write `pointer`, the controls
/// write `speed`, and only the frame callback writes `pose`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetState {
    id: MountId,
    phase: Phase,
    pose: CubePose,
    pointer: PointerState,
    speed: RotationSpeed,
    frames: u64,
    #[serde(skip)]
    event_log: Vec<WidgetEvent>,
}

impl WidgetState {
    /// Fresh state in the `Loading` phase.
    pub fn new(id: MountId, speed: RotationSpeed) -> Self {
        Self {
            id,
            phase: Phase::Loading,
            pose: CubePose::default(),
            pointer: PointerState::default(),
            speed,
            frames: 0,
            event_log: Vec::new(),
        }
    }

    pub fn id(&self) -> MountId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// False only once capability detection has failed.
    pub fn is_supported(&self) -> bool {
        self.phase != Phase::Unsupported
    }

    pub fn pose(&self) -> CubePose {
        self.pose
    }

    pub fn pointer(&self) -> PointerState {
        self.pointer
    }

    pub fn speed(&self) -> RotationSpeed {
        self.speed
    }

    /// Number of frames advanced so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn transition(&mut self, to: Phase) -> Result<(), PhaseError> {
        if self.phase != Phase::Loading {
            return Err(PhaseError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!(mount = %self.id, from = %self.phase, %to, "phase transition");
        self.phase = to;
        Ok(())
    }

    /// `Loading -> Ready`.
    pub fn mark_ready(&mut self) -> Result<(), PhaseError> {
        self.transition(Phase::Ready)?;
        self.record(WidgetEvent::Ready);
        Ok(())
    }

    /// `Loading -> Unsupported`.
    pub fn mark_unsupported(&mut self, reason: impl Into<String>) -> Result<(), PhaseError> {
        self.transition(Phase::Unsupported)?;
        self.record(WidgetEvent::Unsupported {
            reason: reason.into(),
        });
        Ok(())
    }

    pub fn set_pointer(&mut self, pointer: PointerState) {
        self.pointer = pointer;
    }

    /// Replace the speed. Returns true if the value changed.
    pub fn set_speed(&mut self, speed: RotationSpeed) -> bool {
        if speed == self.speed {
            return false;
        }
        let old = self.speed.get();
        self.speed = speed;
        self.record(WidgetEvent::SpeedChanged {
            old,
            new: speed.get(),
        });
        true
    }

    /// Advance the pose by one frame with the current pointer and speed.
    pub fn step(&mut self) {
        frame::advance(&mut self.pose, self.pointer, self.speed);
        self.frames += 1;
    }

    /// Append to the event log, dropping the oldest entry once it holds
    /// [`EVENT_LOG_CAPACITY`] events.
    pub fn record(&mut self, event: WidgetEvent) {
        if self.event_log.len() >= EVENT_LOG_CAPACITY {
            self.event_log.remove(0);
        }
        self.event_log.push(event);
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WidgetEvent] {
        &self.event_log
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WidgetEvent> {
        std::mem::take(&mut self.event_log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WidgetState {
        WidgetState::new(MountId::new(), RotationSpeed::default())
    }

    #[test]
    fn starts_loading_and_supported() {
        let s = state();
        assert_eq!(s.phase(), Phase::Loading);
        assert!(s.is_loading());
        assert!(s.is_supported());
        assert_eq!(s.frames(), 0);
    }

    #[test]
    fn ready_is_terminal() {
        let mut s = state();
        s.mark_ready().unwrap();
        assert!(!s.is_loading());
        assert_eq!(
            s.mark_unsupported("late"),
            Err(PhaseError::InvalidTransition {
                from: Phase::Ready,
                to: Phase::Unsupported
            })
        );
        assert!(s.mark_ready().is_err());
    }

    #[test]
    fn unsupported_is_terminal() {
        let mut s = state();
        s.mark_unsupported("no adapter").unwrap();
        assert!(!s.is_supported());
        assert!(!s.is_loading());
        assert!(s.mark_ready().is_err());
        assert!(matches!(
            s.events().last(),
            Some(WidgetEvent::Unsupported { reason }) if reason == "no adapter"
        ));
    }

    #[test]
    fn hundred_frames_at_default_speed() {
        let mut s = state();
        s.mark_ready().unwrap();
        for _ in 0..100 {
            s.step();
        }
        assert_eq!(s.frames(), 100);
        assert!((s.pose().yaw - 1.0).abs() < 1e-4);
        assert_eq!(s.pose().pitch, 0.0);
        assert_eq!(s.pose().roll, 0.0);
    }

    #[test]
    fn speed_changes_are_logged_once() {
        let mut s = state();
        assert!(s.set_speed(RotationSpeed::new(0.03)));
        assert!(!s.set_speed(RotationSpeed::new(0.03)));
        let events = s.drain_events();
        assert_eq!(events.len(), 1);
        assert!(s.events().is_empty());
    }

    #[test]
    fn event_log_is_bounded() {
        let mut s = state();
        for i in 0..10_000 {
            s.set_speed(RotationSpeed::new(if i % 2 == 0 { 0.02 } else { 0.01 }));
        }
        assert_eq!(s.events().len(), EVENT_LOG_CAPACITY);
        assert_eq!(
            s.events().last(),
            Some(&WidgetEvent::SpeedChanged {
                old: 0.02,
                new: 0.01
            })
        );
    }
}
