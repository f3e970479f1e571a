//! Widget kernel: the per-frame update rule, the phase state machine and the
//! callback scheduler the host drives.
//!
//! # Invariants
//! - Phase moves only `Loading -> Ready` or `Loading -> Unsupported`.
//! - At most one frame callback is pending at any time.
//! - Every scheduled callback can be cancelled through its handle.

mod frame;
mod schedule;
mod state;

pub use frame::{TILT_RANGE, TILT_SMOOTHING, advance, tilt_target};
pub use schedule::{FrameHandle, Scheduler, TaskHandle};
pub use state::{EVENT_LOG_CAPACITY, Phase, PhaseError, WidgetEvent, WidgetState};
