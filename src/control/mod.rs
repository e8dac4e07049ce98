//! Control subsystem: turns interpreted gestures into scroll and volume commands.
//!
//! ```text
//! PoseFrame ──► ControlLoop::tick ──► ControlCommand ──► ScrollOutput / AudioOutput
//!                  │
//!                  ├─ FingerStateExtractor
//!                  ├─ GestureClassifier
//!                  ├─ ModeStateMachine
//!                  └─ ScrollMomentumEngine | VolumeMapper
//! ```
//!
//! [`session`] wraps the loop in a lifecycle and runs it in its own tokio task,
//! fed by the pose reader and publishing a [`session::ControllerStatus`] after
//! every tick.

pub mod control_loop;
pub mod error;
pub mod output;
pub mod scroll;
pub mod session;
pub mod state;
pub mod volume;

pub use control_loop::{ControlLoop, TickReport};
pub use error::{ControlError, OutputError};
pub use output::{AudioOutput, ChannelOutput, ScrollOutput};
pub use session::{ControllerStatus, SessionHandle, SessionStats};
pub use state::ControllerState;

/// Command emitted towards the system collaborators, at most one per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    /// Signed wheel delta, positive scrolls up, never zero
    Scroll { delta: i32 },
    /// Target master volume within the device range
    Volume { level_db: f32 },
}

/// Linear interpolation of `x` from `domain` onto `range`, clamped to the ends.
pub fn lerp_clamped(x: f32, domain: (f32, f32), range: (f32, f32)) -> f32 {
    let (x0, x1) = domain;
    let (y0, y1) = range;
    if x <= x0 {
        y0
    } else if x >= x1 {
        y1
    } else {
        y0 + (x - x0) * (y1 - y0) / (x1 - x0)
    }
}
