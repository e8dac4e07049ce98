//! Debounced interaction mode state machine.
//!
//! ```text
//!   candidate      gesture
//!   ─────────      ───────
//!   Idle     ◄──   fist
//!   Scroll   ◄──   ScrollUp | ScrollDown
//!   Volume   ◄──   VolumePinch
//!   (current) ◄──  Unknown | Escape
//!
//!   Volume ──Escape──► Idle        (immediate)
//! ```
//!
//! Every transition needs N (`stability_threshold`) consecutive ticks with the
//! same candidate mode, except Escape out of Volume, which commits at once.

use std::fmt;
use tracing::{debug, info};

use crate::config::GestureConfig;
use crate::control::state::ControllerState;
use crate::gesture::classifier::GestureLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    Scroll,
    Volume,
}

impl InteractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scroll => "scroll",
            Self::Volume => "volume",
        }
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    /// Candidate held for the full stability threshold
    Debounced,
    /// Escape gesture while in Volume mode
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: InteractionMode,
    pub to: InteractionMode,
    pub reason: TransitionReason,
}

#[derive(Debug, Clone)]
pub struct ModeStateMachine {
    stability_threshold: u32,
}

impl ModeStateMachine {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            stability_threshold: config.stability_threshold.max(1),
        }
    }

    /// Mode a gesture argues for. Labels without a mode of their own vote for
    /// the committed mode, which breaks any pending streak.
    pub fn candidate(label: GestureLabel, committed: InteractionMode) -> InteractionMode {
        match label {
            GestureLabel::Idle => InteractionMode::Idle,
            GestureLabel::ScrollUp | GestureLabel::ScrollDown => InteractionMode::Scroll,
            GestureLabel::VolumePinch => InteractionMode::Volume,
            GestureLabel::Escape | GestureLabel::Unknown => committed,
        }
    }

    /// Feeds one tick into the machine. `None` means no hand was seen.
    ///
    /// Returns the transition when this tick committed a mode change.
    pub fn advance(
        &self,
        state: &mut ControllerState,
        observation: Option<GestureLabel>,
    ) -> Option<ModeTransition> {
        // A hand leaving the frame drops the streak but never the mode
        let Some(label) = observation else {
            state.reset_pending();
            return None;
        };

        if label == GestureLabel::Escape && state.mode == InteractionMode::Volume {
            state.reset_pending();
            return Some(self.commit(state, InteractionMode::Idle, TransitionReason::Escape));
        }

        let candidate = Self::candidate(label, state.mode);
        if state.pending == Some(candidate) {
            state.stability_counter = state.stability_counter.saturating_add(1);
        } else {
            state.pending = Some(candidate);
            state.stability_counter = 1;
        }
        debug!(
            "Candidate {} seen {}/{} ticks (committed {})",
            candidate, state.stability_counter, self.stability_threshold, state.mode
        );

        if state.stability_counter >= self.stability_threshold && candidate != state.mode {
            return Some(self.commit(state, candidate, TransitionReason::Debounced));
        }
        None
    }

    fn commit(
        &self,
        state: &mut ControllerState,
        to: InteractionMode,
        reason: TransitionReason,
    ) -> ModeTransition {
        let from = state.mode;
        state.mode = to;
        state.reset_motion();
        state.active = to != InteractionMode::Idle;
        info!("Mode {} -> {} ({:?})", from, to, reason);
        ModeTransition { from, to, reason }
    }
}
