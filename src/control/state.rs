use chrono::{DateTime, Local};

use crate::config::GestureConfig;
use crate::gesture::history::DistanceHistory;
use crate::gesture::mode::InteractionMode;

/// The single mutable aggregate of one control session.
///
/// Owned by the [`ControlLoop`](crate::control::control_loop::ControlLoop) and lent
/// to each stage in pipeline order, once per tick. Nothing else writes to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    /// Committed interaction mode
    pub mode: InteractionMode,
    /// Candidate mode being debounced
    pub pending: Option<InteractionMode>,
    /// Consecutive ticks `pending` has been seen
    pub stability_counter: u32,
    /// Set while a Scroll or Volume mode is committed
    pub active: bool,

    // Scroll physics
    pub momentum: f32,
    pub speed_multiplier: f32,
    pub decay_modifier: f32,
    pub last_action: Option<DateTime<Local>>,

    // Volume smoothing
    pub history: DistanceHistory,
    pub last_volume_level: Option<f32>,

    base_decay: f32,
}

impl ControllerState {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            mode: InteractionMode::Idle,
            pending: None,
            stability_counter: 0,
            active: false,
            momentum: 0.0,
            speed_multiplier: 1.0,
            decay_modifier: config.momentum_decay,
            last_action: None,
            history: DistanceHistory::new(config.distance_history_capacity),
            last_volume_level: None,
            base_decay: config.momentum_decay,
        }
    }

    /// Clean slate for scroll physics, applied on every mode commit
    pub fn reset_motion(&mut self) {
        self.momentum = 0.0;
        self.speed_multiplier = 1.0;
        self.decay_modifier = self.base_decay;
    }

    pub fn reset_pending(&mut self) {
        self.pending = None;
        self.stability_counter = 0;
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new(&GestureConfig::default())
    }
}
