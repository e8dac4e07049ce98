use chrono::{DateTime, Duration, Local};
use tracing::debug;

use crate::config::{DecayMode, GestureConfig};
use crate::control::lerp_clamped;
use crate::control::state::ControllerState;
use crate::gesture::classifier::GestureLabel;
use crate::gesture::mode::InteractionMode;

// Bounds of the speed-scaled decay factor
const SCALED_DECAY_MIN: f32 = 0.90;
const SCALED_DECAY_MAX: f32 = 0.95;

/// Scroll physics for Scroll mode.
///
/// A held scroll gesture samples a speed from the index-middle fingertip spread
/// and sets momentum to it. Without a gesture the momentum decays each tick and
/// keeps scrolling until it drops below the stop threshold.
#[derive(Debug, Clone)]
pub struct ScrollMomentumEngine {
    cooldown: Duration,
    adaptive_window: Duration,
    speed_range: (f32, f32),
    distance_range: (f32, f32),
    speed_cap: f32,
    speed_step: f32,
    decay_mode: DecayMode,
    decay: f32,
    stop_threshold: f32,
}

impl ScrollMomentumEngine {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            cooldown: Duration::milliseconds(config.scroll_cooldown_ms as i64),
            adaptive_window: Duration::milliseconds(config.adaptive_window_ms as i64),
            speed_range: config.scroll_speed_range,
            distance_range: config.scroll_distance_range_px,
            speed_cap: config.adaptive_speed_cap,
            speed_step: config.adaptive_speed_step,
            decay_mode: config.decay_mode,
            decay: config.momentum_decay,
            stop_threshold: config.momentum_stop_threshold,
        }
    }

    /// Speed for a fingertip spread, boosted by `multiplier` and capped.
    pub fn sample_speed(&self, index_middle_distance: f32, multiplier: f32) -> f32 {
        let base = lerp_clamped(index_middle_distance, self.distance_range, self.speed_range);
        (base * multiplier).min(self.speed_range.1 * self.speed_cap)
    }

    /// Runs one tick and returns the scroll delta to emit, if any.
    pub fn update(
        &self,
        state: &mut ControllerState,
        gesture: GestureLabel,
        index_middle_distance: Option<f32>,
        now: DateTime<Local>,
    ) -> Option<i32> {
        if state.mode != InteractionMode::Scroll {
            return None;
        }

        // No previous action, or one stamped after `now`, counts as "long ago"
        let elapsed = state
            .last_action
            .map(|last| now - last)
            .filter(|elapsed| *elapsed >= Duration::zero());
        let within = |window: Duration| elapsed.is_some_and(|e| e < window);

        state.speed_multiplier = if within(self.adaptive_window) {
            (state.speed_multiplier * self.speed_step).min(self.speed_cap)
        } else {
            1.0
        };
        state.last_action = Some(now);

        if within(self.cooldown) {
            return self.decay(state);
        }

        let direction = match gesture {
            GestureLabel::ScrollUp => 1,
            GestureLabel::ScrollDown => -1,
            _ => return self.decay(state),
        };
        let Some(distance) = index_middle_distance else {
            return self.decay(state);
        };

        let speed = self.sample_speed(distance, state.speed_multiplier);
        state.momentum = direction as f32 * speed;
        if self.decay_mode == DecayMode::SpeedScaled {
            state.decay_modifier = self.scaled_decay(speed);
        }

        let delta = direction * (speed.trunc() as i32).max(1);
        debug!(
            "Sampled scroll speed {:.2} (x{:.3}) -> {}",
            speed, state.speed_multiplier, delta
        );
        Some(delta)
    }

    /// Decays momentum one step. Returns the rounded momentum while it is still
    /// above the stop threshold.
    pub fn decay(&self, state: &mut ControllerState) -> Option<i32> {
        if state.momentum == 0.0 {
            return None;
        }

        let factor = match self.decay_mode {
            DecayMode::Fixed => self.decay,
            DecayMode::SpeedScaled => state.decay_modifier,
        };
        state.momentum *= factor;

        if state.momentum.abs() < self.stop_threshold {
            debug!("Scroll momentum settled");
            state.momentum = 0.0;
            return None;
        }

        let delta = state.momentum.round() as i32;
        (delta != 0).then_some(delta)
    }

    // Faster samples glide longer
    fn scaled_decay(&self, speed: f32) -> f32 {
        let top = self.speed_range.1 * self.speed_cap;
        let t = ((speed - self.speed_range.0) / (top - self.speed_range.0)).clamp(0.0, 1.0);
        SCALED_DECAY_MIN + (SCALED_DECAY_MAX - SCALED_DECAY_MIN) * t
    }
}
