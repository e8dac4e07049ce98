use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GestureConfig;
use crate::control::lerp_clamped;
use crate::control::state::ControllerState;
use crate::gesture::classifier::GestureLabel;
use crate::gesture::mode::InteractionMode;

/// Decibel range reported by the audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeRange {
    pub min_db: f32,
    pub max_db: f32,
}

impl VolumeRange {
    pub fn new(min_db: f32, max_db: f32) -> Self {
        Self { min_db, max_db }
    }

    /// Position of `level_db` within the range as 0..=100
    pub fn percent(&self, level_db: f32) -> f32 {
        lerp_clamped(level_db, (self.min_db, self.max_db), (0.0, 100.0))
    }
}

impl From<(f32, f32)> for VolumeRange {
    fn from((min_db, max_db): (f32, f32)) -> Self {
        Self::new(min_db, max_db)
    }
}

/// Maps the thumb-index pinch width onto the device volume range.
#[derive(Debug, Clone)]
pub struct VolumeMapper {
    hand_range: (f32, f32),
    raw_weight: f32,
    range: VolumeRange,
}

impl VolumeMapper {
    pub fn new(config: &GestureConfig, range: VolumeRange) -> Self {
        Self {
            hand_range: config.hand_distance_range_px,
            raw_weight: config.volume_smoothing_weight,
            range,
        }
    }

    pub fn range(&self) -> VolumeRange {
        self.range
    }

    /// Blends the raw distance with the mean of earlier samples. Without
    /// history the raw distance stands alone.
    pub fn smooth(&self, raw: f32, prior_mean: Option<f32>) -> f32 {
        match prior_mean {
            Some(mean) => self.raw_weight * raw + (1.0 - self.raw_weight) * mean,
            None => raw,
        }
    }

    pub fn level_for(&self, distance: f32) -> f32 {
        lerp_clamped(
            distance,
            self.hand_range,
            (self.range.min_db, self.range.max_db),
        )
    }

    /// Target level for this tick. Only a held pinch in Volume mode sets one.
    pub fn update(
        &self,
        state: &mut ControllerState,
        gesture: GestureLabel,
        thumb_index_distance: Option<f32>,
        prior_mean: Option<f32>,
    ) -> Option<f32> {
        if state.mode != InteractionMode::Volume || gesture != GestureLabel::VolumePinch {
            return None;
        }
        let raw = thumb_index_distance?;

        let smoothed = self.smooth(raw, prior_mean);
        let level = self.level_for(smoothed);
        debug!(
            "Pinch {:.1}px (smoothed {:.1}px) -> {:.2} dB",
            raw, smoothed, level
        );
        state.last_volume_level = Some(level);
        Some(level)
    }
}
