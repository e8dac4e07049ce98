use std::fmt;

use crate::config::GestureConfig;
use crate::gesture::finger_state::FingerStateVector;

/// Discrete gesture recognised in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GestureLabel {
    /// Fist
    Idle,
    /// Index finger alone, thumb held away
    ScrollUp,
    /// Index and middle finger
    ScrollDown,
    /// Thumb and index spread apart
    VolumePinch,
    /// Pinky raised, leaves volume mode
    Escape,
    /// Nothing recognisable, callers keep their state
    #[default]
    Unknown,
}

impl GestureLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ScrollUp => "scroll-up",
            Self::ScrollDown => "scroll-down",
            Self::VolumePinch => "volume-pinch",
            Self::Escape => "escape",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a finger vector plus the raw thumb-index distance to a gesture.
///
/// Rules are checked in priority order and the first match wins. The function
/// is total: anything unmatched is [`GestureLabel::Unknown`].
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    proximity_threshold_px: f32,
    min_volume_gesture_length_px: f32,
}

impl GestureClassifier {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            proximity_threshold_px: config.proximity_threshold_px,
            min_volume_gesture_length_px: config.min_volume_gesture_length_px,
        }
    }

    pub fn classify(&self, fingers: &FingerStateVector, thumb_index: Option<f32>) -> GestureLabel {
        let Some(states) = fingers.states() else {
            return GestureLabel::Unknown;
        };
        // A missing distance never passes a gate
        let distance = thumb_index.unwrap_or(f32::NEG_INFINITY);

        match *states {
            [false, false, false, false, false] => GestureLabel::Idle,
            [_, _, _, _, true] => GestureLabel::Escape,
            [true, true, false, false, false] if distance > self.min_volume_gesture_length_px => {
                GestureLabel::VolumePinch
            }
            // The proximity gate keeps a collapsing pinch from reading as a scroll
            [false, true, false, false, false] if distance > self.proximity_threshold_px => {
                GestureLabel::ScrollUp
            }
            [false, true, true, false, false] => GestureLabel::ScrollDown,
            _ => GestureLabel::Unknown,
        }
    }
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(&GestureConfig::default())
    }
}
