use std::fmt;
use tracing::debug;

use crate::gesture::history::DistanceHistory;
use crate::pose::landmarks::{
    HandPose, Landmark, INDEX_PIP, INDEX_TIP, MIDDLE_MCP, MIDDLE_PIP, MIDDLE_TIP, PINKY_MCP,
    PINKY_PIP, PINKY_TIP, RING_PIP, RING_TIP, THUMB_IP, THUMB_TIP,
};

pub const FINGER_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; FINGER_COUNT] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    pub fn tip(self) -> usize {
        match self {
            Finger::Thumb => THUMB_TIP,
            Finger::Index => INDEX_TIP,
            Finger::Middle => MIDDLE_TIP,
            Finger::Ring => RING_TIP,
            Finger::Pinky => PINKY_TIP,
        }
    }

    // Joint the tip is compared against: the IP joint for the thumb,
    // the lower (PIP) knuckle for the others
    pub fn base(self) -> usize {
        match self {
            Finger::Thumb => THUMB_IP,
            Finger::Index => INDEX_PIP,
            Finger::Middle => MIDDLE_PIP,
            Finger::Ring => RING_PIP,
            Finger::Pinky => PINKY_PIP,
        }
    }
}

/// Which side of the image the thumb sits on, inferred from the knuckles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    /// Pinky knuckle right of the middle knuckle, thumb points toward smaller x
    Left,
    /// Pinky knuckle left of the middle knuckle, thumb points toward larger x
    Right,
}

impl Handedness {
    pub fn detect(pose: &HandPose) -> Self {
        if pose.landmark(PINKY_MCP).x > pose.landmark(MIDDLE_MCP).x {
            Handedness::Left
        } else {
            Handedness::Right
        }
    }
}

/// The thumb is extended when its tip sits further out than its IP joint,
/// away from the palm on the side given by `handedness`.
pub fn thumb_extended(tip: &Landmark, base: &Landmark, handedness: Handedness) -> bool {
    match handedness {
        Handedness::Left => tip.x < base.x,
        Handedness::Right => tip.x > base.x,
    }
}

// Image y grows downward, so an extended finger has its tip above the knuckle
fn finger_extended(tip: &Landmark, base: &Landmark) -> bool {
    tip.y < base.y
}

/// Extended/folded state per finger, thumb to pinky. Empty when no hand was seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FingerStateVector(Option<[bool; FINGER_COUNT]>);

impl FingerStateVector {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn from_states(states: [bool; FINGER_COUNT]) -> Self {
        Self(Some(states))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn states(&self) -> Option<&[bool; FINGER_COUNT]> {
        self.0.as_ref()
    }

    pub fn is_extended(&self, finger: Finger) -> Option<bool> {
        self.0.map(|states| states[finger as usize])
    }
}

impl fmt::Display for FingerStateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(states) => {
                for extended in states {
                    write!(f, "{}", if extended { '1' } else { '0' })?;
                }
                Ok(())
            }
            None => write!(f, "-----"),
        }
    }
}

/// Everything the downstream stages need from one pose.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FingerReading {
    pub fingers: FingerStateVector,
    pub handedness: Option<Handedness>,
    /// Raw thumb tip to index tip distance
    pub thumb_index_distance: Option<f32>,
    /// Index tip to middle tip distance, drives scroll speed
    pub index_middle_distance: Option<f32>,
    /// Distance history mean before this tick's sample was pushed
    pub prior_mean: Option<f32>,
}

/// Turns a pose into a finger vector and the distances derived from it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerStateExtractor;

impl FingerStateExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Reads the finger states of `pose` and appends its thumb-index distance to
    /// `history`. An absent pose yields an empty reading and leaves history alone.
    pub fn extract(&self, pose: Option<&HandPose>, history: &mut DistanceHistory) -> FingerReading {
        let Some(pose) = pose else {
            return FingerReading {
                prior_mean: history.mean(),
                ..Default::default()
            };
        };

        let handedness = Handedness::detect(pose);
        let mut states = [false; FINGER_COUNT];
        for finger in Finger::ALL {
            let tip = pose.landmark(finger.tip());
            let base = pose.landmark(finger.base());
            states[finger as usize] = match finger {
                Finger::Thumb => thumb_extended(tip, base, handedness),
                _ => finger_extended(tip, base),
            };
        }

        let thumb_index = pose.distance(THUMB_TIP, INDEX_TIP);
        let index_middle = pose.distance(INDEX_TIP, MIDDLE_TIP);
        let prior_mean = history.mean();
        history.push(thumb_index);

        let fingers = FingerStateVector::from_states(states);
        debug!(
            "Fingers {} ({:?}), thumb-index {:.1}px, index-middle {:.1}px",
            fingers, handedness, thumb_index, index_middle
        );

        FingerReading {
            fingers,
            handedness: Some(handedness),
            thumb_index_distance: Some(thumb_index),
            index_middle_distance: Some(index_middle),
            prior_mean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::test_poses::{hand_pose, mirrored, HAND_CLOSED};

    #[test]
    fn test_absent_pose_gives_empty_vector() {
        let mut history = DistanceHistory::default();
        history.push(120.0);
        let reading = FingerStateExtractor::new().extract(None, &mut history);

        assert!(reading.fingers.is_empty());
        assert_eq!(reading.thumb_index_distance, None);
        assert_eq!(reading.prior_mean, Some(120.0));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_each_finger_detected() {
        let extractor = FingerStateExtractor::new();
        let mut history = DistanceHistory::default();
        for finger in Finger::ALL {
            let mut states = HAND_CLOSED;
            states[finger as usize] = true;
            let reading = extractor.extract(Some(&hand_pose(states)), &mut history);
            assert_eq!(reading.fingers, FingerStateVector::from_states(states));
            assert_eq!(reading.fingers.is_extended(finger), Some(true));
        }
    }

    #[test]
    fn test_distance_pushed_after_prior_mean() {
        let extractor = FingerStateExtractor::new();
        let mut history = DistanceHistory::default();
        let pose = hand_pose([true, true, false, false, false]);

        let first = extractor.extract(Some(&pose), &mut history);
        assert_eq!(first.prior_mean, None);
        let distance = first.thumb_index_distance.unwrap();
        assert!((distance - pose.distance(THUMB_TIP, INDEX_TIP)).abs() < f32::EPSILON);

        let second = extractor.extract(Some(&pose), &mut history);
        assert_eq!(second.prior_mean, Some(distance));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_handedness_flips_thumb_comparison() {
        let tip = Landmark::new(200.0, 320.0);
        let base = Landmark::new(225.0, 330.0);
        assert!(thumb_extended(&tip, &base, Handedness::Left));
        assert!(!thumb_extended(&tip, &base, Handedness::Right));
    }

    #[test]
    fn test_mirrored_hand_classifies_identically() {
        let extractor = FingerStateExtractor::new();
        let mut history = DistanceHistory::default();
        for states in [
            [true, true, false, false, false],
            [false, true, false, false, false],
            [true, false, false, false, true],
        ] {
            let pose = hand_pose(states);
            let flipped = mirrored(&pose);

            let left = extractor.extract(Some(&pose), &mut history);
            let right = extractor.extract(Some(&flipped), &mut history);
            assert_eq!(left.handedness, Some(Handedness::Left));
            assert_eq!(right.handedness, Some(Handedness::Right));
            assert_eq!(left.fingers, right.fingers);
        }
    }

    #[test]
    fn test_display_vector() {
        assert_eq!(
            FingerStateVector::from_states([false, true, true, false, false]).to_string(),
            "01100"
        );
        assert_eq!(FingerStateVector::empty().to_string(), "-----");
    }
}
