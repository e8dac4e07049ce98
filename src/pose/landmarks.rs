use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// Hand landmark indices (21-point hand topology)
pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

pub const LANDMARK_COUNT: usize = 21;

// Malformed pose input
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PoseError {
    #[error("Expected 21 landmarks, got {0}")]
    LandmarkCount(usize),

    #[error("Landmark {index} has {arity} coordinates, expected 2 or 3")]
    CoordinateArity { index: usize, arity: usize },

    #[error("Landmark {0} has a non-finite coordinate")]
    NonFinite(usize),

    #[error("Invalid frame dimensions {width}x{height}")]
    FrameDimensions { width: u32, height: u32 },

    #[error("Unreadable pose record: {0}")]
    Parse(String),
}

/// One tracked hand point in pixel space (image y grows downward).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: None }
    }

    /// Planar Euclidean distance; depth is ignored
    pub fn distance_to(&self, other: &Landmark) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f32::is_finite)
    }
}

/// The complete 21-landmark skeleton for one hand in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandPose {
    landmarks: [Landmark; LANDMARK_COUNT],
    width: u32,
    height: u32,
}

impl HandPose {
    /// Builds a pose from pixel-space landmarks.
    pub fn new(landmarks: Vec<Landmark>, width: u32, height: u32) -> Result<Self, PoseError> {
        if width == 0 || height == 0 {
            return Err(PoseError::FrameDimensions { width, height });
        }
        if let Some(index) = landmarks.iter().position(|l| !l.is_finite()) {
            return Err(PoseError::NonFinite(index));
        }
        let count = landmarks.len();
        let landmarks: [Landmark; LANDMARK_COUNT] = landmarks
            .try_into()
            .map_err(|_| PoseError::LandmarkCount(count))?;

        Ok(Self {
            landmarks,
            width,
            height,
        })
    }

    /// Builds a pose from detector output in [0, 1], scaled by the frame size.
    pub fn from_normalized(
        landmarks: Vec<Landmark>,
        width: u32,
        height: u32,
    ) -> Result<Self, PoseError> {
        let scaled = landmarks
            .into_iter()
            .map(|l| Landmark {
                x: l.x * width as f32,
                y: l.y * height as f32,
                z: l.z,
            })
            .collect();
        Self::new(scaled, width, height)
    }

    pub fn landmark(&self, index: usize) -> &Landmark {
        &self.landmarks[index]
    }

    pub fn landmarks(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.landmarks
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn distance(&self, a: usize, b: usize) -> f32 {
        self.landmarks[a].distance_to(&self.landmarks[b])
    }
}

/// One tick of pose input: a hand, or its explicit absence.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFrame {
    pub timestamp: DateTime<Local>,
    pub hand: Option<HandPose>,
}

impl PoseFrame {
    pub fn new(timestamp: DateTime<Local>, hand: Option<HandPose>) -> Self {
        Self { timestamp, hand }
    }

    pub fn absent(timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            hand: None,
        }
    }
}
