// Synthetic hands for tests. Palm faces the camera with the pinky on the
// right side of the image, so `Handedness::detect` reports `Left`.

use crate::pose::landmarks::*;

pub const HAND_CLOSED: [bool; 5] = [false; 5];
pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;

// (landmark, extended position, folded position) per fingertip
const TIPS: [(usize, (f32, f32), (f32, f32)); 5] = [
    (THUMB_TIP, (200.0, 320.0), (250.0, 330.0)),
    (INDEX_TIP, (280.0, 210.0), (280.0, 290.0)),
    (MIDDLE_TIP, (310.0, 200.0), (310.0, 285.0)),
    (RING_TIP, (340.0, 210.0), (340.0, 290.0)),
    (PINKY_TIP, (365.0, 240.0), (365.0, 300.0)),
];

fn base_skeleton() -> Vec<Landmark> {
    let mut points = vec![Landmark::default(); LANDMARK_COUNT];
    let fixed = [
        (WRIST, 300.0, 400.0),
        (THUMB_CMC, 260.0, 380.0),
        (THUMB_MCP, 240.0, 350.0),
        (THUMB_IP, 225.0, 330.0),
        (INDEX_MCP, 280.0, 300.0),
        (INDEX_PIP, 280.0, 260.0),
        (INDEX_DIP, 280.0, 235.0),
        (MIDDLE_MCP, 310.0, 295.0),
        (MIDDLE_PIP, 310.0, 255.0),
        (MIDDLE_DIP, 310.0, 228.0),
        (RING_MCP, 340.0, 300.0),
        (RING_PIP, 340.0, 262.0),
        (RING_DIP, 340.0, 236.0),
        (PINKY_MCP, 365.0, 310.0),
        (PINKY_PIP, 365.0, 280.0),
        (PINKY_DIP, 365.0, 260.0),
    ];
    for (index, x, y) in fixed {
        points[index] = Landmark::new(x, y);
    }
    points
}

pub fn hand_landmarks(states: [bool; 5]) -> Vec<Landmark> {
    let mut points = base_skeleton();
    for ((index, extended, folded), is_extended) in TIPS.into_iter().zip(states) {
        let (x, y) = if is_extended { extended } else { folded };
        points[index] = Landmark::new(x, y);
    }
    points
}

pub fn hand_pose(states: [bool; 5]) -> HandPose {
    from_points(hand_landmarks(states))
}

/// Same hand with one landmark moved.
pub fn with_landmark(pose: &HandPose, index: usize, x: f32, y: f32) -> HandPose {
    let mut points = pose.landmarks().to_vec();
    points[index] = Landmark::new(x, y);
    from_points(points)
}

/// Horizontal mirror image, i.e. the other hand making the same gesture.
pub fn mirrored(pose: &HandPose) -> HandPose {
    let points = pose
        .landmarks()
        .iter()
        .map(|l| Landmark::new(FRAME_WIDTH as f32 - l.x, l.y))
        .collect();
    from_points(points)
}

fn from_points(points: Vec<Landmark>) -> HandPose {
    HandPose::new(points, FRAME_WIDTH, FRAME_HEIGHT).expect("synthetic pose is valid")
}
