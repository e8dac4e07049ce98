//! Hand pose input: the 21-landmark model and the JSON-lines reader that feeds it.

pub mod landmarks;
pub mod pose_reader;

pub use landmarks::{HandPose, Landmark, PoseError, PoseFrame};
pub use pose_reader::{PoseReaderHandle, PoseResult, SourceError};
