//! Gesture interpretation: landmarks in, debounced interaction mode out.
//!
//! - [`finger_state`] folds a hand pose into five extended/folded flags and the
//!   fingertip distances the later stages need
//! - [`classifier`] maps the flags to a [`classifier::GestureLabel`]
//! - [`mode`] debounces labels into an [`mode::InteractionMode`]
//! - [`history`] keeps the rolling pinch distances used for volume smoothing

pub mod classifier;
pub mod finger_state;
pub mod history;
pub mod mode;

#[cfg(test)]
pub(crate) mod test_poses;

pub use classifier::{GestureClassifier, GestureLabel};
pub use finger_state::{FingerReading, FingerStateExtractor, FingerStateVector};
pub use mode::{InteractionMode, ModeStateMachine};
