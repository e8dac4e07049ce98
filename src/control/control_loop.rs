use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::config::GestureConfig;
use crate::control::error::{ControlError, OutputError};
use crate::control::output::{AudioOutput, ScrollOutput};
use crate::control::scroll::ScrollMomentumEngine;
use crate::control::state::ControllerState;
use crate::control::volume::{VolumeMapper, VolumeRange};
use crate::control::ControlCommand;
use crate::gesture::classifier::{GestureClassifier, GestureLabel};
use crate::gesture::finger_state::{FingerReading, FingerStateExtractor};
use crate::gesture::mode::{InteractionMode, ModeStateMachine, ModeTransition};
use crate::pose::landmarks::PoseFrame;

/// What one tick saw and did
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub timestamp: DateTime<Local>,
    pub reading: FingerReading,
    pub gesture: GestureLabel,
    /// Committed mode after this tick
    pub mode: InteractionMode,
    pub transition: Option<ModeTransition>,
    pub command: Option<ControlCommand>,
    /// Set when an output refused `command`
    pub output_error: Option<OutputError>,
}

/// Runs the interpretation pipeline once per pose frame, in order:
/// extract → classify → debounce → scroll or volume → emit.
pub struct ControlLoop {
    extractor: FingerStateExtractor,
    classifier: GestureClassifier,
    modes: ModeStateMachine,
    scroll: ScrollMomentumEngine,
    volume: VolumeMapper,
    state: ControllerState,
    scroll_output: Box<dyn ScrollOutput>,
    audio_output: Box<dyn AudioOutput>,
}

impl ControlLoop {
    pub fn new(
        config: &GestureConfig,
        scroll_output: Box<dyn ScrollOutput>,
        audio_output: Box<dyn AudioOutput>,
    ) -> Result<Self, ControlError> {
        config.validate()?;

        let range = match audio_output.volume_range() {
            Ok(range) if range.min_db < range.max_db => range,
            Ok(range) => {
                warn!(
                    "Audio output reported an empty range {:?}, using configured range",
                    range
                );
                VolumeRange::from(config.volume_range_db)
            }
            Err(e) => {
                warn!("Could not query volume range ({}), using configured range", e);
                VolumeRange::from(config.volume_range_db)
            }
        };
        debug!("Volume range {:.1}..{:.1} dB", range.min_db, range.max_db);

        Ok(Self {
            extractor: FingerStateExtractor::new(),
            classifier: GestureClassifier::new(config),
            modes: ModeStateMachine::new(config),
            scroll: ScrollMomentumEngine::new(config),
            volume: VolumeMapper::new(config, range),
            state: ControllerState::new(config),
            scroll_output,
            audio_output,
        })
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn volume_range(&self) -> VolumeRange {
        self.volume.range()
    }

    pub fn tick(&mut self, frame: &PoseFrame) -> TickReport {
        let reading = self
            .extractor
            .extract(frame.hand.as_ref(), &mut self.state.history);
        let gesture = self
            .classifier
            .classify(&reading.fingers, reading.thumb_index_distance);

        let observation = (!reading.fingers.is_empty()).then_some(gesture);
        let transition = self.modes.advance(&mut self.state, observation);

        let command = match self.state.mode {
            InteractionMode::Scroll => self
                .scroll
                .update(
                    &mut self.state,
                    gesture,
                    reading.index_middle_distance,
                    frame.timestamp,
                )
                .map(|delta| ControlCommand::Scroll { delta }),
            InteractionMode::Volume => self
                .volume
                .update(
                    &mut self.state,
                    gesture,
                    reading.thumb_index_distance,
                    reading.prior_mean,
                )
                .map(|level_db| ControlCommand::Volume { level_db }),
            InteractionMode::Idle => None,
        };

        let output_error = command.and_then(|command| self.emit(command).err());

        TickReport {
            timestamp: frame.timestamp,
            reading,
            gesture,
            mode: self.state.mode,
            transition,
            command,
            output_error,
        }
    }

    // Failed commands are dropped; the next tick sends a fresh one
    fn emit(&mut self, command: ControlCommand) -> Result<(), OutputError> {
        let result = match command {
            ControlCommand::Scroll { delta } => self.scroll_output.scroll(delta),
            ControlCommand::Volume { level_db } => self.audio_output.set_level(level_db),
        };
        if let Err(e) = &result {
            warn!("Dropped {:?}: {}", command, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::output::ChannelOutput;
    use crate::gesture::test_poses::{hand_pose, HAND_CLOSED};
    use crate::pose::landmarks::HandPose;
    use chrono::Duration;
    use tokio::sync::mpsc;

    const SCROLL_UP: [bool; 5] = [false, true, false, false, false];
    const SCROLL_DOWN: [bool; 5] = [false, true, true, false, false];
    const PINCH: [bool; 5] = [true, true, false, false, false];
    const ESCAPE: [bool; 5] = [false, false, false, false, true];

    struct Harness {
        control: ControlLoop,
        commands: mpsc::Receiver<ControlCommand>,
        start: DateTime<Local>,
        ticks: i64,
        frame_ms: i64,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_output(|tx| ChannelOutput::new(tx).with_range(VolumeRange::new(-63.5, 0.0)))
        }

        fn with_output(build: impl Fn(mpsc::Sender<ControlCommand>) -> ChannelOutput) -> Self {
            let (tx, commands) = mpsc::channel(256);
            let output = build(tx);
            let control = ControlLoop::new(
                &GestureConfig::default(),
                Box::new(output.clone()),
                Box::new(output),
            )
            .unwrap();
            Self {
                control,
                commands,
                start: Local::now(),
                ticks: 0,
                frame_ms: 40,
            }
        }

        // 40ms per frame by default, outside the scroll cooldown
        fn with_frame_ms(mut self, frame_ms: i64) -> Self {
            self.frame_ms = frame_ms;
            self
        }

        fn tick(&mut self, hand: Option<HandPose>) -> TickReport {
            self.ticks += 1;
            let timestamp = self.start + Duration::milliseconds(self.ticks * self.frame_ms);
            self.control.tick(&PoseFrame::new(timestamp, hand))
        }

        fn hold(&mut self, states: [bool; 5], ticks: usize) -> Vec<TickReport> {
            (0..ticks).map(|_| self.tick(Some(hand_pose(states)))).collect()
        }

        fn drain(&mut self) -> Vec<ControlCommand> {
            let mut out = Vec::new();
            while let Ok(command) = self.commands.try_recv() {
                out.push(command);
            }
            out
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (tx, _rx) = mpsc::channel(1);
        let output = ChannelOutput::new(tx);
        let config = GestureConfig {
            momentum_decay: 1.5,
            ..Default::default()
        };
        let result = ControlLoop::new(&config, Box::new(output.clone()), Box::new(output));
        assert!(matches!(result, Err(ControlError::Config(_))));
    }

    #[test]
    fn test_configured_range_used_without_device_range() {
        let harness = Harness::with_output(ChannelOutput::new);
        assert_eq!(harness.control.volume_range(), VolumeRange::new(-63.5, 0.0));
    }

    #[test]
    fn test_no_mode_change_before_threshold() {
        let mut harness = Harness::new();
        let reports = harness.hold(SCROLL_UP, 4);
        assert!(reports.iter().all(|r| r.mode == InteractionMode::Idle));
        assert!(reports.iter().all(|r| r.command.is_none()));
        assert_eq!(reports[0].gesture, GestureLabel::ScrollUp);
        assert!(harness.drain().is_empty());
    }

    #[test]
    fn test_scroll_commits_and_emits_on_fifth_tick() {
        let mut harness = Harness::new();
        harness.hold(SCROLL_UP, 4);
        let report = harness.tick(Some(hand_pose(SCROLL_UP)));

        assert_eq!(report.mode, InteractionMode::Scroll);
        assert!(report.transition.is_some());
        let Some(ControlCommand::Scroll { delta }) = report.command else {
            panic!("expected a scroll command, got {:?}", report.command);
        };
        assert!(delta >= 1);
        assert_eq!(harness.drain(), vec![ControlCommand::Scroll { delta }]);
    }

    #[test]
    fn test_scroll_down_is_negative() {
        let mut harness = Harness::new();
        let reports = harness.hold(SCROLL_DOWN, 6);
        assert_eq!(reports[5].gesture, GestureLabel::ScrollDown);
        assert!(matches!(
            reports[5].command,
            Some(ControlCommand::Scroll { delta }) if delta <= -1
        ));
    }

    #[test]
    fn test_fast_frames_keep_scrolling_through_cooldown() {
        // 60 fps, every frame after the first sample lands inside the cooldown
        let mut harness = Harness::new().with_frame_ms(16);
        let reports = harness.hold(SCROLL_UP, 15);
        assert_eq!(reports[4].mode, InteractionMode::Scroll);

        let held: Vec<i32> = reports[4..]
            .iter()
            .map(|r| match r.command {
                Some(ControlCommand::Scroll { delta }) => delta,
                other => panic!("expected a scroll command, got {:?}", other),
            })
            .collect();
        assert_eq!(held.len(), 11);
        assert!(held.iter().all(|&delta| delta > 0));
        assert!(held.windows(2).all(|pair| pair[1] <= pair[0]));

        let glide: Vec<Option<ControlCommand>> =
            (0..10).map(|_| harness.tick(None).command).collect();
        assert!(glide
            .iter()
            .all(|c| matches!(c, Some(ControlCommand::Scroll { delta }) if *delta >= 1)));

        // 11 held + 10 gliding commands reached the output
        assert_eq!(harness.drain().len(), 21);
    }

    #[test]
    fn test_absent_hand_keeps_mode_and_momentum() {
        let mut harness = Harness::new();
        harness.hold(SCROLL_UP, 6);
        let momentum = harness.control.state().momentum;
        assert!(momentum > 0.0);

        let report = harness.tick(None);
        assert!(report.reading.fingers.is_empty());
        assert_eq!(report.gesture, GestureLabel::Unknown);
        assert_eq!(report.mode, InteractionMode::Scroll);
        assert_eq!(harness.control.state().stability_counter, 0);
        assert!((harness.control.state().momentum - momentum * 0.92).abs() < 1e-4);
    }

    #[test]
    fn test_fist_returns_to_idle_after_threshold() {
        let mut harness = Harness::new();
        harness.hold(SCROLL_UP, 5);
        let reports = harness.hold(HAND_CLOSED, 5);
        assert_eq!(reports[3].mode, InteractionMode::Scroll);
        assert_eq!(reports[4].mode, InteractionMode::Idle);
        assert_eq!(harness.control.state().momentum, 0.0);
    }

    #[test]
    fn test_volume_pinch_sets_level() {
        let mut harness = Harness::new();
        let reports = harness.hold(PINCH, 5);
        assert_eq!(reports[4].mode, InteractionMode::Volume);
        let Some(ControlCommand::Volume { level_db }) = reports[4].command else {
            panic!("expected a volume command, got {:?}", reports[4].command);
        };
        assert!((-63.5..=0.0).contains(&level_db));
        assert_eq!(harness.control.state().last_volume_level, Some(level_db));
    }

    #[test]
    fn test_escape_leaves_volume_on_next_tick() {
        let mut harness = Harness::new();
        harness.hold(PINCH, 6);
        harness.drain();

        let report = harness.tick(Some(hand_pose(ESCAPE)));
        assert_eq!(report.gesture, GestureLabel::Escape);
        assert_eq!(report.mode, InteractionMode::Idle);
        assert!(report.command.is_none());
        assert!(harness.drain().is_empty());
    }

    #[test]
    fn test_rejected_command_reported_and_loop_continues() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let output = ChannelOutput::new(tx);
        let mut control = ControlLoop::new(
            &GestureConfig::default(),
            Box::new(output.clone()),
            Box::new(output),
        )
        .unwrap();

        let start = Local::now();
        let mut last = None;
        for i in 0..7 {
            let frame = PoseFrame::new(
                start + Duration::milliseconds(i * 40),
                Some(hand_pose(SCROLL_UP)),
            );
            last = Some(control.tick(&frame));
        }
        let report = last.unwrap();
        assert!(report.command.is_some());
        assert!(matches!(report.output_error, Some(OutputError::Unavailable(_))));
        assert_eq!(report.mode, InteractionMode::Scroll);
    }
}
