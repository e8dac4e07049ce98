//! Gesture Session - runs the control loop against a live pose stream
//!
//! A session consumes [`PoseResult`]s from the pose reader, ticks the
//! [`ControlLoop`] once per frame and publishes a [`ControllerStatus`] snapshot
//! through a watch channel after every tick.
//!
//! ```text
//! PoseReaderHandle ─[PoseResult]→ GestureSession ─[ControlCommand]→ outputs
//!                  (mpsc)               │
//!                                       └─[ControllerStatus]→ subscribers (watch)
//! ```
//!
//! The session ends when the pose stream closes, when its cancellation token
//! fires, or on the first source error.

use chrono::{DateTime, Local};
use statum::{machine, state};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::GestureConfig;
use crate::control::control_loop::{ControlLoop, TickReport};
use crate::control::error::ControlError;
use crate::control::output::{AudioOutput, ScrollOutput};
use crate::control::volume::VolumeRange;
use crate::control::ControlCommand;
use crate::gesture::classifier::GestureLabel;
use crate::gesture::finger_state::FingerStateVector;
use crate::gesture::mode::InteractionMode;
use crate::pose::landmarks::PoseFrame;
use crate::pose::pose_reader::PoseResult;

/// Snapshot published after every tick, for overlays and diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerStatus {
    pub mode: InteractionMode,
    pub gesture: GestureLabel,
    pub fingers: FingerStateVector,
    pub momentum: f32,
    pub speed_multiplier: f32,
    pub volume_level_db: Option<f32>,
    pub volume_percent: Option<f32>,
    pub last_command: Option<ControlCommand>,
    /// Frame rate derived from consecutive pose timestamps
    pub fps: f32,
    pub timestamp: Option<DateTime<Local>>,
}

impl ControllerStatus {
    fn from_tick(report: &TickReport, control: &ControlLoop, fps: f32) -> Self {
        let state = control.state();
        let range: VolumeRange = control.volume_range();
        Self {
            mode: report.mode,
            gesture: report.gesture,
            fingers: report.reading.fingers,
            momentum: state.momentum,
            speed_multiplier: state.speed_multiplier,
            volume_level_db: state.last_volume_level,
            volume_percent: state.last_volume_level.map(|level| range.percent(level)),
            last_command: report.command,
            fps,
            timestamp: Some(report.timestamp),
        }
    }
}

/// Counters for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub frames: u64,
    pub hand_frames: u64,
    pub transitions: u64,
    pub commands: u64,
    pub dropped_commands: u64,
    pub first_frame: Option<DateTime<Local>>,
    pub last_frame: Option<DateTime<Local>>,
}

impl SessionStats {
    fn record(&mut self, report: &TickReport) {
        self.frames += 1;
        if !report.reading.fingers.is_empty() {
            self.hand_frames += 1;
        }
        if report.transition.is_some() {
            self.transitions += 1;
        }
        if report.command.is_some() {
            if report.output_error.is_some() {
                self.dropped_commands += 1;
            } else {
                self.commands += 1;
            }
        }
        self.first_frame.get_or_insert(report.timestamp);
        self.last_frame = Some(report.timestamp);
    }

    /// Mean frame rate over the session
    pub fn average_fps(&self) -> Option<f32> {
        let (first, last) = (self.first_frame?, self.last_frame?);
        let seconds = (last - first).num_milliseconds() as f32 / 1000.0;
        (seconds > 0.0 && self.frames > 1).then(|| (self.frames - 1) as f32 / seconds)
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Initializing,
    Running,
    Finished,
}

#[machine]
pub struct GestureSession<S: SessionState> {
    name: String,
    pose_receiver: mpsc::Receiver<PoseResult>,
    status_sender: watch::Sender<ControllerStatus>,
    control: Option<ControlLoop>,
    stats: SessionStats,
    previous_frame: Option<DateTime<Local>>,
}

impl<S: SessionState> GestureSession<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerStatus> {
        self.status_sender.subscribe()
    }
}

impl GestureSession<Initializing> {
    pub fn create(name: impl Into<String>, pose_receiver: mpsc::Receiver<PoseResult>) -> Self {
        let (status_sender, _) = watch::channel(ControllerStatus::default());
        Self::new(
            name.into(),
            pose_receiver,
            status_sender,
            None,
            SessionStats::default(),
            None,
        )
    }

    /// Validates the configuration, queries the audio range and builds the
    /// control loop.
    pub fn configure(
        mut self,
        config: &GestureConfig,
        scroll_output: Box<dyn ScrollOutput>,
        audio_output: Box<dyn AudioOutput>,
    ) -> Result<GestureSession<Running>, ControlError> {
        info!("Configuring gesture session '{}'", self.name);
        debug!("Gesture config: {:?}", config);

        self.control = Some(ControlLoop::new(config, scroll_output, audio_output)?);
        info!("Gesture session '{}' configured, transitioning to Running", self.name);
        Ok(self.transition())
    }
}

impl GestureSession<Running> {
    /// Ticks the control loop with one frame and publishes the resulting status.
    pub fn process_frame(&mut self, frame: &PoseFrame) -> Result<TickReport, ControlError> {
        let control = self
            .control
            .as_mut()
            .ok_or_else(|| ControlError::Initialization("control loop missing".to_string()))?;

        let report = control.tick(frame);

        let fps = self
            .previous_frame
            .map(|previous| (frame.timestamp - previous).num_microseconds().unwrap_or(0))
            .filter(|&micros| micros > 0)
            .map_or(0.0, |micros| 1_000_000.0 / micros as f32);
        self.previous_frame = Some(frame.timestamp);

        let status = ControllerStatus::from_tick(&report, control, fps);
        self.status_sender.send_replace(status);
        self.stats.record(&report);

        Ok(report)
    }

    /// Runs until the pose stream ends or `cancel` fires. A source error ends
    /// the session with that error.
    pub async fn run_until_shutdown(
        mut self,
        cancel: CancellationToken,
    ) -> Result<GestureSession<Finished>, ControlError> {
        info!("Gesture session '{}' running", self.name);

        let mut last_stats_time = Local::now();
        let stats_interval = chrono::Duration::seconds(30);
        let mut frames_at_last_stats = 0;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Gesture session '{}' cancelled", self.name);
                    break;
                }
                next = self.pose_receiver.recv() => next,
            };

            match next {
                Some(Ok(frame)) => {
                    self.process_frame(&frame)?;
                }
                Some(Err(e)) => {
                    error!("Pose source failed: {}", e);
                    return Err(e.into());
                }
                None => {
                    info!("Pose stream closed, ending session '{}'", self.name);
                    break;
                }
            }

            let now = Local::now();
            if now - last_stats_time >= stats_interval {
                let elapsed = (now - last_stats_time).num_milliseconds() as f64 / 1000.0;
                let frames = self.stats.frames - frames_at_last_stats;
                info!(
                    "Session stats: {} frames in {:.1}s ({:.1} fps), {} with a hand, {} commands, {} dropped, mode {}",
                    frames,
                    elapsed,
                    frames as f64 / elapsed,
                    self.stats.hand_frames,
                    self.stats.commands,
                    self.stats.dropped_commands,
                    self.status_sender.borrow().mode
                );
                last_stats_time = now;
                frames_at_last_stats = self.stats.frames;
            }
        }

        Ok(self.transition())
    }
}

impl GestureSession<Finished> {
    pub fn into_stats(self) -> SessionStats {
        info!(
            "Gesture session '{}' finished after {} frames",
            self.name, self.stats.frames
        );
        self.stats
    }
}

/// Runs a [`GestureSession`] in its own tokio task
pub struct SessionHandle {
    name: String,
    status_receiver: watch::Receiver<ControllerStatus>,
    cancel: CancellationToken,
    task_handle: Option<JoinHandle<Result<SessionStats, ControlError>>>,
}

impl SessionHandle {
    pub fn spawn(
        name: impl Into<String>,
        config: &GestureConfig,
        pose_receiver: mpsc::Receiver<PoseResult>,
        scroll_output: Box<dyn ScrollOutput>,
        audio_output: Box<dyn AudioOutput>,
        cancel: CancellationToken,
    ) -> Result<Self, ControlError> {
        let name = name.into();
        info!("Spawning gesture session '{}'", name);

        let session = GestureSession::create(name.clone(), pose_receiver).configure(
            config,
            scroll_output,
            audio_output,
        )?;
        let status_receiver = session.subscribe();

        let task_cancel = cancel.clone();
        let task_handle = tokio::spawn(async move {
            let finished = session.run_until_shutdown(task_cancel).await?;
            Ok(finished.into_stats())
        });
        debug!("Session task spawned: {:?}", task_handle);

        Ok(Self {
            name,
            status_receiver,
            cancel,
            task_handle: Some(task_handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerStatus> {
        self.status_receiver.clone()
    }

    pub fn status(&self) -> ControllerStatus {
        self.status_receiver.borrow().clone()
    }

    /// Waits for the session task to end on its own
    pub async fn wait(&mut self) -> Result<SessionStats, ControlError> {
        let handle = self
            .task_handle
            .take()
            .ok_or_else(|| ControlError::Task(format!("session '{}' already joined", self.name)))?;
        handle
            .await
            .map_err(|e| ControlError::Task(e.to_string()))?
    }

    pub async fn shutdown(&mut self) -> Result<SessionStats, ControlError> {
        info!("Shutting down gesture session '{}'", self.name);
        self.cancel.cancel();
        self.wait().await
    }
}
