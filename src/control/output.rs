//! Seams towards the system collaborators that act on commands.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::control::error::OutputError;
use crate::control::volume::VolumeRange;
use crate::control::ControlCommand;

/// Synthesizes mouse wheel events
pub trait ScrollOutput: Send + 'static {
    fn scroll(&mut self, delta: i32) -> Result<(), OutputError>;
}

/// Master volume endpoint
pub trait AudioOutput: Send + 'static {
    /// Queried once when a session is configured
    fn volume_range(&self) -> Result<VolumeRange, OutputError>;

    fn set_level(&mut self, level_db: f32) -> Result<(), OutputError>;
}

/// Forwards commands onto a bounded channel for an out-of-process or
/// out-of-task consumer. Never blocks the control loop: a full channel
/// rejects the command.
#[derive(Debug, Clone)]
pub struct ChannelOutput {
    sender: mpsc::Sender<ControlCommand>,
    range: Option<VolumeRange>,
}

impl ChannelOutput {
    pub fn new(sender: mpsc::Sender<ControlCommand>) -> Self {
        Self {
            sender,
            range: None,
        }
    }

    /// Advertises a device range. Without one the session falls back to its
    /// configured range.
    pub fn with_range(mut self, range: VolumeRange) -> Self {
        self.range = Some(range);
        self
    }

    fn forward(&self, command: ControlCommand) -> Result<(), OutputError> {
        self.sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => OutputError::Rejected("command channel full".to_string()),
            TrySendError::Closed(_) => {
                OutputError::Unavailable("command channel closed".to_string())
            }
        })
    }
}

impl ScrollOutput for ChannelOutput {
    fn scroll(&mut self, delta: i32) -> Result<(), OutputError> {
        self.forward(ControlCommand::Scroll { delta })
    }
}

impl AudioOutput for ChannelOutput {
    fn volume_range(&self) -> Result<VolumeRange, OutputError> {
        self.range
            .ok_or_else(|| OutputError::Unavailable("no device range advertised".to_string()))
    }

    fn set_level(&mut self, level_db: f32) -> Result<(), OutputError> {
        self.forward(ControlCommand::Volume { level_db })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commands_forwarded_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut output = ChannelOutput::new(tx);

        output.scroll(-3).unwrap();
        output.set_level(-12.5).unwrap();

        assert_eq!(rx.recv().await, Some(ControlCommand::Scroll { delta: -3 }));
        assert_eq!(
            rx.recv().await,
            Some(ControlCommand::Volume { level_db: -12.5 })
        );
    }

    #[test]
    fn test_full_channel_rejects() {
        let (tx, _rx) = mpsc::channel(1);
        let mut output = ChannelOutput::new(tx);

        output.scroll(1).unwrap();
        assert!(matches!(output.scroll(1), Err(OutputError::Rejected(_))));
    }

    #[test]
    fn test_closed_channel_unavailable() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut output = ChannelOutput::new(tx);
        assert!(matches!(
            output.set_level(0.0),
            Err(OutputError::Unavailable(_))
        ));
    }

    #[test]
    fn test_volume_range_advertised() {
        let (tx, _rx) = mpsc::channel(1);
        let output = ChannelOutput::new(tx);
        assert!(output.volume_range().is_err());

        let range = VolumeRange::new(-40.0, 0.0);
        let output = output.with_range(range);
        assert_eq!(output.volume_range(), Ok(range));
    }
}
