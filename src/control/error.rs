//! Error definitions for the control subsystem

use thiserror::Error;

use crate::config::ConfigError;
use crate::pose::pose_reader::SourceError;

/// A collaborator refused or could not take a command. Never fatal; the next
/// tick's command supersedes it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutputError {
    #[error("Command rejected: {0}")]
    Rejected(String),

    #[error("Output unavailable: {0}")]
    Unavailable(String),
}

/// Failures that end or prevent a control session
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pose source error: {0}")]
    Source(#[from] SourceError),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Session task error: {0}")]
    Task(String),
}
