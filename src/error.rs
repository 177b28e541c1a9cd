//! Error types surfaced by the core.
//!
//! Nothing here is meant to reach the user: the session turns a
//! `RevealError` into an ignored click and a `SensorError` into a tap fallback.

use crate::reveal::Stage;

/// Rejected stage transition on the reveal state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealError {
    /// The slot cannot move to `revealed` right now
    InvalidTransition { slot: usize, reason: TransitionBlock },
}

/// Why a reveal was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionBlock {
    /// No slot with that id was initialized for this round
    UnknownSlot,
    /// The slot is not in the `activated` stage
    WrongStage(Stage),
    /// Another slot already won the reveal for this round
    AlreadyRevealed { winner: usize },
    /// The round was reset and the slot holds no story yet
    Unassigned,
}

impl std::fmt::Display for RevealError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevealError::InvalidTransition { slot, reason } => match reason {
                TransitionBlock::UnknownSlot => write!(f, "unknown slot {}", slot),
                TransitionBlock::WrongStage(stage) => {
                    write!(f, "slot {} cannot be revealed while {}", slot, stage)
                }
                TransitionBlock::AlreadyRevealed { winner } => {
                    write!(f, "slot {} ignored, slot {} was already revealed", slot, winner)
                }
                TransitionBlock::Unassigned => write!(f, "slot {} holds no story", slot),
            },
        }
    }
}

impl std::error::Error for RevealError {}

/// Failures talking to the platform motion sensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    /// No motion sensor API on this device
    Unavailable,
    /// The consent prompt failed or was rejected by the platform
    PermissionPrompt(String),
    /// Subscribing to the sample stream failed
    Subscribe(String),
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::Unavailable => write!(f, "motion sensors are not available"),
            SensorError::PermissionPrompt(msg) => write!(f, "permission prompt failed: {}", msg),
            SensorError::Subscribe(msg) => {
                write!(f, "could not subscribe to motion samples: {}", msg)
            }
        }
    }
}

impl std::error::Error for SensorError {}

/// Failures loading the bundled story corpus
#[derive(Debug)]
pub enum CorpusError {
    Missing(String),
    NotUtf8(String),
    Malformed(serde_json::Error),
}

impl std::fmt::Display for CorpusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorpusError::Missing(name) => write!(f, "story file {} not found", name),
            CorpusError::NotUtf8(name) => write!(f, "story file {} is not valid UTF-8", name),
            CorpusError::Malformed(err) => write!(f, "unable to deserialize stories: {}", err),
        }
    }
}

impl std::error::Error for CorpusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CorpusError::Malformed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CorpusError {
    fn from(err: serde_json::Error) -> Self {
        CorpusError::Malformed(err)
    }
}
