//! Mitigation Actions
//!
//! Plays a short spoken joke when the driver's mood turns negative.

mod dispatcher;
mod player;

pub use dispatcher::{MitigationDispatcher, MitigationOutcome};
pub use player::{AudioPlayer, PacedPlayer};

use classifier::ClassifierError;
use thiserror::Error;

/// Mitigation step failures. All of them abort the action silently.
#[derive(Debug, Error)]
pub enum MitigationError {
    #[error("Joke generation failed: {0}")]
    Joke(#[source] ClassifierError),
    #[error("Speech synthesis failed: {0}")]
    Speech(#[source] ClassifierError),
    #[error("Playback failed: {0}")]
    Playback(String),
}
