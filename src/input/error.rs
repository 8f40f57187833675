//! Input resolution and layout errors.

use super::resolve::LogicalButton;
use super::SourceId;
use thiserror::Error;

/// Errors raised while resolving or configuring input sources.
///
/// These indicate programming or configuration mistakes; callers are
/// expected to fail the operation rather than fall back to a default source.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("player index {index} out of range (expected 0..{max})")]
    PlayerOutOfRange { index: usize, max: usize },

    #[error("unknown logical button '{0}'")]
    UnknownButton(String),

    #[error("no input source bound to player {player} button {button:?}")]
    Unbound { player: usize, button: LogicalButton },

    #[error("failed to parse button layout: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid button layout ({} violations)", .0.len())]
    InvalidLayout(Vec<LayoutViolation>),
}

/// A single problem found while validating a button layout.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LayoutViolation {
    #[error("binding {binding}: player {player} out of range")]
    PlayerOutOfRange { binding: usize, player: usize },

    #[error("binding {binding}: unknown button '{name}'")]
    UnknownButton { binding: usize, name: String },

    #[error("binding {binding}: player {player} button {button:?} already bound")]
    DuplicateButton {
        binding: usize,
        player: usize,
        button: LogicalButton,
    },

    #[error("binding {binding}: source {source_id:?} already used")]
    DuplicateSource { binding: usize, source_id: SourceId },
}
