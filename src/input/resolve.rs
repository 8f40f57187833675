//! Mapping `(player, logical button)` pairs to concrete input sources.

use super::error::InputError;
use super::InputSource;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of controller slots.
pub const MAX_PLAYERS: usize = 4;

/// A validated player slot in `0..MAX_PLAYERS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct PlayerIndex(usize);

impl PlayerIndex {
    pub fn new(index: usize) -> Result<Self, InputError> {
        if index < MAX_PLAYERS {
            Ok(Self(index))
        } else {
            Err(InputError::PlayerOutOfRange {
                index,
                max: MAX_PLAYERS,
            })
        }
    }

    pub fn get(self) -> usize {
        self.0
    }

    pub fn all() -> impl Iterator<Item = PlayerIndex> {
        (0..MAX_PLAYERS).map(Self)
    }
}

impl TryFrom<usize> for PlayerIndex {
    type Error = InputError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl From<PlayerIndex> for usize {
    fn from(player: PlayerIndex) -> usize {
        player.0
    }
}

/// Buttons every controller exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalButton {
    A,
    B,
    Left,
    Right,
    Up,
    Down,
    Menu,
}

impl LogicalButton {
    pub const ALL: [LogicalButton; 7] = [
        Self::A,
        Self::B,
        Self::Left,
        Self::Right,
        Self::Up,
        Self::Down,
        Self::Menu,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
            Self::Menu => "menu",
        }
    }
}

impl FromStr for LogicalButton {
    type Err = InputError;

    /// Case-insensitive lookup by name.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|button| button.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| InputError::UnknownButton(name.to_string()))
    }
}

/// Host-provided mapping from controller buttons to input sources.
pub trait Controllers {
    fn source(&self, player: PlayerIndex, button: LogicalButton) -> Option<&dyn InputSource>;
}

/// Resolve a raw `(player, button name)` pair.
///
/// Fails fast on an out-of-range player, an unknown button name, or a button
/// the controllers do not bind.
pub fn resolve_source<'a, C>(
    controllers: &'a C,
    player: usize,
    button: &str,
) -> Result<&'a dyn InputSource, InputError>
where
    C: Controllers + ?Sized,
{
    let player = PlayerIndex::new(player)?;
    let button: LogicalButton = button.parse()?;
    controllers
        .source(player, button)
        .ok_or(InputError::Unbound {
            player: player.get(),
            button,
        })
}
