//! Declarative controller layouts.
//!
//! A [`ButtonLayout`] lists which source id backs each `(player, button)`
//! pair. It is usually loaded from JSON:
//!
//! ```json
//! { "bindings": [ { "player": 0, "button": "A", "source": 1 } ] }
//! ```
//!
//! Validation accumulates every problem in the layout instead of stopping
//! at the first one, so a broken configuration can be fixed in one pass.

use super::error::{InputError, LayoutViolation};
use super::resolve::{Controllers, LogicalButton, PlayerIndex, MAX_PLAYERS};
use super::{InputSource, SourceId, VirtualButton};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::debug;

/// One `(player, button) -> source` assignment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub player: usize,
    pub button: String,
    pub source: SourceId,
}

/// Raw, unvalidated controller layout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonLayout {
    #[serde(default)]
    pub bindings: Vec<ButtonBinding>,
}

impl ButtonLayout {
    pub fn from_json(json: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Every button of every player, with source ids numbered from 1.
    pub fn standard() -> Self {
        let bindings = PlayerIndex::all()
            .flat_map(|player| {
                LogicalButton::ALL
                    .into_iter()
                    .map(move |button| (player.get(), button))
            })
            .zip(1u32..)
            .map(|((player, button), id)| ButtonBinding {
                player,
                button: button.name().to_string(),
                source: SourceId(id),
            })
            .collect();
        Self { bindings }
    }

    pub fn bind(mut self, player: usize, button: &str, source: SourceId) -> Self {
        self.bindings.push(ButtonBinding {
            player,
            button: button.to_string(),
            source,
        });
        self
    }

    /// Check every binding, accumulating all violations.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<LayoutViolation>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<LayoutViolation>>> = Vec::new();
        let mut seen_buttons = HashSet::new();
        let mut seen_sources = HashSet::new();

        for (index, binding) in self.bindings.iter().enumerate() {
            if binding.player >= MAX_PLAYERS {
                checks.push(Validation::fail(LayoutViolation::PlayerOutOfRange {
                    binding: index,
                    player: binding.player,
                }));
            }

            match binding.button.parse::<LogicalButton>() {
                Ok(button) => {
                    if !seen_buttons.insert((binding.player, button)) {
                        checks.push(Validation::fail(LayoutViolation::DuplicateButton {
                            binding: index,
                            player: binding.player,
                            button,
                        }));
                    }
                }
                Err(_) => checks.push(Validation::fail(LayoutViolation::UnknownButton {
                    binding: index,
                    name: binding.button.clone(),
                })),
            }

            if !seen_sources.insert(binding.source) {
                checks.push(Validation::fail(LayoutViolation::DuplicateSource {
                    binding: index,
                    source_id: binding.source,
                }));
            }
        }

        if checks.is_empty() {
            return Validation::success(());
        }
        Validation::all_vec(checks).map(|_| ())
    }

    /// Validate the layout and create a virtual button for every binding.
    pub fn build(&self) -> Result<ControllerSet, InputError> {
        match self.validate() {
            Validation::Success(_) => {}
            Validation::Failure(violations) => {
                return Err(InputError::InvalidLayout(
                    violations.iter().cloned().collect(),
                ));
            }
        }

        let mut buttons = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let player = PlayerIndex::new(binding.player)?;
            let button = binding.button.parse::<LogicalButton>()?;
            buttons.push((player, button, VirtualButton::new(binding.source)));
        }
        debug!(buttons = buttons.len(), "controller set built");
        Ok(ControllerSet { buttons })
    }
}

/// Virtual buttons created from a validated [`ButtonLayout`].
#[derive(Debug)]
pub struct ControllerSet {
    buttons: Vec<(PlayerIndex, LogicalButton, VirtualButton)>,
}

impl ControllerSet {
    pub fn button(&self, player: PlayerIndex, button: LogicalButton) -> Option<&VirtualButton> {
        self.buttons
            .iter()
            .find(|(p, b, _)| *p == player && *b == button)
            .map(|(_, _, source)| source)
    }

    pub fn by_source(&self, id: SourceId) -> Option<&VirtualButton> {
        self.buttons
            .iter()
            .map(|(_, _, source)| source)
            .find(|source| source.id() == id)
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }
}

impl Controllers for ControllerSet {
    fn source(&self, player: PlayerIndex, button: LogicalButton) -> Option<&dyn InputSource> {
        self.button(player, button)
            .map(|source| source as &dyn InputSource)
    }
}
