//! State names and the event kinds handlers can listen for.
//!
//! States are not drawn from a fixed enumeration: any string is a legal
//! state, and "no state yet" is represented by `Option::<StateName>::None`.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Opaque name of a state.
///
/// Cloning is cheap (a reference count bump), so names can be handed to
/// handlers and change callbacks freely.
///
/// # Example
///
/// ```rust
/// use statecraft::core::StateName;
///
/// let idle = StateName::from("idle");
/// assert_eq!(idle, "idle");
/// assert_eq!(idle.as_str(), "idle");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateName(Arc<str>);

impl StateName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateName {
    fn from(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl From<String> for StateName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&StateName> for StateName {
    fn from(name: &StateName) -> Self {
        name.clone()
    }
}

impl AsRef<str> for StateName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StateName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for StateName {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for StateName {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// Synchronous lifecycle events fired by a transition state.
///
/// Enter and Exit fire around every successful transition; Update fires once
/// per tick for the current state. The long-running AsyncUpdate kind has its
/// own registration methods because its handlers return futures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionEvent {
    Enter,
    Exit,
    Update,
}

impl TransitionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Exit => "exit",
            Self::Update => "update",
        }
    }
}

/// Events delivered by an input source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonEvent {
    Pressed,
    Released,
    Repeated,
}

impl ButtonEvent {
    /// Every kind an input source is subscribed for when it is wired.
    pub const ALL: [ButtonEvent; 3] = [Self::Pressed, Self::Released, Self::Repeated];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pressed => "pressed",
            Self::Released => "released",
            Self::Repeated => "repeated",
        }
    }
}
