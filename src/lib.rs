//! Statecraft: a per-entity state transition engine for tick-driven games
//!
//! Statecraft attaches named states, timed transitions and event handlers to
//! any number of independently tracked subjects (sprites, enemies, pickups)
//! plus one global state. The host calls [`Driver::update`] once per frame
//! and the engine does the rest: applying due transitions, firing Update
//! handlers, launching background AsyncUpdate work, delivering button events,
//! and forgetting subjects once the host destroys them.
//!
//! # Core Concepts
//!
//! - **States**: any string; see [`StateName`]
//! - **Events**: Enter, Exit and Update handlers per state, plus weighted
//!   background handlers that fire after the primary one
//! - **Redirects**: an Exit handler may change the destination of the
//!   transition that is leaving its state
//! - **Driver**: owns the global machine and one machine per subject
//!
//! # Example
//!
//! ```rust
//! use statecraft::core::{ManualClock, TransitionEvent};
//! use statecraft::machine::{CooperativeLauncher, Subject};
//! use statecraft::Driver;
//! use std::time::Duration;
//!
//! #[derive(Clone)]
//! struct Enemy(u32);
//!
//! impl Subject for Enemy {
//!     type Id = u32;
//!     fn id(&self) -> u32 { self.0 }
//!     fn is_destroyed(&self) -> bool { false }
//! }
//!
//! let clock = ManualClock::new();
//! let mut driver = Driver::<Enemy>::builder()
//!     .clock(clock.clone())
//!     .launcher(CooperativeLauncher::new())
//!     .build()
//!     .unwrap();
//!
//! let goblin = Enemy(1);
//! driver.change_subject_state(&goblin, "idle", None);
//! driver.change_subject_state(&goblin, "patrol", Some(Duration::from_millis(500)));
//!
//! clock.advance(Duration::from_millis(400));
//! driver.update();
//! assert!(driver.subject_state_is(&goblin, "idle"));
//!
//! clock.advance(Duration::from_millis(200));
//! driver.update();
//! assert!(driver.subject_state_is(&goblin, "patrol"));
//! ```

pub mod core;
pub mod driver;
pub mod input;
pub mod machine;

// Re-export commonly used types
pub use crate::core::{ButtonEvent, StateName, TransitionEvent, Weight};
pub use driver::{BuildError, Driver, DriverBuilder};
pub use input::{InputError, InputSource, SourceId};
pub use machine::{ActorState, GlobalState, StateControl, Subject, TransitionState};
