//! Leaf building blocks of the engine.
//!
//! - State names and event kinds
//! - Monotonic clocks
//! - Ordered, weighted handler storage
//!
//! Nothing in this module knows about subjects, drivers or input wiring.

mod clock;
mod macros;
mod registry;
mod state;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use registry::{HandlerEntry, HandlerRegistry, Weight};
pub use state::{ButtonEvent, StateName, TransitionEvent};
