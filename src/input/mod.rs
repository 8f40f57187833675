//! Input sources and the plumbing that carries their events to the driver.
//!
//! An [`InputSource`] is anything that can report button events: a physical
//! controller button wrapped by the host, or an in-process [`VirtualButton`].
//! When the driver wires a source it hands it one [`InputSink`] per
//! [`ButtonEvent`]; the source calls [`InputSink::emit`] whenever that event
//! happens. The driver delivers queued signals in emission order, before its
//! next tick or state change, whichever comes first.

mod error;
mod layout;
mod resolve;

pub use error::{InputError, LayoutViolation};
pub use layout::{ButtonBinding, ButtonLayout, ControllerSet};
pub use resolve::{resolve_source, Controllers, LogicalButton, PlayerIndex, MAX_PLAYERS};

use crate::core::ButtonEvent;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

/// Identity of an input source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// One button event reported by one source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InputSignal {
    pub source: SourceId,
    pub event: ButtonEvent,
}

/// Something that reports button events.
pub trait InputSource {
    /// Stable identity used to key button handlers.
    fn id(&self) -> SourceId;

    /// Deliver every future occurrence of `event` to `sink`.
    fn subscribe(&self, event: ButtonEvent, sink: InputSink);
}

/// Listener handed to an input source for a single event kind.
#[derive(Clone, Debug)]
pub struct InputSink {
    signal: InputSignal,
    tx: UnboundedSender<InputSignal>,
}

impl InputSink {
    pub(crate) fn new(signal: InputSignal, tx: UnboundedSender<InputSignal>) -> Self {
        Self { signal, tx }
    }

    /// The signal this sink reports.
    pub fn signal(&self) -> InputSignal {
        self.signal
    }

    /// Report that the event happened.
    pub fn emit(&self) {
        if self.tx.send(self.signal).is_err() {
            trace!(source = %self.signal.source, "driver dropped, discarding input signal");
        }
    }
}

/// In-process input source driven by calling [`press`](Self::press) and
/// friends, for keyboard-mapped hosts, replays and tests.
pub struct VirtualButton {
    id: SourceId,
    sinks: RefCell<Vec<InputSink>>,
}

impl VirtualButton {
    pub fn new(id: SourceId) -> Self {
        Self {
            id,
            sinks: RefCell::new(Vec::new()),
        }
    }

    pub fn press(&self) {
        self.emit(ButtonEvent::Pressed);
    }

    pub fn release(&self) {
        self.emit(ButtonEvent::Released);
    }

    pub fn repeat(&self) {
        self.emit(ButtonEvent::Repeated);
    }

    pub fn emit(&self, event: ButtonEvent) {
        for sink in self.sinks.borrow().iter() {
            if sink.signal().event == event {
                sink.emit();
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks.borrow().len()
    }
}

impl InputSource for VirtualButton {
    fn id(&self) -> SourceId {
        self.id
    }

    fn subscribe(&self, _event: ButtonEvent, sink: InputSink) {
        self.sinks.borrow_mut().push(sink);
    }
}

impl fmt::Debug for VirtualButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualButton")
            .field("id", &self.id)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
