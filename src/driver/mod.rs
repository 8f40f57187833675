//! The per-tick coordinator.
//!
//! A [`Driver`] owns the global machine, one [`ActorState`] per tracked
//! subject, and the set of input sources already wired for delivery. The
//! host calls [`Driver::update`] once per frame; each call:
//!
//! 1. delivers queued input signals to the global machine and every live
//!    actor machine,
//! 2. advances the global machine,
//! 3. advances every actor machine whose subject is still alive,
//! 4. drops the machines of subjects that were found destroyed.
//!
//! Input signals are also delivered before any state change made through
//! the driver, so a button press is always handled by the state that was
//! current when it was pressed.
//!
//! Handlers of any machine may ask for a global state change through
//! [`StateControl::change_global_state`](crate::machine::StateControl::change_global_state).
//! The driver applies those requests right after the machine that raised
//! them has finished its step.
//!
//! Actor machines are created lazily the first time a subject is mutated
//! through the driver, never for subjects that were only queried.
//!
//! The driver is an ordinary value owned by the application; there is no
//! process-wide instance.

mod builder;
mod error;
mod surface;

pub use builder::DriverBuilder;
pub use error::BuildError;

use crate::core::{ButtonEvent, Clock};
use crate::input::{InputSignal, InputSink, InputSource, SourceId};
use crate::machine::{ActorState, GlobalRequests, GlobalState, Subject, TaskLauncher};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Ticks every tracked state machine and owns subject bookkeeping.
pub struct Driver<S: Subject> {
    clock: Arc<dyn Clock>,
    launcher: Arc<dyn TaskLauncher>,
    global: GlobalState,
    actors: Vec<ActorState<S>>,
    global_requests: GlobalRequests,
    wired: HashSet<SourceId>,
    input_tx: UnboundedSender<InputSignal>,
    input_rx: UnboundedReceiver<InputSignal>,
}

impl<S: Subject> Driver<S> {
    /// Create a driver with an unset global state and no tracked subjects.
    pub fn new(clock: Arc<dyn Clock>, launcher: Arc<dyn TaskLauncher>) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let global_requests = GlobalRequests::new();
        let mut global = GlobalState::new(Arc::clone(&clock), Arc::clone(&launcher));
        global.attach_global_requests(global_requests.clone());
        Self {
            clock,
            launcher,
            global,
            actors: Vec::new(),
            global_requests,
            wired: HashSet::new(),
            input_tx,
            input_rx,
        }
    }

    /// Start configuring a driver.
    pub fn builder() -> DriverBuilder<S> {
        DriverBuilder::new()
    }

    /// Clock shared by every machine of this driver.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The global machine.
    pub fn global(&self) -> &GlobalState {
        &self.global
    }

    /// The global machine, after delivering queued input.
    pub fn global_mut(&mut self) -> &mut GlobalState {
        self.dispatch_input();
        &mut self.global
    }

    /// Number of subjects that currently have a machine.
    pub fn tracked_count(&self) -> usize {
        self.actors.len()
    }

    /// Machines of every tracked subject, in tracking order.
    pub fn tracked(&self) -> impl Iterator<Item = &ActorState<S>> + '_ {
        self.actors.iter()
    }

    /// Machine of `subject`, if it is tracked. Never creates one.
    pub fn state_for(&self, subject: &S) -> Option<&ActorState<S>> {
        let index = self.position(subject)?;
        Some(&self.actors[index])
    }

    /// Machine of `subject`, created when missing if `create` is set.
    pub fn state_for_mut(&mut self, subject: &S, create: bool) -> Option<&mut ActorState<S>> {
        if create {
            return Some(self.track(subject));
        }
        self.dispatch_input();
        let index = self.position(subject)?;
        Some(&mut self.actors[index])
    }

    /// Machine of `subject`, creating it on first reference.
    pub fn track(&mut self, subject: &S) -> &mut ActorState<S> {
        self.dispatch_input();
        let index = match self.position(subject) {
            Some(index) => index,
            None => {
                debug!(subject = ?subject.id(), "tracking subject");
                let mut state = ActorState::for_subject(
                    subject.clone(),
                    Arc::clone(&self.clock),
                    Arc::clone(&self.launcher),
                );
                state.attach_global_requests(self.global_requests.clone());
                self.actors.push(state);
                self.actors.len() - 1
            }
        };
        &mut self.actors[index]
    }

    /// Advance everything by one tick.
    pub fn update(&mut self) {
        self.dispatch_input();

        self.global.update();
        drain_global_requests(&mut self.global, &self.global_requests);

        let mut reap = false;
        for actor in &mut self.actors {
            if actor.subject().is_destroyed() {
                reap = true;
                continue;
            }
            actor.update();
            drain_global_requests(&mut self.global, &self.global_requests);
            if actor.subject().is_destroyed() {
                reap = true;
            }
        }

        if reap {
            let before = self.actors.len();
            self.actors.retain(|actor| !actor.subject().is_destroyed());
            debug!(
                reaped = before - self.actors.len(),
                tracked = self.actors.len(),
                "dropped destroyed subjects"
            );
        }
    }

    /// Subscribe to every event kind of `source`.
    ///
    /// Returns `false` if the source was already wired, in which case
    /// nothing is subscribed again.
    pub fn register_input_source(&mut self, source: &dyn InputSource) -> bool {
        let id = source.id();
        if !self.wired.insert(id) {
            return false;
        }
        for event in ButtonEvent::ALL {
            let signal = InputSignal { source: id, event };
            source.subscribe(event, InputSink::new(signal, self.input_tx.clone()));
        }
        debug!(source = %id, "input source wired");
        true
    }

    /// Whether `source` has been wired to this driver.
    pub fn is_wired(&self, source: SourceId) -> bool {
        self.wired.contains(&source)
    }

    /// Deliver a button event to the global machine and every live actor.
    ///
    /// Signals already queued by wired sources are delivered first.
    pub fn fire_button_event(&mut self, source: SourceId, event: ButtonEvent) {
        self.dispatch_input();
        self.deliver(source, event);
    }

    /// Deliver every input signal queued by wired sources since the last
    /// call, in the order they were emitted. Returns how many were delivered.
    pub fn dispatch_input(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(signal) = self.input_rx.try_recv() {
            self.deliver(signal.source, signal.event);
            delivered += 1;
        }
        delivered
    }

    /// Apply global state changes requested by handlers so far.
    pub fn apply_global_requests(&mut self) {
        drain_global_requests(&mut self.global, &self.global_requests);
    }

    fn deliver(&mut self, source: SourceId, event: ButtonEvent) {
        self.global.fire_button_event(source, event);
        drain_global_requests(&mut self.global, &self.global_requests);
        for actor in &mut self.actors {
            if !actor.subject().is_destroyed() {
                actor.fire_button_event(source, event);
                drain_global_requests(&mut self.global, &self.global_requests);
            }
        }
    }

    fn position(&self, subject: &S) -> Option<usize> {
        let id = subject.id();
        self.actors
            .iter()
            .position(|actor| actor.subject().id() == id)
    }
}

fn drain_global_requests(global: &mut GlobalState, requests: &GlobalRequests) {
    while let Some(request) = requests.pop() {
        debug!(state = %request.target, delay = ?request.delay, "applying global request");
        match request.delay {
            Some(delay) => global.change_state_in(request.target, delay),
            None => global.change_state(request.target),
        }
    }
}

impl<S: Subject> fmt::Debug for Driver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("global", &self.global)
            .field("tracked", &self.actors.len())
            .field("wired", &self.wired.len())
            .finish()
    }
}
