//! The transition-state machine.
//!
//! A [`TransitionState`] owns a current state name, an optional delayed
//! transition, and three handler registries (lifecycle events, AsyncUpdate
//! handlers, and button events). It is generic over a [`SubjectBinder`],
//! which decides how stored handlers are called:
//!
//! - [`GlobalState`] calls handlers with no subject
//! - [`ActorState`] calls handlers with the tracked subject
//!
//! # Transition rules
//!
//! - Changing to the current state is a no-op, but still cancels any delayed
//!   transition.
//! - Exit handlers for the state being left fire first. If one of them calls
//!   [`StateControl::change_state`], the transition is redirected to that
//!   target instead of starting a second transition. A redirect back to the
//!   state being left re-enters it.
//! - The state is then assigned, the time-in-state clock restarts, the change
//!   callback receives `(previous, next)`, and Enter handlers fire.
//! - Changes requested from Enter, Update or button handlers are applied in
//!   request order once the firing that contains them completes.
//!
//! # Example
//!
//! ```rust
//! use statecraft::core::{ManualClock, TransitionEvent};
//! use statecraft::machine::{CooperativeLauncher, GlobalState};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let mut global = GlobalState::new(Arc::new(clock.clone()), Arc::new(CooperativeLauncher::new()));
//!
//! global.change_state("menu");
//! global.on_event(TransitionEvent::Update, "menu", |ctl| {
//!     if ctl.time_in_state() >= Some(Duration::from_secs(3)) {
//!         ctl.change_state("attract");
//!     }
//! });
//!
//! clock.advance(Duration::from_secs(3));
//! global.update();
//! assert!(global.is("attract"));
//! ```

mod binder;
mod control;
mod task;

pub use binder::{
    ActorAsyncHandler, ActorBinder, ActorHandler, GlobalAsyncHandler, GlobalBinder, GlobalHandler,
    Subject, SubjectBinder,
};
pub use control::{GlobalRequest, GlobalRequests, PendingTransition, StateControl, TransitionPhase};
pub use task::{AsyncSlot, CooperativeLauncher, TaskHandle, TaskLauncher, TokioLauncher};

use crate::core::{ButtonEvent, Clock, HandlerRegistry, StateName, TransitionEvent, Weight};
use crate::input::SourceId;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Callback notified with `(previous, next)` after every transition.
pub type ChangeCallback = dyn FnMut(Option<&StateName>, &StateName);

#[derive(Clone, Debug, PartialEq, Eq)]
struct ButtonKey {
    source: SourceId,
    event: ButtonEvent,
    state: StateName,
}

/// A state machine whose handlers are invoked through the binder `B`.
pub struct TransitionState<B: SubjectBinder> {
    binder: B,
    control: StateControl,
    events: HandlerRegistry<(TransitionEvent, StateName), B::Handler>,
    async_handlers: HandlerRegistry<StateName, B::AsyncHandler>,
    buttons: HandlerRegistry<ButtonKey, B::Handler>,
    on_change: Option<Box<ChangeCallback>>,
    async_slot: AsyncSlot,
    launcher: Arc<dyn TaskLauncher>,
}

/// Machine for the single global actor.
pub type GlobalState = TransitionState<GlobalBinder>;

/// Machine attached to one tracked subject.
pub type ActorState<S> = TransitionState<ActorBinder<S>>;

impl<B: SubjectBinder> TransitionState<B> {
    /// Create a machine that calls its handlers through `binder`.
    pub fn with_binder(binder: B, clock: Arc<dyn Clock>, launcher: Arc<dyn TaskLauncher>) -> Self {
        Self {
            binder,
            control: StateControl::new(clock),
            events: HandlerRegistry::new(),
            async_handlers: HandlerRegistry::new(),
            buttons: HandlerRegistry::new(),
            on_change: None,
            async_slot: AsyncSlot::Idle,
            launcher,
        }
    }

    /// The invocation strategy of this machine.
    pub fn binder(&self) -> &B {
        &self.binder
    }

    /// Route global requests raised by this machine's handlers to `requests`.
    pub(crate) fn attach_global_requests(&mut self, requests: GlobalRequests) {
        self.control.attach_global_requests(requests);
    }

    /// Current state, or `None` if no state was ever entered.
    pub fn state(&self) -> Option<&StateName> {
        self.control.state()
    }

    /// Whether the current state is `state`.
    pub fn is(&self, state: &str) -> bool {
        self.control.is(state)
    }

    /// Time since the last successful transition, `None` before the first.
    pub fn time_in_state(&self) -> Option<Duration> {
        self.control.time_in_state()
    }

    /// Delayed transition waiting for its deadline, if any.
    pub fn pending(&self) -> Option<&PendingTransition> {
        self.control.pending()
    }

    /// Whether an AsyncUpdate task launched by this machine is still running.
    pub fn is_async_running(&self) -> bool {
        self.async_slot.is_running()
    }

    /// Transition to `target` immediately.
    pub fn change_state(&mut self, target: impl Into<StateName>) {
        self.control.change_state(target);
        self.apply_requested();
    }

    /// Transition to `target` on the first update at or after `delay` from now.
    ///
    /// No events fire until then. A later call replaces this one.
    pub fn change_state_in(&mut self, target: impl Into<StateName>, delay: Duration) {
        self.control.change_state_in(target, delay);
    }

    /// Advance the machine by one tick.
    ///
    /// Applies a due delayed transition, fires Update for the current state,
    /// then launches the AsyncUpdate handlers for the current state unless a
    /// previous AsyncUpdate task is still running.
    pub fn update(&mut self) {
        if let Some(target) = self.control.due_transition() {
            self.change_state(target);
        }

        self.fire(TransitionEvent::Update);
        self.apply_requested();

        self.launch_async_update();
    }

    /// Run the button handlers registered for the current state.
    pub fn fire_button_event(&mut self, source: SourceId, event: ButtonEvent) {
        let Some(state) = self.control.state().cloned() else {
            return;
        };
        let key = ButtonKey {
            source,
            event,
            state,
        };
        if let Some(entry) = self.buttons.get_mut(&key) {
            trace!(?source, event = event.name(), state = %key.state, "firing button handlers");
            for handler in entry.iter_mut() {
                self.binder.invoke(handler, &mut self.control);
            }
        }
        self.apply_requested();
    }

    /// Register the change callback, replacing any previous one.
    pub fn on_state_change<F>(&mut self, callback: F)
    where
        F: FnMut(Option<&StateName>, &StateName) + 'static,
    {
        self.on_change = Some(Box::new(callback));
    }

    /// Register `handler` for `event` in `state`.
    ///
    /// Without a weight the handler becomes the primary handler, replacing
    /// any earlier one. With a weight it is added to the background chain.
    pub fn register_event(
        &mut self,
        event: TransitionEvent,
        state: StateName,
        weight: Option<Weight>,
        handler: Box<B::Handler>,
    ) {
        let key = (event, state);
        match weight {
            Some(weight) => self.events.insert_background(key, weight, handler),
            None => {
                self.events.set_primary(key, handler);
            }
        }
    }

    /// Register an AsyncUpdate handler for `state`, primary or weighted.
    pub fn register_async_update(
        &mut self,
        state: StateName,
        weight: Option<Weight>,
        handler: Box<B::AsyncHandler>,
    ) {
        match weight {
            Some(weight) => self.async_handlers.insert_background(state, weight, handler),
            None => {
                self.async_handlers.set_primary(state, handler);
            }
        }
    }

    /// Register a button handler for `(source, event)` in `state`.
    pub fn register_button_event(
        &mut self,
        source: SourceId,
        event: ButtonEvent,
        state: StateName,
        weight: Option<Weight>,
        handler: Box<B::Handler>,
    ) {
        let key = ButtonKey {
            source,
            event,
            state,
        };
        match weight {
            Some(weight) => self.buttons.insert_background(key, weight, handler),
            None => {
                self.buttons.set_primary(key, handler);
            }
        }
    }

    fn apply_requested(&mut self) {
        while let Some(target) = self.control.take_requested() {
            self.transition_to(target);
        }
    }

    fn transition_to(&mut self, target: StateName) {
        if self.control.state() == Some(&target) {
            return;
        }

        self.control.begin_exit();
        self.fire(TransitionEvent::Exit);
        let target = self.control.finish_exit().unwrap_or(target);

        let previous = self.control.enter(target.clone());
        debug!(from = ?previous, to = %target, "state changed");

        if let Some(callback) = self.on_change.as_mut() {
            callback(previous.as_ref(), &target);
        }

        self.fire(TransitionEvent::Enter);
    }

    fn fire(&mut self, event: TransitionEvent) {
        let Some(state) = self.control.state().cloned() else {
            return;
        };
        let Some(entry) = self.events.get_mut(&(event, state)) else {
            return;
        };
        trace!(event = event.name(), handlers = entry.len(), "firing");
        for handler in entry.iter_mut() {
            self.binder.invoke(handler, &mut self.control);
        }
    }

    fn launch_async_update(&mut self) {
        if self.async_slot.poll_finished() {
            trace!("async update finished");
        }
        if self.async_slot.is_running() {
            return;
        }
        let Some(state) = self.control.state() else {
            return;
        };
        let Some(entry) = self.async_handlers.get(state) else {
            return;
        };
        if entry.is_empty() {
            return;
        }

        debug!(state = %state, handlers = entry.len(), "launching async update");
        let tasks: Vec<_> = entry.iter().map(|h| self.binder.launch(h)).collect();
        let task = async move {
            for task in tasks {
                task.await;
            }
        };
        self.async_slot = AsyncSlot::Running(self.launcher.launch(task.boxed()));
    }
}

impl GlobalState {
    /// Create the global machine with no state set.
    pub fn new(clock: Arc<dyn Clock>, launcher: Arc<dyn TaskLauncher>) -> Self {
        Self::with_binder(GlobalBinder, clock, launcher)
    }

    /// Register the primary `event` handler for `state`, replacing any earlier one.
    pub fn on_event<F>(&mut self, event: TransitionEvent, state: impl Into<StateName>, handler: F)
    where
        F: FnMut(&mut StateControl) + 'static,
    {
        self.register_event(event, state.into(), None, Box::new(handler));
    }

    /// Add a weighted background `event` handler for `state`.
    pub fn on_background_event<F>(
        &mut self,
        event: TransitionEvent,
        state: impl Into<StateName>,
        weight: Weight,
        handler: F,
    ) where
        F: FnMut(&mut StateControl) + 'static,
    {
        self.register_event(event, state.into(), Some(weight), Box::new(handler));
    }

    /// Register the AsyncUpdate handler for `state`.
    ///
    /// `handler` builds a future each time a background run is launched.
    pub fn on_async_update<F, Fut>(&mut self, state: impl Into<StateName>, handler: F)
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register_async_update(state.into(), None, Box::new(move || handler().boxed()));
    }

    /// Add a weighted background AsyncUpdate handler for `state`.
    pub fn on_background_async_update<F, Fut>(
        &mut self,
        state: impl Into<StateName>,
        weight: Weight,
        handler: F,
    ) where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register_async_update(
            state.into(),
            Some(weight),
            Box::new(move || handler().boxed()),
        );
    }

    /// Register the primary handler for `(source, event)` in `state`.
    pub fn on_button_event<F>(
        &mut self,
        source: SourceId,
        event: ButtonEvent,
        state: impl Into<StateName>,
        handler: F,
    ) where
        F: FnMut(&mut StateControl) + 'static,
    {
        self.register_button_event(source, event, state.into(), None, Box::new(handler));
    }

    /// Add a weighted background handler for `(source, event)` in `state`.
    pub fn on_background_button_event<F>(
        &mut self,
        source: SourceId,
        event: ButtonEvent,
        state: impl Into<StateName>,
        weight: Weight,
        handler: F,
    ) where
        F: FnMut(&mut StateControl) + 'static,
    {
        self.register_button_event(source, event, state.into(), Some(weight), Box::new(handler));
    }
}

impl<S: Subject> ActorState<S> {
    /// Create a machine bound to `subject`, with no state set.
    pub fn for_subject(subject: S, clock: Arc<dyn Clock>, launcher: Arc<dyn TaskLauncher>) -> Self {
        Self::with_binder(ActorBinder::new(subject), clock, launcher)
    }

    /// The subject every handler of this machine receives.
    pub fn subject(&self) -> &S {
        self.binder().subject()
    }

    /// Register the primary `event` handler for `state`, replacing any earlier one.
    pub fn on_event<F>(&mut self, event: TransitionEvent, state: impl Into<StateName>, handler: F)
    where
        F: FnMut(&S, &mut StateControl) + 'static,
    {
        self.register_event(event, state.into(), None, Box::new(handler));
    }

    /// Add a weighted background `event` handler for `state`.
    pub fn on_background_event<F>(
        &mut self,
        event: TransitionEvent,
        state: impl Into<StateName>,
        weight: Weight,
        handler: F,
    ) where
        F: FnMut(&S, &mut StateControl) + 'static,
    {
        self.register_event(event, state.into(), Some(weight), Box::new(handler));
    }

    /// Register the AsyncUpdate handler for `state`.
    ///
    /// The handler receives its own clone of the subject.
    pub fn on_async_update<F, Fut>(&mut self, state: impl Into<StateName>, handler: F)
    where
        F: Fn(S) -> Fut + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register_async_update(
            state.into(),
            None,
            Box::new(move |subject| handler(subject).boxed()),
        );
    }

    /// Add a weighted background AsyncUpdate handler for `state`.
    pub fn on_background_async_update<F, Fut>(
        &mut self,
        state: impl Into<StateName>,
        weight: Weight,
        handler: F,
    ) where
        F: Fn(S) -> Fut + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register_async_update(
            state.into(),
            Some(weight),
            Box::new(move |subject| handler(subject).boxed()),
        );
    }

    /// Register the primary handler for `(source, event)` in `state`.
    pub fn on_button_event<F>(
        &mut self,
        source: SourceId,
        event: ButtonEvent,
        state: impl Into<StateName>,
        handler: F,
    ) where
        F: FnMut(&S, &mut StateControl) + 'static,
    {
        self.register_button_event(source, event, state.into(), None, Box::new(handler));
    }

    /// Add a weighted background handler for `(source, event)` in `state`.
    pub fn on_background_button_event<F>(
        &mut self,
        source: SourceId,
        event: ButtonEvent,
        state: impl Into<StateName>,
        weight: Weight,
        handler: F,
    ) where
        F: FnMut(&S, &mut StateControl) + 'static,
    {
        self.register_button_event(source, event, state.into(), Some(weight), Box::new(handler));
    }
}

impl<B: SubjectBinder> fmt::Debug for TransitionState<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionState")
            .field("control", &self.control)
            .field("async_slot", &self.async_slot)
            .field("event_keys", &self.events.len())
            .field("button_keys", &self.buttons.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::task::Poll;

    struct Fixture {
        clock: ManualClock,
        launcher: CooperativeLauncher,
        global: GlobalState,
        log: Rc<RefCell<Vec<String>>>,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::new();
        let launcher = CooperativeLauncher::new();
        let global = GlobalState::new(Arc::new(clock.clone()), Arc::new(launcher.clone()));
        Fixture {
            clock,
            launcher,
            global,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    impl Fixture {
        fn record(&mut self, event: TransitionEvent, state: &str) {
            let log = Rc::clone(&self.log);
            let line = format!("{}:{}", event.name(), state);
            self.global.on_event(event, state, move |_| log.borrow_mut().push(line.clone()));
        }

        fn record_lifecycle(&mut self, state: &str) {
            self.record(TransitionEvent::Enter, state);
            self.record(TransitionEvent::Exit, state);
        }

        fn take_log(&self) -> Vec<String> {
            self.log.borrow_mut().drain(..).collect()
        }
    }

    #[test]
    fn change_state_fires_exit_then_enter() {
        let mut f = fixture();
        f.record_lifecycle("idle");
        f.record_lifecycle("walk");

        f.global.change_state("idle");
        assert_eq!(f.take_log(), vec!["enter:idle"]);

        f.global.change_state("walk");
        assert_eq!(f.take_log(), vec!["exit:idle", "enter:walk"]);
        assert!(f.global.is("walk"));
    }

    #[test]
    fn changing_to_current_state_is_a_no_op() {
        let mut f = fixture();
        f.record_lifecycle("idle");
        let changes = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&changes);
        f.global.on_state_change(move |_, _| *counter.borrow_mut() += 1);

        f.global.change_state("idle");
        f.take_log();
        f.clock.advance(Duration::from_millis(50));
        f.global.change_state_in("walk", Duration::from_millis(10));

        f.global.change_state("idle");

        assert!(f.take_log().is_empty());
        assert_eq!(*changes.borrow(), 1);
        assert_eq!(f.global.time_in_state(), Some(Duration::from_millis(50)));
        assert!(f.global.pending().is_none());
    }

    #[test]
    fn time_in_state_is_unset_before_first_transition() {
        let f = fixture();
        assert!(f.global.state().is_none());
        assert!(f.global.time_in_state().is_none());
    }

    #[test]
    fn delayed_transition_waits_for_deadline() {
        let mut f = fixture();
        f.record_lifecycle("idle");
        f.record_lifecycle("walk");
        f.global.change_state("idle");
        f.take_log();

        f.global.change_state_in("walk", Duration::from_millis(500));
        assert!(f.take_log().is_empty());

        f.clock.set(Duration::from_millis(400));
        f.global.update();
        assert!(f.global.is("idle"));

        f.clock.set(Duration::from_millis(600));
        f.global.update();
        assert!(f.global.is("walk"));
        assert_eq!(f.take_log(), vec!["exit:idle", "enter:walk"]);
        assert_eq!(f.global.time_in_state(), Some(Duration::ZERO));
        assert!(f.global.pending().is_none());

        f.clock.advance(Duration::from_secs(5));
        f.global.update();
        assert!(f.take_log().is_empty());
    }

    #[test]
    fn later_delayed_request_overwrites_earlier() {
        let mut f = fixture();
        f.global.change_state("idle");
        f.global.change_state_in("walk", Duration::from_millis(100));
        f.global.change_state_in("run", Duration::from_millis(300));

        f.clock.set(Duration::from_millis(200));
        f.global.update();
        assert!(f.global.is("idle"));

        f.clock.set(Duration::from_millis(300));
        f.global.update();
        assert!(f.global.is("run"));
    }

    #[test]
    fn exit_handler_redirects_transition() {
        let mut f = fixture();
        f.record(TransitionEvent::Enter, "dead");
        f.record(TransitionEvent::Enter, "fleeing");
        f.global.on_event(TransitionEvent::Exit, "combat", |ctl| {
            ctl.change_state("fleeing");
        });
        let changes = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&changes);
        f.global.on_state_change(move |from, to| {
            seen.borrow_mut().push((from.cloned(), to.clone()));
        });

        f.global.change_state("combat");
        changes.borrow_mut().clear();

        f.global.change_state("dead");

        assert!(f.global.is("fleeing"));
        assert_eq!(f.take_log(), vec!["enter:fleeing"]);
        assert_eq!(
            *changes.borrow(),
            vec![(Some(StateName::from("combat")), StateName::from("fleeing"))]
        );
    }

    #[test]
    fn exit_redirect_to_same_state_reenters_it() {
        let mut f = fixture();
        f.record(TransitionEvent::Enter, "combat");
        f.record(TransitionEvent::Enter, "idle");
        f.global.change_state("combat");
        f.take_log();
        f.global.on_event(TransitionEvent::Exit, "combat", |ctl| {
            ctl.change_state("combat");
        });
        let changes = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&changes);
        f.global.on_state_change(move |from, to| {
            seen.borrow_mut().push((from.cloned(), to.clone()));
        });

        f.clock.advance(Duration::from_millis(70));
        f.global.change_state("idle");

        assert!(f.global.is("combat"));
        assert_eq!(f.take_log(), vec!["enter:combat"]);
        assert_eq!(f.global.time_in_state(), Some(Duration::ZERO));
        assert_eq!(
            *changes.borrow(),
            vec![(Some(StateName::from("combat")), StateName::from("combat"))]
        );
    }

    #[test]
    fn timed_request_from_exit_handler_stays_scheduled() {
        let mut f = fixture();
        f.global.change_state("a");
        f.global.on_event(TransitionEvent::Exit, "a", |ctl| {
            ctl.change_state_in("c", Duration::from_millis(100));
        });

        f.global.change_state("b");
        assert!(f.global.is("b"));
        assert_eq!(
            f.global.pending().map(|p| p.target.clone()),
            Some(StateName::from("c"))
        );

        f.clock.advance(Duration::from_millis(100));
        f.global.update();
        assert!(f.global.is("c"));
    }

    #[test]
    fn enter_handler_chains_transitions_iteratively() {
        let mut f = fixture();
        f.record(TransitionEvent::Enter, "landed");
        f.global.on_event(TransitionEvent::Enter, "falling", |ctl| {
            ctl.change_state("landed");
        });

        f.global.change_state("falling");
        assert!(f.global.is("landed"));
        assert_eq!(f.take_log(), vec!["enter:landed"]);
    }

    #[test]
    fn update_fires_primary_then_weighted_background() {
        let mut f = fixture();
        for weight in [5, 1, 9] {
            let log = Rc::clone(&f.log);
            f.global
                .on_background_event(TransitionEvent::Update, "idle", weight, move |_| {
                    log.borrow_mut().push(weight.to_string())
                });
        }
        let log = Rc::clone(&f.log);
        f.global.on_event(TransitionEvent::Update, "idle", move |_| {
            log.borrow_mut().push("primary".into())
        });

        f.global.change_state("idle");
        f.global.update();
        assert_eq!(f.take_log(), vec!["primary", "9", "5", "1"]);
    }

    #[test]
    fn change_requested_by_update_applies_after_all_update_handlers() {
        let mut f = fixture();
        f.record(TransitionEvent::Exit, "idle");
        f.global.on_event(TransitionEvent::Update, "idle", |ctl| {
            ctl.change_state("walk");
        });
        let log = Rc::clone(&f.log);
        f.global
            .on_background_event(TransitionEvent::Update, "idle", 0, move |ctl| {
                log.borrow_mut().push(format!("background in {}", ctl.state().unwrap()));
            });

        f.global.change_state("idle");
        f.global.update();

        assert_eq!(f.take_log(), vec!["background in idle", "exit:idle"]);
        assert!(f.global.is("walk"));
    }

    #[test]
    fn two_requests_in_one_update_both_transition() {
        let mut f = fixture();
        f.record_lifecycle("walk");
        f.record(TransitionEvent::Enter, "run");
        f.global.on_event(TransitionEvent::Update, "idle", |ctl| {
            ctl.change_state("walk");
        });
        f.global
            .on_background_event(TransitionEvent::Update, "idle", 1, |ctl| {
                ctl.change_state("run");
            });
        let changes = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&changes);
        f.global.on_state_change(move |from, to| {
            seen.borrow_mut().push(format!("{}->{to}", from.map_or("-", |s| s.as_str())));
        });

        f.global.change_state("idle");
        f.take_log();
        changes.borrow_mut().clear();
        f.global.update();

        assert!(f.global.is("run"));
        assert_eq!(*changes.borrow(), vec!["idle->walk", "walk->run"]);
        assert_eq!(f.take_log(), vec!["enter:walk", "exit:walk", "enter:run"]);
    }

    #[test]
    fn primary_registration_replaces_previous_handler() {
        let mut f = fixture();
        let log = Rc::clone(&f.log);
        f.global.on_event(TransitionEvent::Enter, "idle", move |_| {
            log.borrow_mut().push("old".into())
        });
        let log = Rc::clone(&f.log);
        f.global.on_event(TransitionEvent::Enter, "idle", move |_| {
            log.borrow_mut().push("new".into())
        });

        f.global.change_state("idle");
        assert_eq!(f.take_log(), vec!["new"]);
    }

    #[test]
    fn only_latest_change_callback_is_kept() {
        let mut f = fixture();
        let log = Rc::clone(&f.log);
        f.global.on_state_change(move |_, to| log.borrow_mut().push(format!("first {to}")));
        let log = Rc::clone(&f.log);
        f.global.on_state_change(move |_, to| log.borrow_mut().push(format!("second {to}")));

        f.global.change_state("idle");
        assert_eq!(f.take_log(), vec!["second idle"]);
    }

    #[test]
    fn at_most_one_async_update_in_flight() {
        let mut f = fixture();
        let open = Arc::new(AtomicBool::new(false));
        let launches = Arc::new(AtomicUsize::new(0));
        let (gate, count) = (Arc::clone(&open), Arc::clone(&launches));
        f.global.on_async_update("loading", move || {
            count.fetch_add(1, Ordering::SeqCst);
            let gate = Arc::clone(&gate);
            futures::future::poll_fn(move |_| {
                if gate.load(Ordering::SeqCst) {
                    Poll::Ready(())
                } else {
                    Poll::Pending
                }
            })
        });

        f.global.change_state("loading");
        for _ in 0..10 {
            f.global.update();
            f.launcher.poll_tasks();
        }
        assert_eq!(launches.load(Ordering::SeqCst), 1);
        assert!(f.global.is_async_running());

        open.store(true, Ordering::SeqCst);
        f.launcher.poll_tasks();
        f.global.update();
        assert_eq!(launches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn async_update_survives_state_change() {
        let mut f = fixture();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        f.global.on_async_update("a", move || {
            let flag = Arc::clone(&flag);
            async move { flag.store(true, Ordering::SeqCst) }
        });
        f.global.on_async_update("b", || async {});

        f.global.change_state("a");
        f.global.update();
        f.global.change_state("b");
        f.global.update();
        assert!(f.global.is_async_running());
        assert_eq!(f.launcher.pending(), 1);

        f.launcher.poll_tasks();
        assert!(finished.load(Ordering::SeqCst));
        f.global.update();
        assert_eq!(f.launcher.pending(), 1);
    }

    #[test]
    fn no_async_launch_without_handler() {
        let mut f = fixture();
        f.global.change_state("idle");
        f.global.update();
        assert!(!f.global.is_async_running());
        assert_eq!(f.launcher.pending(), 0);
    }

    #[test]
    fn button_handlers_follow_current_state() {
        let mut f = fixture();
        let source = SourceId(7);
        let log = Rc::clone(&f.log);
        f.global
            .on_button_event(source, ButtonEvent::Pressed, "menu", move |ctl| {
                log.borrow_mut().push("menu pressed".into());
                ctl.change_state("playing");
            });
        let log = Rc::clone(&f.log);
        f.global
            .on_button_event(source, ButtonEvent::Pressed, "playing", move |_| {
                log.borrow_mut().push("jump".into())
            });

        f.global.fire_button_event(source, ButtonEvent::Pressed);
        assert!(f.take_log().is_empty());

        f.global.change_state("menu");
        f.global.fire_button_event(source, ButtonEvent::Released);
        f.global.fire_button_event(SourceId(8), ButtonEvent::Pressed);
        assert!(f.take_log().is_empty());

        f.global.fire_button_event(source, ButtonEvent::Pressed);
        assert_eq!(f.take_log(), vec!["menu pressed"]);
        assert!(f.global.is("playing"));

        f.global.fire_button_event(source, ButtonEvent::Pressed);
        assert_eq!(f.take_log(), vec!["jump"]);
    }
}
