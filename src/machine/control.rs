//! Transition controls shared by a state machine and its handlers.

use crate::core::{Clock, StateName};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// A delayed transition waiting for its deadline.
///
/// Target and deadline live in one value so they are always set and cleared
/// together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransition {
    pub target: StateName,
    pub deadline: Duration,
}

/// Where a machine is in applying a transition.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum TransitionPhase {
    /// No transition is being applied.
    #[default]
    Idle,
    /// Exit handlers for the state being left are running. A state change
    /// requested now is captured as `redirect` and replaces the destination
    /// once, instead of starting a nested transition.
    Exiting { redirect: Option<StateName> },
}

/// A global state change raised from inside a handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalRequest {
    pub target: StateName,
    pub delay: Option<Duration>,
}

/// Outbox shared by every machine of one driver.
///
/// Handlers push global requests here; the driver applies them after the
/// machine that raised them has finished its own work.
#[derive(Clone, Debug, Default)]
pub struct GlobalRequests {
    queue: Rc<RefCell<VecDeque<GlobalRequest>>>,
}

impl GlobalRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, request: GlobalRequest) {
        self.queue.borrow_mut().push_back(request);
    }

    /// Oldest request not yet applied.
    pub fn pop(&self) -> Option<GlobalRequest> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

/// The view a synchronous handler gets of the machine that invoked it.
///
/// Handlers never mutate handler registries; they read the current state and
/// request transitions. Requests made from Exit handlers redirect the
/// transition in flight; requests made anywhere else are applied in order
/// as soon as the firing that contains the handler has finished.
pub struct StateControl {
    clock: Arc<dyn Clock>,
    current: Option<StateName>,
    entered_at: Option<Duration>,
    pending: Option<PendingTransition>,
    phase: TransitionPhase,
    requested: VecDeque<StateName>,
    global_requests: Option<GlobalRequests>,
}

impl StateControl {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            current: None,
            entered_at: None,
            pending: None,
            phase: TransitionPhase::Idle,
            requested: VecDeque::new(),
            global_requests: None,
        }
    }

    /// Current state, or `None` if no state was ever entered.
    pub fn state(&self) -> Option<&StateName> {
        self.current.as_ref()
    }

    /// Whether the current state is `state`.
    pub fn is(&self, state: &str) -> bool {
        self.current.as_ref().is_some_and(|s| s.as_str() == state)
    }

    /// Time since the current state was entered.
    pub fn time_in_state(&self) -> Option<Duration> {
        self.entered_at
            .map(|entered| self.clock.now().saturating_sub(entered))
    }

    /// Delayed transition waiting for its deadline, if any.
    pub fn pending(&self) -> Option<&PendingTransition> {
        self.pending.as_ref()
    }

    /// Where the machine is in applying a transition.
    pub fn phase(&self) -> &TransitionPhase {
        &self.phase
    }

    /// Request an immediate transition to `target`.
    ///
    /// Any delayed transition is cancelled.
    pub fn change_state(&mut self, target: impl Into<StateName>) {
        let target = target.into();
        self.pending = None;
        match &mut self.phase {
            TransitionPhase::Exiting { redirect } => *redirect = Some(target),
            TransitionPhase::Idle => self.requested.push_back(target),
        }
    }

    /// Schedule a transition to `target` once `delay` has elapsed.
    ///
    /// Replaces any previously scheduled transition.
    pub fn change_state_in(&mut self, target: impl Into<StateName>, delay: Duration) {
        let deadline = self
            .clock
            .now()
            .checked_add(delay)
            .unwrap_or(Duration::MAX);
        self.pending = Some(PendingTransition {
            target: target.into(),
            deadline,
        });
    }

    /// Ask the driver to change the global state, now or after `delay`.
    ///
    /// Applied once the machine running this handler has finished its
    /// current work. Dropped with a warning when the machine does not
    /// belong to a driver.
    pub fn change_global_state(&mut self, target: impl Into<StateName>, delay: Option<Duration>) {
        let request = GlobalRequest {
            target: target.into(),
            delay,
        };
        match &self.global_requests {
            Some(requests) => requests.push(request),
            None => warn!(state = %request.target, "no driver attached, global request dropped"),
        }
    }

    pub(crate) fn attach_global_requests(&mut self, requests: GlobalRequests) {
        self.global_requests = Some(requests);
    }

    pub(crate) fn take_requested(&mut self) -> Option<StateName> {
        self.requested.pop_front()
    }

    /// Target of the scheduled transition if its deadline has been reached.
    pub(crate) fn due_transition(&self) -> Option<StateName> {
        let pending = self.pending.as_ref()?;
        (self.clock.now() >= pending.deadline).then(|| pending.target.clone())
    }

    pub(crate) fn begin_exit(&mut self) {
        self.phase = TransitionPhase::Exiting { redirect: None };
    }

    /// Leave the exit phase, returning the redirect captured during it.
    pub(crate) fn finish_exit(&mut self) -> Option<StateName> {
        match mem::take(&mut self.phase) {
            TransitionPhase::Exiting { redirect } => redirect,
            TransitionPhase::Idle => None,
        }
    }

    /// Make `target` current and restart the time-in-state clock.
    pub(crate) fn enter(&mut self, target: StateName) -> Option<StateName> {
        self.entered_at = Some(self.clock.now());
        self.current.replace(target)
    }
}

impl fmt::Debug for StateControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateControl")
            .field("current", &self.current)
            .field("entered_at", &self.entered_at)
            .field("pending", &self.pending)
            .field("phase", &self.phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;

    fn control() -> (StateControl, ManualClock) {
        let clock = ManualClock::new();
        (StateControl::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn fresh_control_has_no_state() {
        let (control, _) = control();
        assert!(control.state().is_none());
        assert!(control.time_in_state().is_none());
        assert!(!control.is("idle"));
        assert_eq!(control.phase(), &TransitionPhase::Idle);
    }

    #[test]
    fn change_request_while_idle_is_queued() {
        let (mut control, _) = control();
        control.change_state("walk");
        assert_eq!(control.take_requested(), Some(StateName::from("walk")));
        assert_eq!(control.take_requested(), None);
    }

    #[test]
    fn change_requests_while_idle_keep_their_order() {
        let (mut control, _) = control();
        control.change_state("walk");
        control.change_state("run");

        assert_eq!(control.take_requested(), Some(StateName::from("walk")));
        assert_eq!(control.take_requested(), Some(StateName::from("run")));
        assert_eq!(control.take_requested(), None);
    }

    #[test]
    fn global_requests_reach_attached_outbox() {
        let (mut control, _) = control();
        let requests = GlobalRequests::new();
        control.change_global_state("ignored", None);
        assert!(requests.is_empty());

        control.attach_global_requests(requests.clone());
        control.change_global_state("game_over", Some(Duration::from_secs(2)));

        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests.pop(),
            Some(GlobalRequest {
                target: StateName::from("game_over"),
                delay: Some(Duration::from_secs(2)),
            })
        );
        assert!(control.take_requested().is_none());
    }

    #[test]
    fn change_request_while_exiting_becomes_redirect() {
        let (mut control, _) = control();
        control.begin_exit();
        control.change_state("first");
        control.change_state("second");

        assert!(control.take_requested().is_none());
        assert_eq!(control.finish_exit(), Some(StateName::from("second")));
        assert_eq!(control.phase(), &TransitionPhase::Idle);
        assert_eq!(control.finish_exit(), None);
    }

    #[test]
    fn immediate_change_cancels_scheduled_one() {
        let (mut control, _) = control();
        control.change_state_in("later", Duration::from_millis(100));
        assert!(control.pending().is_some());

        control.change_state("now");
        assert!(control.pending().is_none());
    }

    #[test]
    fn scheduled_change_is_due_at_deadline() {
        let (mut control, clock) = control();
        control.change_state_in("walk", Duration::from_millis(500));

        clock.advance(Duration::from_millis(499));
        assert_eq!(control.due_transition(), None);

        clock.advance(Duration::from_millis(1));
        assert_eq!(control.due_transition(), Some(StateName::from("walk")));
    }

    #[test]
    fn enter_resets_time_in_state() {
        let (mut control, clock) = control();
        clock.advance(Duration::from_millis(300));
        assert_eq!(control.enter(StateName::from("idle")), None);

        clock.advance(Duration::from_millis(20));
        assert_eq!(control.time_in_state(), Some(Duration::from_millis(20)));
        assert!(control.is("idle"));

        let previous = control.enter(StateName::from("walk"));
        assert_eq!(previous, Some(StateName::from("idle")));
        assert_eq!(control.time_in_state(), Some(Duration::ZERO));
    }
}
