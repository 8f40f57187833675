//! Pass-through operations for hosts and editor bindings.
//!
//! Every operation here is a thin wrapper over [`Driver`] lookups and
//! [`TransitionState`](crate::machine::TransitionState) methods. Queries
//! never start tracking a subject; mutations and registrations do.

use super::Driver;
use crate::core::{ButtonEvent, StateName, TransitionEvent, Weight};
use crate::input::InputSource;
use crate::machine::{StateControl, Subject};
use std::future::Future;
use std::time::Duration;

impl<S: Subject> Driver<S> {
    /// Current state of `subject`, `None` if unset or untracked.
    pub fn subject_state(&self, subject: &S) -> Option<&StateName> {
        self.state_for(subject)?.state()
    }

    /// Time `subject` has spent in its current state.
    pub fn subject_time_in_state(&self, subject: &S) -> Option<Duration> {
        self.state_for(subject)?.time_in_state()
    }

    /// Whether `subject` is tracked and currently in `state`.
    pub fn subject_state_is(&self, subject: &S, state: &str) -> bool {
        self.state_for(subject).is_some_and(|s| s.is(state))
    }

    /// Change the state of `subject` now, or after `delay`.
    pub fn change_subject_state(
        &mut self,
        subject: &S,
        target: impl Into<StateName>,
        delay: Option<Duration>,
    ) {
        let state = self.track(subject);
        match delay {
            Some(delay) => state.change_state_in(target, delay),
            None => state.change_state(target),
        }
        self.apply_global_requests();
    }

    /// Register the primary `event` handler of `subject` for `state`.
    pub fn on_subject_event<F>(
        &mut self,
        subject: &S,
        event: TransitionEvent,
        state: impl Into<StateName>,
        handler: F,
    ) where
        F: FnMut(&S, &mut StateControl) + 'static,
    {
        self.track(subject).on_event(event, state, handler);
    }

    /// Add a weighted background `event` handler of `subject` for `state`.
    pub fn on_subject_background_event<F>(
        &mut self,
        subject: &S,
        event: TransitionEvent,
        state: impl Into<StateName>,
        weight: Weight,
        handler: F,
    ) where
        F: FnMut(&S, &mut StateControl) + 'static,
    {
        self.track(subject)
            .on_background_event(event, state, weight, handler);
    }

    /// Register the primary AsyncUpdate handler of `subject` for `state`.
    pub fn on_subject_async_update<F, Fut>(
        &mut self,
        subject: &S,
        state: impl Into<StateName>,
        handler: F,
    ) where
        F: Fn(S) -> Fut + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.track(subject).on_async_update(state, handler);
    }

    /// Add a weighted background AsyncUpdate handler of `subject` for `state`.
    pub fn on_subject_background_async_update<F, Fut>(
        &mut self,
        subject: &S,
        state: impl Into<StateName>,
        weight: Weight,
        handler: F,
    ) where
        F: Fn(S) -> Fut + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.track(subject)
            .on_background_async_update(state, weight, handler);
    }

    /// Register a button handler for `subject`, wiring `source` if needed.
    ///
    /// Without a weight the handler becomes the primary handler.
    pub fn on_subject_button_event<F>(
        &mut self,
        subject: &S,
        source: &dyn InputSource,
        event: ButtonEvent,
        state: impl Into<StateName>,
        weight: Option<Weight>,
        handler: F,
    ) where
        F: FnMut(&S, &mut StateControl) + 'static,
    {
        self.register_input_source(source);
        self.track(subject).register_button_event(
            source.id(),
            event,
            state.into(),
            weight,
            Box::new(handler),
        );
    }

    /// Set the change callback of `subject`, replacing any earlier one.
    pub fn on_subject_state_change<F>(&mut self, subject: &S, callback: F)
    where
        F: FnMut(Option<&StateName>, &StateName) + 'static,
    {
        self.track(subject).on_state_change(callback);
    }

    /// Current global state, `None` if never set.
    pub fn global_state(&self) -> Option<&StateName> {
        self.global.state()
    }

    /// Time the global machine has spent in its current state.
    pub fn global_time_in_state(&self) -> Option<Duration> {
        self.global.time_in_state()
    }

    /// Whether the global machine is currently in `state`.
    pub fn global_state_is(&self, state: &str) -> bool {
        self.global.is(state)
    }

    /// Change the global state now, or after `delay`.
    pub fn change_global_state(&mut self, target: impl Into<StateName>, delay: Option<Duration>) {
        self.dispatch_input();
        match delay {
            Some(delay) => self.global.change_state_in(target, delay),
            None => self.global.change_state(target),
        }
        self.apply_global_requests();
    }

    /// Register the primary global `event` handler for `state`.
    pub fn on_global_event<F>(&mut self, event: TransitionEvent, state: impl Into<StateName>, handler: F)
    where
        F: FnMut(&mut StateControl) + 'static,
    {
        self.global.on_event(event, state, handler);
    }

    /// Add a weighted background global `event` handler for `state`.
    pub fn on_global_background_event<F>(
        &mut self,
        event: TransitionEvent,
        state: impl Into<StateName>,
        weight: Weight,
        handler: F,
    ) where
        F: FnMut(&mut StateControl) + 'static,
    {
        self.global
            .on_background_event(event, state, weight, handler);
    }

    /// Register the primary global AsyncUpdate handler for `state`.
    pub fn on_global_async_update<F, Fut>(&mut self, state: impl Into<StateName>, handler: F)
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.global.on_async_update(state, handler);
    }

    /// Add a weighted background global AsyncUpdate handler for `state`.
    pub fn on_global_background_async_update<F, Fut>(
        &mut self,
        state: impl Into<StateName>,
        weight: Weight,
        handler: F,
    ) where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.global
            .on_background_async_update(state, weight, handler);
    }

    /// Register a global button handler, wiring `source` if needed.
    ///
    /// Without a weight the handler becomes the primary handler.
    pub fn on_global_button_event<F>(
        &mut self,
        source: &dyn InputSource,
        event: ButtonEvent,
        state: impl Into<StateName>,
        weight: Option<Weight>,
        handler: F,
    ) where
        F: FnMut(&mut StateControl) + 'static,
    {
        self.register_input_source(source);
        self.global.register_button_event(
            source.id(),
            event,
            state.into(),
            weight,
            Box::new(handler),
        );
    }

    /// Set the global change callback, replacing any earlier one.
    pub fn on_global_state_change<F>(&mut self, callback: F)
    where
        F: FnMut(Option<&StateName>, &StateName) + 'static,
    {
        self.global.on_state_change(callback);
    }
}
