//! Invocation strategies that adapt stored handlers to their owning context.
//!
//! One generic [`TransitionState`](super::TransitionState) drives both the
//! global machine and every per-subject machine. What differs is only how a
//! stored handler is called: global handlers take no subject, actor handlers
//! receive the tracked subject as an implicit first argument.

use super::control::StateControl;
use futures::future::BoxFuture;
use std::fmt;

/// An externally owned entity that can carry its own state.
///
/// The host owns subjects and sets their destroyed flag; the engine only
/// polls it. Subjects are compared by [`Subject::id`], never by value.
pub trait Subject: Clone + Send + 'static {
    type Id: PartialEq + fmt::Debug;

    /// Identity used to find the machine of this subject.
    fn id(&self) -> Self::Id;

    /// Whether the host has destroyed this subject.
    fn is_destroyed(&self) -> bool;
}

/// Adapts stored handler values into calls.
pub trait SubjectBinder {
    /// Synchronous handler shape (Enter, Exit, Update, button events).
    type Handler: ?Sized;

    /// AsyncUpdate handler shape: builds the future to run in the background.
    type AsyncHandler: ?Sized;

    /// Call a synchronous handler with `control` and any bound subject.
    fn invoke(&self, handler: &mut Self::Handler, control: &mut StateControl);

    /// Build the future an AsyncUpdate handler wants to run.
    fn launch(&self, handler: &Self::AsyncHandler) -> BoxFuture<'static, ()>;
}

/// Synchronous handler of the global machine.
pub type GlobalHandler = dyn FnMut(&mut StateControl);
/// AsyncUpdate handler of the global machine.
pub type GlobalAsyncHandler = dyn Fn() -> BoxFuture<'static, ()>;

/// Synchronous handler of a subject's machine.
pub type ActorHandler<S> = dyn FnMut(&S, &mut StateControl);
/// AsyncUpdate handler of a subject's machine; receives its own clone.
pub type ActorAsyncHandler<S> = dyn Fn(S) -> BoxFuture<'static, ()>;

/// Binder for the single global machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalBinder;

impl SubjectBinder for GlobalBinder {
    type Handler = GlobalHandler;
    type AsyncHandler = GlobalAsyncHandler;

    fn invoke(&self, handler: &mut GlobalHandler, control: &mut StateControl) {
        handler(control)
    }

    fn launch(&self, handler: &GlobalAsyncHandler) -> BoxFuture<'static, ()> {
        handler()
    }
}

/// Binder that passes its subject to every handler.
#[derive(Clone, Debug)]
pub struct ActorBinder<S> {
    subject: S,
}

impl<S: Subject> ActorBinder<S> {
    pub fn new(subject: S) -> Self {
        Self { subject }
    }

    /// The bound subject.
    pub fn subject(&self) -> &S {
        &self.subject
    }
}

impl<S: Subject> SubjectBinder for ActorBinder<S> {
    type Handler = ActorHandler<S>;
    type AsyncHandler = ActorAsyncHandler<S>;

    fn invoke(&self, handler: &mut ActorHandler<S>, control: &mut StateControl) {
        handler(&self.subject, control)
    }

    fn launch(&self, handler: &ActorAsyncHandler<S>) -> BoxFuture<'static, ()> {
        handler(self.subject.clone())
    }
}
