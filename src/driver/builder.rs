//! Builder for constructing drivers.

use super::error::BuildError;
use super::Driver;
use crate::core::{Clock, MonotonicClock};
use crate::machine::{Subject, TaskLauncher, TokioLauncher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Builder for [`Driver`] with a fluent API.
///
/// The clock defaults to a [`MonotonicClock`]; the task launcher must be
/// chosen explicitly because it decides how AsyncUpdate handlers run.
pub struct DriverBuilder<S: Subject> {
    clock: Option<Arc<dyn Clock>>,
    launcher: Option<Arc<dyn TaskLauncher>>,
    _phantom: PhantomData<S>,
}

impl<S: Subject> DriverBuilder<S> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            clock: None,
            launcher: None,
            _phantom: PhantomData,
        }
    }

    /// Set the clock used for delays and time-in-state.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Use a clock that is shared with other components.
    pub fn shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the launcher for AsyncUpdate tasks (required).
    pub fn launcher(mut self, launcher: impl TaskLauncher + 'static) -> Self {
        self.launcher = Some(Arc::new(launcher));
        self
    }

    /// Launch AsyncUpdate tasks on the tokio runtime the caller runs in.
    pub fn tokio(self) -> Result<Self, BuildError> {
        let launcher = TokioLauncher::current()?;
        Ok(self.launcher(launcher))
    }

    /// Build the driver.
    /// Returns an error if no launcher was configured.
    pub fn build(self) -> Result<Driver<S>, BuildError> {
        let launcher = self.launcher.ok_or(BuildError::MissingLauncher)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        Ok(Driver::new(clock, launcher))
    }
}

impl<S: Subject> Default for DriverBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
