//! Type-state builder for `IrrigationController`.
//!
//! `build()` is only available once a relay and a settings source are set;
//! `try_build()` is always available and reports what is missing.

use std::marker::PhantomData;
use std::sync::Arc;

use irrigator_traits::clock::{Clock, MonotonicClock};
use irrigator_traits::Relay;

use crate::controller::{IrrigationController, SharedClock};
use crate::error::{BuildError, Result};
use crate::logger::LogSink;
use crate::settings::SettingsSource;

pub struct Missing;
pub struct Set;

pub struct ControllerBuilder<R, RS, SS> {
    relay: Option<R>,
    settings: Option<Box<dyn SettingsSource + Send>>,
    sink: Option<Box<dyn LogSink + Send>>,
    clock: Option<SharedClock>,
    _r: PhantomData<RS>,
    _s: PhantomData<SS>,
}

impl<R: Relay> IrrigationController<R> {
    /// Start building a controller.
    pub fn builder() -> ControllerBuilder<R, Missing, Missing> {
        ControllerBuilder {
            relay: None,
            settings: None,
            sink: None,
            clock: None,
            _r: PhantomData,
            _s: PhantomData,
        }
    }
}

impl<R: Relay, RS, SS> ControllerBuilder<R, RS, SS> {
    pub fn with_relay(self, relay: R) -> ControllerBuilder<R, Set, SS> {
        ControllerBuilder {
            relay: Some(relay),
            settings: self.settings,
            sink: self.sink,
            clock: self.clock,
            _r: PhantomData,
            _s: PhantomData,
        }
    }

    pub fn with_settings(
        self,
        settings: impl SettingsSource + Send + 'static,
    ) -> ControllerBuilder<R, RS, Set> {
        ControllerBuilder {
            relay: self.relay,
            settings: Some(Box::new(settings)),
            sink: self.sink,
            clock: self.clock,
            _r: PhantomData,
            _s: PhantomData,
        }
    }

    /// Destination for per-long-average log rows. Optional.
    pub fn with_sink(mut self, sink: impl LogSink + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Defaults to [`MonotonicClock`].
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Validate and build, regardless of type-state.
    pub fn try_build(self) -> Result<IrrigationController<R>> {
        let relay = self
            .relay
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRelay))?;
        let settings = self
            .settings
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSettings))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        Ok(IrrigationController::new(relay, clock, settings, self.sink))
    }
}

impl<R: Relay> ControllerBuilder<R, Set, Set> {
    pub fn build(self) -> Result<IrrigationController<R>> {
        self.try_build()
    }
}
