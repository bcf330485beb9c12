use super::{Handler, Measurement};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Start time and observer shared by every operation of one measurement.
///
/// Cloning is cheap: the handler is reference counted.
#[derive(Clone)]
pub struct MeasurementRoot {
    beginning: Instant,
    handler: Option<Arc<dyn Handler>>,
}

impl MeasurementRoot {
    pub fn new(beginning: Instant, handler: Option<Arc<dyn Handler>>) -> Self {
        Self { beginning, handler }
    }

    /// A root that records nothing, starting now.
    pub fn detached() -> Self {
        Self::new(Instant::now(), None)
    }

    /// True when a handler that actually observes events is attached.
    pub fn is_instrumented(&self) -> bool {
        self.handler.as_ref().is_some_and(|h| !h.is_noop())
    }

    pub fn elapsed(&self) -> Duration {
        self.beginning.elapsed()
    }

    pub fn emit(&self, measurement: Measurement) {
        if let Some(handler) = &self.handler {
            handler.on_measurement(measurement);
        }
    }
}

impl fmt::Debug for MeasurementRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasurementRoot")
            .field("beginning", &self.beginning)
            .field("instrumented", &self.is_instrumented())
            .finish()
    }
}
