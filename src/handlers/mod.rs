//! Instrumentation hooks.
//!
//! A [`Handler`] observes every network operation performed on behalf of a
//! measurement: connects, TLS handshakes, DNS round trips and HTTP
//! exchanges. Handlers are passed at construction time and reach the
//! operations through a [`MeasurementRoot`] carried by the call context.
//!
//! - [`NoHandler`]: discards everything (the default)
//! - [`LoggingHandler`]: forwards events to `tracing`
//! - [`SavingHandler`]: keeps events in memory for later inspection

mod logging;
mod root;
mod saving;

pub use logging::LoggingHandler;
pub use root::MeasurementRoot;
pub use saving::SavingHandler;

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// A single observation. `elapsed` is measured from the root's beginning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Measurement {
    Connect {
        network: &'static str,
        remote_address: String,
        elapsed: Duration,
        failure: Option<String>,
    },
    TlsHandshakeDone {
        server_name: String,
        elapsed: Duration,
        failure: Option<String>,
    },
    DnsQuery {
        transport: &'static str,
        server: String,
        name: String,
        qtype: String,
        elapsed: Duration,
    },
    DnsReply {
        transport: &'static str,
        server: String,
        name: String,
        qtype: String,
        elapsed: Duration,
        failure: Option<String>,
    },
    ResolveStart {
        hostname: String,
        elapsed: Duration,
    },
    ResolveDone {
        hostname: String,
        addresses: Vec<String>,
        elapsed: Duration,
        failure: Option<String>,
    },
    HttpRoundTripDone {
        method: String,
        url: String,
        status: Option<u16>,
        elapsed: Duration,
        failure: Option<String>,
    },
}

/// Observer of network operations.
///
/// Implementations must be cheap and non-blocking: they run inline on the
/// task performing the operation.
pub trait Handler: Send + Sync + fmt::Debug {
    fn on_measurement(&self, measurement: Measurement);

    /// Whether this handler discards every event. A no-op handler counts as
    /// "no instrumentation" when choosing the DoH client lifecycle.
    fn is_noop(&self) -> bool {
        false
    }
}

/// Handler that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHandler;

impl Handler for NoHandler {
    fn on_measurement(&self, _measurement: Measurement) {}

    fn is_noop(&self) -> bool {
        true
    }
}
