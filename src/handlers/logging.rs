use super::{Handler, Measurement};

/// Forwards every measurement to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

impl Handler for LoggingHandler {
    fn on_measurement(&self, measurement: Measurement) {
        match &measurement {
            Measurement::Connect { network, remote_address, elapsed, failure } => {
                tracing::info!(%network, %remote_address, ?elapsed, ?failure, "connect");
            }
            Measurement::TlsHandshakeDone { server_name, elapsed, failure } => {
                tracing::info!(%server_name, ?elapsed, ?failure, "tls handshake done");
            }
            Measurement::DnsQuery { transport, server, name, qtype, elapsed } => {
                tracing::info!(%transport, %server, %name, %qtype, ?elapsed, "dns query");
            }
            Measurement::DnsReply { transport, server, name, qtype, elapsed, failure } => {
                tracing::info!(%transport, %server, %name, %qtype, ?elapsed, ?failure, "dns reply");
            }
            Measurement::ResolveStart { hostname, elapsed } => {
                tracing::info!(%hostname, ?elapsed, "resolve start");
            }
            Measurement::ResolveDone { hostname, addresses, elapsed, failure } => {
                tracing::info!(%hostname, ?addresses, ?elapsed, ?failure, "resolve done");
            }
            Measurement::HttpRoundTripDone { method, url, status, elapsed, failure } => {
                tracing::info!(%method, %url, ?status, ?elapsed, ?failure, "http round trip done");
            }
        }
    }
}
