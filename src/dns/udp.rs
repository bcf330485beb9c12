//! DNS over UDP.

use super::resolve::Lookup;
use super::wire::{WireResolver, WireTransport};
use crate::base::callcontext::CallContext;
use crate::base::context::IoResultExt;
use crate::socket::dialer::ChildDialer;

/// Largest reply accepted over UDP. Anything longer is truncated by the
/// kernel and fails to decode.
const MAX_UDP_REPLY: usize = 4096;

/// Sends each query in a single datagram on a fresh connected socket.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    dialer: ChildDialer,
    address: String,
}

impl UdpTransport {
    /// `address` must already carry a port.
    pub fn new(dialer: ChildDialer, address: impl Into<String>) -> Self {
        Self { dialer, address: address.into() }
    }
}

impl WireTransport for UdpTransport {
    fn round_trip<'a>(&'a self, ctx: &'a CallContext, query: &'a [u8]) -> Lookup<'a, Vec<u8>> {
        Box::pin(async move {
            let socket = self.dialer.dial_udp(ctx, &self.address).await?;
            let endpoint = socket.peer_addr()?;
            socket.send(query).await.endpoint_context(endpoint)?;

            let mut buf = vec![0u8; MAX_UDP_REPLY];
            let n = socket.recv(&mut buf).await.endpoint_context(endpoint)?;
            buf.truncate(n);
            Ok(buf)
        })
    }

    fn network(&self) -> &'static str {
        "udp"
    }

    fn address(&self) -> &str {
        &self.address
    }
}

/// Resolver speaking DNS over UDP to a single server.
pub type UdpResolver = WireResolver<UdpTransport>;

