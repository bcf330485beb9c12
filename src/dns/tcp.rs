//! DNS over TCP and DNS over TLS.
//!
//! Both use the two-byte length prefix framing of RFC 1035 section 4.2.2;
//! DoT wraps the same stream in TLS (RFC 7858).

use super::address::split_host_port;
use super::resolve::Lookup;
use super::wire::{WireResolver, WireTransport};
use crate::base::callcontext::CallContext;
use crate::base::neterror::NetError;
use crate::socket::dialer::ChildDialer;
use crate::socket::tls::TlsConfig;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone)]
enum Security {
    Plain,
    Tls { server_name: String, config: TlsConfig },
}

/// One connection per query, closed after the reply.
#[derive(Debug, Clone)]
pub struct StreamTransport {
    dialer: ChildDialer,
    address: String,
    security: Security,
}

impl StreamTransport {
    /// Plain DNS over TCP. `address` must already carry a port.
    pub fn tcp(dialer: ChildDialer, address: impl Into<String>) -> Self {
        Self { dialer, address: address.into(), security: Security::Plain }
    }

    /// DNS over TLS. The server is authenticated against the host part of
    /// `address`, which must already carry a port.
    pub fn tls(dialer: ChildDialer, address: impl Into<String>) -> Result<Self, NetError> {
        let address = address.into();
        let server_name = split_host_port(&address)
            .map(|(host, _)| host.to_string())
            .map_err(|_| NetError::InvalidAddress {
                address: address.clone(),
                reason: "expected host:port",
            })?;
        let config = dialer.config().tls.clone().with_alpn(["dot"]);
        Ok(Self { dialer, address, security: Security::Tls { server_name, config } })
    }

    /// Name the TLS handshake verifies, if any.
    pub fn server_name(&self) -> Option<&str> {
        match &self.security {
            Security::Plain => None,
            Security::Tls { server_name, .. } => Some(server_name),
        }
    }
}

impl WireTransport for StreamTransport {
    fn round_trip<'a>(&'a self, ctx: &'a CallContext, query: &'a [u8]) -> Lookup<'a, Vec<u8>> {
        Box::pin(async move {
            match &self.security {
                Security::Plain => {
                    let mut stream = self.dialer.dial_tcp(ctx, &self.address).await?;
                    Ok(exchange_framed(&mut stream, query).await?)
                }
                Security::Tls { server_name, config } => {
                    let mut stream =
                        self.dialer.dial_tls(ctx, &self.address, server_name, config).await?;
                    Ok(exchange_framed(&mut stream, query).await?)
                }
            }
        })
    }

    fn network(&self) -> &'static str {
        match self.security {
            Security::Plain => "tcp",
            Security::Tls { .. } => "dot",
        }
    }

    fn address(&self) -> &str {
        &self.address
    }
}

/// Write one length-prefixed query and read one length-prefixed reply.
pub async fn exchange_framed<S>(stream: &mut S, query: &[u8]) -> io::Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let len = u16::try_from(query.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "query too large"))?;
    let mut frame = Vec::with_capacity(query.len() + 2);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(query);
    stream.write_all(&frame).await?;
    stream.flush().await?;

    let reply_len = stream.read_u16().await? as usize;
    let mut reply = vec![0u8; reply_len];
    stream.read_exact(&mut reply).await?;
    Ok(reply)
}

/// Resolver speaking DNS over TCP or TLS to a single server.
pub type StreamResolver = WireResolver<StreamTransport>;
