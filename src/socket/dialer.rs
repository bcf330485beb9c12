//! Instrumented dialing.
//!
//! [`Dialer`] is the general-purpose dialer: it resolves hostnames through a
//! configurable [`Resolver`] (system resolution by default) and reports each
//! connect attempt and TLS handshake to the measurement's handler.
//!
//! [`ChildDialer`] is the dialer handed to DNS transports. It shares the
//! general dialer's timeouts and instrumentation but can never be configured
//! with a custom resolver: a DNS-over-TCP/UDP/TLS resolver reaching its
//! server through itself would recurse forever. It accepts IP literals
//! directly and resolves anything else with the system resolver.

use crate::base::callcontext::CallContext;
use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::dns::address::split_host_port;
use crate::dns::Resolver;
use crate::handlers::{Handler, Measurement, MeasurementRoot};
use crate::socket::config::DialerConfig;
use crate::socket::tls::TlsConfig;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpStream, UdpSocket};
use tokio_boring::SslStream;

#[derive(Clone)]
pub struct Dialer {
    config: DialerConfig,
    root: MeasurementRoot,
    resolver: Option<Arc<dyn Resolver>>,
}

impl Dialer {
    /// Create a dialer that resolves through the system resolver.
    pub fn new(beginning: Instant, handler: Option<Arc<dyn Handler>>) -> Self {
        Self {
            config: DialerConfig::default(),
            root: MeasurementRoot::new(beginning, handler),
            resolver: None,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: DialerConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve hostnames through `resolver` instead of the system resolver.
    pub fn set_resolver(&mut self, resolver: Arc<dyn Resolver>) {
        self.resolver = Some(resolver);
    }

    pub fn config(&self) -> &DialerConfig {
        &self.config
    }

    /// Open a TCP connection to `address` (`host:port`).
    pub async fn dial_tcp(&self, ctx: &CallContext, address: &str) -> Result<TcpStream, NetError> {
        let (host, port) = parse_endpoint(address)?;
        let endpoints = self.resolve(ctx, host, port).await?;
        let root = self.root_for(ctx);

        let mut last_err = NetError::NameNotResolved;
        for endpoint in endpoints {
            let attempt = ctx.run(async {
                match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(endpoint))
                    .await
                {
                    Ok(result) => result.endpoint_context(endpoint),
                    Err(_) => Err(NetError::ConnectionTimedOut),
                }
            });
            let result = attempt.await;
            root.emit(Measurement::Connect {
                network: "tcp",
                remote_address: endpoint.to_string(),
                elapsed: root.elapsed(),
                failure: result.as_ref().err().map(|e| e.failure().to_string()),
            });
            match result {
                Ok(stream) => {
                    tracing::debug!(%address, %endpoint, "tcp connected");
                    return Ok(stream);
                }
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    tracing::debug!(%address, %endpoint, error = %e, "tcp connect failed");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    /// Open a connected UDP socket to `address` (`host:port`).
    pub async fn dial_udp(&self, ctx: &CallContext, address: &str) -> Result<UdpSocket, NetError> {
        let (host, port) = parse_endpoint(address)?;
        let endpoint = self.resolve(ctx, host, port).await?.into_iter().next().ok_or_else(|| {
            NetError::NameNotResolvedFor {
                domain: host.to_string(),
                source: Arc::new(std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses")),
            }
        })?;
        let root = self.root_for(ctx);

        let local: SocketAddr = if endpoint.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let result = ctx
            .run(async {
                let socket = UdpSocket::bind(local).await.endpoint_context(endpoint)?;
                socket.connect(endpoint).await.endpoint_context(endpoint)?;
                Ok(socket)
            })
            .await;
        root.emit(Measurement::Connect {
            network: "udp",
            remote_address: endpoint.to_string(),
            elapsed: root.elapsed(),
            failure: result.as_ref().err().map(|e| e.failure().to_string()),
        });
        result
    }

    /// Open a TCP connection to `address` and run a TLS handshake with
    /// `server_name` as the server identity.
    pub async fn dial_tls(
        &self,
        ctx: &CallContext,
        address: &str,
        server_name: &str,
        tls: &TlsConfig,
    ) -> Result<SslStream<TcpStream>, NetError> {
        let stream = self.dial_tcp(ctx, address).await?;
        let root = self.root_for(ctx);
        let config = tls.configure(server_name)?;

        let result = ctx
            .run(async {
                match tokio::time::timeout(
                    self.config.tls_handshake_timeout,
                    tokio_boring::connect(config, server_name, stream),
                )
                .await
                {
                    Ok(Ok(stream)) => Ok(stream),
                    Ok(Err(e)) => Err(NetError::TlsHandshakeFailed {
                        server_name: server_name.to_string(),
                        reason: format!("{:?}", e),
                    }),
                    Err(_) => Err(NetError::ConnectionTimedOut),
                }
            })
            .await;
        root.emit(Measurement::TlsHandshakeDone {
            server_name: server_name.to_string(),
            elapsed: root.elapsed(),
            failure: result.as_ref().err().map(|e| e.failure().to_string()),
        });
        result
    }

    fn root_for<'a>(&'a self, ctx: &'a CallContext) -> &'a MeasurementRoot {
        ctx.measurement_root().unwrap_or(&self.root)
    }

    async fn resolve(
        &self,
        ctx: &CallContext,
        host: &str,
        port: u16,
    ) -> Result<Vec<SocketAddr>, NetError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }
        let ips = match &self.resolver {
            Some(resolver) => resolver.lookup_host(ctx, host).await?,
            None => {
                let target = format!("{host}:{port}");
                let addrs = ctx
                    .run(async { tokio::net::lookup_host(target).await.dns_context(host) })
                    .await?;
                return Ok(addrs.collect());
            }
        };
        Ok(ips.into_iter().map(|ip| SocketAddr::new(ip, port)).collect())
    }
}

impl fmt::Debug for Dialer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialer")
            .field("config", &self.config)
            .field("root", &self.root)
            .field("custom_resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Dialer used only to reach DNS servers.
///
/// Built from the same start time, handler and configuration as the
/// general-purpose dialer, but there is no way to attach a resolver to it.
#[derive(Clone, Debug)]
pub struct ChildDialer {
    inner: Dialer,
}

impl ChildDialer {
    pub fn new(beginning: Instant, handler: Option<Arc<dyn Handler>>, config: DialerConfig) -> Self {
        Self { inner: Dialer::new(beginning, handler).with_config(config) }
    }

    pub fn config(&self) -> &DialerConfig {
        self.inner.config()
    }

    pub async fn dial_tcp(&self, ctx: &CallContext, address: &str) -> Result<TcpStream, NetError> {
        self.inner.dial_tcp(ctx, address).await
    }

    pub async fn dial_udp(&self, ctx: &CallContext, address: &str) -> Result<UdpSocket, NetError> {
        self.inner.dial_udp(ctx, address).await
    }

    pub async fn dial_tls(
        &self,
        ctx: &CallContext,
        address: &str,
        server_name: &str,
        tls: &TlsConfig,
    ) -> Result<SslStream<TcpStream>, NetError> {
        self.inner.dial_tls(ctx, address, server_name, tls).await
    }
}

fn parse_endpoint(address: &str) -> Result<(&str, u16), NetError> {
    let invalid = |reason: &'static str| NetError::InvalidAddress {
        address: address.to_string(),
        reason,
    };
    let (host, port) = split_host_port(address).map_err(|_| invalid("expected host:port"))?;
    let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
    Ok((host, port))
}
