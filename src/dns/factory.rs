//! Building resolvers from a transport name and a server address.
//!
//! | transport          | address                       | default port |
//! |--------------------|-------------------------------|--------------|
//! | `""` or `system`   | ignored                       |              |
//! | `udp`              | `host` or `host:port`         | 53           |
//! | `tcp`              | `host` or `host:port`         | 53           |
//! | `dot`              | `host` or `host:port`         | 853          |
//! | `doh`              | full `https://` URL           |              |
//!
//! Every resolver comes back wrapped in an [`InstrumentedResolver`] so its
//! events reach the factory's handler.

use super::address::with_port;
use super::chain::ChainResolver;
use super::doh::HttpsTransport;
use super::resolve::Resolver;
use super::system::SystemResolver;
use super::tcp::StreamTransport;
use super::udp::UdpTransport;
use super::wire::WireResolver;
use super::wrapper::InstrumentedResolver;
use crate::base::neterror::NetError;
use crate::handlers::Handler;
use crate::http::new_http_client_for_doh;
use crate::socket::config::DialerConfig;
use crate::socket::dialer::ChildDialer;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// A resolver backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    System,
    Udp,
    Tcp,
    Dot,
    Doh,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::System => "system",
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
            Transport::Dot => "dot",
            Transport::Doh => "doh",
        }
    }

    /// Port appended to addresses given without one.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Transport::Udp | Transport::Tcp => Some(53),
            Transport::Dot => Some(853),
            Transport::System | Transport::Doh => None,
        }
    }
}

impl FromStr for Transport {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "system" => Ok(Transport::System),
            "udp" => Ok(Transport::Udp),
            "tcp" => Ok(Transport::Tcp),
            "dot" => Ok(Transport::Dot),
            "doh" => Ok(Transport::Doh),
            other => Err(NetError::UnsupportedTransport(other.to_string())),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds resolvers that share one start time, handler and dialer config.
#[derive(Clone)]
pub struct ResolverFactory {
    beginning: Instant,
    handler: Option<Arc<dyn Handler>>,
    dialer: DialerConfig,
}

impl Default for ResolverFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverFactory {
    /// Factory starting now, without instrumentation.
    pub fn new() -> Self {
        Self { beginning: Instant::now(), handler: None, dialer: DialerConfig::default() }
    }

    /// Set the time measurement events are relative to.
    pub fn beginning(mut self, beginning: Instant) -> Self {
        self.beginning = beginning;
        self
    }

    /// Report events to `handler`.
    pub fn handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Set the dialer configuration used by udp, tcp and dot resolvers, and
    /// by doh resolvers built with a handler.
    ///
    /// A doh resolver built without a handler (or with a no-op one) always
    /// uses the process-wide shared client, whose dialer keeps the default
    /// configuration. `config` does not apply to it.
    pub fn dialer_config(mut self, config: DialerConfig) -> Self {
        self.dialer = config;
        self
    }

    fn child_dialer(&self) -> ChildDialer {
        ChildDialer::new(self.beginning, self.handler.clone(), self.dialer.clone())
    }

    fn wrap<R: Resolver + 'static>(&self, inner: R) -> Arc<dyn Resolver> {
        Arc::new(InstrumentedResolver::new(self.beginning, self.handler.clone(), inner))
    }

    /// Build a resolver for `transport` (see the module table) and `address`.
    pub fn build(&self, transport: &str, address: &str) -> Result<Arc<dyn Resolver>, NetError> {
        let transport = transport.parse::<Transport>().inspect_err(|e| {
            tracing::debug!(%transport, error = %e, "unsupported resolver transport");
        })?;
        self.build_transport(transport, address)
    }

    pub fn build_transport(
        &self,
        transport: Transport,
        address: &str,
    ) -> Result<Arc<dyn Resolver>, NetError> {
        tracing::debug!(%transport, %address, "building resolver");
        let resolver = match transport {
            Transport::System => self.wrap(SystemResolver::new()),
            Transport::Doh => {
                let client =
                    new_http_client_for_doh(self.beginning, self.handler.clone(), self.dialer.clone());
                self.wrap(WireResolver::new(HttpsTransport::new(client, address)?))
            }
            Transport::Dot => {
                let endpoint = with_port(address, 853)?;
                self.wrap(WireResolver::new(StreamTransport::tls(self.child_dialer(), endpoint)?))
            }
            Transport::Tcp => {
                let endpoint = with_port(address, 53)?;
                self.wrap(WireResolver::new(StreamTransport::tcp(self.child_dialer(), endpoint)))
            }
            Transport::Udp => {
                let endpoint = with_port(address, 53)?;
                self.wrap(WireResolver::new(UdpTransport::new(self.child_dialer(), endpoint)))
            }
        };
        Ok(resolver)
    }

    /// Build the resolvers described by `settings`, chaining the fallback
    /// behind the primary when one is present.
    pub fn build_settings(&self, settings: &ResolverSettings) -> Result<Arc<dyn Resolver>, NetError> {
        let primary = self.build(&settings.transport, &settings.address)?;
        match &settings.fallback {
            Some(fallback) => Ok(chain_resolvers(primary, self.build_settings(fallback)?)),
            None => Ok(primary),
        }
    }
}

impl fmt::Debug for ResolverFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverFactory")
            .field("beginning", &self.beginning)
            .field("handler", &self.handler)
            .field("dialer", &self.dialer)
            .finish()
    }
}

/// Resolver description a host application can load from JSON.
///
/// ```json
/// {"transport": "dot", "address": "9.9.9.9",
///  "fallback": {"transport": "system"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolverSettings {
    #[serde(default)]
    pub transport: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub fallback: Option<Box<ResolverSettings>>,
}

/// Build an uninstrumented resolver for `transport` and `address` with the
/// default dialer configuration.
pub fn new_resolver(transport: &str, address: &str) -> Result<Arc<dyn Resolver>, NetError> {
    ResolverFactory::new().build(transport, address)
}

/// Like [`new_resolver`], reporting events relative to `beginning` to
/// `handler`.
pub fn new_resolver_with_handler(
    beginning: Instant,
    handler: Option<Arc<dyn Handler>>,
    transport: &str,
    address: &str,
) -> Result<Arc<dyn Resolver>, NetError> {
    let mut factory = ResolverFactory::new().beginning(beginning);
    if let Some(handler) = handler {
        factory = factory.handler(handler);
    }
    factory.build(transport, address)
}

/// Resolver trying `primary` first and `secondary` when it fails.
pub fn chain_resolvers(primary: Arc<dyn Resolver>, secondary: Arc<dyn Resolver>) -> Arc<dyn Resolver> {
    Arc::new(ChainResolver::new(primary, secondary))
}
