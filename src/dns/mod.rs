//! DNS resolution.
//!
//! Five backends share the [`Resolver`] capability:
//! - [`SystemResolver`]: getaddrinfo plus the system-configured stub resolver
//! - [`UdpResolver`]: DNS over UDP
//! - [`StreamResolver`]: DNS over TCP, or over TLS (DoT)
//! - [`HttpsResolver`]: DNS over HTTPS (DoH)
//!
//! [`InstrumentedResolver`] reports lookups to a measurement handler and
//! [`ChainResolver`] falls back from one resolver to another. Most callers
//! only need [`ResolverFactory`]:
//!
//! ```rust,ignore
//! use probenet::base::callcontext::CallContext;
//! use probenet::dns::{chain_resolvers, ResolverFactory};
//!
//! let factory = ResolverFactory::new();
//! let resolver = chain_resolvers(factory.build("dot", "9.9.9.9")?, factory.build("system", "")?);
//! let addrs = resolver.lookup_host(&CallContext::new(), "example.com").await?;
//! ```

pub mod address;
mod chain;
mod doh;
mod factory;
mod resolve;
mod system;
mod tcp;
mod udp;
pub mod wire;
mod wrapper;

pub use address::with_port;
pub use chain::ChainResolver;
pub use doh::{HttpsResolver, HttpsTransport};
pub use factory::{
    chain_resolvers, new_resolver, new_resolver_with_handler, ResolverFactory, ResolverSettings,
    Transport,
};
pub use resolve::{Lookup, MxRecord, NsRecord, Resolver};
pub use system::SystemResolver;
pub use tcp::{StreamResolver, StreamTransport};
pub use udp::{UdpResolver, UdpTransport};
pub use wire::{WireResolver, WireTransport};
pub use wrapper::InstrumentedResolver;

// Every backend, the wrapper and the chain must provide the full capability.
const _: () = {
    const fn assert_resolver<R: Resolver>() {}
    assert_resolver::<SystemResolver>();
    assert_resolver::<UdpResolver>();
    assert_resolver::<StreamResolver>();
    assert_resolver::<HttpsResolver>();
    assert_resolver::<ChainResolver>();
    assert_resolver::<InstrumentedResolver<SystemResolver>>();
    assert_resolver::<InstrumentedResolver<ChainResolver>>();
};
