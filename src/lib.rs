//! # probenet
//!
//! Resolver and dialer plumbing for network interference measurements.
//!
//! `probenet` resolves names through a selectable transport (the system
//! resolver, plain DNS over UDP or TCP, DNS over TLS or DNS over HTTPS),
//! reports every connect, handshake and DNS round trip to an optional
//! measurement handler, and keeps working when one resolver is blocked by
//! falling back to another.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use probenet::base::callcontext::CallContext;
//! use probenet::dns::ResolverFactory;
//! use probenet::handlers::SavingHandler;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let saver = Arc::new(SavingHandler::new());
//!     let resolver = ResolverFactory::new()
//!         .handler(saver.clone())
//!         .build("dot", "9.9.9.9")
//!         .unwrap();
//!     let addrs = resolver.lookup_host(&CallContext::new(), "example.com").await.unwrap();
//!     println!("{addrs:?} after {} events", saver.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Errors, error context helpers and the per-call context
//! - [`dns`] - Resolver backends, instrumentation wrapper, chaining and factory
//! - [`handlers`] - Measurement events and the handlers that observe them
//! - [`http`] - HTTP/1.1 client used for DoH and service discovery
//! - [`locate`] - `locate.measurementlab.net` client
//! - [`socket`] - Instrumented dialers and TLS configuration

pub mod base;
pub mod dns;
pub mod handlers;
pub mod http;
pub mod locate;
pub mod socket;

pub use base::callcontext::CallContext;
pub use base::neterror::NetError;
pub use dns::{chain_resolvers, new_resolver, Resolver, ResolverFactory};
