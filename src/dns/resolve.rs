//! Core DNS resolution types and traits.
//!
//! This module defines the [`Resolver`] trait and the record types it
//! returns. Every backend, wrapper and composite in this crate implements
//! the full trait so callers can treat all resolvers interchangeably.

use crate::base::callcontext::CallContext;
use crate::base::neterror::NetError;
use std::{fmt, future::Future, net::IpAddr, pin::Pin, sync::Arc};

/// Alias for the `Future` type returned by every lookup.
pub type Lookup<'a, T> = Pin<Box<dyn Future<Output = Result<T, NetError>> + Send + 'a>>;

/// A mail exchanger record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MxRecord {
    /// Exchange host, fully qualified with a trailing dot.
    pub host: String,
    pub preference: u16,
}

/// A name server record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NsRecord {
    /// Server host, fully qualified with a trailing dot.
    pub host: String,
}

impl fmt::Display for MxRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.preference, self.host)
    }
}

impl fmt::Display for NsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

/// Name resolution capability.
///
/// Implementations must be thread-safe and hold no per-call mutable state.
/// Every method honours the call context: when it is cancelled or its
/// deadline passes, the in-flight operation is dropped and a cancellation
/// error is returned. A call either succeeds with a complete result or
/// fails with no result.
pub trait Resolver: Send + Sync {
    /// Resolves a hostname to its IPv4 and IPv6 addresses.
    fn lookup_host<'a>(&'a self, ctx: &'a CallContext, hostname: &'a str)
        -> Lookup<'a, Vec<IpAddr>>;

    /// Returns the names pointing at `addr` (PTR records).
    fn lookup_addr<'a>(&'a self, ctx: &'a CallContext, addr: IpAddr) -> Lookup<'a, Vec<String>>;

    /// Returns the canonical name of `host`.
    fn lookup_cname<'a>(&'a self, ctx: &'a CallContext, host: &'a str) -> Lookup<'a, String>;

    /// Returns the MX records of `name`, sorted by preference.
    fn lookup_mx<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<MxRecord>>;

    /// Returns the NS records of `name`.
    fn lookup_ns<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<NsRecord>>;
}

/// Blanket implementation for Arc-wrapped resolvers.
impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a CallContext,
        hostname: &'a str,
    ) -> Lookup<'a, Vec<IpAddr>> {
        (**self).lookup_host(ctx, hostname)
    }

    fn lookup_addr<'a>(&'a self, ctx: &'a CallContext, addr: IpAddr) -> Lookup<'a, Vec<String>> {
        (**self).lookup_addr(ctx, addr)
    }

    fn lookup_cname<'a>(&'a self, ctx: &'a CallContext, host: &'a str) -> Lookup<'a, String> {
        (**self).lookup_cname(ctx, host)
    }

    fn lookup_mx<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<MxRecord>> {
        (**self).lookup_mx(ctx, name)
    }

    fn lookup_ns<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<NsRecord>> {
        (**self).lookup_ns(ctx, name)
    }
}

/// Blanket implementation for boxed resolvers.
impl<R: Resolver + ?Sized> Resolver for Box<R> {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a CallContext,
        hostname: &'a str,
    ) -> Lookup<'a, Vec<IpAddr>> {
        (**self).lookup_host(ctx, hostname)
    }

    fn lookup_addr<'a>(&'a self, ctx: &'a CallContext, addr: IpAddr) -> Lookup<'a, Vec<String>> {
        (**self).lookup_addr(ctx, addr)
    }

    fn lookup_cname<'a>(&'a self, ctx: &'a CallContext, host: &'a str) -> Lookup<'a, String> {
        (**self).lookup_cname(ctx, host)
    }

    fn lookup_mx<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<MxRecord>> {
        (**self).lookup_mx(ctx, name)
    }

    fn lookup_ns<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<NsRecord>> {
        (**self).lookup_ns(ctx, name)
    }
}
