//! Resolver backed by the operating system's configuration.
//!
//! Host lookups go through `getaddrinfo`, executed on the blocking thread
//! pool so they honour `/etc/hosts`, nsswitch and friends. Record lookups
//! the C library cannot answer (PTR, CNAME, MX, NS) use a process-wide
//! hickory resolver configured from the system's `resolv.conf`.

use super::resolve::{Lookup, MxRecord, NsRecord, Resolver};
use super::wire::{self, canonical_name, reverse_name, to_fqdn};
use crate::base::callcontext::CallContext;
use crate::base::neterror::NetError;
use hickory_resolver::proto::rr::{Record, RecordType};
use hickory_resolver::{
    config::ResolverConfig, name_server::TokioConnectionProvider, ResolveError, TokioResolver,
};
use std::io;
use std::net::{IpAddr, ToSocketAddrs};
use std::sync::{Arc, LazyLock};

static RESOLVER: LazyLock<TokioResolver> = LazyLock::new(|| {
    let builder = match TokioResolver::builder_tokio() {
        Ok(builder) => {
            tracing::debug!("using system DNS configuration");
            builder
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read system DNS config, using defaults");
            TokioResolver::builder_with_config(
                ResolverConfig::default(),
                TokioConnectionProvider::default(),
            )
        }
    };
    builder.build()
});

/// The platform resolver.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }

    /// Network name reported by this backend.
    pub fn network(&self) -> &'static str {
        "system"
    }

    async fn records(
        &self,
        ctx: &CallContext,
        name: &str,
        rtype: RecordType,
    ) -> Result<Vec<Record>, NetError> {
        tracing::debug!(%name, %rtype, "resolving via system configuration");
        let lookup = ctx
            .race(RESOLVER.lookup(name, rtype))
            .await?
            .map_err(|e| map_resolve_error(name, rtype, e))?;
        Ok(lookup.record_iter().cloned().collect())
    }
}

impl Resolver for SystemResolver {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a CallContext,
        hostname: &'a str,
    ) -> Lookup<'a, Vec<IpAddr>> {
        Box::pin(async move {
            let host = hostname.to_string();
            let task = tokio::task::spawn_blocking(move || {
                tracing::debug!(%host, "resolving via getaddrinfo");
                (host.as_str(), 0u16).to_socket_addrs().map(|iter| iter.collect::<Vec<_>>())
            });

            let addrs = ctx
                .race(task)
                .await?
                .map_err(|e| {
                    tracing::error!(error = %e, "DNS resolution task failed");
                    NetError::NameNotResolved
                })?
                .map_err(|e| {
                    tracing::debug!(domain = %hostname, error = %e, "DNS resolution failed");
                    NetError::NameNotResolvedFor { domain: hostname.to_string(), source: Arc::new(e) }
                })?;

            if addrs.is_empty() {
                return Err(NetError::NameNotResolvedFor {
                    domain: hostname.to_string(),
                    source: Arc::new(io::Error::new(
                        io::ErrorKind::NotFound,
                        "no addresses returned by getaddrinfo",
                    )),
                });
            }

            let mut ips: Vec<IpAddr> = Vec::with_capacity(addrs.len());
            for addr in addrs {
                if !ips.contains(&addr.ip()) {
                    ips.push(addr.ip());
                }
            }
            tracing::debug!(domain = %hostname, count = ips.len(), "DNS resolution complete");
            Ok(ips)
        })
    }

    fn lookup_addr<'a>(&'a self, ctx: &'a CallContext, addr: IpAddr) -> Lookup<'a, Vec<String>> {
        Box::pin(async move {
            let name = reverse_name(addr);
            let records = self.records(ctx, &name, RecordType::PTR).await?;
            let names = wire::ptr_names(&records);
            if names.is_empty() {
                return Err(NetError::NoAnswer { domain: name, rtype: "PTR".into() });
            }
            Ok(names)
        })
    }

    fn lookup_cname<'a>(&'a self, ctx: &'a CallContext, host: &'a str) -> Lookup<'a, String> {
        Box::pin(async move {
            let qname = to_fqdn(host)?;
            let records = self.records(ctx, host, RecordType::A).await?;
            Ok(canonical_name(&records, &qname).unwrap_or_else(|| qname.to_string()))
        })
    }

    fn lookup_mx<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<MxRecord>> {
        Box::pin(async move {
            let records = self.records(ctx, name, RecordType::MX).await?;
            Ok(wire::mx_records(&records))
        })
    }

    fn lookup_ns<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<NsRecord>> {
        Box::pin(async move {
            let records = self.records(ctx, name, RecordType::NS).await?;
            Ok(wire::ns_records(&records))
        })
    }
}

fn map_resolve_error(name: &str, rtype: RecordType, e: ResolveError) -> NetError {
    tracing::debug!(%name, %rtype, error = %e, "system lookup failed");
    if e.is_nx_domain() {
        NetError::NxDomain { domain: name.to_string() }
    } else if e.is_no_records_found() {
        NetError::NoAnswer { domain: name.to_string(), rtype: rtype.to_string() }
    } else {
        NetError::NameNotResolvedFor {
            domain: name.to_string(),
            source: Arc::new(io::Error::other(e.to_string())),
        }
    }
}
