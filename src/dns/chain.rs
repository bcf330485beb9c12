use super::resolve::{Lookup, MxRecord, NsRecord, Resolver};
use crate::base::callcontext::CallContext;
use crate::base::neterror::NetError;
use std::net::IpAddr;
use std::sync::Arc;

/// Falls back to a secondary resolver when the primary fails.
///
/// The secondary is started only after the primary has returned an error,
/// with the same arguments and the same call context. Its outcome is the
/// outcome of the call. A cancelled context is not a primary failure: the
/// cancellation is returned without trying the secondary.
#[derive(Clone)]
pub struct ChainResolver {
    primary: Arc<dyn Resolver>,
    secondary: Arc<dyn Resolver>,
}

impl ChainResolver {
    pub fn new(primary: Arc<dyn Resolver>, secondary: Arc<dyn Resolver>) -> Self {
        Self { primary, secondary }
    }

    pub fn primary(&self) -> &Arc<dyn Resolver> {
        &self.primary
    }

    pub fn secondary(&self) -> &Arc<dyn Resolver> {
        &self.secondary
    }
}

impl std::fmt::Debug for ChainResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainResolver").finish_non_exhaustive()
    }
}

impl Resolver for ChainResolver {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a CallContext,
        hostname: &'a str,
    ) -> Lookup<'a, Vec<IpAddr>> {
        Box::pin(async move {
            match self.primary.lookup_host(ctx, hostname).await {
                Ok(addrs) => Ok(addrs),
                Err(e) if e.is_cancellation() => Err(e),
                Err(e) => {
                    suppressed("lookup_host", &e);
                    self.secondary.lookup_host(ctx, hostname).await
                }
            }
        })
    }

    fn lookup_addr<'a>(&'a self, ctx: &'a CallContext, addr: IpAddr) -> Lookup<'a, Vec<String>> {
        Box::pin(async move {
            match self.primary.lookup_addr(ctx, addr).await {
                Ok(names) => Ok(names),
                Err(e) if e.is_cancellation() => Err(e),
                Err(e) => {
                    suppressed("lookup_addr", &e);
                    self.secondary.lookup_addr(ctx, addr).await
                }
            }
        })
    }

    fn lookup_cname<'a>(&'a self, ctx: &'a CallContext, host: &'a str) -> Lookup<'a, String> {
        Box::pin(async move {
            match self.primary.lookup_cname(ctx, host).await {
                Ok(cname) => Ok(cname),
                Err(e) if e.is_cancellation() => Err(e),
                Err(e) => {
                    suppressed("lookup_cname", &e);
                    self.secondary.lookup_cname(ctx, host).await
                }
            }
        })
    }

    fn lookup_mx<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<MxRecord>> {
        Box::pin(async move {
            match self.primary.lookup_mx(ctx, name).await {
                Ok(records) => Ok(records),
                Err(e) if e.is_cancellation() => Err(e),
                Err(e) => {
                    suppressed("lookup_mx", &e);
                    self.secondary.lookup_mx(ctx, name).await
                }
            }
        })
    }

    fn lookup_ns<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<NsRecord>> {
        Box::pin(async move {
            match self.primary.lookup_ns(ctx, name).await {
                Ok(records) => Ok(records),
                Err(e) if e.is_cancellation() => Err(e),
                Err(e) => {
                    suppressed("lookup_ns", &e);
                    self.secondary.lookup_ns(ctx, name).await
                }
            }
        })
    }
}

/// The primary's error is dropped here and nowhere else in the crate.
fn suppressed(operation: &'static str, error: &NetError) {
    tracing::debug!(operation, %error, "primary resolver failed, trying secondary");
}
