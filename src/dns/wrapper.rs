use super::resolve::{Lookup, MxRecord, NsRecord, Resolver};
use crate::base::callcontext::CallContext;
use crate::handlers::{Handler, Measurement, MeasurementRoot};
use std::borrow::Cow;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

/// Attaches a measurement root to every call before delegating.
///
/// Results pass through untouched. A context that already carries a root
/// keeps it, so nesting wrappers (or wrapping a chain) reports everything
/// to the outermost caller's handler.
pub struct InstrumentedResolver<R> {
    root: MeasurementRoot,
    inner: R,
}

impl<R: Resolver> InstrumentedResolver<R> {
    pub fn new(beginning: Instant, handler: Option<Arc<dyn Handler>>, inner: R) -> Self {
        Self { root: MeasurementRoot::new(beginning, handler), inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn context<'c>(&self, ctx: &'c CallContext) -> Cow<'c, CallContext> {
        if ctx.measurement_root().is_some() || !self.root.is_instrumented() {
            Cow::Borrowed(ctx)
        } else {
            Cow::Owned(ctx.with_measurement_root(self.root.clone()))
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for InstrumentedResolver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedResolver")
            .field("root", &self.root)
            .field("inner", &self.inner)
            .finish()
    }
}

impl<R: Resolver> Resolver for InstrumentedResolver<R> {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a CallContext,
        hostname: &'a str,
    ) -> Lookup<'a, Vec<IpAddr>> {
        Box::pin(async move {
            let ctx = self.context(ctx);
            let root = ctx.measurement_root();
            if let Some(root) = root {
                root.emit(Measurement::ResolveStart {
                    hostname: hostname.to_string(),
                    elapsed: root.elapsed(),
                });
            }
            let result = self.inner.lookup_host(&ctx, hostname).await;
            if let Some(root) = root {
                root.emit(Measurement::ResolveDone {
                    hostname: hostname.to_string(),
                    addresses: result
                        .as_ref()
                        .map(|ips| ips.iter().map(ToString::to_string).collect())
                        .unwrap_or_default(),
                    elapsed: root.elapsed(),
                    failure: result.as_ref().err().map(|e| e.failure().to_string()),
                });
            }
            result
        })
    }

    fn lookup_addr<'a>(&'a self, ctx: &'a CallContext, addr: IpAddr) -> Lookup<'a, Vec<String>> {
        Box::pin(async move {
            let ctx = self.context(ctx);
            self.inner.lookup_addr(&ctx, addr).await
        })
    }

    fn lookup_cname<'a>(&'a self, ctx: &'a CallContext, host: &'a str) -> Lookup<'a, String> {
        Box::pin(async move {
            let ctx = self.context(ctx);
            self.inner.lookup_cname(&ctx, host).await
        })
    }

    fn lookup_mx<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<MxRecord>> {
        Box::pin(async move {
            let ctx = self.context(ctx);
            self.inner.lookup_mx(&ctx, name).await
        })
    }

    fn lookup_ns<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<NsRecord>> {
        Box::pin(async move {
            let ctx = self.context(ctx);
            self.inner.lookup_ns(&ctx, name).await
        })
    }
}
