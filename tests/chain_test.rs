//! Chained resolver tests.
//!
//! The primary is a resolver that always fails and counts its failures; the
//! secondary is a real UDP resolver talking to a loopback server.

mod common;

use probenet::base::callcontext::CallContext;
use probenet::base::neterror::NetError;
use probenet::dns::{chain_resolvers, Lookup, MxRecord, NsRecord, Resolver, ResolverFactory};
use probenet::handlers::SavingHandler;
use probenet::socket::Dialer;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

#[derive(Default)]
struct BrokenResolver {
    num_errors: AtomicUsize,
}

impl BrokenResolver {
    fn fail<'a, T: Send + 'a>(&'a self) -> Lookup<'a, T> {
        self.num_errors.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(NetError::NameNotResolved) })
    }

    fn errors(&self) -> usize {
        self.num_errors.load(Ordering::SeqCst)
    }
}

impl Resolver for BrokenResolver {
    fn lookup_host<'a>(&'a self, _: &'a CallContext, _: &'a str) -> Lookup<'a, Vec<IpAddr>> {
        self.fail()
    }

    fn lookup_addr<'a>(&'a self, _: &'a CallContext, _: IpAddr) -> Lookup<'a, Vec<String>> {
        self.fail()
    }

    fn lookup_cname<'a>(&'a self, _: &'a CallContext, _: &'a str) -> Lookup<'a, String> {
        self.fail()
    }

    fn lookup_mx<'a>(&'a self, _: &'a CallContext, _: &'a str) -> Lookup<'a, Vec<MxRecord>> {
        self.fail()
    }

    fn lookup_ns<'a>(&'a self, _: &'a CallContext, _: &'a str) -> Lookup<'a, Vec<NsRecord>> {
        self.fail()
    }
}

#[tokio::test]
async fn test_chain_falls_back_to_secondary() {
    let server = common::udp_server().await;
    let broken = Arc::new(BrokenResolver::default());
    let secondary = ResolverFactory::new().build("udp", &server.to_string()).unwrap();
    let chain = chain_resolvers(broken.clone(), secondary);
    let ctx = CallContext::new();

    let addrs = chain.lookup_host(&ctx, "dns.google").await.unwrap();
    assert!(addrs.contains(&"8.8.8.8".parse().unwrap()));
    assert_eq!(broken.errors(), 1);

    assert_eq!(chain.lookup_cname(&ctx, "www.ooni.org").await.unwrap(), "ooni.netlify.app.");
    assert_eq!(chain.lookup_mx(&ctx, "ooni.org").await.unwrap().len(), 2);
    assert_eq!(chain.lookup_ns(&ctx, "ooni.org").await.unwrap().len(), 2);
    assert_eq!(
        chain.lookup_addr(&ctx, "8.8.8.8".parse().unwrap()).await.unwrap(),
        vec!["dns.google.".to_string()]
    );
    assert_eq!(broken.errors(), 5);
}

#[tokio::test]
async fn test_chain_with_working_primary() {
    let server = common::udp_server().await;
    let primary = ResolverFactory::new().build("udp", &server.to_string()).unwrap();
    let broken = Arc::new(BrokenResolver::default());
    let chain = chain_resolvers(primary, broken.clone());

    chain.lookup_host(&CallContext::new(), "dns.google").await.unwrap();
    assert_eq!(broken.errors(), 0);
}

#[tokio::test]
async fn test_chain_both_failing() {
    let first = Arc::new(BrokenResolver::default());
    let second = Arc::new(BrokenResolver::default());
    let chain = chain_resolvers(first.clone(), second.clone());

    let err = chain.lookup_host(&CallContext::new(), "dns.google").await.unwrap_err();
    assert!(matches!(err, NetError::NameNotResolved));
    assert_eq!((first.errors(), second.errors()), (1, 1));
}

#[tokio::test]
async fn test_cancelled_primary_skips_secondary() {
    let server = common::udp_server().await;
    let primary = ResolverFactory::new().build("udp", &server.to_string()).unwrap();
    let secondary = Arc::new(BrokenResolver::default());
    let chain = chain_resolvers(primary, secondary.clone());

    let ctx = CallContext::new();
    ctx.cancel();
    let err = chain.lookup_host(&ctx, "dns.google").await.unwrap_err();
    assert!(err.is_cancellation(), "{err:?}");
    assert_eq!(err.failure(), "interrupted");
    assert_eq!(secondary.errors(), 0);
}

#[tokio::test]
async fn test_expired_primary_skips_secondary() {
    let server = common::silent_udp_server().await;
    let primary = ResolverFactory::new().build("udp", &server.to_string()).unwrap();
    let secondary = Arc::new(BrokenResolver::default());
    let chain = chain_resolvers(primary, secondary.clone());

    let ctx = CallContext::new().with_timeout(Duration::from_millis(100));
    let err = chain.lookup_mx(&ctx, "ooni.org").await.unwrap_err();
    assert!(err.is_cancellation(), "{err:?}");
    assert_eq!(secondary.errors(), 0);
}

#[tokio::test]
async fn test_chains_nest() {
    let server = common::udp_server().await;
    let a = Arc::new(BrokenResolver::default());
    let b = Arc::new(BrokenResolver::default());
    let working = ResolverFactory::new().build("udp", &server.to_string()).unwrap();
    let chain = chain_resolvers(a.clone(), chain_resolvers(b.clone(), working));

    chain.lookup_mx(&CallContext::new(), "ooni.org").await.unwrap();
    assert_eq!((a.errors(), b.errors()), (1, 1));
}

#[tokio::test]
async fn test_dialer_resolves_through_chain() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let _ = listener.accept().await;
    });

    let server = common::udp_server().await;
    let broken = Arc::new(BrokenResolver::default());
    let saver = Arc::new(SavingHandler::new());
    let factory = ResolverFactory::new().handler(saver.clone());
    let chain = chain_resolvers(broken.clone(), factory.build("udp", &server.to_string()).unwrap());

    let mut dialer = Dialer::new(Instant::now(), Some(saver.clone()));
    dialer.set_resolver(chain);
    let stream = dialer.dial_tcp(&CallContext::new(), &format!("probe.test:{port}")).await.unwrap();

    assert_eq!(stream.peer_addr().unwrap().port(), port);
    assert_eq!(broken.errors(), 1);
    assert!(saver.connect_targets().contains(&format!("127.0.0.1:{port}")));
}
