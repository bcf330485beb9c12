//! Tests against public resolvers. Ignored by default:
//!
//! ```text
//! cargo test --test network_test -- --ignored
//! ```

use probenet::base::callcontext::CallContext;
use probenet::dns::{chain_resolvers, ResolverFactory};
use probenet::handlers::SavingHandler;
use probenet::locate::LocateClient;
use probenet::socket::Dialer;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn google_dns() -> IpAddr {
    "8.8.8.8".parse().unwrap()
}

#[tokio::test]
#[ignore = "requires network"]
async fn test_udp_google() {
    let resolver = ResolverFactory::new().build("udp", "8.8.8.8").unwrap();
    let addrs = resolver.lookup_host(&CallContext::new(), "dns.google.com").await.unwrap();
    assert!(addrs.contains(&google_dns()));
}

#[tokio::test]
#[ignore = "requires network"]
async fn test_tcp_google() {
    let resolver = ResolverFactory::new().build("tcp", "8.8.8.8:53").unwrap();
    let addrs = resolver.lookup_host(&CallContext::new(), "dns.google.com").await.unwrap();
    assert!(addrs.contains(&google_dns()));
}

#[tokio::test]
#[ignore = "requires network"]
async fn test_dot_quad9() {
    let saver = Arc::new(SavingHandler::new());
    let resolver = ResolverFactory::new().handler(saver.clone()).build("dot", "9.9.9.9").unwrap();
    let addrs = resolver.lookup_host(&CallContext::new(), "dns.google.com").await.unwrap();
    assert!(addrs.contains(&google_dns()));
    assert!(saver.connect_targets().iter().all(|target| target == "9.9.9.9:853"));
}

#[tokio::test]
#[ignore = "requires network"]
async fn test_doh_cloudflare() {
    let resolver =
        ResolverFactory::new().build("doh", "https://cloudflare-dns.com/dns-query").unwrap();
    let ctx = CallContext::new().with_timeout(Duration::from_secs(30));
    let addrs = resolver.lookup_host(&ctx, "dns.google.com").await.unwrap();
    assert!(addrs.contains(&google_dns()));
    assert!(!resolver.lookup_mx(&ctx, "gmail.com").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires network"]
async fn test_system_reverse_lookup() {
    let resolver = ResolverFactory::new().build("system", "").unwrap();
    let names = resolver.lookup_addr(&CallContext::new(), google_dns()).await.unwrap();
    assert!(names.iter().any(|name| name == "dns.google."));
}

#[tokio::test]
#[ignore = "requires network"]
async fn test_dialer_with_chain() {
    let factory = ResolverFactory::new();
    // Port 1 on loopback refuses, so the primary fails fast.
    let primary = factory.build("tcp", "127.0.0.1:1").unwrap();
    let chain = chain_resolvers(primary, factory.build("system", "").unwrap());

    let mut dialer = Dialer::new(Instant::now(), None);
    dialer.set_resolver(chain);
    let ctx = CallContext::new().with_timeout(Duration::from_secs(20));
    let stream = dialer.dial_tcp(&ctx, "www.google.com:80").await.unwrap();
    assert_eq!(stream.peer_addr().unwrap().port(), 80);
}

#[tokio::test]
#[ignore = "requires network"]
async fn test_locate_ndt7() {
    let locate = LocateClient::new(probenet::http::shared_doh_client(), "probenet/0.1");
    let fqdn = locate.query(&CallContext::new(), "ndt7").await.unwrap();
    assert!(fqdn.contains("measurement-lab.org"));
}
