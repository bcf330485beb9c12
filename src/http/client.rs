//! Minimal HTTP/1.1 client used by DoH and the locate client.
//!
//! Connections are dialed through a [`ChildDialer`], so they are
//! instrumented like every other connection of the measurement and never
//! resolve through a custom resolver. With keep-alive on, idle connections
//! are parked per origin and reused; with keep-alive off every request
//! carries `Connection: close` and nothing is kept.
//!
//! The idle pool is bounded: at most [`DEFAULT_MAX_IDLE_PER_ORIGIN`]
//! connections are parked per origin, and a parked connection older than
//! [`DEFAULT_IDLE_TIMEOUT`] is closed instead of reused.

use super::response::HttpResponse;
use crate::base::callcontext::CallContext;
use crate::base::neterror::NetError;
use crate::dns::address::join_host_port;
use crate::handlers::{Handler, Measurement, MeasurementRoot};
use crate::socket::config::DialerConfig;
use crate::socket::dialer::ChildDialer;
use crate::socket::stream::SocketType;
use crate::socket::tls::TlsConfig;
use bytes::Bytes;
use dashmap::DashMap;
use http::{header, HeaderMap, HeaderValue, Method, Request};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use url::{Host, Url};

type Sender = http1::SendRequest<Full<Bytes>>;

/// Connections kept per origin once their request is done.
pub const DEFAULT_MAX_IDLE_PER_ORIGIN: usize = 2;
/// How long a parked connection stays eligible for reuse.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

struct IdleSender {
    sender: Sender,
    parked_at: Instant,
}

static SHARED_DOH_CLIENT: OnceLock<Arc<HttpClient>> = OnceLock::new();

pub struct HttpClient {
    dialer: ChildDialer,
    root: MeasurementRoot,
    tls: TlsConfig,
    keep_alive: bool,
    max_idle_per_origin: usize,
    idle_timeout: Duration,
    idle: DashMap<String, Vec<IdleSender>>,
}

impl HttpClient {
    /// Create a keep-alive client. TLS connections offer only `http/1.1`.
    pub fn new(beginning: Instant, handler: Option<Arc<dyn Handler>>, config: DialerConfig) -> Self {
        let tls = config.tls.clone().with_alpn(["http/1.1"]);
        Self {
            dialer: ChildDialer::new(beginning, handler.clone(), config),
            root: MeasurementRoot::new(beginning, handler),
            tls,
            keep_alive: true,
            max_idle_per_origin: DEFAULT_MAX_IDLE_PER_ORIGIN,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            idle: DashMap::new(),
        }
    }

    /// Close every connection after a single request.
    pub fn without_keep_alive(mut self) -> Self {
        self.keep_alive = false;
        self
    }

    /// Cap on parked connections per origin. Zero disables reuse.
    pub fn with_max_idle_per_origin(mut self, max: usize) -> Self {
        self.max_idle_per_origin = max;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Number of parked connections across all origins.
    pub fn idle_connections(&self) -> usize {
        self.idle.iter().map(|entry| entry.value().len()).sum()
    }

    pub async fn get(
        &self,
        ctx: &CallContext,
        url: &Url,
        headers: HeaderMap,
    ) -> Result<HttpResponse, NetError> {
        self.execute(ctx, Method::GET, url, headers, Bytes::new()).await
    }

    pub async fn post(
        &self,
        ctx: &CallContext,
        url: &Url,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<HttpResponse, NetError> {
        self.execute(ctx, Method::POST, url, headers, body).await
    }

    /// Send one request and read the whole response body.
    pub async fn execute(
        &self,
        ctx: &CallContext,
        method: Method,
        url: &Url,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<HttpResponse, NetError> {
        let result = self.round_trip(ctx, &method, url, headers, body).await;
        let root = ctx.measurement_root().unwrap_or(&self.root);
        root.emit(Measurement::HttpRoundTripDone {
            method: method.to_string(),
            url: url.to_string(),
            status: result.as_ref().ok().map(|r| r.status().as_u16()),
            elapsed: root.elapsed(),
            failure: result.as_ref().err().map(|e| e.failure().to_string()),
        });
        result
    }

    async fn round_trip(
        &self,
        ctx: &CallContext,
        method: &Method,
        url: &Url,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<HttpResponse, NetError> {
        let target = Target::from_url(url)?;
        let request = self.build_request(method, url, &target, headers, body)?;

        let mut reused = None;
        if let Some(mut idle) = self.take_idle(&target.key) {
            if ctx.race(idle.ready()).await?.is_ok() {
                tracing::debug!(origin = %target.key, "reusing idle connection");
                reused = Some(idle);
            }
        }
        let mut sender = match reused {
            Some(sender) => sender,
            None => {
                let mut sender = self.connect(ctx, &target).await?;
                ctx.race(sender.ready()).await?.map_err(map_hyper_error)?;
                sender
            }
        };

        let response = ctx.race(sender.send_request(request)).await?.map_err(map_hyper_error)?;
        let (parts, incoming) = response.into_parts();
        let body = ctx.race(incoming.collect()).await?.map_err(map_hyper_error)?.to_bytes();
        tracing::debug!(%method, %url, status = %parts.status, bytes = body.len(), "http round trip");

        if self.keep_alive && !sender.is_closed() {
            self.park(target.key, sender);
        }
        Ok(HttpResponse::from_parts(parts, body))
    }

    fn build_request(
        &self,
        method: &Method,
        url: &Url,
        target: &Target,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Request<Full<Bytes>>, NetError> {
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        let mut request = Request::builder()
            .method(method.clone())
            .uri(path)
            .body(Full::new(body))
            .map_err(|_| NetError::InvalidUrl)?;

        *request.headers_mut() = headers;
        let host = HeaderValue::from_str(&target.authority).map_err(|_| NetError::InvalidUrl)?;
        request.headers_mut().insert(header::HOST, host);
        if !self.keep_alive {
            request.headers_mut().insert(header::CONNECTION, HeaderValue::from_static("close"));
        }
        Ok(request)
    }

    fn is_reusable(&self, parked: &IdleSender) -> bool {
        !parked.sender.is_closed() && parked.parked_at.elapsed() < self.idle_timeout
    }

    fn take_idle(&self, key: &str) -> Option<Sender> {
        let found = {
            let mut idle = self.idle.get_mut(key)?;
            let mut found = None;
            while let Some(parked) = idle.pop() {
                if self.is_reusable(&parked) {
                    found = Some(parked.sender);
                    break;
                }
            }
            found
        };
        self.idle.remove_if(key, |_, idle| idle.is_empty());
        found
    }

    /// Return a connection to the pool, or drop it (closing it) when its
    /// origin already holds the maximum number of idle connections.
    fn park(&self, key: String, sender: Sender) {
        self.cleanup_idle_connections();
        let mut idle = self.idle.entry(key).or_default();
        if idle.len() >= self.max_idle_per_origin {
            tracing::debug!(origin = %idle.key(), "idle pool full, closing connection");
            return;
        }
        idle.push(IdleSender { sender, parked_at: Instant::now() });
    }

    /// Close expired or dead idle connections and forget empty origins.
    pub fn cleanup_idle_connections(&self) {
        self.idle.retain(|_, idle| {
            idle.retain(|parked| self.is_reusable(parked));
            !idle.is_empty()
        });
    }

    async fn connect(&self, ctx: &CallContext, target: &Target) -> Result<Sender, NetError> {
        let socket = if target.tls {
            let stream =
                self.dialer.dial_tls(ctx, &target.address, &target.host, &self.tls).await?;
            SocketType::Ssl(stream)
        } else {
            SocketType::Tcp(self.dialer.dial_tcp(ctx, &target.address).await?)
        };

        let (sender, conn) = ctx
            .race(http1::handshake::<_, Full<Bytes>>(TokioIo::new(socket)))
            .await?
            .map_err(|e| {
                tracing::debug!(origin = %target.key, error = %e, "http handshake failed");
                NetError::ConnectionFailed
            })?;

        let origin = target.key.clone();
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(%origin, error = %e, "http connection closed with error");
            }
        });
        Ok(sender)
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("keep_alive", &self.keep_alive)
            .field("max_idle_per_origin", &self.max_idle_per_origin)
            .field("idle", &self.idle_connections())
            .field("root", &self.root)
            .finish()
    }
}

/// Where a URL's request goes.
struct Target {
    /// Pool key, `scheme://host:port`
    key: String,
    /// Dial address, `host:port`
    address: String,
    /// Bare host, used as the TLS server name
    host: String,
    /// Value of the `Host` header
    authority: String,
    tls: bool,
}

impl Target {
    fn from_url(url: &Url) -> Result<Self, NetError> {
        let tls = match url.scheme() {
            "https" => true,
            "http" => false,
            _ => return Err(NetError::UnknownUrlScheme),
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(NetError::InvalidUrl),
        };
        let port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;
        let address = join_host_port(&host, port);
        let authority = match url.port() {
            Some(port) => join_host_port(&host, port),
            None if host.contains(':') => format!("[{host}]"),
            None => host.clone(),
        };
        Ok(Self { key: format!("{}://{}", url.scheme(), address), address, host, authority, tls })
    }
}

fn map_hyper_error(e: hyper::Error) -> NetError {
    tracing::debug!(error = %e, "http exchange failed");
    if e.is_timeout() {
        NetError::ConnectionTimedOut
    } else if e.is_canceled() || e.is_closed() || e.is_incomplete_message() {
        NetError::ConnectionClosed
    } else if e.is_parse() || e.is_parse_status() {
        NetError::InvalidResponse
    } else {
        NetError::ConnectionFailed
    }
}

/// The process-wide keep-alive client used by uninstrumented DoH resolvers.
///
/// Created on first use and never torn down.
pub fn shared_doh_client() -> Arc<HttpClient> {
    SHARED_DOH_CLIENT
        .get_or_init(|| {
            tracing::debug!("creating shared DoH client");
            Arc::new(HttpClient::new(Instant::now(), None, DialerConfig::default()))
        })
        .clone()
}

/// HTTP client for a DoH resolver.
///
/// Without a handler (or with a no-op one) every caller gets the shared
/// client and `config` is ignored: the shared client always dials with the
/// default configuration. With a real handler the caller gets its own client with
/// keep-alive disabled, so each query shows up as a fresh connection in the
/// handler's events.
pub fn new_http_client_for_doh(
    beginning: Instant,
    handler: Option<Arc<dyn Handler>>,
    config: DialerConfig,
) -> Arc<HttpClient> {
    match handler {
        Some(handler) if !handler.is_noop() => {
            Arc::new(HttpClient::new(beginning, Some(handler), config).without_keep_alive())
        }
        _ => shared_doh_client(),
    }
}
