//! Client for the `locate.measurementlab.net` discovery service.
//!
//! `GET https://locate.measurementlab.net/<tool>` answers with the FQDN of
//! the server a probe should run `<tool>` against:
//!
//! ```json
//! {"fqdn": "ndt-iupui-mlab1-mil04.measurement-lab.org"}
//! ```

use crate::base::callcontext::CallContext;
use crate::base::neterror::NetError;
use crate::http::HttpClient;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_HOSTNAME: &str = "locate.measurementlab.net";

#[derive(Debug, Deserialize)]
struct LocateResult {
    #[serde(default)]
    fqdn: String,
}

#[derive(Debug, Clone)]
pub struct LocateClient {
    http: Arc<HttpClient>,
    hostname: String,
    scheme: String,
    user_agent: String,
    probe_ip: Option<String>,
}

impl LocateClient {
    pub fn new(http: Arc<HttpClient>, user_agent: impl Into<String>) -> Self {
        Self {
            http,
            hostname: DEFAULT_HOSTNAME.to_string(),
            scheme: "https".to_string(),
            user_agent: user_agent.into(),
            probe_ip: None,
        }
    }

    /// Query a different host (`host` or `host:port`).
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Use `http` or `https`.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Tell the service which address to locate a server for.
    ///
    /// Needed when the probe talks to the service through a proxy: without
    /// it the answer would suit the proxy's location rather than ours.
    pub fn with_probe_ip(mut self, probe_ip: impl Into<String>) -> Self {
        self.probe_ip = Some(probe_ip.into());
        self
    }

    /// URL queried for `tool`.
    pub fn url_for(&self, tool: &str) -> Result<Url, NetError> {
        let mut url = Url::parse(&format!("{}://{}/", self.scheme, self.hostname))
            .map_err(|_| NetError::InvalidUrl)?;
        url.set_path(tool);
        if let Some(ip) = &self.probe_ip {
            url.query_pairs_mut().append_pair("ip", ip);
        }
        Ok(url)
    }

    /// Return the FQDN of the server to use for `tool`.
    pub async fn query(&self, ctx: &CallContext, tool: &str) -> Result<String, NetError> {
        let url = self.url_for(tool)?;
        let mut headers = HeaderMap::new();
        let user_agent =
            HeaderValue::from_str(&self.user_agent).map_err(|_| NetError::InvalidUrl)?;
        headers.insert(header::USER_AGENT, user_agent);

        tracing::debug!(%url, "mlablocate: GET");
        let response = self.http.get(ctx, &url, headers).await?;
        if response.status() != StatusCode::OK {
            tracing::debug!(status = %response.status(), "mlablocate: non-200 status code");
            return Err(NetError::HttpStatus(response.status().as_u16()));
        }
        tracing::debug!(body = %response.text(), "mlablocate: reply");

        let result: LocateResult = response.json()?;
        if result.fqdn.is_empty() {
            return Err(NetError::EmptyFqdn);
        }
        Ok(result.fqdn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::shared_doh_client;
    use crate::socket::config::DialerConfig;
    use std::net::SocketAddr;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response and hand back the request head.
    async fn serve_once(response: impl Into<String>) -> (SocketAddr, tokio::task::JoinHandle<String>) {
        let response = response.into();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap();
            stream.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (addr, handle)
    }

    fn client(addr: SocketAddr) -> LocateClient {
        let http = Arc::new(HttpClient::new(Instant::now(), None, DialerConfig::default()));
        LocateClient::new(http, "probenet/0.1").with_scheme("http").with_hostname(addr.to_string())
    }

    #[test]
    fn test_url_for() {
        let locate = LocateClient::new(shared_doh_client(), "probenet/0.1");
        assert_eq!(
            locate.url_for("ndt7").unwrap().as_str(),
            "https://locate.measurementlab.net/ndt7"
        );
        let locate = locate.with_probe_ip("130.192.91.211");
        assert_eq!(
            locate.url_for("ndt7").unwrap().as_str(),
            "https://locate.measurementlab.net/ndt7?ip=130.192.91.211"
        );
    }

    #[tokio::test]
    async fn test_query_success() {
        let body = r#"{"fqdn":"ndt-iupui-mlab1-mil04.measurement-lab.org"}"#;
        let response =
            format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}", body.len(), body);
        let (addr, server) = serve_once(response).await;

        let fqdn = client(addr).query(&CallContext::new(), "ndt7").await.unwrap();
        assert_eq!(fqdn, "ndt-iupui-mlab1-mil04.measurement-lab.org");

        let head = server.await.unwrap();
        assert!(head.starts_with("GET /ndt7 HTTP/1.1\r\n"));
        assert!(head.to_ascii_lowercase().contains("user-agent: probenet/0.1"));
    }

    #[tokio::test]
    async fn test_query_non_200() {
        let (addr, _server) =
            serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n").await;
        let err = client(addr).query(&CallContext::new(), "nonexistent").await.unwrap_err();
        assert!(matches!(err, NetError::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_query_empty_fqdn() {
        let (addr, _server) =
            serve_once("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n{}").await;
        let err = client(addr).query(&CallContext::new(), "ndt7").await.unwrap_err();
        assert!(matches!(err, NetError::EmptyFqdn));
    }

    #[tokio::test]
    async fn test_query_invalid_json() {
        let (addr, _server) =
            serve_once("HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\n{").await;
        let err = client(addr).query(&CallContext::new(), "ndt7").await.unwrap_err();
        assert!(matches!(err, NetError::InvalidJson(_)));
    }

    #[tokio::test]
    #[ignore = "requires network"]
    async fn test_query_live() {
        let locate = LocateClient::new(shared_doh_client(), "probenet/0.1");
        let fqdn = locate.query(&CallContext::new(), "ndt7").await.unwrap();
        assert!(!fqdn.is_empty());
    }
}
