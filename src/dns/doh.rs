//! DNS over HTTPS (RFC 8484), POST form.

use super::resolve::Lookup;
use super::wire::{WireResolver, WireTransport};
use crate::base::callcontext::CallContext;
use crate::base::neterror::NetError;
use crate::http::HttpClient;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use std::sync::Arc;
use url::Url;

const DNS_MESSAGE: &str = "application/dns-message";

/// Posts each query to a DoH endpoint.
#[derive(Debug, Clone)]
pub struct HttpsTransport {
    client: Arc<HttpClient>,
    url: Url,
    address: String,
}

impl HttpsTransport {
    /// `url` is the full endpoint URL, e.g. `https://cloudflare-dns.com/dns-query`.
    pub fn new(client: Arc<HttpClient>, url: &str) -> Result<Self, NetError> {
        let parsed = Url::parse(url).map_err(|e| {
            tracing::debug!(%url, error = %e, "invalid DoH URL");
            NetError::InvalidUrl
        })?;
        if !matches!(parsed.scheme(), "https" | "http") {
            return Err(NetError::UnknownUrlScheme);
        }
        if parsed.host().is_none() {
            return Err(NetError::InvalidUrl);
        }
        Ok(Self { client, url: parsed, address: url.to_string() })
    }

    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }
}

impl WireTransport for HttpsTransport {
    fn round_trip<'a>(&'a self, ctx: &'a CallContext, query: &'a [u8]) -> Lookup<'a, Vec<u8>> {
        Box::pin(async move {
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(DNS_MESSAGE));
            headers.insert(header::ACCEPT, HeaderValue::from_static(DNS_MESSAGE));

            let response =
                self.client.post(ctx, &self.url, headers, Bytes::copy_from_slice(query)).await?;
            if response.status() != StatusCode::OK {
                return Err(NetError::HttpStatus(response.status().as_u16()));
            }
            if response.content_type() != Some(DNS_MESSAGE) {
                return Err(NetError::InvalidResponse);
            }
            Ok(response.into_bytes().to_vec())
        })
    }

    fn network(&self) -> &'static str {
        "doh"
    }

    fn address(&self) -> &str {
        &self.address
    }
}

/// Resolver speaking DNS over HTTPS to a single endpoint.
pub type HttpsResolver = WireResolver<HttpsTransport>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::shared_doh_client;

    #[test]
    fn test_url_validation() {
        let client = shared_doh_client();
        let transport =
            HttpsTransport::new(client.clone(), "https://cloudflare-dns.com/dns-query").unwrap();
        assert_eq!(transport.address(), "https://cloudflare-dns.com/dns-query");
        assert_eq!(transport.network(), "doh");

        assert!(matches!(
            HttpsTransport::new(client.clone(), "cloudflare-dns.com"),
            Err(NetError::InvalidUrl)
        ));
        assert!(matches!(
            HttpsTransport::new(client, "ftp://cloudflare-dns.com/dns-query"),
            Err(NetError::UnknownUrlScheme)
        ));
    }
}
