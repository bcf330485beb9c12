//! HTTP response with a fully read body.

use crate::base::neterror::NetError;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// Response whose body has already been collected.
///
/// DNS messages and locate replies are small, so the client reads the whole
/// body before handing the response back.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    pub fn from_parts(parts: http::response::Parts, body: Bytes) -> Self {
        Self { status: parts.status, headers: parts.headers, body }
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The `Content-Type` header, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        serde_json::from_slice(&self.body).map_err(|e| NetError::InvalidJson(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> HttpResponse {
        let (parts, _) = http::Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(())
            .unwrap()
            .into_parts();
        HttpResponse::from_parts(parts, Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn test_json_body() {
        #[derive(serde::Deserialize)]
        struct Reply {
            fqdn: String,
        }
        let resp = response(200, r#"{"fqdn":"ndt-iupui-mlab1-mil04.measurement-lab.org"}"#);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.content_type(), Some("application/json"));
        let reply: Reply = resp.json().unwrap();
        assert_eq!(reply.fqdn, "ndt-iupui-mlab1-mil04.measurement-lab.org");
    }

    #[test]
    fn test_invalid_json() {
        let resp = response(200, "{");
        assert!(matches!(resp.json::<serde_json::Value>(), Err(NetError::InvalidJson(_))));
    }
}
