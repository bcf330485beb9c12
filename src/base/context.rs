//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into context-rich `NetError` variants.

use crate::base::neterror::NetError;
use std::io;
use std::net::SocketAddr;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use probenet::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(endpoint).await
    ///     .endpoint_context(endpoint)?;
    /// // Error: "Connection to 9.9.9.9:853 failed: connection refused"
    /// ```
    fn endpoint_context(self, endpoint: SocketAddr) -> Result<T, NetError>;

    /// Add DNS resolution context to an IO error.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn endpoint_context(self, endpoint: SocketAddr) -> Result<T, NetError> {
        self.map_err(|e| NetError::connection_failed_to(&endpoint.ip().to_string(), endpoint.port(), e))
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::dns_failed(domain, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_endpoint_context_refused() {
        let result: Result<(), io::Error> =
            Err(Error::new(ErrorKind::ConnectionRefused, "refused"));
        let err = result.endpoint_context("9.9.9.9:853".parse().unwrap()).unwrap_err();

        match err {
            NetError::ConnectionFailedTo { host, port, .. } => {
                assert_eq!(host, "9.9.9.9");
                assert_eq!(port, 853);
            }
            _ => panic!("Expected ConnectionFailedTo"),
        }
    }

    #[test]
    fn test_endpoint_context() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::TimedOut, "slow"));
        let err = result.endpoint_context("[2001:db8::1]:53".parse().unwrap()).unwrap_err();

        match err {
            NetError::ConnectionFailedTo { host, port, .. } => {
                assert_eq!(host, "2001:db8::1");
                assert_eq!(port, 53);
            }
            _ => panic!("Expected ConnectionFailedTo"),
        }
    }

    #[test]
    fn test_dns_context() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::NotFound, "no such host"));
        let err = result.dns_context("unknown.example.com").unwrap_err();

        match err {
            NetError::NameNotResolvedFor { domain, .. } => {
                assert_eq!(domain, "unknown.example.com");
            }
            _ => panic!("Expected NameNotResolvedFor"),
        }
    }
}
