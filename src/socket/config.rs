//! Dialer configuration.

use crate::socket::tls::TlsConfig;
use std::time::Duration;

/// Timeouts and TLS settings shared by the general-purpose dialer and every
/// child dialer derived from the same factory.
#[derive(Debug, Clone)]
pub struct DialerConfig {
    /// Upper bound for a single TCP connect attempt
    pub connect_timeout: Duration,
    /// Upper bound for a TLS handshake
    pub tls_handshake_timeout: Duration,
    /// TLS settings for DoT and DoH
    pub tls: TlsConfig,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            tls_handshake_timeout: Duration::from_secs(10),
            tls: TlsConfig::default(),
        }
    }
}

impl DialerConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the TLS handshake timeout.
    pub fn tls_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.tls_handshake_timeout = timeout;
        self
    }

    /// Set the TLS settings.
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DialerConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.tls_handshake_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_pattern() {
        let config = DialerConfig::new()
            .connect_timeout(Duration::from_secs(5))
            .tls_handshake_timeout(Duration::from_secs(3));

        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.tls_handshake_timeout, Duration::from_secs(3));
    }
}
