use crate::base::neterror::NetError;
use boring::ssl::{ConnectConfiguration, SslConnector, SslMethod, SslVerifyMode, SslVersion};
use std::net::IpAddr;

/// TLS client settings for encrypted DNS transports.
///
/// Certificate validation uses the system verifier; this type only selects
/// protocol versions and ALPN.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub min_version: Option<SslVersion>,
    pub max_version: Option<SslVersion>,
    pub alpn_protos: Vec<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            min_version: Some(SslVersion::TLS1_2),
            max_version: Some(SslVersion::TLS1_3),
            alpn_protos: Vec::new(),
        }
    }
}

impl TlsConfig {
    /// Replace the ALPN list.
    pub fn with_alpn<I, S>(mut self, protos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alpn_protos = protos.into_iter().map(Into::into).collect();
        self
    }

    /// ALPN list in wire format (length-prefixed protocol names).
    pub fn alpn_wire(&self) -> Result<Vec<u8>, NetError> {
        let mut alpn_wire = Vec::new();
        for proto in &self.alpn_protos {
            if proto.is_empty() || proto.len() > 255 {
                return Err(NetError::SslProtocolError);
            }
            alpn_wire.push(proto.len() as u8);
            alpn_wire.extend_from_slice(proto.as_bytes());
        }
        Ok(alpn_wire)
    }

    /// Build a connect configuration for `server_name`.
    ///
    /// IP literals get no SNI and are verified against the certificate's
    /// IP address entries instead of DNS names.
    pub fn configure(&self, server_name: &str) -> Result<ConnectConfiguration, NetError> {
        let mut builder =
            SslConnector::builder(SslMethod::tls()).map_err(|_| NetError::SslProtocolError)?;

        if let Some(min) = self.min_version {
            builder.set_min_proto_version(Some(min)).map_err(|_| NetError::SslProtocolError)?;
        }
        if let Some(max) = self.max_version {
            builder.set_max_proto_version(Some(max)).map_err(|_| NetError::SslProtocolError)?;
        }
        if !self.alpn_protos.is_empty() {
            builder.set_alpn_protos(&self.alpn_wire()?).map_err(|_| NetError::SslProtocolError)?;
        }
        builder.set_verify(SslVerifyMode::PEER);

        let mut config =
            builder.build().configure().map_err(|_| NetError::SslProtocolError)?;
        if !Self::should_set_sni(server_name) {
            config.set_use_server_name_indication(false);
            config.set_verify_hostname(false);
            if let Ok(ip) = server_name.parse::<IpAddr>() {
                config.param_mut().set_ip(ip).map_err(|_| NetError::SslProtocolError)?;
            }
        }
        Ok(config)
    }

    /// Check if SNI (Server Name Indication) should be set for this host.
    /// Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
    pub fn should_set_sni(host: &str) -> bool {
        host.parse::<IpAddr>().is_err()
    }
}
