use std::io;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("SSL protocol error")]
    SslProtocolError,
    #[error("Address unreachable")]
    AddressUnreachable,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Network access denied")]
    NetworkAccessDenied,

    // Cancellation
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,
    #[error("Invalid response")]
    InvalidResponse,
    #[error("Unexpected HTTP status code: {0}")]
    HttpStatus(u16),

    // Configuration Errors
    #[error("Unsupported resolver transport: {0:?}")]
    UnsupportedTransport(String),
    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: &'static str },

    // Context-rich errors
    #[error("Connection to {host}:{port} failed: {source}")]
    ConnectionFailedTo {
        host: String,
        port: u16,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("Failed to resolve {domain}: {source}")]
    NameNotResolvedFor {
        domain: String,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("TLS handshake with {server_name} failed: {reason}")]
    TlsHandshakeFailed { server_name: String, reason: String },

    // DNS protocol errors
    #[error("Malformed DNS message: {0}")]
    MalformedDnsMessage(String),
    #[error("Truncated DNS reply")]
    DnsTruncated,
    #[error("No such host: {domain}")]
    NxDomain { domain: String },
    #[error("DNS server returned {rcode} for {domain}")]
    DnsServerFailure { domain: String, rcode: String },
    #[error("No {rtype} records for {domain}")]
    NoAnswer { domain: String, rtype: String },
    #[error("{transport} resolver {server}: {source}")]
    DnsTransportFailed {
        transport: &'static str,
        server: String,
        #[source]
        source: Box<NetError>,
    },

    // Locate service errors
    #[error("Locate service returned an empty FQDN")]
    EmptyFqdn,
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
}

impl NetError {
    /// Create a connection error with host/port context.
    pub fn connection_failed_to(host: &str, port: u16, source: io::Error) -> Self {
        NetError::ConnectionFailedTo { host: host.to_string(), port, source: Arc::new(source) }
    }

    /// Create a DNS error with domain context.
    pub fn dns_failed(domain: &str, source: io::Error) -> Self {
        NetError::NameNotResolvedFor { domain: domain.to_string(), source: Arc::new(source) }
    }

    /// Attribute an error to the DNS transport and server that produced it.
    ///
    /// Cancellation is kept wrapped as well, callers check
    /// [`NetError::is_cancellation`] rather than matching on the variant.
    pub fn dns_transport(transport: &'static str, server: &str, source: NetError) -> Self {
        NetError::DnsTransportFailed {
            transport,
            server: server.to_string(),
            source: Box::new(source),
        }
    }

    /// True when the caller gave up (cancellation or deadline), as opposed
    /// to the network failing.
    pub fn is_cancellation(&self) -> bool {
        match self {
            NetError::Cancelled | NetError::DeadlineExceeded => true,
            NetError::DnsTransportFailed { source, .. } => source.is_cancellation(),
            _ => false,
        }
    }

    /// Short failure classification used in measurement events.
    pub fn failure(&self) -> &'static str {
        match self {
            NetError::Cancelled => "interrupted",
            NetError::DeadlineExceeded | NetError::ConnectionTimedOut => "generic_timeout_error",
            NetError::ConnectionRefused => "connection_refused",
            NetError::ConnectionReset => "connection_reset",
            NetError::AddressUnreachable => "host_unreachable",
            NetError::ConnectionFailedTo { source, .. } => match source.kind() {
                io::ErrorKind::ConnectionRefused => "connection_refused",
                io::ErrorKind::ConnectionReset => "connection_reset",
                io::ErrorKind::TimedOut => "generic_timeout_error",
                _ => "unknown_failure",
            },
            NetError::NameNotResolved
            | NetError::NameNotResolvedFor { .. }
            | NetError::NxDomain { .. } => "dns_nxdomain_error",
            NetError::NoAnswer { .. } => "dns_no_answer",
            NetError::DnsServerFailure { .. } => "dns_server_failure",
            NetError::SslProtocolError | NetError::TlsHandshakeFailed { .. } => {
                "ssl_failed_handshake"
            }
            NetError::DnsTransportFailed { source, .. } => source.failure(),
            _ => "unknown_failure",
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::Cancelled => -3,
            NetError::DeadlineExceeded => -7,

            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionFailed | NetError::ConnectionFailedTo { .. } => -104,
            NetError::NameNotResolved
            | NetError::NameNotResolvedFor { .. }
            | NetError::NxDomain { .. } => -105,
            NetError::SslProtocolError | NetError::TlsHandshakeFailed { .. } => -107,
            NetError::InvalidAddress { .. } => -108,
            NetError::AddressUnreachable => -109,
            NetError::ConnectionTimedOut => -118,
            NetError::NetworkAccessDenied => -138,

            NetError::InvalidUrl => -300,
            NetError::UnknownUrlScheme => -302,
            NetError::InvalidResponse => -320,

            // net/dns error range
            NetError::MalformedDnsMessage(_) => -800,
            NetError::DnsTruncated => -801,
            NetError::DnsServerFailure { .. } => -802,
            NetError::NoAnswer { .. } => -805,
            NetError::DnsTransportFailed { source, .. } => source.as_i32(),

            // Custom codes, outside every range Chromium assigns
            NetError::UnsupportedTransport(_) => -10000,
            NetError::HttpStatus(_) => -10001,
            NetError::EmptyFqdn => -10002,
            NetError::InvalidJson(_) => -10003,
        }
    }
}

impl From<io::Error> for NetError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            io::ErrorKind::ConnectionReset => NetError::ConnectionReset,
            io::ErrorKind::ConnectionAborted | io::ErrorKind::UnexpectedEof => {
                NetError::ConnectionClosed
            }
            io::ErrorKind::TimedOut => NetError::ConnectionTimedOut,
            io::ErrorKind::PermissionDenied => NetError::NetworkAccessDenied,
            io::ErrorKind::AddrNotAvailable => NetError::AddressUnreachable,
            _ => NetError::ConnectionFailed,
        }
    }
}
