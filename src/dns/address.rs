//! `host:port` handling and default-port injection.
//!
//! Callers may configure a resolver with either a bare host (`9.9.9.9`,
//! `dns.quad9.net`) or an explicit endpoint (`9.9.9.9:853`). [`with_port`]
//! turns both into an endpoint before a backend is built.

use crate::base::neterror::NetError;
use std::net::Ipv6Addr;

/// Why an address could not be split into host and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitError {
    MissingPort,
    TooManyColons,
    MissingBracket,
    UnexpectedBracket,
}

impl SplitError {
    fn reason(self) -> &'static str {
        match self {
            SplitError::MissingPort => "missing port in address",
            SplitError::TooManyColons => "too many colons in address",
            SplitError::MissingBracket => "missing ']' in address",
            SplitError::UnexpectedBracket => "unexpected bracket in address",
        }
    }
}

/// Split `host:port` or `[host]:port`. Brackets are stripped from the host.
pub fn split_host_port(address: &str) -> Result<(&str, &str), SplitError> {
    let colon = address.rfind(':').ok_or(SplitError::MissingPort)?;

    let (host, after_host) = if let Some(rest) = address.strip_prefix('[') {
        let end = rest.find(']').ok_or(SplitError::MissingBracket)? + 1;
        if end + 1 == address.len() {
            return Err(SplitError::MissingPort);
        }
        if end + 1 != colon {
            return Err(if address.as_bytes()[end + 1] == b':' {
                SplitError::TooManyColons
            } else {
                SplitError::MissingPort
            });
        }
        (&address[1..end], end + 1)
    } else {
        let host = &address[..colon];
        if host.contains(':') {
            return Err(SplitError::TooManyColons);
        }
        (host, colon)
    };

    if host.contains('[') || address[after_host..].contains('[') {
        return Err(SplitError::UnexpectedBracket);
    }
    if host.contains(']') || address[after_host..].contains(']') {
        return Err(SplitError::UnexpectedBracket);
    }
    Ok((host, &address[colon + 1..]))
}

/// Join host and port, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Ensure `address` carries an explicit port, appending `default_port` when
/// none is present.
///
/// An address that already has a port is returned unchanged, so the
/// function is idempotent. A bare IPv6 literal is treated as missing its
/// port. Any other malformation is reported as [`NetError::InvalidAddress`]
/// rather than normalized.
pub fn with_port(address: &str, default_port: u16) -> Result<String, NetError> {
    let invalid = |reason: &'static str| NetError::InvalidAddress {
        address: address.to_string(),
        reason,
    };
    match split_host_port(address) {
        Ok((host, port)) => {
            if host.is_empty() {
                return Err(invalid("missing host"));
            }
            port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
            Ok(address.to_string())
        }
        Err(SplitError::MissingPort) => {
            // The only bracketed form without a port is `[ipv6]`.
            let host = match address.strip_prefix('[') {
                Some(rest) => rest
                    .strip_suffix(']')
                    .filter(|inner| inner.parse::<Ipv6Addr>().is_ok())
                    .ok_or_else(|| invalid("malformed bracketed address"))?,
                None if address.contains(['[', ']']) => {
                    return Err(invalid(SplitError::UnexpectedBracket.reason()))
                }
                None => address,
            };
            if host.is_empty() {
                return Err(invalid("missing host"));
            }
            Ok(join_host_port(host, default_port))
        }
        Err(SplitError::TooManyColons) if address.parse::<Ipv6Addr>().is_ok() => {
            Ok(join_host_port(address, default_port))
        }
        Err(e) => Err(invalid(e.reason())),
    }
}
