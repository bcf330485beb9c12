//! Sockets and dialing.
//!
//! - [`dialer`]: instrumented TCP, UDP and TLS dialing
//! - [`config`]: dialer timeouts
//! - [`tls`]: TLS configuration with BoringSSL
//! - [`stream`]: plain-or-TLS stream handed to the HTTP client

pub mod config;
pub mod dialer;
pub mod stream;
pub mod tls;

pub use config::DialerConfig;
pub use dialer::{ChildDialer, Dialer};
pub use tls::TlsConfig;
