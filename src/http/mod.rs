//! HTTP/1.1 plumbing for DNS-over-HTTPS and the locate client.

pub mod client;
pub mod response;

pub use client::{new_http_client_for_doh, shared_doh_client, HttpClient};
pub use response::HttpResponse;
