//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): error codes, Chromium numbering where one exists
//! - [`CallContext`](callcontext::CallContext): cancellation, deadline and measurement root
//! - [`IoResultExt`](context::IoResultExt): context-rich IO error conversion

pub mod callcontext;
pub mod context;
pub mod neterror;
