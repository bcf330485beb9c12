//! Per-call context: cancellation, deadline and measurement root.
//!
//! Every lookup and dial takes a [`CallContext`]. Backends never modify it;
//! they pass it down and wrap their network operations in
//! [`CallContext::run`] so a single external deadline bounds DNS round
//! trips, TLS handshakes and HTTP requests alike.

use crate::base::neterror::NetError;
use crate::handlers::MeasurementRoot;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    root: Option<MeasurementRoot>,
}

impl CallContext {
    /// A context that never expires and is not instrumented.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the call to `timeout` from now. An earlier deadline wins.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.with_deadline(deadline)
    }

    /// Bound the call to an absolute deadline. An earlier deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Tie this context to an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Derive a context carrying `root`, sharing cancellation and deadline.
    pub fn with_measurement_root(&self, root: MeasurementRoot) -> Self {
        Self { cancel: self.cancel.clone(), deadline: self.deadline, root: Some(root) }
    }

    pub fn measurement_root(&self) -> Option<&MeasurementRoot> {
        self.root.as_ref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel this context and every context sharing its token.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive a fallible `fut` until it completes, the context is cancelled
    /// or the deadline passes, whichever happens first. Dropping `fut`
    /// aborts the in-flight operation.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, NetError>
    where
        F: Future<Output = Result<T, NetError>>,
    {
        self.race(fut).await?
    }

    /// Like [`CallContext::run`] for futures with a foreign output type:
    /// the output is handed back untouched, so callers map their own
    /// errors after the context check.
    pub async fn race<F>(&self, fut: F) -> Result<F::Output, NetError>
    where
        F: Future,
    {
        if self.cancel.is_cancelled() {
            return Err(NetError::Cancelled);
        }
        let expiry = async {
            match self.deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
                }
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(NetError::Cancelled),
            _ = expiry => Err(NetError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}
