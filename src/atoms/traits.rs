// ── Gyan Atoms: Seam Traits ────────────────────────────────────────────────
// Every boundary the engine talks across is a trait defined here, so the
// dispatcher and chat session can be driven by in-memory fakes in tests.

use crate::atoms::types::{ChatSnapshot, HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure below the HTTP layer: DNS, refused connection, TLS, timeout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Sends one HTTP request. Implementations must not retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Waits between retry attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Anonymous sign-in against an external identity service.
/// Returns the opaque user id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn sign_in_anonymously(&self) -> Result<String, crate::atoms::error::EngineError>;
}

/// Notified synchronously after every state mutation.
pub trait StateObserver: Send + Sync {
    fn on_change(&self, snapshot: &ChatSnapshot);
}

impl<F> StateObserver for F
where
    F: Fn(&ChatSnapshot) + Send + Sync,
{
    fn on_change(&self, snapshot: &ChatSnapshot) {
        self(snapshot)
    }
}
