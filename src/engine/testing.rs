// In-memory fakes for the engine's seam traits. Test-only.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{IdentityProvider, Sleeper, Transport, TransportError};
use crate::atoms::types::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

type Scripted = Result<HttpResponse, TransportError>;

/// Replays a fixed script of responses and records every request it saw.
/// Clones share the same script and log.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    fallback: Option<Scripted>,
    seen: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Scripted>) -> Self {
        ScriptedTransport { script: Arc::new(Mutex::new(script.into())), ..Default::default() }
    }

    /// Answers every request with the same result.
    pub fn repeating(result: Scripted) -> Self {
        ScriptedTransport { fallback: Some(result), ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().push(request.clone());
        let next = self.script.lock().pop_front();
        match (next, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(result)) => result.clone(),
            (None, None) => Err(TransportError("script exhausted".into())),
        }
    }
}

/// Records requested delays without waiting.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn delays_ms(&self) -> Vec<u128> {
        self.delays.lock().iter().map(|d| d.as_millis()).collect()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().push(delay);
    }
}

/// Identity provider returning a fixed result.
pub struct FixedIdentity(pub Option<String>);

#[async_trait]
impl IdentityProvider for FixedIdentity {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn sign_in_anonymously(&self) -> EngineResult<String> {
        self.0.clone().ok_or_else(|| EngineError::identity("sign-in refused"))
    }
}
