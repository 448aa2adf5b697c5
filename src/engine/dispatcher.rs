// Gyan Engine — Resilient Dispatcher
//
// Sends one logical request with bounded retry for transient failures.
// Returns exactly one of {parsed success body, terminal DispatchError}.
//
//   START → ATTEMPT → [2xx]                  → DONE
//                   → [transient, budget>0]  → WAIT → ATTEMPT
//                   → [transient, budget=0]  → FAILED (RetriesExhausted)
//                   → [terminal]             → FAILED
//
// Backoff is unconditional: base, 2·base, 4·base, … with no jitter and no cap.
// There is no cancellation; a dispatch runs until it succeeds or fails.

use crate::atoms::constants::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_RETRIES};
use crate::atoms::error::DispatchError;
use crate::atoms::traits::{Sleeper, TokioSleeper, Transport};
use crate::atoms::types::HttpRequest;
use crate::engine::http::{api_error_message, backoff_delay, classify_status, redact_url, StatusClass};
use log::{error, info, warn};
use serde_json::Value;
use std::time::Duration;

/// Attempt budget and initial delay for one dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Values below 1 are treated as 1.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        RetryPolicy { max_retries, base_delay }
    }

    fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

pub struct ResilientDispatcher<T: Transport, S: Sleeper = TokioSleeper> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
}

impl<T: Transport> ResilientDispatcher<T, TokioSleeper> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, TokioSleeper, policy)
    }
}

impl<T: Transport, S: Sleeper> ResilientDispatcher<T, S> {
    pub fn with_sleeper(transport: T, sleeper: S, policy: RetryPolicy) -> Self {
        ResilientDispatcher { transport, sleeper, policy }
    }

    /// Send `request`, retrying transient failures, and parse a 2xx body as JSON.
    pub async fn dispatch(&self, request: &HttpRequest) -> Result<Value, DispatchError> {
        let attempts = self.policy.attempts();
        let target = redact_url(&request.url);
        let mut delay = self.policy.base_delay;

        for attempt in 0..attempts {
            let failure = match self.attempt_once(request).await {
                Ok(body) => {
                    if attempt > 0 {
                        info!("[dispatch] {} succeeded on attempt {}/{}", target, attempt + 1, attempts);
                    }
                    return Ok(body);
                }
                Err(e) if !e.is_retryable() => {
                    error!("[dispatch] {} failed terminally on attempt {}: {}", target, attempt + 1, e);
                    return Err(e);
                }
                Err(e) => e,
            };

            if attempt + 1 >= attempts {
                error!("[dispatch] {} giving up after {} attempts: {}", target, attempts, failure);
                return Err(DispatchError::RetriesExhausted { attempts, last: Box::new(failure) });
            }

            warn!(
                "[dispatch] {} attempt {}/{} failed ({}), retrying in {}ms",
                target,
                attempt + 1,
                attempts,
                failure,
                delay.as_millis()
            );
            self.sleeper.sleep(delay).await;
            delay = backoff_delay(self.policy.base_delay, attempt + 1);
        }

        // attempts() is at least 1, so the loop always returns.
        Err(DispatchError::RetriesExhausted {
            attempts,
            last: Box::new(DispatchError::TransientNetwork("no attempt was made".into())),
        })
    }

    async fn attempt_once(&self, request: &HttpRequest) -> Result<Value, DispatchError> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| DispatchError::TransientNetwork(e.0))?;

        match classify_status(response.status) {
            StatusClass::Success => serde_json::from_str(&response.body)
                .map_err(|e| DispatchError::MalformedResponse(format!("body is not JSON: {}", e))),
            StatusClass::Transient => Err(DispatchError::TransientServer {
                status: response.status,
                body: response.body,
            }),
            StatusClass::Terminal => Err(DispatchError::TerminalClient {
                status: response.status,
                message: api_error_message(&response.body),
            }),
        }
    }
}
