// ── Gyan Engine: HTTP Classification, Backoff & Transport ───────────────────
//
// Shared HTTP utilities used by the dispatcher, the Gemini client and the
// identity bootstrap.
//
// Features:
//   • Status classification: 2xx success, 429/≥500 transient, other 4xx terminal
//   • Exponential backoff schedule (base · 2^n, no jitter, no cap)
//   • Server error-message extraction from `{"error":{"message":…}}`
//   • Mozilla-rooted rustls `reqwest::Client` behind the `Transport` trait
//   • API-key redaction for log lines

use crate::atoms::constants::GENERIC_API_FAILURE;
use crate::atoms::error::EngineResult;
use crate::atoms::traits::{Transport, TransportError};
use crate::atoms::types::{ApiErrorBody, HttpMethod, HttpRequest, HttpResponse};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use rustls::ClientConfig;
use std::sync::Arc;
use std::time::Duration;

// ── Status classification ──────────────────────────────────────────────────

/// Where an HTTP status lands in the retry state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Transient,
    Terminal,
}

/// Check if an HTTP status code represents a transient/retryable error.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

pub fn classify_status(status: u16) -> StatusClass {
    if (200..300).contains(&status) {
        StatusClass::Success
    } else if is_retryable_status(status) {
        StatusClass::Transient
    } else {
        StatusClass::Terminal
    }
}

// ── Backoff delay ──────────────────────────────────────────────────────────

/// Delay to wait after failed attempt `attempt` (0-based): `base · 2^attempt`.
/// Saturates instead of overflowing for absurd attempt counts.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

// ── Error-body parsing ─────────────────────────────────────────────────────

/// The server-provided `error.message`, or a generic failure message.
pub fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| GENERIC_API_FAILURE.to_string())
}

// ── Log redaction ──────────────────────────────────────────────────────────

/// Replace the value of a `key=` query parameter so URLs can be logged.
pub fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let redacted: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some(("key", _)) => "key=***".to_string(),
            _ => pair.to_string(),
        })
        .collect();
    format!("{}?{}", base, redacted.join("&"))
}

// ── Mozilla-rooted client ──────────────────────────────────────────────────
//
// Builds a `reqwest::Client` on a rustls config holding only the Mozilla
// root certificates, so an OS-level CA cannot intercept API traffic.

/// Uses an explicit `ring` CryptoProvider so the config works in test
/// binaries where no process-level provider has been installed.
fn pinned_tls_config() -> EngineResult<ClientConfig> {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| crate::atoms::error::EngineError::Other(format!("TLS setup failed: {}", e)))?
        .with_root_certificates(root_store)
        .with_no_client_auth();
    Ok(config)
}

/// Build the HTTP client shared by every request in a session.
pub fn build_client(connect_timeout: Duration, request_timeout: Duration) -> EngineResult<Client> {
    let client = Client::builder()
        .use_preconfigured_tls(pinned_tls_config()?)
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()?;
    Ok(client)
}

// ── reqwest transport ──────────────────────────────────────────────────────

/// `Transport` over a real `reqwest::Client`. Sends exactly once per call.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(format!("HTTP request failed: {}", e.without_url())))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("Failed to read response body: {}", e.without_url())))?;
        debug!("[http] {} {} -> {} ({} bytes)", method_name(request.method), redact_url(&request.url), status, body.len());
        Ok(HttpResponse { status, body })
    }
}

fn method_name(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
