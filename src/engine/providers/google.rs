// Gyan Engine — Google Gemini Provider
// Non-streaming `generateContent` over the resilient dispatcher.
// The wire contract is fixed by the API: conversation in, first candidate's
// first text part out.

use crate::atoms::error::DispatchError;
use crate::atoms::traits::{Sleeper, TokioSleeper, Transport};
use crate::atoms::types::{GenerateContentRequest, GenerateContentResponse, HttpRequest};
use crate::engine::dispatcher::ResilientDispatcher;
use log::{info, warn};
use serde_json::Value;

/// What a successful (2xx) dispatch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// The reply text.
    Text(String),
    /// 2xx body without the expected `candidates[0].content.parts[0].text`.
    Unrecognized(Value),
}

pub struct GeminiClient<T: Transport, S: Sleeper = TokioSleeper> {
    dispatcher: ResilientDispatcher<T, S>,
    base_url: String,
    model: String,
    api_key: String,
}

impl<T: Transport, S: Sleeper> GeminiClient<T, S> {
    pub fn new(
        dispatcher: ResilientDispatcher<T, S>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        GeminiClient {
            dispatcher,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `{base}/models/{model}:generateContent?key={api_key}`, with the model
    /// and key percent-encoded.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.model),
            urlencoding::encode(&self.api_key)
        )
    }

    pub async fn generate(&self, payload: &GenerateContentRequest) -> Result<Generation, DispatchError> {
        let request = HttpRequest::post_json(self.endpoint(), payload)
            .map_err(|e| DispatchError::MalformedResponse(format!("request serialization failed: {}", e)))?;

        info!("[gemini] generateContent model={} turns={}", self.model, payload.contents.len());
        let body = self.dispatcher.dispatch(&request).await?;
        Ok(interpret_response(body))
    }
}

/// Pull the reply out of a 2xx body, or hand the body back unrecognized.
pub fn interpret_response(body: Value) -> Generation {
    let parsed = match serde_json::from_value::<GenerateContentResponse>(body.clone()) {
        Ok(p) => p,
        Err(e) => {
            warn!("[gemini] response did not match the expected schema: {}", e);
            return Generation::Unrecognized(body);
        }
    };

    match parsed.first_text() {
        Some(text) => Generation::Text(text.to_string()),
        None => {
            if let Some(reason) = parsed
                .candidates
                .as_ref()
                .and_then(|c| c.first())
                .and_then(|c| c.finish_reason.as_deref())
            {
                warn!("[gemini] first candidate carried no text (finishReason={})", reason);
            }
            Generation::Unrecognized(body)
        }
    }
}
