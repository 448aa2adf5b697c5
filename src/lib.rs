//! Gyan: a chat client for the Gemini `generateContent` API.
//!
//! The crate keeps an append-only conversation, resends it in full on every
//! submission through a retrying dispatcher, and exposes the resulting state
//! to observers (renderers). An optional anonymous sign-in supplies a user id
//! for display.
//!
//! Layering: `atoms` (pure types, errors, seam traits) ← `engine` (state,
//! dispatch, providers) ← this module (wiring for binaries).

pub mod atoms;
pub mod engine;

use std::sync::Arc;

pub use atoms::error::{DispatchError, EngineError, EngineResult};
pub use atoms::traits::{IdentityProvider, Sleeper, StateObserver, TokioSleeper, Transport, TransportError};
pub use atoms::types::{ChatSnapshot, ReplyKind, Role, Turn};
pub use engine::chat::{ChatSession, RejectReason, SubmitOutcome};
pub use engine::config::AppConfig;
pub use engine::dispatcher::{ResilientDispatcher, RetryPolicy};
pub use engine::history::HistoryAccumulator;
pub use engine::state::{ChatState, ObserverId};

use engine::http::{build_client, ReqwestTransport};
use engine::identity::FirebaseIdentity;
use engine::providers::GeminiClient;
use log::{error, info};

/// Production chat session type.
pub type Session = ChatSession<ReqwestTransport>;

/// Build the production transport from the configured timeouts.
pub fn transport_for(config: &AppConfig) -> EngineResult<ReqwestTransport> {
    Ok(ReqwestTransport::new(build_client(config.connect_timeout(), config.request_timeout())?))
}

/// Validate `config` and assemble a chat session over the real network.
pub fn connect(config: &AppConfig, state: Arc<ChatState>) -> EngineResult<Session> {
    config.validate()?;
    let dispatcher = ResilientDispatcher::new(transport_for(config)?, config.retry_policy());
    let client = GeminiClient::new(
        dispatcher,
        config.gemini.base_url.clone(),
        config.gemini.model.clone(),
        config.gemini.api_key.clone(),
    );
    let session = ChatSession::new(state, client);
    info!(
        "[engine] session {} ready: model={} max_retries={} base_delay={}ms",
        session.id(),
        config.gemini.model,
        config.retry.max_retries,
        config.retry.base_delay_ms
    );
    Ok(session)
}

/// The anonymous identity provider, or `None` when sign-in is disabled or
/// no identity key is configured.
pub fn identity_provider(config: &AppConfig) -> EngineResult<Option<Arc<dyn IdentityProvider>>> {
    if !config.identity.enabled {
        info!("[identity] anonymous sign-in disabled");
        return Ok(None);
    }
    let Some(api_key) = config.identity_api_key() else {
        error!("[identity] identity API key is missing; skipping anonymous sign-in");
        return Ok(None);
    };
    let dispatcher = ResilientDispatcher::new(transport_for(config)?, config.retry_policy());
    let provider: Arc<dyn IdentityProvider> =
        Arc::new(FirebaseIdentity::new(dispatcher, config.identity.endpoint.clone(), api_key));
    Ok(Some(provider))
}
