// Gyan Engine — Anonymous Identity Bootstrap
//
// Signs the user in anonymously (Firebase Identity Toolkit `accounts:signUp`)
// and publishes the resulting opaque user id into ChatState. The id is for
// display only: chatting never waits on it and works without it.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{IdentityProvider, Sleeper, TokioSleeper, Transport};
use crate::atoms::types::HttpRequest;
use crate::engine::dispatcher::ResilientDispatcher;
use crate::engine::state::ChatState;
use async_trait::async_trait;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest {
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    #[serde(default)]
    id_token: Option<String>,
}

pub struct FirebaseIdentity<T: Transport, S: Sleeper = TokioSleeper> {
    dispatcher: ResilientDispatcher<T, S>,
    endpoint: String,
    api_key: String,
}

impl<T: Transport, S: Sleeper> FirebaseIdentity<T, S> {
    pub fn new(dispatcher: ResilientDispatcher<T, S>, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        FirebaseIdentity {
            dispatcher,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    fn sign_up_url(&self) -> String {
        format!(
            "{}/accounts:signUp?key={}",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl<T: Transport, S: Sleeper> IdentityProvider for FirebaseIdentity<T, S> {
    fn name(&self) -> &str {
        "firebase"
    }

    async fn sign_in_anonymously(&self) -> EngineResult<String> {
        let request = HttpRequest::post_json(self.sign_up_url(), &SignUpRequest { return_secure_token: true })?;
        let body = self.dispatcher.dispatch(&request).await?;
        let response: SignUpResponse = serde_json::from_value(body)
            .map_err(|e| EngineError::identity(format!("unexpected sign-up response: {}", e)))?;
        if response.local_id.is_empty() {
            return Err(EngineError::identity("sign-up response carried an empty user id"));
        }
        if response.id_token.is_none() {
            info!("[identity] sign-up returned no id token; only the user id is kept");
        }
        Ok(response.local_id)
    }
}

/// Run one sign-in and store the user id. Failures are logged and leave the
/// id unset.
pub async fn bootstrap_identity(state: &ChatState, provider: &dyn IdentityProvider) -> Option<String> {
    match provider.sign_in_anonymously().await {
        Ok(user_id) => {
            info!("[identity] {} user id: {}", provider.name(), user_id);
            state.set_user_id(Some(user_id.clone()));
            Some(user_id)
        }
        Err(e) => {
            error!("[identity] anonymous sign-in via {} failed: {}", provider.name(), e);
            state.set_user_id(None);
            None
        }
    }
}

/// Spawn the bootstrap as a one-shot background task.
pub fn spawn_identity_bootstrap(
    state: Arc<ChatState>,
    provider: Arc<dyn IdentityProvider>,
) -> JoinHandle<Option<String>> {
    tokio::spawn(async move { bootstrap_identity(&state, provider.as_ref()).await })
}
