// ── Gyan Atoms: Error Types ────────────────────────────────────────────────
// One coarse crate error (`EngineError`) plus the dispatch taxonomy
// (`DispatchError`), both built with `thiserror`.
//
// Design rules:
//   • `EngineError` variants are coarse-grained by domain (I/O, config, identity…).
//   • `DispatchError` variants carry the retry classification, nothing more.
//   • No variant carries secret material (API keys) in its message.

use thiserror::Error;

// ── Dispatch taxonomy ──────────────────────────────────────────────────────

/// Outcome of a failed dispatch, classified as retryable or terminal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Connectivity failure or timeout below the HTTP layer.
    #[error("Network error: {0}")]
    TransientNetwork(String),

    /// Rate limit (429) or server-side failure (≥500).
    #[error("Server error or rate limit: {status}")]
    TransientServer { status: u16, body: String },

    /// Client error other than 429. `message` is the server's `error.message`
    /// when present, otherwise a generic failure message.
    #[error("{message}")]
    TerminalClient { status: u16, message: String },

    /// 2xx status but the body could not be understood.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The attempt budget ran out on transient failures.
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<DispatchError>,
    },
}

impl DispatchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::TransientNetwork(_) | DispatchError::TransientServer { .. }
        )
    }

    /// HTTP status associated with the failure, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::TransientServer { status, .. }
            | DispatchError::TerminalClient { status, .. } => Some(*status),
            DispatchError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client construction failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anonymous sign-in failure.
    #[error("Identity error: {0}")]
    Identity(String),

    /// A dispatch that failed after classification.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Catch-all for errors that do not yet have a dedicated variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn identity(message: impl Into<String>) -> Self {
        Self::Identity(message.into())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(e: toml::de::Error) -> Self {
        EngineError::Config(format!("invalid config file: {}", e))
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations should return this type.
pub type EngineResult<T> = Result<T, EngineError>;
