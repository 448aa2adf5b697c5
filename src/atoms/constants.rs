// ── Gyan Atoms: Constants ──────────────────────────────────────────────────
// All named constants for the crate live here.

use std::time::Duration;

// ── Retry policy defaults ─────────────────────────────────────────────────
// `DEFAULT_MAX_RETRIES` is the total attempt budget, first attempt included.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

// ── Gemini generation API ─────────────────────────────────────────────────
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-05-20";

// ── Anonymous identity (Firebase Identity Toolkit) ────────────────────────
pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

// ── HTTP client timeouts ──────────────────────────────────────────────────
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ── User-facing fallback replies ──────────────────────────────────────────
// Shown as model turns. Technical detail goes to the log only.
pub const DEGRADED_REPLY_TEXT: &str =
    "Sorry, I couldn't get a response from Gyan. Please try again.";
pub const FAILED_REPLY_TEXT: &str =
    "An error occurred while connecting to Gyan. Please check your network and try again.";

/// Message used for a terminal client error whose body carries no `error.message`.
pub const GENERIC_API_FAILURE: &str = "API request failed";

// ── Renderer strings ──────────────────────────────────────────────────────
pub const ASSISTANT_NAME: &str = "Gyan";
pub const EMPTY_CONVERSATION_HINT: &str = "Start a conversation with Gyan!";
pub const THINKING_INDICATOR: &str = "Gyan is thinking...";

// ── Configuration file + environment ──────────────────────────────────────
pub const CONFIG_DIR_NAME: &str = "gyan";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const ENV_GEMINI_API_KEY: &str = "GYAN_GEMINI_API_KEY";
pub const ENV_GEMINI_API_KEY_FALLBACK: &str = "GEMINI_API_KEY";
pub const ENV_MODEL: &str = "GYAN_MODEL";
pub const ENV_BASE_URL: &str = "GYAN_BASE_URL";
pub const ENV_MAX_RETRIES: &str = "GYAN_MAX_RETRIES";
pub const ENV_BASE_DELAY_MS: &str = "GYAN_BASE_DELAY_MS";
pub const ENV_FIREBASE_API_KEY: &str = "GYAN_FIREBASE_API_KEY";
pub const ENV_IDENTITY_ENDPOINT: &str = "GYAN_IDENTITY_ENDPOINT";
