// Gyan Engine — AI Provider Registry
// Only the Gemini generation API is wired up.

pub mod google;

pub use google::{GeminiClient, Generation};
