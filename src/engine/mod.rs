// Gyan Engine — conversation state, resilient dispatch and the Gemini client.
// Talks to the network only through the atoms::traits seams.

pub mod chat;
pub mod config;
pub mod dispatcher;
pub mod history;
pub mod http;
pub mod identity;
pub mod providers;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
