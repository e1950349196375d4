//! gemini-relay: relays user text and document uploads to Gemini and
//! streams the reply back as `data:` server-push frames.
//!
//! Server path: multipart request → content extraction → prompt assembly →
//! streaming model invocation → chunked response. Client path: chunked
//! reads → UTF-8 boundary-carry decoding → frame accumulation → transcript.

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod prompt;
pub mod providers;
pub mod spool;
