//! Model providers.
//!
//! The gateway talks to the model through [`StreamInvoker`] so tests (and
//! any future provider) can substitute their own fragment source.

pub mod gemini;
pub mod sse;

use crate::error::RelayError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;

pub use gemini::{GeminiInvoker, GenerationConfig};

/// An ordered, finite sequence of model text fragments. Only the
/// concatenation in emission order is meaningful; an `Err` item ends the
/// sequence abruptly with no retraction of what was already yielded.
pub type FragmentStream = BoxStream<'static, Result<String, RelayError>>;

/// A single-turn streaming call to a generative model. Not restartable: a
/// fresh prompt requires a fresh invocation.
#[async_trait]
pub trait StreamInvoker: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<FragmentStream, RelayError>;
}
