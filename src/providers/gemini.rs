//! Streaming client for the Gemini `streamGenerateContent` API.

use super::sse::SseDecoder;
use super::{FragmentStream, StreamInvoker};
use crate::config::Config;
use crate::error::RelayError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Sampling parameters sent with every invocation. Fixed constants for this
/// service, not user-configurable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GenerateContentChunk {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    text: String,
}

/// Gemini-backed [`StreamInvoker`]. Built once at startup; the credential
/// and model are fixed for the process lifetime.
pub struct GeminiInvoker {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    generation: GenerationConfig,
}

impl GeminiInvoker {
    /// The reqwest timeout is a whole-request deadline: it covers connect
    /// through the last body byte, so a stalled upstream stream cannot hold
    /// a request open forever.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            generation: GenerationConfig::default(),
        })
    }
}

#[async_trait]
impl StreamInvoker for GeminiInvoker {
    async fn invoke(&self, prompt: &str) -> Result<FragmentStream, RelayError> {
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );
        let request = GenerateContentRequest {
            // Single-turn session: one user content, no prior history.
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: &self.generation,
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::UpstreamInvocationFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "model invocation rejected");
            return Err(RelayError::UpstreamInvocationFailure(format!(
                "upstream returned {status}: {body}"
            )));
        }

        Ok(stream::try_unfold(InFlight::new(response), InFlight::step).boxed())
    }
}

struct InFlight {
    response: reqwest::Response,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

impl InFlight {
    fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn queue(&mut self, payload: &str) {
        if let Some(text) = fragment_text(payload) {
            self.pending.push_back(text);
        }
    }

    async fn step(mut self) -> Result<Option<(String, Self)>, RelayError> {
        loop {
            if let Some(text) = self.pending.pop_front() {
                return Ok(Some((text, self)));
            }
            if self.done {
                return Ok(None);
            }
            match self.response.chunk().await {
                Ok(Some(bytes)) => {
                    for payload in self.decoder.push(&bytes) {
                        self.queue(&payload);
                    }
                }
                Ok(None) => {
                    self.done = true;
                    if let Some(payload) = self.decoder.finish() {
                        self.queue(&payload);
                    }
                }
                Err(e) => {
                    return Err(RelayError::UpstreamInvocationFailure(e.to_string()));
                }
            }
        }
    }
}

/// Pull the text out of one streamed chunk. Chunks with no text (safety
/// metadata, usage counts) yield nothing; unparseable payloads are skipped
/// rather than killing a stream that is otherwise delivering.
fn fragment_text(payload: &str) -> Option<String> {
    let chunk: GenerateContentChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::warn!(error = %e, "skipping unparseable stream payload");
            return None;
        }
    };
    let text: String = chunk
        .candidates
        .into_iter()
        .flat_map(|c| c.content.parts)
        .map(|p| p.text)
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
