//! Generation-client contract and HTTP implementation.
//!
//! A generation backend is a plain request/response endpoint: persona
//! instruction plus user text in, a single candidate reply out. The engine
//! only distinguishes two failure classes, [`GenerationError::Transport`]
//! (the request never made it) and [`GenerationError::Malformed`] (the
//! response came back in a shape we cannot read), because each maps to its
//! own user-visible fallback message.

use async_trait::async_trait;

use crate::api::models::{GenerateRequest, GenerateResponse};

pub mod models;

#[derive(Debug)]
pub enum GenerationError {
    /// Network or HTTP-level failure.
    Transport(String),

    /// The endpoint answered, but with no usable candidate text: missing
    /// candidate list, missing content parts, or an empty reply.
    Malformed(String),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::Transport(reason) => {
                write!(f, "generation transport error: {reason}")
            }
            GenerationError::Malformed(reason) => {
                write!(f, "malformed generation response: {reason}")
            }
        }
    }
}

impl std::error::Error for GenerationError {}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(
        &self,
        persona: Option<&str>,
        user_text: &str,
    ) -> Result<String, GenerationError>;
}

/// HTTP generation client speaking a candidates/parts JSON shape.
pub struct HttpGenerationClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpGenerationClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate(
        &self,
        persona: Option<&str>,
        user_text: &str,
    ) -> Result<String, GenerationError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request
            .json(&GenerateRequest::new(persona, user_text))
            .send()
            .await
            .map_err(|err| GenerationError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(GenerationError::Transport(format!(
                "generation request failed with status {status}: {error_text}"
            )));
        }

        let payload = response
            .json::<GenerateResponse>()
            .await
            .map_err(|err| GenerationError::Malformed(err.to_string()))?;

        extract_text(payload)
    }
}

/// Pulls the reply text out of a decoded response, concatenating the parts of
/// the first candidate.
fn extract_text(response: GenerateResponse) -> Result<String, GenerationError> {
    let candidate = response
        .candidates
        .and_then(|mut candidates| {
            if candidates.is_empty() {
                None
            } else {
                Some(candidates.remove(0))
            }
        })
        .ok_or_else(|| GenerationError::Malformed("response contained no candidates".to_string()))?;

    let parts = candidate
        .content
        .and_then(|content| content.parts)
        .filter(|parts| !parts.is_empty())
        .ok_or_else(|| {
            GenerationError::Malformed("candidate contained no content parts".to_string())
        })?;

    let text: String = parts.into_iter().map(|part| part.text).collect();
    if text.is_empty() {
        return Err(GenerationError::Malformed(
            "candidate text was empty".to_string(),
        ));
    }
    Ok(text)
}
