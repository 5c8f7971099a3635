use async_trait::async_trait;
use thiserror::Error;

/// Failure modes of a remote generation call.
#[derive(Error, Debug)]
pub enum GenerateError {
    /// The remote service rejected the credential.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Any other non-success response (rate limit, server error, bad request).
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The response decoded but carried no usable text.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// User prompt: text plus an optional image shown to the model before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub image_url: Option<String>,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// A single-turn request: fixed system instruction, one user prompt.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub system: &'a str,
    pub prompt: Prompt,
    pub max_tokens: u32,
}

/// A remote text generator.
///
/// Implementations make exactly one remote call per [`generate`](Self::generate)
/// and never retry; retry policy belongs to the caller.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the first text segment of the response, trimmed.
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerateError>;
}
