//! LLM layer: the [`Generator`] seam, its Anthropic implementation, and API
//! credential resolution.

mod anthropic;
mod credential;
mod generator;

pub use anthropic::{AnthropicClient, ClientConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use credential::{API_KEY_VAR, ApiKey, CredentialError, load_api_key, resolve_api_key};
pub use generator::{GenerateError, GenerationRequest, Generator, Prompt};
