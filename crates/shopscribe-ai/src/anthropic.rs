//! Anthropic Messages API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::credential::ApiKey;
use crate::generator::{GenerateError, GenerationRequest, Generator};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";

/// Connection settings for [`AnthropicClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: ApiKey,
    pub model: String,
    /// Like `https://api.anthropic.com`, no trailing slash needed.
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Some(Duration::from_secs(120)),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`Generator`] backed by the Anthropic Messages API.
///
/// Built once at startup and shared immutably across requests.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(config: ClientConfig) -> Result<Self, GenerateError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            api_key: config.api_key,
            model: config.model,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[async_trait]
impl Generator for AnthropicClient {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerateError> {
        let mut content = Vec::with_capacity(2);
        if let Some(url) = request.prompt.image_url.as_deref() {
            content.push(ContentBlock::Image {
                source: ImageSource::Url { url },
            });
        }
        content.push(ContentBlock::Text {
            text: &request.prompt.text,
        });

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: request.system,
            messages: vec![Message {
                role: "user",
                content,
            }],
        };

        debug!(model = %self.model, image = request.prompt.image_url.is_some(), "calling messages API");
        let resp = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(&body);
            return Err(if status == StatusCode::UNAUTHORIZED {
                GenerateError::Auth(message)
            } else {
                GenerateError::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let parsed: MessagesResponse = resp.json().await?;
        if let Some(usage) = &parsed.usage {
            info!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "generation complete"
            );
        }
        parsed
            .content
            .into_iter()
            .find_map(|block| match block {
                ResponseBlock::Text { text } => Some(text.trim().to_string()),
                ResponseBlock::Other => None,
            })
            .ok_or_else(|| GenerateError::Malformed("response has no text content".into()))
    }
}

/// Pull `error.message` out of an API error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

// ── Wire types ──

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ImageSource<'a> {
    Url { url: &'a str },
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Prompt;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::post;
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Option<(HeaderMap, serde_json::Value)>>>;

    /// Serve a single canned response on `/v1/messages` and capture the request.
    async fn mock_api(status: u16, body: &'static str) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(None));
        let sink = captured.clone();
        let app = Router::new().route(
            "/v1/messages",
            post(move |headers: HeaderMap, axum::Json(req): axum::Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = Some((headers, req));
                    (AxumStatus::from_u16(status).unwrap(), body)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/"), captured)
    }

    fn client(base_url: &str) -> AnthropicClient {
        let config = ClientConfig::new(ApiKey::new("sk-test")).base_url(base_url);
        AnthropicClient::new(config).unwrap()
    }

    fn request(prompt: Prompt) -> GenerationRequest<'static> {
        GenerationRequest {
            system: "be brief",
            prompt,
            max_tokens: 300,
        }
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let c = client("http://localhost:9999/");
        assert_eq!(c.messages_url(), "http://localhost:9999/v1/messages");
    }

    #[test]
    fn error_message_prefers_envelope() {
        let body = r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#;
        assert_eq!(error_message(body), "slow down");
        assert_eq!(error_message("  bad gateway \n"), "bad gateway");
    }

    #[tokio::test]
    async fn returns_first_text_block_trimmed() {
        let (url, captured) = mock_api(
            200,
            r#"{"content":[{"type":"text","text":"  Sour gummy worms.\n"}],"usage":{"input_tokens":10,"output_tokens":5}}"#,
        )
        .await;
        let text = client(&url)
            .generate(&request(Prompt::text("describe")))
            .await
            .unwrap();
        assert_eq!(text, "Sour gummy worms.");

        let (headers, body) = captured.lock().unwrap().take().unwrap();
        assert_eq!(headers["x-api-key"], "sk-test");
        assert_eq!(headers["anthropic-version"], API_VERSION);
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], 300);
        assert_eq!(body["system"], "be brief");
        assert_eq!(body["messages"][0]["content"][0]["type"], "text");
    }

    #[tokio::test]
    async fn image_part_precedes_text() {
        let (url, captured) =
            mock_api(200, r#"{"content":[{"type":"text","text":"ok"}]}"#).await;
        let prompt = Prompt::text("describe").with_image("https://cdn.example/img.png");
        client(&url).generate(&request(prompt)).await.unwrap();

        let (_, body) = captured.lock().unwrap().take().unwrap();
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["type"], "url");
        assert_eq!(content[0]["source"]["url"], "https://cdn.example/img.png");
        assert_eq!(content[1]["text"], "describe");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth() {
        let (url, _) = mock_api(
            401,
            r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
        )
        .await;
        let err = client(&url)
            .generate(&request(Prompt::text("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Auth(ref m) if m == "invalid x-api-key"));
    }

    #[tokio::test]
    async fn server_error_maps_to_api() {
        let (url, _) = mock_api(529, "overloaded").await;
        let err = client(&url)
            .generate(&request(Prompt::text("x")))
            .await
            .unwrap_err();
        match err {
            GenerateError::Api { status, message } => {
                assert_eq!(status, 529);
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_text_is_malformed() {
        let (url, _) = mock_api(200, r#"{"content":[{"type":"tool_use","id":"x"}]}"#).await;
        let err = client(&url)
            .generate(&request(Prompt::text("x")))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Malformed(_)));
    }
}
