//! Best-effort prompt rewriting through a chat-completion API

use img2img_config::EnhancerConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Instruction sent ahead of every user prompt
pub const SYSTEM_PROMPT: &str = "Given this topic, come up with the best SDXL prompt. Make sure to include these exact words in the prompt: watercolor, abstract, digital art.

Return ONLY the enhanced prompt, nothing else. Make it concise and optimized for SDXL image generation. Do not mention people in the prompt.";

/// Where the text of an [`EnhancedPrompt`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSource {
    /// Rewritten by the remote model
    Enhanced,
    /// Enhancement was skipped or failed; the input is passed through
    Original,
}

/// Prompt to condition the model on. Always populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedPrompt {
    pub text: String,
    pub source: PromptSource,
}

impl EnhancedPrompt {
    pub fn original(prompt: &str) -> Self {
        Self {
            text: prompt.to_string(),
            source: PromptSource::Original,
        }
    }

    pub fn enhanced(text: String) -> Self {
        Self {
            text,
            source: PromptSource::Enhanced,
        }
    }

    pub fn is_enhanced(&self) -> bool {
        self.source == PromptSource::Enhanced
    }
}

/// Rewrites a raw user prompt into one better suited to the model.
///
/// Implementations must not fail: on any problem they hand back the input.
#[allow(async_fn_in_trait)]
pub trait PromptEnhancer {
    async fn enhance(&self, prompt: &str) -> EnhancedPrompt;
}

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("HTTP status {0}")]
    Status(StatusCode),

    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(reqwest::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for EnhanceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EnhanceError::Timeout
        } else {
            EnhanceError::Request(e)
        }
    }
}

/// Enhancer backed by an OpenAI-compatible `/v1/chat/completions` route
pub struct ChatCompletionEnhancer {
    client: Client,
    config: EnhancerConfig,
}

impl ChatCompletionEnhancer {
    pub fn new(config: EnhancerConfig) -> Result<Self, EnhanceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(EnhanceError::Request)?;

        if !config.has_credential() {
            warn!("No chat-completion API key configured, prompts will be used as-is");
        }

        Ok(Self { client, config })
    }

    async fn request(&self, api_key: &str, prompt: &str) -> Result<String, EnhanceError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = self.config.completions_url();
        debug!("Requesting prompt enhancement from {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(EnhanceError::Status(status));
        }

        let bytes = response.bytes().await?;
        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|e| EnhanceError::Malformed(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| EnhanceError::Malformed("no message content".into()))?;

        Ok(content.trim().to_string())
    }
}

impl PromptEnhancer for ChatCompletionEnhancer {
    async fn enhance(&self, prompt: &str) -> EnhancedPrompt {
        let Some(api_key) = self.config.api_key.as_deref() else {
            warn!("No chat-completion API key found, using original prompt");
            return EnhancedPrompt::original(prompt);
        };

        match self.request(api_key, prompt).await {
            Ok(enhanced) => {
                info!("Original prompt: {}", prompt);
                info!("Enhanced prompt: {}", enhanced);
                EnhancedPrompt::enhanced(enhanced)
            }
            Err(EnhanceError::Status(status)) => {
                warn!("Chat-completion API error: {}", status);
                EnhancedPrompt::original(prompt)
            }
            Err(e) => {
                error!("Error enhancing prompt: {}", e);
                EnhancedPrompt::original(prompt)
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockChatServer, capture_logs, closed_url};
    use std::time::Duration;

    const WATERCOLOR_REPLY: &str = r#"{"choices":[{"message":{"role":"assistant","content":" soft watercolor mountains, abstract digital art "}}]}"#;

    fn enhancer_for(endpoint: &str, api_key: Option<&str>) -> ChatCompletionEnhancer {
        ChatCompletionEnhancer::new(EnhancerConfig {
            api_key: api_key.map(str::to_string),
            endpoint: endpoint.to_string(),
            timeout: Duration::from_millis(500),
            ..EnhancerConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_no_credential_returns_input() {
        let server = MockChatServer::start(200, WATERCOLOR_REPLY).await;
        let enhancer = enhancer_for(&server.url, None);

        let (logs, _guard) = capture_logs();
        let result = enhancer.enhance("sunset over mountains").await;

        assert_eq!(result.text, "sunset over mountains");
        assert_eq!(result.source, PromptSource::Original);
        assert_eq!(server.hits().await, 0);

        let logs = logs.contents();
        assert!(logs.contains("WARN"));
        assert!(logs.contains("No chat-completion API key found"));
    }

    #[tokio::test]
    async fn test_success_is_trimmed() {
        let server = MockChatServer::start(200, WATERCOLOR_REPLY).await;
        let enhancer = enhancer_for(&server.url, Some("sk-test"));

        let result = enhancer.enhance("mountains").await;

        assert!(result.is_enhanced());
        assert_eq!(result.text, "soft watercolor mountains, abstract digital art");
        assert_eq!(server.hits().await, 1);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let server = MockChatServer::start(200, WATERCOLOR_REPLY).await;
        let enhancer = enhancer_for(&server.url, Some("sk-test"));
        enhancer.enhance("ocean waves").await;

        let requests = server.requests().await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.url.path(), "/v1/chat/completions");
        let auth = request.headers.get("authorization").unwrap();
        assert_eq!(auth.to_str().unwrap(), "Bearer sk-test");

        let body: serde_json::Value = request.body_json().unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 100);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "ocean waves");
    }

    #[tokio::test]
    async fn test_error_status_falls_back() {
        let server =
            MockChatServer::start(429, r#"{"error":{"message":"rate limited"}}"#).await;
        let enhancer = enhancer_for(&server.url, Some("sk-test"));

        let result = enhancer.enhance("ocean waves").await;

        assert_eq!(result, EnhancedPrompt::original("ocean waves"));
        assert_eq!(server.hits().await, 1);
    }

    #[tokio::test]
    async fn test_malformed_body_falls_back() {
        let server = MockChatServer::start(200, r#"{"choices":[]}"#).await;
        let enhancer = enhancer_for(&server.url, Some("sk-test"));
        assert_eq!(
            enhancer.enhance("ocean waves").await,
            EnhancedPrompt::original("ocean waves")
        );

        let server = MockChatServer::start(200, "not json").await;
        let enhancer = enhancer_for(&server.url, Some("sk-test"));
        assert_eq!(
            enhancer.enhance("ocean waves").await,
            EnhancedPrompt::original("ocean waves")
        );
    }

    #[tokio::test]
    async fn test_blank_content_is_returned_trimmed() {
        let server =
            MockChatServer::start(200, r#"{"choices":[{"message":{"content":"   "}}]}"#).await;
        let enhancer = enhancer_for(&server.url, Some("sk-test"));

        let result = enhancer.enhance("ocean waves").await;

        assert_eq!(result.text, "");
        assert_eq!(result.source, PromptSource::Enhanced);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let server = MockChatServer::silent().await;
        let enhancer = ChatCompletionEnhancer::new(EnhancerConfig {
            api_key: Some("sk-test".into()),
            endpoint: server.url.clone(),
            timeout: Duration::from_millis(200),
            ..EnhancerConfig::default()
        })
        .unwrap();

        let result = enhancer.enhance("ocean waves").await;
        assert_eq!(result, EnhancedPrompt::original("ocean waves"));
    }

    #[tokio::test]
    async fn test_connection_refused_falls_back() {
        let url = closed_url().await;
        let enhancer = enhancer_for(&url, Some("sk-test"));

        let (logs, _guard) = capture_logs();
        let result = enhancer.enhance("ocean waves").await;

        assert_eq!(result.text, "ocean waves");
        assert!(logs.contents().contains("Error enhancing prompt"));
    }
}
