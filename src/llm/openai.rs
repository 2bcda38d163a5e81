//! Client for OpenAI-compatible chat completion endpoints.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{BoxcarError, Result};
use crate::llm::types::Message;
use crate::llm::LlmClient;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";

const MAX_ATTEMPTS: u32 = 3;
const FIRST_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// One failed request, and whether sending it again could help.
#[derive(Debug)]
struct Failure {
    error: BoxcarError,
    retry: bool,
}

impl Failure {
    fn fatal(msg: impl Into<String>) -> Self {
        Self {
            error: BoxcarError::llm(msg),
            retry: false,
        }
    }

    fn transient(msg: impl Into<String>) -> Self {
        Self {
            error: BoxcarError::llm(msg),
            retry: true,
        }
    }

    /// Classifies a non-success HTTP response.
    fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => {
                Self::fatal("Authentication failed. Check your OPENAI_API_KEY.")
            }
            StatusCode::TOO_MANY_REQUESTS => Self::transient("Rate limited. Please wait and try again."),
            _ => {
                let detail = serde_json::from_str::<ErrorBody>(body)
                    .map(|b| b.error.message)
                    .unwrap_or_else(|_| format!("({status}) {body}"));
                let msg = format!("OpenAI API error: {detail}");
                if status.is_server_error() {
                    Self::transient(msg)
                } else {
                    Self::fatal(msg)
                }
            }
        }
    }

    fn from_request(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::transient("Request timed out.")
        } else if error.is_connect() {
            Self::transient(format!("Failed to connect to the OpenAI API: {error}"))
        } else {
            Self::fatal(format!("Request failed: {error}"))
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BoxcarError::llm(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn send(&self, request: &ChatRequest<'_>) -> std::result::Result<String, Failure> {
        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Failure::from_request(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Failure::fatal(format!("Failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(Failure::from_status(status, &body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| Failure::fatal(format!("Failed to parse response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Failure::fatal("OpenAI returned no completion"))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: 0.0,
        };

        let mut delay = FIRST_RETRY_DELAY;
        for attempt in 1..=MAX_ATTEMPTS {
            debug!("Chat completion request {}/{}", attempt, MAX_ATTEMPTS);
            match self.send(&request).await {
                Ok(content) => return Ok(content),
                Err(failure) if failure.retry && attempt < MAX_ATTEMPTS => {
                    warn!("{}; retrying in {:?}", failure.error, delay);
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(failure) => return Err(failure.error),
            }
        }
        Err(BoxcarError::internal("retry loop ended without a result"))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
