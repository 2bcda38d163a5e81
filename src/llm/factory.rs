//! LLM client factory.

use crate::error::{BoxcarError, Result};
use crate::llm::openai::DEFAULT_MODEL;
use crate::llm::{LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig};

/// Creates an LLM client for the given provider.
///
/// For OpenAI the key is the `api_key` argument, else `OPENAI_API_KEY`. The
/// model is the `model` argument, else `OPENAI_MODEL`, else the default. A
/// set `OPENAI_BASE_URL` points the client at a compatible endpoint.
pub fn create_client(
    provider: LlmProvider,
    api_key: Option<String>,
    model: Option<String>,
) -> Result<Box<dyn LlmClient>> {
    match provider {
        LlmProvider::OpenAi => {
            let key = api_key
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| BoxcarError::llm("No API key configured. Set OPENAI_API_KEY."))?;
            let model = model
                .or_else(|| std::env::var("OPENAI_MODEL").ok())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string());

            let mut config = OpenAiConfig::new(key, model);
            if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
                config = config.with_base_url(base_url);
            }
            Ok(Box::new(OpenAiClient::new(config)?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}
