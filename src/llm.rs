use anyhow::{anyhow, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
};
use async_openai::Client as OpenAIClient;
use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::generation::parameters::FormatType;
use ollama_rs::Ollama;
use serde::Serialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{GeneratorConfig, Provider};
use crate::synthesis::DraftResponse;
use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

pub mod schema;
#[cfg(test)]
pub(crate) mod testing;

use schema::StructuredOutput;

const SYSTEM_PROMPT: &str = "你是专业的新闻事件分析师。只返回符合要求的JSON对象，不要添加任何解释。";

/// One member article as sent to the generation endpoint.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ArticlePayload {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub description: String,
    pub source: String,
    pub category: String,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
}

/// Request for one event draft: the member articles plus free-text instructions.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SynthesisRequest {
    pub articles: Vec<ArticlePayload>,
    pub instructions: String,
}

impl SynthesisRequest {
    /// Flattens the request into a single prompt for completion-style backends.
    pub fn to_prompt(&self) -> String {
        let articles = serde_json::to_string_pretty(&self.articles).unwrap_or_default();
        format!("{}\n\n原始新闻数据：\n{}", self.instructions, articles)
    }
}

/// A text-generation backend that turns a synthesis request into raw model output.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human readable backend description for logs.
    fn describe(&self) -> String;

    async fn generate(&self, request: &SynthesisRequest) -> Result<String>;
}

/// [`TextGenerator`] backed by an OpenAI-compatible API or a local Ollama server.
#[derive(Clone, Debug)]
pub struct LlmGenerator {
    params: LLMParams,
}

impl LlmGenerator {
    pub fn new(params: LLMParams) -> Self {
        Self { params }
    }

    /// Builds a generator when a credential is available; `None` selects the
    /// heuristic path.
    pub fn from_config(config: &GeneratorConfig) -> Option<Self> {
        if !config.has_credentials() {
            return None;
        }

        let llm_client = match config.provider {
            Provider::OpenAI => {
                let api_key = config.usable_api_key()?;
                let openai_config = OpenAIConfig::new()
                    .with_api_key(api_key)
                    .with_api_base(&config.api_endpoint);
                LLMClient::OpenAI(OpenAIClient::with_config(openai_config))
            }
            Provider::Ollama => {
                info!(
                    target: TARGET_LLM_REQUEST,
                    "Connecting to Ollama at {}:{}", config.ollama_host, config.ollama_port
                );
                LLMClient::Ollama(Ollama::new(config.ollama_host.clone(), config.ollama_port))
            }
        };

        Some(Self::new(LLMParams {
            llm_client,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        }))
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    fn describe(&self) -> String {
        let provider = match self.params.llm_client {
            LLMClient::Ollama(_) => "ollama",
            LLMClient::OpenAI(_) => "openai",
        };
        format!("{} ({})", provider, self.params.model)
    }

    async fn generate(&self, request: &SynthesisRequest) -> Result<String> {
        let schema = DraftResponse::openai_schema();
        generate_llm_response(&request.to_prompt(), &self.params, Some(&schema))
            .await
            .ok_or_else(|| anyhow!("No response from {}", self.describe()))
    }
}

/// Sends one prompt to the configured backend. When `schema` is given the
/// backend is asked for JSON output: a strict JSON schema for OpenAI-compatible
/// APIs, plain JSON mode for Ollama.
///
/// Makes a single attempt bounded by `params.timeout_secs`; failures are logged
/// and reported as `None`.
pub async fn generate_llm_response(
    prompt: &str,
    params: &LLMParams,
    schema: Option<&serde_json::Value>,
) -> Option<String> {
    let limit = Duration::from_secs(params.timeout_secs);
    debug!(target: TARGET_LLM_REQUEST, "Sending LLM request with prompt: {}", prompt);

    let response = match &params.llm_client {
        LLMClient::Ollama(ollama) => {
            let mut request = GenerationRequest::new(params.model.clone(), prompt.to_string());
            request.options = Some(GenerationOptions::default().temperature(params.temperature));
            if schema.is_some() {
                request.format = Some(FormatType::Json);
            }

            match timeout(limit, ollama.generate(request)).await {
                Ok(Ok(response)) => Some(response.response),
                Ok(Err(e)) => {
                    warn!(target: TARGET_LLM_REQUEST, "Error generating response: {}", e);
                    None
                }
                Err(_) => {
                    warn!(target: TARGET_LLM_REQUEST, "LLM request timed out after {:?}", limit);
                    None
                }
            }
        }
        LLMClient::OpenAI(client) => {
            let request = match build_openai_request(prompt, params, schema) {
                Ok(request) => request,
                Err(e) => {
                    warn!(target: TARGET_LLM_REQUEST, "Failed to build OpenAI request: {}", e);
                    return None;
                }
            };

            match timeout(limit, client.chat().create(request)).await {
                Ok(Ok(response)) => response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content),
                Ok(Err(e)) => {
                    warn!(target: TARGET_LLM_REQUEST, "Error generating response: {}", e);
                    None
                }
                Err(_) => {
                    warn!(target: TARGET_LLM_REQUEST, "LLM request timed out after {:?}", limit);
                    None
                }
            }
        }
    };

    match response {
        Some(text) if !text.trim().is_empty() => {
            debug!(target: TARGET_LLM_REQUEST, "LLM response received: {}", text);
            Some(text)
        }
        _ => None,
    }
}

fn build_openai_request(
    prompt: &str,
    params: &LLMParams,
    schema: Option<&serde_json::Value>,
) -> Result<async_openai::types::CreateChatCompletionRequest> {
    let mut builder = CreateChatCompletionRequestArgs::default();
    builder
        .model(&params.model)
        .messages(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into(),
        ])
        .temperature(params.temperature)
        .max_completion_tokens(params.max_tokens);

    if let Some(schema) = schema {
        builder.response_format(ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: Some("Synthesized news event".to_string()),
                name: "event_draft".to_string(),
                schema: Some(schema.clone()),
                strict: Some(true),
            },
        });
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_instructions_and_articles() {
        let request = SynthesisRequest {
            articles: vec![ArticlePayload {
                title: "人工智能大会开幕".to_string(),
                content: String::new(),
                summary: "摘要".to_string(),
                description: String::new(),
                source: "新华网".to_string(),
                category: "科技".to_string(),
                published_at: "2025-03-01 08:00:00".to_string(),
            }],
            instructions: "请生成事件".to_string(),
        };

        let prompt = request.to_prompt();
        assert!(prompt.starts_with("请生成事件"));
        assert!(prompt.contains("人工智能大会开幕"));
        assert!(prompt.contains("\"publishedAt\""));
    }

    #[test]
    fn test_no_generator_without_credentials() {
        assert!(LlmGenerator::from_config(&GeneratorConfig::default()).is_none());

        let config = GeneratorConfig {
            api_key: Some("sk-test".to_string()),
            ..GeneratorConfig::default()
        };
        let generator = LlmGenerator::from_config(&config).unwrap();
        assert!(generator.describe().starts_with("openai"));
    }

    #[test]
    fn test_openai_request_uses_strict_schema() {
        let config = GeneratorConfig {
            api_key: Some("sk-test".to_string()),
            ..GeneratorConfig::default()
        };
        let generator = LlmGenerator::from_config(&config).unwrap();
        let schema = DraftResponse::openai_schema();

        let request = build_openai_request("prompt", &generator.params, Some(&schema)).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
    }
}
