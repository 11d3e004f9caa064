pub mod classifier;
pub mod config;
pub mod db;
pub mod environment;
pub mod grouping;
pub mod linker;
pub mod llm;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod similarity;
pub mod synthesis;
pub mod topics;

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;

pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_DB: &str = "db_query";

#[derive(Clone, Debug)]
pub enum LLMClient {
    Ollama(Ollama),
    OpenAI(OpenAIClient<OpenAIConfig>),
}

#[derive(Clone, Debug)]
pub struct LLMParams {
    pub llm_client: LLMClient,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}
