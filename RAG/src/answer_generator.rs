use crate::error::{RagError, Result};
use crate::models::*;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Produces an answer to `question` grounded in the retrieved segments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, segments: &[TextSegment], question: &str) -> Result<String>;
}

/// Model sampling settings fixed when a generator is built.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Collapses whitespace runs to one space and trims both ends.
pub fn clean_answer(raw: &str) -> String {
    WHITESPACE.replace_all(raw, " ").trim().to_string()
}

/// "Stuff" prompt: every retrieved segment goes into a single context block.
pub fn build_prompt(segments: &[TextSegment], question: &str) -> String {
    let context = segments
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
{context}\n\nQuestion: {question}\nHelpful Answer:"
    )
}

pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    config: GenerationConfig,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, base_url: String, config: GenerationConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        }
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiGenerator {
    async fn generate(&self, segments: &[TextSegment], question: &str) -> Result<String> {
        let request = OpenAiCompletionRequest {
            model: self.config.model.clone(),
            prompt: build_prompt(segments, question),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let completion: OpenAiCompletionResponse = response
            .json()
            .await
            .map_err(|e| RagError::Generation(format!("malformed completion: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| clean_answer(&choice.text))
            .ok_or_else(|| RagError::Generation("no completion returned".to_string()))
    }
}

pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    config: GenerationConfig,
}

impl GeminiGenerator {
    pub fn new(api_key: String, config: GenerationConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            config,
        }
    }
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    async fn generate(&self, segments: &[TextSegment], question: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: build_prompt(segments, question),
                }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            }),
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.config.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!("Gemini API error: {}", error_text)));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| RagError::Generation(format!("malformed completion: {}", e)))?;

        gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| clean_answer(&p.text))
            .ok_or_else(|| RagError::Generation("no candidates returned".to_string()))
    }
}
