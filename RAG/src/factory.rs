//! Picks the vector store, embedder and generator variants named in [`Settings`].

use crate::answer_generator::{AnswerGenerator, GeminiGenerator, GenerationConfig, OpenAiGenerator};
use crate::config::{EmbeddingProvider, LlmProvider, Settings, VectorStoreKind};
use crate::embedding_service::{Embedder, GeminiEmbedder, LocalEmbedder, OpenAiEmbedder};
use crate::query_service::{PipelineOptions, QueryService};
use crate::text_splitter::DEFAULT_SEPARATOR;
use crate::vector_store::{InMemoryVectorStore, RedisVectorStore, VectorStore};
use anyhow::{anyhow, Result};
use std::sync::Arc;

pub fn build_vector_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    Ok(match settings.vector_store {
        VectorStoreKind::Redis => Arc::new(RedisVectorStore::new(&settings.redis_url)?),
        VectorStoreKind::Memory => Arc::new(InMemoryVectorStore::new()),
    })
}

pub fn build_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    Ok(match settings.embedding_provider {
        EmbeddingProvider::OpenAi => Arc::new(OpenAiEmbedder::new(
            openai_key(settings)?,
            settings.openai_base_url.clone(),
            settings.openai_embedding_model.clone(),
        )),
        EmbeddingProvider::Gemini => Arc::new(GeminiEmbedder::new(
            gemini_key(settings)?,
            settings.gemini_embedding_model.clone(),
        )),
        EmbeddingProvider::Local => Arc::new(LocalEmbedder::default()),
    })
}

pub fn build_generator(settings: &Settings) -> Result<Arc<dyn AnswerGenerator>> {
    Ok(match settings.llm_provider {
        LlmProvider::OpenAi => Arc::new(OpenAiGenerator::new(
            openai_key(settings)?,
            settings.openai_base_url.clone(),
            GenerationConfig {
                model: settings.openai_completion_model.clone(),
                temperature: settings.llm_temperature,
                max_tokens: settings.llm_max_tokens,
            },
        )),
        LlmProvider::Gemini => Arc::new(GeminiGenerator::new(
            gemini_key(settings)?,
            GenerationConfig {
                model: settings.gemini_model.clone(),
                temperature: settings.llm_temperature,
                max_tokens: settings.llm_max_tokens,
            },
        )),
    })
}

pub fn build_query_service(settings: &Settings) -> Result<QueryService> {
    let options = PipelineOptions {
        separator: DEFAULT_SEPARATOR.to_string(),
        chunk_size: settings.chunk_size,
        chunk_overlap: settings.chunk_overlap,
        index_prefix: settings.index_prefix.clone(),
        search_k: settings.search_k,
    };

    Ok(QueryService::new(
        build_vector_store(settings)?,
        build_embedder(settings)?,
        build_generator(settings)?,
        options,
    )?)
}

fn openai_key(settings: &Settings) -> Result<String> {
    settings
        .openai_api_key
        .clone()
        .ok_or_else(|| anyhow!("OPENAI_API_KEY environment variable not set"))
}

fn gemini_key(settings: &Settings) -> Result<String> {
    settings
        .gemini_api_key
        .clone()
        .ok_or_else(|| anyhow!("GEMINI_API_KEY environment variable not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| {
            pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    #[test]
    fn builds_offline_pipeline() {
        let settings = settings(&[
            ("TIMEZONE", "UTC"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
            ("VECTOR_STORE", "memory"),
            ("EMBEDDING_PROVIDER", "local"),
            ("LLM_PROVIDER", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
        ]);
        assert!(build_query_service(&settings).is_ok());
    }

    #[test]
    fn redis_store_builds_without_connecting() {
        let settings = settings(&[
            ("TIMEZONE", "UTC"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
            ("OPENAI_API_KEY", "sk-test"),
        ]);
        assert!(build_vector_store(&settings).is_ok());
    }

    #[test]
    fn invalid_redis_url_is_rejected() {
        let mut settings = settings(&[
            ("TIMEZONE", "UTC"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
            ("OPENAI_API_KEY", "sk-test"),
        ]);
        settings.redis_url = "not a url".to_string();
        assert!(build_vector_store(&settings).is_err());
    }
}
