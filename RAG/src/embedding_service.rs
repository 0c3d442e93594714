use crate::error::{RagError, Result};
use crate::models::*;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Turns text into vectors for similarity search.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(&[query.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("no embedding returned for query".to_string()))
    }
}

pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = OpenAiEmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let mut body: OpenAiEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        if body.data.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = format!("models/{}", self.model);
        let request = GeminiBatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| GeminiEmbedRequest {
                    model: model.clone(),
                    content: GeminiContent {
                        parts: vec![GeminiPart { text: text.clone() }],
                    },
                })
                .collect(),
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/{}:batchEmbedContents?key={}",
            model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!("Gemini API error: {}", error_text)));
        }

        let body: GeminiBatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        if body.embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.embeddings.len()
            )));
        }

        Ok(body.embeddings.into_iter().map(|e| e.values).collect())
    }
}

/// Hashed bag-of-words vectors, computed in-process.
///
/// Scores lexical overlap only; meant for offline runs and tests.
pub struct LocalEmbedder {
    dimensions: usize,
}

impl LocalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];
        let words = tokenize(text);
        let total_words = words.len() as f32;

        for (word, count) in count_words(&words) {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let idx = (hasher.finish() % self.dimensions as u64) as usize;
            embedding[idx] += count as f32 / total_words;
        }

        // Normalize
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in embedding.iter_mut() {
                *value /= norm;
            }
        }

        embedding
    }
}

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new(512)
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|word| word.len() > 2)
        .collect()
}

fn count_words(words: &[String]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for word in words {
        *counts.entry(word.as_str()).or_insert(0) += 1;
    }
    counts
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_embeddings_are_normalized() {
        let embedder = LocalEmbedder::new(64);
        let vectors = embedder
            .embed_documents(&["The sky is blue today".to_string()])
            .await
            .unwrap();

        let norm: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn related_text_scores_higher() {
        let embedder = LocalEmbedder::default();
        let query = embedder.embed_query("What color is the sky?").await.unwrap();
        let docs = embedder
            .embed_documents(&[
                "The sky is blue.".to_string(),
                "Invoices are due within thirty days.".to_string(),
            ])
            .await
            .unwrap();

        assert!(cosine_similarity(&query, &docs[0]) > cosine_similarity(&query, &docs[1]));
    }

    #[tokio::test]
    async fn text_without_words_embeds_to_zero_vector() {
        let embedder = LocalEmbedder::new(8);
        let vector = embedder.embed_query("?! a b").await.unwrap();
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
    }
}
