use crate::embedding_service::{cosine_similarity, Embedder};
use crate::error::{RagError, Result};
use crate::models::{ScoredSegment, TextSegment};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

pub const DEFAULT_SEARCH_K: usize = 4;
const EMBED_BATCH_SIZE: usize = 64;

/// Backing storage for named collections of embedded segments.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Appends segments to `index_name`, creating the index when it does not exist.
    async fn add_segments(
        &self,
        index_name: &str,
        segments: &[TextSegment],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<()>;

    /// Top `k` segments by similarity, best first.
    async fn similarity_search(
        &self,
        index_name: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredSegment>>;

    /// Removes the index and every segment stored under it.
    async fn drop_index(&self, index_name: &str) -> Result<()>;
}

/// Handle to one populated index, bundled with the embedder used to fill it.
pub struct VectorIndex {
    name: String,
    segment_count: usize,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl VectorIndex {
    pub async fn build(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        index_name: impl Into<String>,
        segments: &[TextSegment],
    ) -> Result<Self> {
        let name = index_name.into();

        for batch in segments.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|s| s.content.clone()).collect();
            let embeddings = embedder.embed_documents(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            store.add_segments(&name, batch, embeddings).await?;
        }

        log::info!("Indexed {} segments under '{}'", segments.len(), name);

        Ok(Self {
            name,
            segment_count: segments.len(),
            store,
            embedder,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.segment_count
    }

    pub fn is_empty(&self) -> bool {
        self.segment_count == 0
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredSegment>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_query(query).await?;
        let results = self
            .store
            .similarity_search(&self.name, &query_embedding, k)
            .await?;

        log::debug!("Found {} relevant segments in '{}'", results.len(), self.name);
        Ok(results)
    }

    pub async fn delete(self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        self.store.drop_index(&self.name).await
    }
}

/// Brute-force cosine search over segments held in process memory.
#[derive(Default)]
pub struct InMemoryVectorStore {
    indexes: RwLock<HashMap<String, Vec<(TextSegment, Vec<f32>)>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn index_names(&self) -> Vec<String> {
        self.indexes.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_segments(
        &self,
        index_name: &str,
        segments: &[TextSegment],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        let entries = indexes.entry(index_name.to_string()).or_default();
        entries.extend(segments.iter().cloned().zip(embeddings));
        Ok(())
    }

    async fn similarity_search(
        &self,
        index_name: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredSegment>> {
        let indexes = self.indexes.read().await;
        let entries = indexes
            .get(index_name)
            .ok_or_else(|| RagError::IndexUnavailable(format!("unknown index '{}'", index_name)))?;

        let mut scored: Vec<ScoredSegment> = entries
            .iter()
            .map(|(segment, embedding)| ScoredSegment {
                segment: segment.clone(),
                score: cosine_similarity(query_embedding, embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn drop_index(&self, index_name: &str) -> Result<()> {
        self.indexes.write().await.remove(index_name);
        Ok(())
    }
}

/// RediSearch-backed store: one FLAT cosine index per name over
/// hashes keyed `doc:<index>:<segment id>`.
///
/// One multiplexed connection is opened on first use and cloned per call.
pub struct RedisVectorStore {
    client: redis::Client,
    connection: OnceCell<MultiplexedConnection>,
}

impl RedisVectorStore {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let con = self
            .connection
            .get_or_try_init(|| self.client.get_multiplexed_async_connection())
            .await?;
        Ok(con.clone())
    }

    fn is_connected(&self) -> bool {
        self.connection.initialized()
    }
}

fn key_prefix(index_name: &str) -> String {
    format!("doc:{}:", index_name)
}

fn create_index_cmd(index_name: &str, dimensions: usize) -> redis::Cmd {
    let mut cmd = redis::cmd("FT.CREATE");
    cmd.arg(index_name)
        .arg("ON")
        .arg("HASH")
        .arg("PREFIX")
        .arg(1)
        .arg(key_prefix(index_name))
        .arg("SCHEMA")
        .arg("content")
        .arg("TEXT")
        .arg("content_vector")
        .arg("VECTOR")
        .arg("FLAT")
        .arg(6)
        .arg("TYPE")
        .arg("FLOAT32")
        .arg("DIM")
        .arg(dimensions)
        .arg("DISTANCE_METRIC")
        .arg("COSINE");
    cmd
}

fn hset_cmd(index_name: &str, segment: &TextSegment, embedding: &[f32]) -> redis::Cmd {
    let mut cmd = redis::cmd("HSET");
    cmd.arg(format!("{}{}", key_prefix(index_name), segment.id))
        .arg("content")
        .arg(&segment.content)
        .arg("content_vector")
        .arg(vector_bytes(embedding));
    cmd
}

fn search_cmd(index_name: &str, query_embedding: &[f32], k: usize) -> redis::Cmd {
    let mut cmd = redis::cmd("FT.SEARCH");
    cmd.arg(index_name)
        .arg(format!("*=>[KNN {} @content_vector $vector AS vector_score]", k))
        .arg("PARAMS")
        .arg(2)
        .arg("vector")
        .arg(vector_bytes(query_embedding))
        .arg("SORTBY")
        .arg("vector_score")
        .arg("ASC")
        .arg("RETURN")
        .arg(2)
        .arg("content")
        .arg("vector_score")
        .arg("LIMIT")
        .arg(0)
        .arg(k)
        .arg("DIALECT")
        .arg(2);
    cmd
}

/// An existing index is appended to rather than treated as a failure.
fn index_creation_result(index_name: &str, created: redis::RedisResult<()>) -> Result<()> {
    match created {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("Index already exists") => {
            log::debug!("Index '{}' exists, appending", index_name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl VectorStore for RedisVectorStore {
    async fn add_segments(
        &self,
        index_name: &str,
        segments: &[TextSegment],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<()> {
        let Some(dimensions) = embeddings.first().map(Vec::len) else {
            return Ok(());
        };

        let mut con = self.connection().await?;
        let created = create_index_cmd(index_name, dimensions)
            .query_async(&mut con)
            .await;
        index_creation_result(index_name, created)?;

        let mut pipe = redis::pipe();
        for (segment, embedding) in segments.iter().zip(&embeddings) {
            pipe.add_command(hset_cmd(index_name, segment, embedding)).ignore();
        }
        let () = pipe.query_async(&mut con).await?;
        Ok(())
    }

    async fn similarity_search(
        &self,
        index_name: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredSegment>> {
        let mut con = self.connection().await?;
        let reply: Value = search_cmd(index_name, query_embedding, k)
            .query_async(&mut con)
            .await?;

        parse_search_reply(&reply, &key_prefix(index_name))
    }

    async fn drop_index(&self, index_name: &str) -> Result<()> {
        let mut con = self.connection().await?;
        let () = redis::cmd("FT.DROPINDEX")
            .arg(index_name)
            .arg("DD")
            .query_async(&mut con)
            .await?;
        Ok(())
    }
}

fn vector_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        _ => None,
    }
}

/// Parses `[total, key, [field, value, ...], key, [...], ...]`.
fn parse_search_reply(reply: &Value, key_prefix: &str) -> Result<Vec<ScoredSegment>> {
    let Value::Array(items) = reply else {
        return Err(RagError::IndexUnavailable(format!(
            "unexpected FT.SEARCH reply: {:?}",
            reply
        )));
    };

    let mut results = Vec::new();
    for pair in items.get(1..).unwrap_or_default().chunks(2) {
        let [key, Value::Array(fields)] = pair else {
            continue;
        };
        let Some(key) = value_to_string(key) else {
            continue;
        };

        let mut content = None;
        let mut distance = None;
        for field in fields.chunks(2) {
            let [name, value] = field else { continue };
            match value_to_string(name).as_deref() {
                Some("content") => content = value_to_string(value),
                Some("vector_score") => {
                    distance = value_to_string(value).and_then(|s| s.parse::<f32>().ok())
                }
                _ => {}
            }
        }

        if let Some(content) = content {
            let id = key.strip_prefix(key_prefix).unwrap_or(&key).to_string();
            results.push(ScoredSegment {
                segment: TextSegment { id, content },
                score: 1.0 - distance.unwrap_or(1.0),
            });
        }
    }

    Ok(results)
}
