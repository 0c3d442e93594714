use anyhow::{anyhow, Context, Result};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorStoreKind {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    OpenAi,
    Gemini,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Gemini,
}

impl FromStr for VectorStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!("Unknown vector database type: {}", other)),
        }
    }
}

impl FromStr for EmbeddingProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "local" => Ok(Self::Local),
            other => Err(anyhow!("Unknown embedding provider: {}", other)),
        }
    }
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(anyhow!("Unknown QA chain type: {}", other)),
        }
    }
}

/// Process configuration, read once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Settings {
    pub timezone: String,
    pub redis_url: String,
    pub bind_addr: String,
    pub vector_store: VectorStoreKind,
    pub embedding_provider: EmbeddingProvider,
    pub llm_provider: LlmProvider,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_completion_model: String,
    pub openai_embedding_model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_embedding_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub index_prefix: String,
    pub search_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_upload_bytes: usize,
    pub log_file: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                anyhow!(
                    "KEY \"{}\" NOT FOUND IN THE ENVIRONMENT FILE. PLEASE ADD TO PROCEED",
                    key
                )
            })
        };
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let settings = Self {
            timezone: required("TIMEZONE")?,
            redis_url: required("REDIS_URL")?,
            bind_addr: or_default("BIND_ADDR", "0.0.0.0:8000"),
            vector_store: parse(&get, "VECTOR_STORE", VectorStoreKind::Redis)?,
            embedding_provider: parse(&get, "EMBEDDING_PROVIDER", EmbeddingProvider::OpenAi)?,
            llm_provider: parse(&get, "LLM_PROVIDER", LlmProvider::OpenAi)?,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_completion_model: or_default("OPENAI_COMPLETION_MODEL", "gpt-3.5-turbo-instruct"),
            openai_embedding_model: or_default("OPENAI_EMBEDDING_MODEL", "text-embedding-ada-002"),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: or_default("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_embedding_model: or_default("GEMINI_EMBEDDING_MODEL", "text-embedding-004"),
            llm_temperature: parse(&get, "LLM_TEMPERATURE", 0.7)?,
            llm_max_tokens: parse(&get, "LLM_MAX_TOKENS", 256)?,
            index_prefix: or_default("INDEX_PREFIX", "reviewidx"),
            search_k: parse(&get, "SEARCH_K", 4)?,
            chunk_size: parse(&get, "CHUNK_SIZE", 800)?,
            chunk_overlap: parse(&get, "CHUNK_OVERLAP", 200)?,
            max_upload_bytes: parse(&get, "MAX_UPLOAD_BYTES", 25 * 1024 * 1024)?,
            log_file: get("LOG_FILE"),
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let needs_openai = self.llm_provider == LlmProvider::OpenAi
            || self.embedding_provider == EmbeddingProvider::OpenAi;
        if needs_openai && self.openai_api_key.is_none() {
            return Err(anyhow!("OPENAI_API_KEY environment variable not set"));
        }

        let needs_gemini = self.llm_provider == LlmProvider::Gemini
            || self.embedding_provider == EmbeddingProvider::Gemini;
        if needs_gemini && self.gemini_api_key.is_none() {
            return Err(anyhow!("GEMINI_API_KEY environment variable not set"));
        }

        if self.chunk_overlap > self.chunk_size {
            return Err(anyhow!(
                "CHUNK_OVERLAP ({}) must not exceed CHUNK_SIZE ({})",
                self.chunk_overlap,
                self.chunk_size
            ));
        }

        Ok(())
    }
}

fn parse<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
