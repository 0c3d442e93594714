pub mod answer_generator;
pub mod config;
pub mod content_extractor;
pub mod embedding_service;
pub mod error;
pub mod factory;
pub mod models;
pub mod output_packager;
pub mod query_service;
pub mod text_splitter;
pub mod vector_store;

pub use answer_generator::{AnswerGenerator, GeminiGenerator, OpenAiGenerator};
pub use config::Settings;
pub use content_extractor::{ContentExtractor, ExtractMode, ExtractedContent, FileTypeChecker};
pub use embedding_service::{Embedder, GeminiEmbedder, LocalEmbedder, OpenAiEmbedder};
pub use error::{RagError, Result};
pub use models::*;
pub use output_packager::{package_answers, PackagedAnswers};
pub use query_service::{PipelineOptions, QueryService};
pub use text_splitter::TextSplitter;
pub use vector_store::{InMemoryVectorStore, RedisVectorStore, VectorIndex, VectorStore};
