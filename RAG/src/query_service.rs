use crate::answer_generator::{clean_answer, AnswerGenerator};
use crate::embedding_service::Embedder;
use crate::error::Result;
use crate::models::AnswerMapping;
use crate::text_splitter::{
    TextSplitter, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_SEPARATOR,
};
use crate::vector_store::{VectorIndex, VectorStore, DEFAULT_SEARCH_K};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub separator: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub index_prefix: String,
    pub search_k: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            index_prefix: "reviewidx".to_string(),
            search_k: DEFAULT_SEARCH_K,
        }
    }
}

/// Runs one document and its questions through chunk, index, retrieve and
/// generate. Each call indexes under a fresh name and drops that index when
/// done, whatever the outcome.
pub struct QueryService {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn AnswerGenerator>,
    splitter: TextSplitter,
    index_prefix: String,
    search_k: usize,
}

impl QueryService {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
        options: PipelineOptions,
    ) -> Result<Self> {
        let splitter = TextSplitter::new(options.separator, options.chunk_size, options.chunk_overlap)?;

        Ok(Self {
            vector_store,
            embedder,
            generator,
            splitter,
            index_prefix: options.index_prefix,
            search_k: options.search_k,
        })
    }

    pub async fn answer_questions(&self, text: &str, questions: &[String]) -> Result<AnswerMapping> {
        let start_time = Instant::now();

        let segments = self.splitter.create_segments(text);
        let index_name = format!("{}-{}", self.index_prefix, Uuid::new_v4());

        let index = match VectorIndex::build(
            self.vector_store.clone(),
            self.embedder.clone(),
            index_name.clone(),
            &segments,
        )
        .await
        {
            Ok(index) => index,
            Err(e) => {
                if let Err(drop_err) = self.vector_store.drop_index(&index_name).await {
                    log::debug!("No partial index '{}' to drop: {}", index_name, drop_err);
                }
                return Err(e);
            }
        };

        let result = self.answer_each(&index, questions).await;

        if let Err(e) = index.delete().await {
            log::warn!("Failed to drop index '{}': {}", index_name, e);
        }

        let answers = result?;
        log::info!(
            "Answered {} questions over {} segments in {} ms",
            answers.len(),
            segments.len(),
            start_time.elapsed().as_millis()
        );
        Ok(answers)
    }

    async fn answer_each(&self, index: &VectorIndex, questions: &[String]) -> Result<AnswerMapping> {
        let mut answers = AnswerMapping::new();

        for question in questions {
            let relevant: Vec<_> = index
                .search(question, self.search_k)
                .await?
                .into_iter()
                .map(|scored| scored.segment)
                .collect();

            let answer = self.generator.generate(&relevant, question).await?;
            answers.insert(question.clone(), clean_answer(&answer));
        }

        Ok(answers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer_generator::MockAnswerGenerator;
    use crate::embedding_service::LocalEmbedder;
    use crate::error::RagError;
    use crate::vector_store::InMemoryVectorStore;

    const DOCUMENT: &str = "The sky is blue on a clear day.\n\
Quarterly revenue grew by twelve percent.\n\
Employees accrue vacation days monthly.";

    fn service(store: Arc<InMemoryVectorStore>, generator: MockAnswerGenerator) -> QueryService {
        let options = PipelineOptions {
            chunk_size: 40,
            chunk_overlap: 0,
            search_k: 1,
            ..PipelineOptions::default()
        };
        QueryService::new(store, Arc::new(LocalEmbedder::default()), Arc::new(generator), options).unwrap()
    }

    fn questions(items: &[&str]) -> Vec<String> {
        items.iter().map(|q| q.to_string()).collect()
    }

    #[tokio::test]
    async fn answers_every_question_in_order() {
        let mut generator = MockAnswerGenerator::new();
        generator
            .expect_generate()
            .times(3)
            .returning(|_, question| Ok(format!("  answer to\n\n{}  ", question)));

        let store = Arc::new(InMemoryVectorStore::new());
        let asked = questions(&["Why is the sky blue?", "How did revenue change?", "Vacation?"]);
        let answers = service(store, generator).answer_questions(DOCUMENT, &asked).await.unwrap();

        assert_eq!(answers.len(), 3);
        assert_eq!(answers.questions().collect::<Vec<_>>(), asked);
        assert_eq!(answers.get("Vacation?"), Some("answer to Vacation?"));
    }

    #[tokio::test]
    async fn generator_sees_the_relevant_segment() {
        let mut generator = MockAnswerGenerator::new();
        generator
            .expect_generate()
            .withf(|segments, _question| {
                segments.len() == 1 && segments[0].content.contains("revenue")
            })
            .times(1)
            .returning(|_, _| Ok("Twelve percent.".to_string()));

        let store = Arc::new(InMemoryVectorStore::new());
        let answers = service(store, generator)
            .answer_questions(DOCUMENT, &questions(&["How much did revenue grow?"]))
            .await
            .unwrap();

        assert_eq!(answers.get("How much did revenue grow?"), Some("Twelve percent."));
    }

    #[tokio::test]
    async fn index_is_dropped_after_success() {
        let mut generator = MockAnswerGenerator::new();
        generator.expect_generate().returning(|_, _| Ok("ok".to_string()));

        let store = Arc::new(InMemoryVectorStore::new());
        service(store.clone(), generator)
            .answer_questions(DOCUMENT, &questions(&["Sky?"]))
            .await
            .unwrap();

        assert!(store.index_names().await.is_empty());
    }

    #[tokio::test]
    async fn generation_failure_aborts_the_batch_and_drops_the_index() {
        let mut generator = MockAnswerGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Err(RagError::Generation("rate limited".to_string())));

        let store = Arc::new(InMemoryVectorStore::new());
        let err = service(store.clone(), generator)
            .answer_questions(DOCUMENT, &questions(&["Sky?", "Revenue?"]))
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Generation(_)));
        assert!(store.index_names().await.is_empty());
    }

    #[tokio::test]
    async fn empty_document_still_answers() {
        let mut generator = MockAnswerGenerator::new();
        generator
            .expect_generate()
            .withf(|segments, _question| segments.is_empty())
            .returning(|_, _| Ok("I don't know.".to_string()));

        let store = Arc::new(InMemoryVectorStore::new());
        let answers = service(store, generator)
            .answer_questions("", &questions(&["Anything?"]))
            .await
            .unwrap();

        assert_eq!(answers.get("Anything?"), Some("I don't know."));
    }

    #[tokio::test]
    async fn repeated_runs_retrieve_the_same_segments() {
        let echo_top_segment = || {
            let mut generator = MockAnswerGenerator::new();
            generator.expect_generate().returning(|segments, _| {
                Ok(segments.first().map(|s| s.content.clone()).unwrap_or_default())
            });
            generator
        };

        let asked = questions(&["What color is the sky?"]);
        let store = Arc::new(InMemoryVectorStore::new());
        let first = service(store.clone(), echo_top_segment())
            .answer_questions(DOCUMENT, &asked)
            .await
            .unwrap();
        let second = service(store, echo_top_segment())
            .answer_questions(DOCUMENT, &asked)
            .await
            .unwrap();

        let answer = first.get("What color is the sky?").unwrap();
        assert!(!answer.is_empty());
        assert!(answer.contains("sky"));
        assert_eq!(first, second);
    }
}
