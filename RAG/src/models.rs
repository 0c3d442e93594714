use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// A bounded slice of document text, the unit of indexing and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    pub id: String,
    pub content: String,
}

impl TextSegment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSegment {
    pub segment: TextSegment,
    pub score: f32,
}

/// Question to answer mapping, kept in the order questions were asked.
///
/// Re-inserting a question keeps its original position and replaces the answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerMapping {
    entries: Vec<(String, String)>,
}

impl AnswerMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        let question = question.into();
        let answer = answer.into();
        match self.entries.iter_mut().find(|(q, _)| *q == question) {
            Some(entry) => entry.1 = answer,
            None => self.entries.push((question, answer)),
        }
    }

    pub fn get(&self, question: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(q, _)| q == question)
            .map(|(_, a)| a.as_str())
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(q, _)| q.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(q, a)| (q.as_str(), a.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AnswerMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (question, answer) in &self.entries {
            map.serialize_entry(question, answer)?;
        }
        map.end()
    }
}

// Gemini wire types

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    pub generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiCandidate {
    pub content: GeminiContent,
}

#[derive(Debug, Serialize)]
pub struct GeminiBatchEmbedRequest {
    pub requests: Vec<GeminiEmbedRequest>,
}

#[derive(Debug, Serialize)]
pub struct GeminiEmbedRequest {
    pub model: String,
    pub content: GeminiContent,
}

#[derive(Debug, Deserialize)]
pub struct GeminiBatchEmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<GeminiEmbedding>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiEmbedding {
    pub values: Vec<f32>,
}

// OpenAI wire types

#[derive(Debug, Serialize)]
pub struct OpenAiCompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiCompletionResponse {
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiChoice {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct OpenAiEmbeddingRequest<'a> {
    pub model: &'a str,
    pub input: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct OpenAiEmbeddingResponse {
    pub data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiEmbeddingData {
    pub embedding: Vec<f32>,
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_mapping_keeps_question_order() {
        let mut answers = AnswerMapping::new();
        answers.insert("b?", "2");
        answers.insert("a?", "1");

        let json = serde_json::to_string(&answers).unwrap();
        assert_eq!(json, r#"{"b?":"2","a?":"1"}"#);
    }

    #[test]
    fn duplicate_question_keeps_position_and_last_answer() {
        let mut answers = AnswerMapping::new();
        answers.insert("first?", "old");
        answers.insert("second?", "x");
        answers.insert("first?", "new");

        assert_eq!(answers.len(), 2);
        assert_eq!(answers.questions().collect::<Vec<_>>(), vec!["first?", "second?"]);
        assert_eq!(answers.get("first?"), Some("new"));
    }
}
