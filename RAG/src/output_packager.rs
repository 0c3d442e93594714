use crate::content_extractor::JSON_CONTENT_TYPE;
use crate::error::Result;
use crate::models::AnswerMapping;

pub const ANSWERS_FILENAME: &str = "answers.json";

/// Serialised answers ready to stream back as an attachment.
#[derive(Debug, Clone)]
pub struct PackagedAnswers {
    pub bytes: Vec<u8>,
    pub filename: &'static str,
    pub media_type: &'static str,
}

impl PackagedAnswers {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename={}", self.filename)
    }
}

pub fn package_answers(answers: &AnswerMapping) -> Result<PackagedAnswers> {
    Ok(PackagedAnswers {
        bytes: serde_json::to_vec(answers)?,
        filename: ANSWERS_FILENAME,
        media_type: JSON_CONTENT_TYPE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packages_utf8_json_in_question_order() {
        let mut answers = AnswerMapping::new();
        answers.insert("Wie heißt das?", "Straße");
        answers.insert("What color is the sky?", "Blue.");

        let packaged = package_answers(&answers).unwrap();
        let text = String::from_utf8(packaged.bytes.clone()).unwrap();
        assert_eq!(text, r#"{"Wie heißt das?":"Straße","What color is the sky?":"Blue."}"#);
        assert_eq!(packaged.media_type, "application/json");
        assert_eq!(packaged.content_disposition(), "attachment; filename=answers.json");
    }

    #[test]
    fn empty_mapping_is_an_empty_object() {
        let packaged = package_answers(&AnswerMapping::new()).unwrap();
        assert_eq!(packaged.bytes, b"{}");
    }
}
