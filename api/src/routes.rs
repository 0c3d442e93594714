use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use zania_rag::{package_answers, ContentExtractor, ExtractMode, FileTypeChecker};

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/zania/chat", post(zania_chat))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

struct UploadedFile {
    content_type: String,
    bytes: Vec<u8>,
}

async fn read_parts(
    mut multipart: Multipart,
) -> ApiResult<(Option<UploadedFile>, Option<UploadedFile>)> {
    let mut questions = None;
    let mut data = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await?.to_vec();
        let upload = UploadedFile { content_type, bytes };

        match name.as_str() {
            "questions" => questions = Some(upload),
            "data" => data = Some(upload),
            other => log::debug!("Ignoring unexpected form field '{}'", other),
        }
    }

    Ok((questions, data))
}

/// Answers every question in the `questions` part against the `data` document
/// and streams the answers back as `answers.json`.
pub async fn zania_chat(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let (questions, data) = read_parts(multipart?).await?;
    let questions = questions.ok_or(ApiError::MissingPart("questions"))?;
    let data = data.ok_or(ApiError::MissingPart("data"))?;

    FileTypeChecker::structured_data_only().check(&questions.content_type)?;
    FileTypeChecker::default().check(&data.content_type)?;

    let raw_text = ContentExtractor::new(ExtractMode::AsText)
        .extract(data.bytes, &data.content_type)
        .await?
        .into_text();

    let question_list = ContentExtractor::new(ExtractMode::AsObject)
        .extract(questions.bytes, &questions.content_type)
        .await?
        .into_question_list()
        .ok_or(ApiError::QuestionsNotProper)?;

    log::info!(
        "Answering {} questions over {} characters of text",
        question_list.len(),
        raw_text.chars().count()
    );

    let answers = state
        .query_service
        .answer_questions(&raw_text, &question_list)
        .await?;
    let packaged = package_answers(&answers)?;

    Ok((
        [
            (CONTENT_TYPE, packaged.media_type.to_string()),
            (CONTENT_DISPOSITION, packaged.content_disposition()),
        ],
        packaged.bytes,
    )
        .into_response())
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": true,
        "timezone": state.timezone,
    }))
}
